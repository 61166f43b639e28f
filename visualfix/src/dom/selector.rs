// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! The subset of CSS selectors the page runtime needs: type, universal,
//! `#id`, `.class`, `[attr]`, `[attr=v]`, `[attr~=v]`, `[attr^=v]`, the
//! descendant combinator and comma separated lists.

use super::{Document, NodeId};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, map, opt, value},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorError {
    selector: String,
}

impl fmt::Display for SelectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unsupported selector syntax: {}", self.selector)
    }
}

impl std::error::Error for SelectorError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOperator {
    Equals,
    Includes,
    Prefix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SimpleSelector {
    Tag(String),
    Universal,
    Id(String),
    Class(String),
    Attr {
        name: String,
        test: Option<(AttrOperator, String)>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Compound(Vec<SimpleSelector>);

/// Compounds joined by descendant combinators, leftmost first.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex(Vec<Compound>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        all_consuming(delimited(multispace0, selector_list, multispace0))(input)
            .map(|(_, alternatives)| Self { alternatives })
            .map_err(|_| SelectorError {
                selector: input.to_string(),
            })
    }

    pub fn matches(&self, document: &Document, node: NodeId) -> bool {
        self.alternatives
            .iter()
            .any(|complex| complex.matches(document, node))
    }
}

impl Complex {
    fn matches(&self, document: &Document, node: NodeId) -> bool {
        let Some((last, ancestors)) = self.0.split_last() else {
            return false;
        };
        if !last.matches(document, node) {
            return false;
        }
        let mut cursor = document.parent(node);
        for compound in ancestors.iter().rev() {
            loop {
                let Some(candidate) = cursor else {
                    return false;
                };
                cursor = document.parent(candidate);
                if compound.matches(document, candidate) {
                    break;
                }
            }
        }
        true
    }
}

impl Compound {
    fn matches(&self, document: &Document, node: NodeId) -> bool {
        let Some(element) = document.element(node) else {
            return false;
        };
        self.0.iter().all(|simple| match simple {
            SimpleSelector::Universal => true,
            SimpleSelector::Tag(name) => element.name == *name,
            SimpleSelector::Id(id) => element.attr("id") == Some(id.as_str()),
            SimpleSelector::Class(class) => element.has_class(class),
            SimpleSelector::Attr { name, test } => match (element.attr(name), test) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(actual), Some((AttrOperator::Equals, expected))) => actual == expected,
                (Some(actual), Some((AttrOperator::Includes, expected))) => actual
                    .split_ascii_whitespace()
                    .any(|item| item == expected),
                (Some(actual), Some((AttrOperator::Prefix, expected))) => {
                    !expected.is_empty() && actual.starts_with(expected.as_str())
                }
            },
        })
    }
}

fn identifier(input: &str) -> IResult<&str, String> {
    map(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
        |ident: &str| ident.to_string(),
    )(input)
}

fn attr_value(input: &str) -> IResult<&str, String> {
    alt((
        map(
            delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
            |value: &str| value.to_string(),
        ),
        map(
            delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
            |value: &str| value.to_string(),
        ),
        identifier,
    ))(input)
}

fn attr_operator(input: &str) -> IResult<&str, AttrOperator> {
    alt((
        value(AttrOperator::Includes, tag("~=")),
        value(AttrOperator::Prefix, tag("^=")),
        value(AttrOperator::Equals, tag("=")),
    ))(input)
}

fn attribute_selector(input: &str) -> IResult<&str, SimpleSelector> {
    map(
        delimited(
            pair(char('['), multispace0),
            pair(
                terminated(identifier, multispace0),
                opt(pair(
                    terminated(attr_operator, multispace0),
                    terminated(attr_value, multispace0),
                )),
            ),
            char(']'),
        ),
        |(name, test)| SimpleSelector::Attr {
            name: name.to_ascii_lowercase(),
            test,
        },
    )(input)
}

fn subclass_selector(input: &str) -> IResult<&str, SimpleSelector> {
    alt((
        map(preceded(char('#'), identifier), SimpleSelector::Id),
        map(preceded(char('.'), identifier), SimpleSelector::Class),
        attribute_selector,
    ))(input)
}

fn compound(input: &str) -> IResult<&str, Compound> {
    let (rest, (head, mut tail)) = pair(
        opt(alt((
            value(SimpleSelector::Universal, char('*')),
            map(identifier, |name| SimpleSelector::Tag(name.to_ascii_lowercase())),
        ))),
        many0(subclass_selector),
    )(input)?;
    if head.is_none() && tail.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        )));
    }
    if let Some(head) = head {
        tail.insert(0, head);
    }
    Ok((rest, Compound(tail)))
}

fn complex(input: &str) -> IResult<&str, Complex> {
    map(separated_list1(multispace1, compound), Complex)(input)
}

fn selector_list(input: &str) -> IResult<&str, Vec<Complex>> {
    separated_list1(tuple((multispace0, char(','), multispace0)), complex)(input)
}
