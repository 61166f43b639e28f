// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Lenient HTML fragment parser.
//!
//! Covers the markup the host renders: elements with quoted, unquoted and
//! bare attributes, void elements, comments, doctype and raw text elements.
//! Stray end tags are ignored and unclosed elements are closed at the end of
//! input. Anything that does not tokenize as a tag is text.

use super::entities::decode_entities;
use super::{Document, ElementData, NodeData, NodeId};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{alpha1, char, multispace0, multispace1},
    combinator::{map, opt, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

#[derive(Debug, PartialEq)]
enum Token<'a> {
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag(String),
    Comment(&'a str),
    Doctype(&'a str),
}

pub(super) fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub(super) fn is_raw_text_element(name: &str) -> bool {
    matches!(name, "script" | "style")
}

pub(super) fn parse_into(document: &mut Document, parent: NodeId, html: &str) {
    let mut open: Vec<NodeId> = vec![parent];
    let mut text = String::new();
    let mut rest = html;

    while !rest.is_empty() {
        let Some(position) = rest.find('<') else {
            text.push_str(rest);
            break;
        };
        text.push_str(&rest[..position]);
        rest = &rest[position..];

        let Ok((after, token)) = markup_token(rest) else {
            text.push('<');
            rest = &rest[1..];
            continue;
        };
        flush_text(document, &open, &mut text);
        rest = after;

        let current = *open.last().unwrap_or(&parent);
        match token {
            Token::Comment(body) => {
                let node = document.create_node(NodeData::Comment(body.to_string()));
                document.append_child(current, node);
            }
            Token::Doctype(body) => {
                let node = document.create_node(NodeData::Doctype(body.trim().to_string()));
                document.append_child(current, node);
            }
            Token::EndTag(name) => {
                // Never pop the fragment parent itself.
                if let Some(index) = open
                    .iter()
                    .skip(1)
                    .rposition(|node| document.tag_name(*node) == Some(name.as_str()))
                {
                    open.truncate(index + 1);
                }
            }
            Token::StartTag {
                name,
                attrs,
                self_closing,
            } => {
                let element = document.create_node(NodeData::Element(ElementData {
                    name: name.clone(),
                    attrs,
                }));
                document.append_child(current, element);
                if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                    let (after_raw, raw) = raw_text(rest, &name);
                    rest = after_raw;
                    if !raw.is_empty() {
                        let value = if is_raw_text_element(&name) {
                            raw.to_string()
                        } else {
                            decode_entities(raw)
                        };
                        let node = document.create_text(&value);
                        document.append_child(element, node);
                    }
                } else if !self_closing && !is_void_element(&name) {
                    open.push(element);
                }
            }
        }
    }

    flush_text(document, &open, &mut text);
}

fn flush_text(document: &mut Document, open: &[NodeId], text: &mut String) {
    if text.is_empty() {
        return;
    }
    let Some(current) = open.last().copied() else {
        return;
    };
    let node = document.create_text(&decode_entities(text));
    document.append_child(current, node);
    text.clear();
}

/// Content of a raw text element up to its end tag, and the input after it.
fn raw_text<'a>(input: &'a str, name: &str) -> (&'a str, &'a str) {
    let lowered = input.to_ascii_lowercase();
    let closing = format!("</{}", name);
    match lowered.find(&closing) {
        Some(position) => {
            let raw = &input[..position];
            let after = &input[position..];
            match after.find('>') {
                Some(end) => (&after[end + 1..], raw),
                None => ("", raw),
            }
        }
        None => ("", input),
    }
}

fn markup_token(input: &str) -> IResult<&str, Token<'_>> {
    alt((comment, doctype, end_tag, start_tag))(input)
}

fn comment(input: &str) -> IResult<&str, Token<'_>> {
    map(
        delimited(tag("<!--"), take_until("-->"), tag("-->")),
        Token::Comment,
    )(input)
}

fn doctype(input: &str) -> IResult<&str, Token<'_>> {
    map(
        delimited(tag("<!"), take_while(|c: char| c != '>'), char('>')),
        Token::Doctype,
    )(input)
}

fn tag_name(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alpha1,
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == ':'),
        )),
        |name: &str| name.to_ascii_lowercase(),
    )(input)
}

fn end_tag(input: &str) -> IResult<&str, Token<'_>> {
    map(
        delimited(tag("</"), tag_name, preceded(multispace0, char('>'))),
        Token::EndTag,
    )(input)
}

fn start_tag(input: &str) -> IResult<&str, Token<'_>> {
    map(
        tuple((
            preceded(char('<'), tag_name),
            many0(preceded(multispace1, attribute)),
            multispace0,
            opt(char('/')),
            char('>'),
        )),
        |(name, attrs, _, slash, _)| Token::StartTag {
            name,
            attrs,
            self_closing: slash.is_some(),
        },
    )(input)
}

fn attribute_name(input: &str) -> IResult<&str, String> {
    map(
        take_while1(|c: char| {
            !c.is_whitespace() && !matches!(c, '/' | '>' | '=' | '"' | '\'' | '<')
        }),
        |name: &str| name.to_ascii_lowercase(),
    )(input)
}

fn attribute_value(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
            delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
            take_while1(|c: char| {
                !c.is_whitespace() && !matches!(c, '>' | '"' | '\'' | '<' | '`')
            }),
        )),
        decode_entities,
    )(input)
}

fn attribute(input: &str) -> IResult<&str, (String, String)> {
    map(
        pair(
            attribute_name,
            opt(preceded(
                terminated(preceded(multispace0, char('=')), multispace0),
                attribute_value,
            )),
        ),
        |(name, value)| (name, value.unwrap_or_default()),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> Document {
        Document::parse(html)
    }

    #[test]
    fn tokenizes_start_tag_with_mixed_attributes() {
        let (rest, token) =
            start_tag(r#"<input type=text disabled data-x='1' class="a b">tail"#).expect("tag");
        assert_eq!(rest, "tail");
        assert_eq!(
            token,
            Token::StartTag {
                name: "input".to_string(),
                attrs: vec![
                    ("type".to_string(), "text".to_string()),
                    ("disabled".to_string(), String::new()),
                    ("data-x".to_string(), "1".to_string()),
                    ("class".to_string(), "a b".to_string()),
                ],
                self_closing: false,
            }
        );
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        let document = parse("<p>a < b</p>");
        assert_eq!(document.text_content(document.root()), "a < b");
    }

    #[test]
    fn decodes_entities_in_text_and_attributes() {
        let document = parse(r#"<span title="&quot;x&quot;">&lt;i&gt;</span>"#);
        let span = document.select_first(document.root(), "span").expect("span");
        assert_eq!(document.attr(span, "title"), Some("\"x\""));
        assert_eq!(document.text_content(span), "<i>");
    }

    #[test]
    fn stray_end_tags_are_ignored_and_open_tags_closed() {
        let document = parse("</div><ul><li>one<li>two</ul>");
        assert_eq!(
            document.inner_html(document.root()),
            "<ul><li>one<li>two</li></li></ul>"
        );
    }

    #[test]
    fn raw_text_elements_keep_markup() {
        let document = parse("<script>if (a < b) { x = '<i>'; }</script><p>after</p>");
        let script = document.select_first(document.root(), "script").expect("script");
        assert_eq!(document.text_content(script), "if (a < b) { x = '<i>'; }");
        assert!(document.select_first(document.root(), "p").is_some());
    }

    #[test]
    fn keeps_comments_and_doctype() {
        let html = "<!DOCTYPE html><!-- note --><p>x</p>";
        let document = parse(html);
        assert_eq!(document.inner_html(document.root()), html);
    }
}
