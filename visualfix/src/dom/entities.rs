// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Character reference handling for the rendered tree.
//!
//! Decoding covers the named references the host actually emits plus numeric
//! references. Unknown references are kept verbatim, the way browsers keep an
//! ampersand that does not start a known reference.

const NAMED_REFERENCES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    ("copy", '\u{a9}'),
    ("reg", '\u{ae}'),
    ("hellip", '\u{2026}'),
    ("ndash", '\u{2013}'),
    ("mdash", '\u{2014}'),
    ("laquo", '\u{ab}'),
    ("raquo", '\u{bb}'),
];

/// Decode one layer of character references.
pub fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }

    let mut decoded = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(position) = rest.find('&') {
        decoded.push_str(&rest[..position]);
        let candidate = &rest[position..];
        match decode_reference(candidate) {
            Some((ch, consumed)) => {
                decoded.push(ch);
                rest = &candidate[consumed..];
            }
            None => {
                decoded.push('&');
                rest = &candidate[1..];
            }
        }
    }
    decoded.push_str(rest);
    decoded
}

/// Returns the decoded character and the number of bytes consumed, `&` and
/// `;` included.
fn decode_reference(candidate: &str) -> Option<(char, usize)> {
    let body = candidate.strip_prefix('&')?;
    let end = body.find(';')?;
    let name = &body[..end];
    if name.is_empty() || name.len() > 10 {
        return None;
    }

    let ch = if let Some(numeric) = name.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        char::from_u32(code)?
    } else {
        NAMED_REFERENCES
            .iter()
            .find(|(reference, _)| *reference == name)
            .map(|(_, ch)| *ch)?
    };

    Some((ch, end + 2))
}

/// Escape text content the way `innerHTML` serializes it.
pub fn escape_text(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\u{a0}' => escaped.push_str("&nbsp;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Escape an attribute value for a double-quoted attribute.
pub fn escape_attribute(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\u{a0}' => escaped.push_str("&nbsp;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_named_and_numeric_references() {
        assert_eq!(
            decode_entities("&lt;i class=&quot;ti&quot;&gt;&#65;&#x42;"),
            "<i class=\"ti\">AB"
        );
    }

    #[test]
    fn decodes_only_one_layer() {
        assert_eq!(decode_entities("&amp;lt;b&amp;gt;"), "&lt;b&gt;");
    }

    #[test]
    fn keeps_unknown_and_unterminated_references() {
        assert_eq!(decode_entities("a & b &bogus; &lt"), "a & b &bogus; &lt");
    }

    #[test]
    fn text_escaping_leaves_quotes_alone() {
        assert_eq!(escape_text("<i class=\"x\">&"), "&lt;i class=\"x\"&gt;&amp;");
        assert_eq!(escape_attribute("a\"b&c<"), "a&quot;b&amp;c<");
    }
}
