// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Color utilities for tag badges
//!
//! Tags carry a background color as a CSS hex string. The badge text color is
//! chosen from the perceived brightness of that background.

/// Backgrounds at or above this brightness get black text.
pub const BRIGHTNESS_THRESHOLD: u32 = 128;

pub const DARK_TEXT: &str = "#000000";
pub const LIGHT_TEXT: &str = "#ffffff";

/// Parse a CSS hex color
///
/// # Arguments
/// * `value` - `#rgb` or `#rrggbb`, the leading `#` optional
///
/// # Returns
/// * `Some((r, g, b))` - components (0-255), `None` for anything else
pub fn parse_hex_color(value: &str) -> Option<(u8, u8, u8)> {
    let hex = value.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    match hex.len() {
        3 => {
            let mut parts = hex.chars().map(|c| c.to_digit(16).map(|d| (d * 17) as u8));
            Some((parts.next()??, parts.next()??, parts.next()??))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some((r, g, b))
        }
        _ => None,
    }
}

/// Perceived brightness (0-255) using the `(299 r + 587 g + 114 b) / 1000`
/// weighting.
pub fn perceived_brightness(r: u8, g: u8, b: u8) -> u32 {
    (299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)) / 1000
}

/// Text color readable on `background`, or `None` when the background is not
/// a hex color.
pub fn contrast_text_color(background: &str) -> Option<&'static str> {
    let (r, g, b) = parse_hex_color(background)?;
    if perceived_brightness(r, g, b) >= BRIGHTNESS_THRESHOLD {
        Some(DARK_TEXT)
    } else {
        Some(LIGHT_TEXT)
    }
}
