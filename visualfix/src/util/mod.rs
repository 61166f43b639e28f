// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

pub mod color;
pub mod log_level_changer;
pub mod test_fixtures;

pub use color::{contrast_text_color, parse_hex_color, perceived_brightness};
pub use log_level_changer::{LevelRule, default_rules, init_logger};
