// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use env_logger::Logger;
use log::{Level, Log, Metadata, Record, SetLoggerError};

/// Re-levels records whose target starts with `prefix` and whose level is
/// `from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelRule {
    pub prefix: String,
    pub from: Level,
    pub to: Level,
}

impl LevelRule {
    pub fn new(prefix: &str, from: Level, to: Level) -> Self {
        Self {
            prefix: prefix.to_string(),
            from,
            to,
        }
    }
}

/// Startup chatter from the server and the HTTP client stack is demoted so
/// `info` stays about tag lookups and page patching.
pub fn default_rules() -> Vec<LevelRule> {
    vec![
        LevelRule::new("actix_server", Level::Info, Level::Debug),
        LevelRule::new("reqwest", Level::Info, Level::Debug),
        LevelRule::new("hyper_util", Level::Info, Level::Trace),
        LevelRule::new("rustls", Level::Info, Level::Trace),
    ]
}

struct LevelModifierLogger {
    inner: Logger,
    rules: Vec<LevelRule>,
}

impl LevelModifierLogger {
    fn new(inner: Logger, rules: Vec<LevelRule>) -> Self {
        LevelModifierLogger { inner, rules }
    }

    fn get_new_level(&self, target: &str, original_level: Level) -> Level {
        relevel(&self.rules, target, original_level)
    }
}

fn relevel(rules: &[LevelRule], target: &str, level: Level) -> Level {
    rules
        .iter()
        .find(|rule| target.starts_with(&rule.prefix) && rule.from == level)
        .map(|rule| rule.to)
        .unwrap_or(level)
}

impl Log for LevelModifierLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        let new_level = self.get_new_level(metadata.target(), metadata.level());
        let new_metadata = Metadata::builder()
            .level(new_level)
            .target(metadata.target())
            .build();
        self.inner.enabled(&new_metadata)
    }

    fn log(&self, record: &Record) {
        let new_level = self.get_new_level(record.target(), record.level());
        let new_record = Record::builder()
            .level(new_level)
            .target(record.target())
            .args(*record.args())
            .module_path(record.module_path())
            .file(record.file())
            .line(record.line())
            .build();
        self.inner.log(&new_record);
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

pub fn init_logger(rules: Vec<LevelRule>, logger: Logger) -> Result<(), SetLoggerError> {
    let custom_logger = LevelModifierLogger::new(logger, rules);
    log::set_boxed_logger(Box::new(custom_logger))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
