// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::config::{Config, ConfigError, ValidatedConfig};
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

pub mod config;

#[derive(Debug)]
pub struct BootstrapResult {
    pub validated_config: ValidatedConfig,
    pub runtime_root: PathBuf,
    pub created_config: bool,
}

#[derive(Debug)]
pub enum BootstrapError {
    Config(ConfigError),
    Io(std::io::Error),
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::Config(err) => write!(f, "{}", err),
            BootstrapError::Io(err) => write!(f, "Bootstrap I/O error: {}", err),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BootstrapError::Config(err) => Some(err),
            BootstrapError::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for BootstrapError {
    fn from(err: ConfigError) -> Self {
        BootstrapError::Config(err)
    }
}

impl From<std::io::Error> for BootstrapError {
    fn from(err: std::io::Error) -> Self {
        BootstrapError::Io(err)
    }
}

pub fn bootstrap_runtime(root: &Path) -> Result<BootstrapResult, BootstrapError> {
    let root_path = config::normalize_root(root)?;

    let created_config = config::ensure_config(&root_path)?;

    let runtime_root = root_path.canonicalize()?;
    let validated_config =
        Config::load_and_validate(&runtime_root).map_err(BootstrapError::Config)?;

    Ok(BootstrapResult {
        validated_config,
        runtime_root,
        created_config,
    })
}

pub(crate) fn log_action(message: impl AsRef<str>) {
    eprintln!("[bootstrap] {}", message.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_fixtures::TestFixtureRoot;
    use std::fs;

    #[test]
    fn bootstrap_creates_defaults_when_missing() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-default").unwrap();
        let result = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");

        assert!(result.created_config);
        assert_eq!(result.validated_config.server.port, 7080);
        assert_eq!(
            result.validated_config.host.root,
            result.runtime_root.join("glpi")
        );
        assert!(fixture.path().join("config.yaml").exists());
    }

    #[test]
    fn bootstrap_keeps_existing_config() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-existing").unwrap();
        fs::write(
            fixture.path().join("config.yaml"),
            "server:\n  host: \"0.0.0.0\"\n  port: 9090\napp:\n  name: \"Board\"\n  root_doc: \"/glpi\"\nlogging:\n  level: \"debug\"\nhost:\n  root: \"/srv/glpi\"\n",
        )
        .unwrap();
        let result = bootstrap_runtime(fixture.path()).expect("bootstrap should succeed");
        assert!(!result.created_config);
        assert_eq!(result.validated_config.server.port, 9090);
        assert_eq!(result.validated_config.app.root_doc, "/glpi");
    }

    #[test]
    fn bootstrap_reports_invalid_config() {
        let fixture = TestFixtureRoot::new_unique("bootstrap-invalid").unwrap();
        fs::write(fixture.path().join("config.yaml"), "server: [").unwrap();
        let err = bootstrap_runtime(fixture.path()).expect_err("invalid config");
        assert!(matches!(err, BootstrapError::Config(_)));
    }
}
