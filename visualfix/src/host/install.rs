// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::{HostError, read_yaml};

pub const MANIFEST_FILE: &str = "host.yaml";
pub const SESSIONS_FILE: &str = "sessions.yaml";
pub const PLUGIN_NAME: &str = "visualfix";

/// Contents of the host's `host.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HostManifest {
    pub version: String,
    #[serde(default)]
    pub plugins: Vec<String>,
}

impl HostManifest {
    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins
            .iter()
            .any(|plugin| plugin.eq_ignore_ascii_case(name))
    }

    /// Dotted numeric comparison; missing components count as zero.
    pub fn version_at_least(&self, minimum: &str) -> bool {
        let actual = version_parts(&self.version);
        let wanted = version_parts(minimum);
        let width = actual.len().max(wanted.len());
        for index in 0..width {
            let left = actual.get(index).copied().unwrap_or(0);
            let right = wanted.get(index).copied().unwrap_or(0);
            if left != right {
                return left > right;
            }
        }
        true
    }
}

fn version_parts(version: &str) -> Vec<u64> {
    version
        .trim()
        .split('.')
        .map(|part| {
            part.chars()
                .take_while(char::is_ascii_digit)
                .collect::<String>()
                .parse()
                .unwrap_or(0)
        })
        .collect()
}

/// The host installation could not be located or read.
#[derive(Debug)]
pub struct InstallError {
    pub searched: PathBuf,
    pub dir: PathBuf,
    pub cause: Option<HostError>,
}

#[derive(Debug, Serialize)]
pub struct InstallErrorBody {
    pub error: String,
    pub searched: String,
    pub dir: String,
}

impl InstallError {
    pub fn to_body(&self) -> InstallErrorBody {
        InstallErrorBody {
            error: self.to_string(),
            searched: self.searched.display().to_string(),
            dir: self.dir.display().to_string(),
        }
    }
}

impl fmt::Display for InstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            None => write!(f, "Host {} not found", MANIFEST_FILE),
            Some(cause) => write!(f, "Host installation unreadable: {}", cause),
        }
    }
}

impl std::error::Error for InstallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// Paths of a host installation rooted at `root`.
#[derive(Debug, Clone)]
pub struct HostInstallation {
    root: PathBuf,
}

impl HostInstallation {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn sessions_path(&self) -> PathBuf {
        self.root.join(SESSIONS_FILE)
    }

    pub fn plugin_dir(&self, name: &str) -> PathBuf {
        self.root.join("plugins").join(name)
    }

    /// Read the manifest; run before anything else that needs the host.
    pub fn manifest(&self) -> Result<HostManifest, InstallError> {
        let searched = self.manifest_path();
        let dir = self.plugin_dir(PLUGIN_NAME);
        if !searched.is_file() {
            return Err(InstallError {
                searched,
                dir,
                cause: None,
            });
        }
        read_yaml(&searched).map_err(|cause| InstallError {
            searched,
            dir,
            cause: Some(cause),
        })
    }
}
