// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Interfaces to the host application the plugin runs inside: its
//! installation, sessions, entity scoping, tag records and plugin hooks.
//! The host stores these as YAML documents under its installation root.

pub mod install;
pub mod plugin;
pub mod scope;
pub mod session;
pub mod tags;

use std::error::Error;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub use install::{HostInstallation, HostManifest, InstallError};
pub use plugin::{HostHooks, KanbanFilter, PluginDescriptor};
pub use scope::EntityScope;
pub use session::{AuthRequest, Caller, SessionAuthMiddlewareFactory, SessionStore};
pub use tags::{TagCriteria, TagRecord, TagRepository, YamlTagStore};

#[derive(Debug)]
pub enum HostError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Io { path, source } => {
                write!(f, "Failed to read '{}': {}", path.display(), source)
            }
            HostError::Parse { path, source } => {
                write!(f, "Failed to parse '{}': {}", path.display(), source)
            }
        }
    }
}

impl Error for HostError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HostError::Io { source, .. } => Some(source),
            HostError::Parse { source, .. } => Some(source),
        }
    }
}

/// Read and deserialize one of the host's YAML documents.
pub(crate) fn read_yaml<T>(path: &Path) -> Result<T, HostError>
where
    T: serde::de::DeserializeOwned,
{
    let content = fs::read_to_string(path).map_err(|source| HostError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| HostError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
