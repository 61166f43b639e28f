// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::host::install::{MANIFEST_FILE, SESSIONS_FILE};

/// A scratch directory under `target/test-fixtures`, removed on drop.
#[derive(Debug)]
pub struct TestFixtureRoot {
    path: PathBuf,
}

impl TestFixtureRoot {
    pub fn new_fixed(name: &str) -> std::io::Result<Self> {
        let root = fixtures_root().join(name);
        if root.exists() {
            fs::remove_dir_all(&root)?;
        }
        fs::create_dir_all(&root)?;
        Ok(Self { path: root })
    }

    pub fn new_unique(prefix: &str) -> std::io::Result<Self> {
        let name = format!("{}-{}", prefix, Uuid::new_v4());
        Self::new_fixed(&name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a fake host installation lives inside the fixture.
    pub fn host_root(&self) -> PathBuf {
        self.path.join("glpi")
    }

    pub fn tags_file(&self) -> PathBuf {
        self.host_root().join("plugins").join("tag").join("tags.yaml")
    }

    /// Lay out a host installation reporting `version` with `plugins` active.
    pub fn init_host_layout(&self, version: &str, plugins: &[&str]) -> std::io::Result<()> {
        let host_root = self.host_root();
        fs::create_dir_all(host_root.join("plugins").join("visualfix"))?;
        let manifest = format!("version: \"{}\"\nplugins: [{}]\n", version, plugins.join(", "));
        fs::write(host_root.join(MANIFEST_FILE), manifest)?;
        if !host_root.join(SESSIONS_FILE).exists() {
            fs::write(host_root.join(SESSIONS_FILE), "{}\n")?;
        }
        Ok(())
    }

    pub fn write_sessions(&self, yaml: &str) -> std::io::Result<()> {
        fs::create_dir_all(self.host_root())?;
        fs::write(self.host_root().join(SESSIONS_FILE), yaml)
    }

    pub fn write_tags(&self, yaml: &str) -> std::io::Result<()> {
        let path = self.tags_file();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, yaml)
    }
}

impl Drop for TestFixtureRoot {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn fixtures_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let repo_root = manifest_dir.parent().unwrap_or(&manifest_dir);
    repo_root.join("target").join("test-fixtures")
}
