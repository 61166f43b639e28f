// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use std::sync::Arc;

use crate::config::ValidatedConfig;
use crate::host::install::PLUGIN_NAME;
use crate::host::{HostInstallation, PluginDescriptor, SessionStore, TagRepository, YamlTagStore};
use crate::lookup::LookupService;

pub struct AppState {
    pub install: HostInstallation,
    pub sessions: SessionStore,
    pub lookup: LookupService,
    pub plugin: PluginDescriptor,
    pub root_doc: String,
}

impl AppState {
    pub fn new(config: &ValidatedConfig) -> Self {
        let install = HostInstallation::new(config.host.root.clone());
        let tags = YamlTagStore::new(install.plugin_dir("tag").join("tags.yaml"));
        Self::with_repository(config, Arc::new(tags))
    }

    /// State backed by a caller-supplied tag repository.
    pub fn with_repository(config: &ValidatedConfig, repository: Arc<dyn TagRepository>) -> Self {
        let install = HostInstallation::new(config.host.root.clone());
        let sessions = SessionStore::new(install.sessions_path(), &config.host.session_cookie);
        Self {
            install,
            sessions,
            lookup: LookupService::new(repository),
            plugin: PluginDescriptor::default(),
            root_doc: config.app.root_doc.clone(),
        }
    }

    pub fn lookup_path(&self) -> String {
        crate::lookup::lookup_path(&self.root_doc)
    }

    /// Log the host installation status once at startup.
    pub fn log_host_status(&self) {
        match self.install.manifest() {
            Ok(manifest) => {
                log::info!(
                    "Host installation {} (version {})",
                    self.install.root().display(),
                    manifest.version
                );
                match self.plugin.hooks(&manifest) {
                    Ok(hooks) => log::info!(
                        "Plugin hooks: stylesheets {:?}, {} kanban filter(s)",
                        hooks.stylesheets,
                        hooks.kanban_filters.len()
                    ),
                    Err(message) => log::warn!("{}", message),
                }
                if !manifest.has_plugin(PLUGIN_NAME) {
                    log::warn!("Plugin '{}' is not listed as active by the host", PLUGIN_NAME);
                }
            }
            Err(error) => log::warn!("{}", error),
        }
    }
}
