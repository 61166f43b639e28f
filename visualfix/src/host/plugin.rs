// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::http::header;
use actix_web::{HttpResponse, Result, web};
use serde::Serialize;

use super::install::{HostManifest, PLUGIN_NAME};

const STYLESHEET: &str = include_str!("assets/visualfix.css");
const STYLESHEET_PATH: &str = "css/visualfix.css";
pub const MIN_HOST_VERSION: &str = "11.0.0";
const PROJECT_ITEMTYPE: &str = "Project";

/// Registration data the host reads when listing the plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDescriptor {
    pub key: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    pub license: &'static str,
    pub min_host_version: &'static str,
    pub csrf_compliant: bool,
}

impl Default for PluginDescriptor {
    fn default() -> Self {
        Self {
            key: PLUGIN_NAME,
            name: "Visual Fix",
            version: "1.0.0",
            license: "GPLv2+",
            min_host_version: MIN_HOST_VERSION,
            csrf_compliant: true,
        }
    }
}

/// A filter the host kanban offers in its own filter menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KanbanFilter {
    pub key: String,
    pub label: String,
}

/// What the plugin registers with a given host installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostHooks {
    pub stylesheets: Vec<&'static str>,
    pub kanban_filters: Vec<KanbanFilter>,
}

/// Hook surface the host's plugin manager calls into.
impl PluginDescriptor {
    /// Resolve the page hooks for `manifest`, failing when the host is too
    /// old for the plugin.
    pub fn hooks(&self, manifest: &HostManifest) -> Result<HostHooks, String> {
        self.check_prerequisites(manifest)?;
        Ok(HostHooks {
            stylesheets: self.stylesheets(manifest),
            kanban_filters: self.kanban_filters(PROJECT_ITEMTYPE),
        })
    }

    /// Stylesheets added to every host page while the plugin is active.
    pub fn stylesheets(&self, manifest: &HostManifest) -> Vec<&'static str> {
        if manifest.has_plugin(self.key) {
            vec![STYLESHEET_PATH]
        } else {
            Vec::new()
        }
    }

    pub fn check_prerequisites(&self, manifest: &HostManifest) -> Result<(), String> {
        if manifest.version_at_least(self.min_host_version) {
            Ok(())
        } else {
            Err(format!(
                "{} requires host version {} or later, found {}",
                self.name, self.min_host_version, manifest.version
            ))
        }
    }

    /// No extra kanban filters: the tag plugin already registers its own and
    /// duplicates break the host's filter cache.
    pub fn kanban_filters(&self, _itemtype: &str) -> Vec<KanbanFilter> {
        Vec::new()
    }

    /// Lifecycle hooks run by the host when the plugin is (un)installed.
    /// Nothing is stored, so both always succeed.
    pub fn install(&self) -> bool {
        log::info!("{} {} installed", self.name, self.version);
        true
    }

    pub fn uninstall(&self) -> bool {
        log::info!("{} {} uninstalled", self.name, self.version);
        true
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, root_doc: &str) {
    cfg.route(
        &format!("{}/plugins/{}/{}", root_doc, PLUGIN_NAME, STYLESHEET_PATH),
        web::get().to(serve_stylesheet),
    );
}

async fn serve_stylesheet() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok()
        .content_type("text/css; charset=utf-8")
        .insert_header((header::CACHE_CONTROL, "public, max-age=3600"))
        .body(STYLESHEET))
}
