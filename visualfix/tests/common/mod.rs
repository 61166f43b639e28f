// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

#![allow(dead_code)]

use actix_web::cookie::Cookie;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, Result, web};
use std::sync::Arc;
use visualfix::app_state::AppState;
use visualfix::config::{
    AppConfig, ClientConfig, LoggingConfig, ServerConfig, ValidatedConfig, ValidatedHostConfig,
};
use visualfix::host::session::DEFAULT_SESSION_COOKIE;
use visualfix::host::{SessionAuthMiddlewareFactory, TagRepository, plugin};
use visualfix::lookup;
use visualfix::util::test_fixtures::TestFixtureRoot;

pub const ROOT_DOC: &str = "/glpi";
pub const ALICE_TOKEN: &str = "token-alice";
pub const BOB_TOKEN: &str = "token-bob";
pub const TAG_COUNT: usize = 25;

const SESSIONS: &str = r#"
token-alice:
  user: alice
  entities: [1]
  ancestors: [0]
token-bob:
  user: bob
  entities: [2]
  ancestors: [0]
"#;

pub struct TestHarness {
    pub fixture: TestFixtureRoot,
    pub config: Arc<ValidatedConfig>,
    pub app_state: Arc<AppState>,
}

impl TestHarness {
    /// A host with the tag plugin active, two sessions and 25 tags owned by
    /// entity 1.
    pub fn new() -> Self {
        Self::with_plugins(&["tag", "visualfix"])
    }

    pub fn with_plugins(plugins: &[&str]) -> Self {
        let fixture = TestFixtureRoot::new_unique("lookup-api").expect("fixture root");
        fixture
            .init_host_layout("11.0.1", plugins)
            .expect("host layout");
        fixture.write_sessions(SESSIONS).expect("sessions");
        fixture.write_tags(&numbered_tags(TAG_COUNT)).expect("tags");
        Self::assemble(fixture, None)
    }

    /// No host installation at all under the configured root.
    pub fn without_host_install() -> Self {
        let fixture = TestFixtureRoot::new_unique("lookup-api-bare").expect("fixture root");
        Self::assemble(fixture, None)
    }

    pub fn with_repository(repository: Arc<dyn TagRepository>) -> Self {
        let fixture = TestFixtureRoot::new_unique("lookup-api-repo").expect("fixture root");
        fixture
            .init_host_layout("11.0.1", &["tag", "visualfix"])
            .expect("host layout");
        fixture.write_sessions(SESSIONS).expect("sessions");
        Self::assemble(fixture, Some(repository))
    }

    fn assemble(fixture: TestFixtureRoot, repository: Option<Arc<dyn TagRepository>>) -> Self {
        let config = Arc::new(build_config(&fixture));
        let app_state = Arc::new(match repository {
            Some(repository) => AppState::with_repository(&config, repository),
            None => AppState::new(&config),
        });
        Self {
            fixture,
            config,
            app_state,
        }
    }

    pub fn lookup_uri(&self, query: &str) -> String {
        let path = self.app_state.lookup_path();
        if query.is_empty() {
            path
        } else {
            format!("{}?{}", path, query)
        }
    }
}

pub fn build_config(fixture: &TestFixtureRoot) -> ValidatedConfig {
    ValidatedConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 7080,
            workers: 1,
        },
        app: AppConfig {
            name: "VisualFix Test".to_string(),
            root_doc: ROOT_DOC.to_string(),
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        host: ValidatedHostConfig {
            root: fixture.host_root(),
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
        },
        client: ClientConfig::default(),
    }
}

/// `tag-01` .. `tag-NN`, every third one coloured, all in entity 1.
pub fn numbered_tags(count: usize) -> String {
    let mut yaml = String::from("entity_assign: true\ntags:\n");
    for index in 1..=count {
        let color = if index % 3 == 0 {
            format!(", color: \"#{:02x}{:02x}00\"", index * 10, 255 - index * 10)
        } else {
            String::new()
        };
        yaml.push_str(&format!(
            "  - {{ id: {}, name: \"tag-{:02}\", entities_id: 1{} }}\n",
            100 + index,
            index,
            color
        ));
    }
    yaml
}

pub fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::new(DEFAULT_SESSION_COOKIE, token.to_string())
}

pub fn build_test_app(
    harness: &TestHarness,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    > + use<>,
> {
    let root_doc_for_lookup = harness.config.app.root_doc.clone();
    let root_doc_for_plugin = harness.config.app.root_doc.clone();

    App::new()
        .app_data(web::Data::from(harness.app_state.clone()))
        .wrap(SessionAuthMiddlewareFactory)
        .configure(move |cfg| lookup::configure(cfg, &root_doc_for_lookup))
        .configure(move |cfg| plugin::configure(cfg, &root_doc_for_plugin))
        .default_service(web::route().to(test_default_not_found))
}

async fn test_default_not_found() -> Result<HttpResponse> {
    Ok(HttpResponse::NotFound().body("not found"))
}
