// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::web::Data;
use actix_web::{HttpMessage, HttpRequest};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::{Ready, ready};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::rc::Rc;

use super::{HostError, read_yaml};
use crate::app_state::AppState;

pub const DEFAULT_SESSION_COOKIE: &str = "glpi_session";

/// The authenticated user behind a request, with the entities their session
/// has active and the ancestors of those entities.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Caller {
    pub user: String,
    #[serde(default)]
    pub entities: Vec<u64>,
    #[serde(default)]
    pub ancestors: Vec<u64>,
}

/// The session layer could not be consulted for this request.
#[derive(Debug, Clone)]
pub struct SessionFailure(pub String);

/// Host sessions stored as a token to caller map in `sessions.yaml`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
    cookie_name: String,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>, cookie_name: &str) -> Self {
        Self {
            path: path.into(),
            cookie_name: cookie_name.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Sessions are re-read on every call so logins and logouts in the host
    /// take effect immediately.
    pub fn resolve(&self, token: &str) -> Result<Option<Caller>, HostError> {
        if token.is_empty() {
            return Ok(None);
        }
        let mut sessions: HashMap<String, Caller> = read_yaml(&self.path)?;
        Ok(sessions.remove(token))
    }
}

/// Trait to add session accessors to HttpRequest
pub trait AuthRequest {
    fn caller(&self) -> Option<Caller>;
    fn session_failure(&self) -> Option<SessionFailure>;

    fn is_authenticated(&self) -> bool;
}

impl AuthRequest for HttpRequest {
    fn caller(&self) -> Option<Caller> {
        self.extensions().get::<Caller>().cloned()
    }

    fn session_failure(&self) -> Option<SessionFailure> {
        self.extensions().get::<SessionFailure>().cloned()
    }

    fn is_authenticated(&self) -> bool {
        self.caller().is_some()
    }
}

// Session Authentication Middleware
pub struct SessionAuthMiddlewareFactory;

impl<S, B> Transform<S, ServiceRequest> for SessionAuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct SessionAuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SessionAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let state = req.app_data::<Data<AppState>>().cloned();
        let service = self.service.clone();

        Box::pin(async move {
            if let Some(state) = state {
                let sessions = &state.sessions;
                if let Some(cookie) = req.cookie(sessions.cookie_name()) {
                    match sessions.resolve(cookie.value()) {
                        Ok(Some(caller)) => {
                            log::debug!("Session resolved for user: {}", caller.user);
                            req.extensions_mut().insert(caller);
                        }
                        Ok(None) => {
                            log::debug!("Unknown session token presented");
                        }
                        Err(error) => {
                            log::error!("Session layer unavailable: {}", error);
                            req.extensions_mut()
                                .insert(SessionFailure(error.to_string()));
                        }
                    }
                }
            }

            service.call(req).await
        })
    }
}
