// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Decorator over the host's request dispatcher.
//!
//! Only the board refresh exchange is observed; every other request passes
//! through unchanged, and the refresh response itself is handed back to the
//! caller untouched.

use actix_web::http::Method;
use actix_web::web;
use futures_util::future::LocalBoxFuture;
use std::fmt;
use std::rc::Rc;

use super::context::PageContext;

const REFRESH_ACTION: &str = "refresh";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
}

impl HostRequest {
    pub fn get(url: &str) -> Self {
        Self {
            method: Method::GET,
            url: url.to_string(),
            body: None,
        }
    }

    /// A form-encoded POST, the way the board posts its actions.
    pub fn post_form(url: &str, body: &str) -> Self {
        Self {
            method: Method::POST,
            url: url.to_string(),
            body: Some(body.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostResponse {
    pub status: u16,
    pub body: String,
}

impl HostResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Network(String),
    Aborted,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Network(msg) => write!(f, "Request failed: {}", msg),
            TransportError::Aborted => write!(f, "Request aborted"),
        }
    }
}

impl std::error::Error for TransportError {}

/// The host's outgoing request mechanism.
pub trait Transport {
    fn dispatch(
        &self,
        request: HostRequest,
    ) -> LocalBoxFuture<'static, Result<HostResponse, TransportError>>;
}

/// Recognizes the board refresh request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshMatcher {
    path: String,
}

impl RefreshMatcher {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
        }
    }

    /// The URL names the refresh endpoint and `action=refresh` is sent either
    /// in the query string or in the form body.
    pub fn matches(&self, request: &HostRequest) -> bool {
        if !request.url.contains(&self.path) {
            return false;
        }
        let query = request
            .url
            .split_once('?')
            .map(|(_, query)| query.split('#').next().unwrap_or(""))
            .unwrap_or("");
        has_refresh_action(query) || request.body.as_deref().is_some_and(has_refresh_action)
    }
}

fn has_refresh_action(encoded: &str) -> bool {
    if encoded.is_empty() {
        return false;
    }
    match web::Query::<Vec<(String, String)>>::from_query(encoded) {
        Ok(params) => params
            .iter()
            .any(|(name, value)| name == "action" && value == REFRESH_ACTION),
        Err(_) => false,
    }
}

pub struct InterceptingTransport {
    inner: Rc<dyn Transport>,
    context: PageContext,
    matcher: RefreshMatcher,
}

impl InterceptingTransport {
    pub fn new(inner: Rc<dyn Transport>, context: PageContext, matcher: RefreshMatcher) -> Self {
        Self {
            inner,
            context,
            matcher,
        }
    }
}

impl Transport for InterceptingTransport {
    fn dispatch(
        &self,
        request: HostRequest,
    ) -> LocalBoxFuture<'static, Result<HostResponse, TransportError>> {
        if !self.matcher.matches(&request) {
            return self.inner.dispatch(request);
        }

        let pending = self.inner.dispatch(request);
        let context = self.context.clone();
        Box::pin(async move {
            let response = pending.await?;
            if response.is_success() {
                match context.capture_board_refresh(&response.body) {
                    Ok(cards) => {
                        log::debug!("VisualFix: captured tag metadata for {} card(s)", cards)
                    }
                    Err(err) => log::warn!("VisualFix: {}", err),
                }
            }
            Ok(response)
        })
    }
}
