// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::http::{StatusCode, header};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Serialize;

use super::error::{LookupError, LookupErrorKind};
use super::query::{LookupParams, SearchQuery};
use crate::app_state::AppState;
use crate::host::install::PLUGIN_NAME;
use crate::host::session::AuthRequest;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
const TAG_PLUGIN: &str = "tag";

pub fn configure(cfg: &mut web::ServiceConfig, root_doc: &str) {
    cfg.route(&lookup_path(root_doc), web::get().to(search_tags));
}

pub fn lookup_path(root_doc: &str) -> String {
    format!("{}/plugins/{}/ajax/tags.php", root_doc, PLUGIN_NAME)
}

#[derive(Serialize)]
struct AuthErrorBody<'a> {
    error: &'a str,
}

async fn search_tags(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let manifest = match state.install.manifest() {
        Ok(manifest) => manifest,
        Err(error) => {
            log::error!("Host installation check failed: {}", error);
            return json_response(StatusCode::INTERNAL_SERVER_ERROR, &error.to_body());
        }
    };

    if let Some(failure) = req.session_failure() {
        let error = LookupError::new(
            LookupErrorKind::SessionUnavailable,
            format!("Session layer unavailable: {}", failure.0),
        );
        return lookup_error_response(&error);
    }

    let Some(caller) = req.caller() else {
        return json_response(
            StatusCode::UNAUTHORIZED,
            &AuthErrorBody {
                error: "Authentication required",
            },
        );
    };

    if !manifest.has_plugin(TAG_PLUGIN) {
        return lookup_error_response(&LookupError::tag_type_unavailable());
    }

    let params = web::Query::<LookupParams>::from_query(req.query_string())
        .map(web::Query::into_inner)
        .unwrap_or_else(|error| {
            log::debug!("Ignoring malformed lookup query string: {}", error);
            LookupParams::default()
        });
    let query = SearchQuery::from_params(&params);

    let service = state.lookup.clone();
    let outcome = web::block(move || service.search(&caller, &query)).await;
    match outcome {
        Ok(Ok(page)) => json_response(StatusCode::OK, &page),
        Ok(Err(error)) => lookup_error_response(&error),
        Err(blocking) => {
            let error = LookupError::with_source(
                LookupErrorKind::Internal,
                "Tag lookup worker failed",
                blocking,
            );
            lookup_error_response(&error)
        }
    }
}

fn lookup_error_response(error: &LookupError) -> HttpResponse {
    log::error!(
        "Tag lookup failed at {}:{}: {}",
        error.file(),
        error.line(),
        error
    );
    json_response(StatusCode::INTERNAL_SERVER_ERROR, &error.to_body())
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    match serde_json::to_string(body) {
        Ok(json) => HttpResponse::build(status)
            .content_type(JSON_CONTENT_TYPE)
            .insert_header((
                header::CACHE_CONTROL,
                "no-store, no-cache, must-revalidate, max-age=0",
            ))
            .insert_header((header::PRAGMA, "no-cache"))
            .insert_header((header::EXPIRES, "Mon, 26 Jul 1997 05:00:00 GMT"))
            .body(json),
        Err(error) => {
            log::error!("Failed to serialize lookup response: {}", error);
            HttpResponse::InternalServerError().finish()
        }
    }
}
