// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::panic::Location;

pub const TAG_TYPE_UNAVAILABLE: &str =
    "Tag type not available. Check if the \"tag\" plugin is active.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupErrorKind {
    SessionUnavailable,
    TagTypeUnavailable,
    Repository,
    Internal,
}

/// Failure of a lookup request, reported to the caller with the place it was
/// raised and the chain of underlying causes.
#[derive(Debug)]
pub struct LookupError {
    kind: LookupErrorKind,
    message: String,
    location: &'static Location<'static>,
    source: Option<Box<dyn Error + Send + Sync>>,
}

#[derive(Debug, Serialize)]
pub struct LookupErrorBody {
    pub error: String,
    pub file: String,
    pub line: u32,
    pub trace: Vec<String>,
}

impl LookupError {
    #[track_caller]
    pub fn new(kind: LookupErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: Location::caller(),
            source: None,
        }
    }

    #[track_caller]
    pub fn with_source<E>(kind: LookupErrorKind, message: impl Into<String>, source: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self {
            kind,
            message: message.into(),
            location: Location::caller(),
            source: Some(Box::new(source)),
        }
    }

    #[track_caller]
    pub fn tag_type_unavailable() -> Self {
        Self::new(LookupErrorKind::TagTypeUnavailable, TAG_TYPE_UNAVAILABLE)
    }

    pub fn kind(&self) -> LookupErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn file(&self) -> &'static str {
        self.location.file()
    }

    pub fn line(&self) -> u32 {
        self.location.line()
    }

    /// One line per underlying cause, outermost first.
    pub fn trace(&self) -> Vec<String> {
        let mut trace = vec![format!(
            "#0 {}:{} {}",
            self.location.file(),
            self.location.line(),
            self.message
        )];
        let mut cause = self.source();
        while let Some(error) = cause {
            trace.push(format!("#{} {}", trace.len(), error));
            cause = error.source();
        }
        trace
    }

    pub fn to_body(&self) -> LookupErrorBody {
        LookupErrorBody {
            error: self.message.clone(),
            file: self.file().to_string(),
            line: self.line(),
            trace: self.trace(),
        }
    }
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for LookupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|error| error as &(dyn Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_where_it_was_raised() {
        let error = LookupError::tag_type_unavailable();
        assert_eq!(error.kind(), LookupErrorKind::TagTypeUnavailable);
        assert!(error.file().ends_with("error.rs"));
        assert_eq!(error.line(), line!() - 3);
    }

    #[test]
    fn trace_follows_source_chain() {
        let io = std::io::Error::other("disk gone");
        let error = LookupError::with_source(LookupErrorKind::Repository, "Tag query failed", io);
        let trace = error.trace();
        assert_eq!(trace.len(), 2);
        assert!(trace[0].contains("Tag query failed"));
        assert!(trace[1].starts_with("#1 disk gone"));
        let body = error.to_body();
        assert_eq!(body.error, "Tag query failed");
        assert_eq!(body.trace, trace);
    }
}
