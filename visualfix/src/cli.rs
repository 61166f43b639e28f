// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

//! Command line entry points besides the server: patch a saved kanban page
//! offline, or query the tag lookup of a running server.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bootstrap;
use crate::config::ValidatedConfig;
use crate::dom::Document;
use crate::lookup::{SearchQuery, coerce_page, lookup_path};
use crate::page::{
    BoardSnapshot, HttpLookupSource, LookupSource, PageContext, PageSettings,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliErrorKind {
    Usage,
    Failure,
}

#[derive(Debug, Clone)]
pub struct CliError {
    kind: CliErrorKind,
    message: String,
}

impl CliError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self {
            kind: CliErrorKind::Usage,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            kind: CliErrorKind::Failure,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> CliErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> i32 {
        match self.kind {
            CliErrorKind::Usage => 2,
            CliErrorKind::Failure => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Fix {
        page: PathBuf,
        url: String,
        snapshot: Option<PathBuf>,
        select: Vec<String>,
    },
    Search {
        session: Option<String>,
        page: u32,
        term: String,
    },
}

pub fn help_text() -> String {
    let mut out = String::new();
    push_line(&mut out, "Usage:");
    push_line(&mut out, "  visualfix [options]");
    push_line(&mut out, "  visualfix [options] fix <page.html> [--url <href>] [--snapshot <json>] [--select <a,b>]");
    push_line(&mut out, "  visualfix [options] search [--session <token>] [--page <n>] [term]");
    push_line(&mut out, "  visualfix help");
    push_line(&mut out, "");
    push_line(&mut out, "Options:");
    push_line(&mut out, "  -C <root>   Set the runtime root (default: .).");
    push_line(&mut out, "  -h, --help  Show this help.");
    push_line(&mut out, "");
    push_line(&mut out, "Commands:");
    push_line(&mut out, "  fix      Apply the kanban patches to a saved page and print the result.");
    push_line(&mut out, "           --url       Address the page was loaded from (selects project boards).");
    push_line(&mut out, "           --snapshot  Board refresh response to use as card metadata.");
    push_line(&mut out, "           --select    Comma separated tag names to filter by.");
    push_line(&mut out, "  search   Query the tag lookup of a running server.");
    push_line(&mut out, "           --session   Host session token sent as the session cookie.");
    push_line(&mut out, "           --page      Result page, starting at 1.");
    push_line(&mut out, "");
    push_line(&mut out, "Without a command the lookup server is started.");
    out
}

pub fn parse_command(tokens: &[String]) -> Result<CliCommand, CliError> {
    let Some((name, rest)) = tokens.split_first() else {
        return Err(CliError::usage("Missing command"));
    };

    if name.eq_ignore_ascii_case("fix") {
        parse_fix(rest)
    } else if name.eq_ignore_ascii_case("search") {
        parse_search(rest)
    } else {
        Err(CliError::usage(format!("Unknown command '{}'", name)))
    }
}

fn option_value<'a>(
    name: &str,
    args: &mut impl Iterator<Item = &'a String>,
) -> Result<&'a String, CliError> {
    args.next()
        .ok_or_else(|| CliError::usage(format!("Missing value for {}", name)))
}

fn parse_fix(args: &[String]) -> Result<CliCommand, CliError> {
    let mut page = None;
    let mut url = String::new();
    let mut snapshot = None;
    let mut select = Vec::new();

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--url" => url = option_value(arg, &mut args)?.clone(),
            "--snapshot" => snapshot = Some(PathBuf::from(option_value(arg, &mut args)?)),
            "--select" => {
                select = option_value(arg, &mut args)?
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            other if other.starts_with("--") => {
                return Err(CliError::usage(format!("Unknown option '{}'", other)));
            }
            other => {
                if page.is_some() {
                    return Err(CliError::usage("fix takes a single page file"));
                }
                page = Some(PathBuf::from(other));
            }
        }
    }

    let page = page.ok_or_else(|| CliError::usage("fix needs a page file"))?;
    Ok(CliCommand::Fix {
        page,
        url,
        snapshot,
        select,
    })
}

fn parse_search(args: &[String]) -> Result<CliCommand, CliError> {
    let mut session = None;
    let mut page = 1;
    let mut terms = Vec::new();

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--session" => session = Some(option_value(arg, &mut args)?.clone()),
            "--page" => page = coerce_page(option_value(arg, &mut args)?),
            other if other.starts_with("--") => {
                return Err(CliError::usage(format!("Unknown option '{}'", other)));
            }
            other => terms.push(other.to_string()),
        }
    }

    Ok(CliCommand::Search {
        session,
        page,
        term: terms.join(" "),
    })
}

pub async fn run_cli(runtime_root: &Path, tokens: Vec<String>) -> i32 {
    let command = match parse_command(&tokens) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{}", err);
            return err.exit_code();
        }
    };

    match execute(runtime_root, command).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{}", err);
            err.exit_code()
        }
    }
}

async fn execute(runtime_root: &Path, command: CliCommand) -> Result<(), CliError> {
    let bootstrap = bootstrap::bootstrap_runtime(runtime_root)
        .map_err(|err| CliError::failure(format!("Bootstrap error: {}", err)))?;
    let config = bootstrap.validated_config;

    match command {
        CliCommand::Fix {
            page,
            url,
            snapshot,
            select,
        } => {
            let html = fix_page(&config, &page, &url, snapshot.as_deref(), &select)?;
            print!("{}", html);
            Ok(())
        }
        CliCommand::Search {
            session,
            page,
            term,
        } => search(&config, session.as_deref(), page, &term).await,
    }
}

/// Run the page patch pipeline over a saved page and return its markup.
pub fn fix_page(
    config: &ValidatedConfig,
    page: &Path,
    url: &str,
    snapshot: Option<&Path>,
    select: &[String],
) -> Result<String, CliError> {
    let html = fs::read_to_string(page)
        .map_err(|err| CliError::failure(format!("Failed to read {}: {}", page.display(), err)))?;

    let settings = PageSettings::from_config(&config.app.root_doc, &config.client);
    let context = PageContext::new(Document::parse(&html), url, settings);

    if let Some(path) = snapshot {
        let body = fs::read_to_string(path).map_err(|err| {
            CliError::failure(format!("Failed to read {}: {}", path.display(), err))
        })?;
        let snapshot = BoardSnapshot::from_json(&body)
            .map_err(|err| CliError::failure(format!("{}: {}", path.display(), err)))?;
        context.set_snapshot(snapshot);
    }

    let report = context.boot();
    let filter = if select.is_empty() {
        report.filter
    } else {
        context.apply_filter_names(select)
    };

    eprintln!(
        "Repaired {} fragment(s); {} of {} card(s) hidden; {} card(s) annotated; tag filter {}",
        report.repair.total(),
        filter.hidden,
        filter.cards,
        report.filter.annotated,
        if report.injected { "added" } else { "not added" }
    );
    Ok(context.html())
}

/// Lookup URL of the configured server, unless one is set explicitly.
pub fn lookup_url(config: &ValidatedConfig) -> String {
    if let Some(url) = &config.client.lookup_url {
        return url.clone();
    }
    let host = match config.server.host.as_str() {
        "0.0.0.0" | "::" => "127.0.0.1",
        host => host,
    };
    format!(
        "http://{}:{}{}",
        host,
        config.server.port,
        lookup_path(&config.app.root_doc)
    )
}

async fn search(
    config: &ValidatedConfig,
    session: Option<&str>,
    page: u32,
    term: &str,
) -> Result<(), CliError> {
    let mut source = HttpLookupSource::new(&lookup_url(config));
    if let Some(token) = session {
        source = source.with_session(&config.host.session_cookie, token);
    }

    let results = source
        .fetch(SearchQuery::new(term, page))
        .await
        .map_err(|err| CliError::failure(err.to_string()))?;

    for tag in &results.results {
        match &tag.color {
            Some(color) => println!("{}\t{}\t{}", tag.id, tag.text, color),
            None => println!("{}\t{}", tag.id, tag.text),
        }
    }
    if results.pagination.more {
        println!("(more results on page {})", page.saturating_add(1));
    }
    Ok(())
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}
