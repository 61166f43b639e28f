// This file is part of the product VisualFix.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::rt::System;
use actix_web::{App, HttpServer, middleware::Logger, web};
use log::{LevelFilter, info};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use visualfix::app_state::AppState;
use visualfix::bootstrap;
use visualfix::cli;
use visualfix::config::ValidatedConfig;
use visualfix::host::{SessionAuthMiddlewareFactory, plugin};
use visualfix::lookup;
use visualfix::util;

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let parsed_args = match parse_args() {
        Ok(args) => args,
        Err(error) => {
            eprintln!("❌ Invalid command line arguments: {}", error);
            eprintln!("❌ Use -C <root> to set the runtime directory.");
            return 1;
        }
    };

    if matches!(parsed_args.mode, RunMode::Help) {
        print!("{}", cli::help_text());
        return 0;
    }

    if let RunMode::Cli(tokens) = parsed_args.mode {
        if let Err(error) = init_logging(LevelFilter::Warn, env_logger::Target::Stderr) {
            eprintln!("❌ Failed to initialize logger: {}", error);
            return 1;
        }
        return System::new()
            .block_on(async { cli::run_cli(&parsed_args.runtime_root, tokens).await });
    }

    let bootstrap = match bootstrap::bootstrap_runtime(&parsed_args.runtime_root) {
        Ok(result) => result,
        Err(error) => {
            eprintln!("❌ Bootstrap error: {}", error);
            eprintln!("❌ Application cannot start with invalid configuration.");
            return 1;
        }
    };

    match System::new().block_on(run_server(bootstrap)) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("❌ Server failed to start: {}", error);
            1
        }
    }
}

fn init_logging(
    level: LevelFilter,
    target: env_logger::Target,
) -> Result<(), log::SetLoggerError> {
    // Configure logging with a stable format
    let logger = env_logger::Builder::from_default_env()
        .filter_level(level)
        .target(target)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f UTC"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .build();

    util::init_logger(util::default_rules(), logger)
}

async fn run_server(bootstrap: bootstrap::BootstrapResult) -> std::io::Result<()> {
    let validated_config = Arc::new(bootstrap.validated_config);

    init_logging(
        validated_config.log_level_filter(),
        env_logger::Target::Stdout,
    )
    .map_err(|error| {
        eprintln!("❌ Failed to initialize logger: {}", error);
        std::io::Error::other(error.to_string())
    })?;

    log_startup_info(&validated_config, &bootstrap.runtime_root);

    let app_state = Arc::new(AppState::new(&validated_config));
    app_state.log_host_status();
    info!("✅ Tag lookup available at {}", app_state.lookup_path());

    let root_doc = validated_config.app.root_doc.clone();
    let workers = validated_config.server.workers;

    let factory = move || {
        let app_state = app_state.clone();
        let root_doc_for_lookup = root_doc.clone();
        let root_doc_for_plugin = root_doc.clone();

        App::new()
            .app_data(web::Data::from(app_state))
            .wrap(Logger::new(
                r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T"#,
            ))
            .wrap(SessionAuthMiddlewareFactory)
            .configure(move |cfg| lookup::configure(cfg, &root_doc_for_lookup))
            .configure(move |cfg| plugin::configure(cfg, &root_doc_for_plugin))
    };

    HttpServer::new(factory)
        .workers(workers)
        .bind(validated_config.server.address_tuple())?
        .run()
        .await
}

fn log_startup_info(config: &ValidatedConfig, runtime_root: &Path) {
    info!("Starting {}", config.app.name);
    info!("Workers: {}", config.server.workers);
    info!(
        "Listening on http://{}:{}",
        config.server.host, config.server.port
    );
    info!("Host installation: {}", config.host.root.display());
    info!("Session cookie: {}", config.host.session_cookie);
    info!("Runtime root: {}", runtime_root.display());

    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {}", current_dir.display());
    }
}

enum RunMode {
    Server,
    Cli(Vec<String>),
    Help,
}

struct ParsedArgs {
    runtime_root: std::path::PathBuf,
    mode: RunMode,
}

fn parse_args() -> Result<ParsedArgs, String> {
    parse_args_from(std::env::args().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<ParsedArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();
    if args.iter().any(|arg| is_help_flag(arg)) {
        return Ok(ParsedArgs {
            runtime_root: std::path::PathBuf::from("."),
            mode: RunMode::Help,
        });
    }

    let mut args = args.into_iter();
    let mut runtime_root = std::path::PathBuf::from(".");
    let mut cli_tokens = Vec::new();

    while let Some(arg) = args.next() {
        if arg == "--" && cli_tokens.is_empty() {
            continue;
        } else if arg == "-C" && cli_tokens.is_empty() {
            let value = args
                .next()
                .ok_or_else(|| "Missing value for -C".to_string())?;
            runtime_root = std::path::PathBuf::from(value);
        } else {
            cli_tokens.push(arg);
        }
    }

    if cli_tokens.len() == 1 && cli_tokens[0].eq_ignore_ascii_case("help") {
        return Ok(ParsedArgs {
            runtime_root,
            mode: RunMode::Help,
        });
    }

    let runtime_root = make_runtime_root_absolute(runtime_root)?;

    let mode = if cli_tokens.is_empty() {
        RunMode::Server
    } else {
        RunMode::Cli(cli_tokens)
    };

    Ok(ParsedArgs { runtime_root, mode })
}

fn is_help_flag(arg: &str) -> bool {
    arg == "-h" || arg == "--help"
}

fn make_runtime_root_absolute(
    runtime_root: std::path::PathBuf,
) -> Result<std::path::PathBuf, String> {
    if runtime_root.is_absolute() {
        return Ok(runtime_root);
    }

    let current_dir = std::env::current_dir()
        .map_err(|error| format!("Failed to resolve current directory: {}", error))?;
    Ok(current_dir.join(runtime_root))
}
