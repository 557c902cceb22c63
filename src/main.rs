//! certidian-server – HTTP front end for the PDF generation pipelines.
//!
//! Usage:
//!   certidian-server [--env-file .env]
//!
//! Configuration comes from the environment (see [`certidian::config`]); the
//! optional `--env-file` loads `KEY=VALUE` lines first, without overriding
//! variables that are already set.

use std::sync::Arc;
use std::{env, fs, io, path::Path, path::PathBuf, process};

use certidian::config::Config;
use certidian::engine::HtmlEngine;
use certidian::form::FormRenderer;
use certidian::http::{self, AppState};

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut env_file: Option<PathBuf> = None;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--env-file" | "-e" => match iter.next() {
                Some(v) => env_file = Some(PathBuf::from(v)),
                None => {
                    eprintln!("--env-file requires a path");
                    print_usage(&args[0]);
                    process::exit(1);
                }
            },
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    if let Some(path) = &env_file {
        if let Err(e) = load_env_file(path) {
            eprintln!("Error reading env file '{}': {e}", path.display());
            process::exit(1);
        }
    }

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(1);
        }
    };

    let state = AppState {
        engine: HtmlEngine::new(&config.engine_binary, config.engine_timeout),
        forms: Arc::new(FormRenderer::new(&config.assets_dir, &config.reports_dir)),
        internal_code: config.internal_code.clone(),
    };
    let app = http::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Error binding '{addr}': {e}");
            process::exit(1);
        }
    };

    log::info!(
        "listening on {addr} (engine: {})",
        config.engine_binary.display()
    );
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {e}");
        process::exit(1);
    }
}

/// Load `KEY=VALUE` lines into the process environment. Variables that are
/// already set win, so the real environment can override the file.
fn load_env_file(path: &Path) -> io::Result<()> {
    for line in fs::read_to_string(path)?.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if env::var_os(key).is_none() {
            env::set_var(key, value.trim());
        }
    }
    Ok(())
}

fn print_usage(prog: &str) {
    eprintln!("certidian-server – PDF generation service");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} [--env-file .env]");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --env-file, -e   Load KEY=VALUE lines before reading the environment");
    eprintln!("  --help           Print this message");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  INTERNAL_CODE        shared secret for the x-internalcode header (required)");
    eprintln!("  HTTP_PORT            listen port (default: 8080)");
    eprintln!("  ENGINE_BINARY        html renderer binary (default: wkhtmltopdf)");
    eprintln!("  ENGINE_TIMEOUT_SECS  html render deadline (default: none)");
    eprintln!("  FORM_ASSETS_DIR      form image assets (default: ./assets)");
    eprintln!("  REPORTS_DIR          debug report destination (default: .)");
}
