//! Service entry point.
//!
//! Loads configuration, installs the log subscriber, starts the server,
//! waits for a termination signal or a fatal listener error, then drains
//! within the configured deadline.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use api_server::config;
use api_server::http::build_router;
use api_server::observability::logging;
use api_server::{Server, TerminationReason};

#[derive(Parser)]
#[command(name = "api-server")]
#[command(about = "Minimal HTTP service with graceful shutdown", long_about = None)]
struct Cli {
    /// Dotenv file loaded into the environment before reading configuration.
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Print the resolved configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let dotenv = dotenvy::from_path(&cli.env_file);
    let loaded = config::load_from_env();

    if let Err(err) = logging::init(&loaded.config.env) {
        eprintln!("failed to install log subscriber: {err}");
        return ExitCode::FAILURE;
    }

    match dotenv {
        Ok(()) => tracing::debug!(path = %cli.env_file.display(), "Loaded env file"),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!(path = %cli.env_file.display(), error = %err, "Failed to load env file"),
    }
    loaded.log_warnings();
    let config = loaded.config;

    if cli.print_config {
        return match serde_json::to_string_pretty(&config) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to render configuration");
                ExitCode::FAILURE
            }
        };
    }

    tracing::info!(
        env = %config.env,
        http_addr = %config.http_addr,
        read_timeout_secs = config.read_timeout_secs,
        write_timeout_secs = config.write_timeout_secs,
        idle_timeout_secs = config.idle_timeout_secs,
        shutdown_timeout_secs = config.shutdown_timeout_secs,
        "Configuration loaded"
    );

    let server = Server::new(&config, build_router(&config));
    if let Err(err) = server.start() {
        tracing::error!(error = %err, "Failed to start server");
        return ExitCode::FAILURE;
    }

    let reason = server.await_termination().await;
    let shutdown = server.stop(config.shutdown_timeout()).await;

    match &shutdown {
        Ok(()) => tracing::info!("server stopped"),
        Err(err) => tracing::error!(error = %err, "graceful shutdown failed"),
    }

    match (reason, shutdown) {
        (TerminationReason::Signal(_), Ok(())) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
