//! tictactoe_agents - HTTP backend, dashboard and query CLI.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tictactoe_agents::{AppConfig, AppState, Credentials, run_dashboard, run_query, serve};
use tracing::{info, instrument};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, host, port } => {
            init_tracing();
            run_server(config, host, port).await
        }
        Command::Dashboard { server_url, config } => {
            let config = AppConfig::load(config.as_deref())?;
            let server_url = server_url.unwrap_or_else(|| config.dashboard().server_url().clone());
            let poll = Duration::from_millis(*config.dashboard().poll_interval_ms());
            run_dashboard(server_url, poll).await
        }
        Command::Query {
            agent,
            method,
            params,
            server_url,
        } => {
            init_tracing();
            run_query(&server_url, &agent, &method, params.as_deref()).await
        }
    }
}

/// Run the HTTP backend
#[instrument]
async fn run_server(config_path: Option<PathBuf>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = AppConfig::load(config_path.as_deref())?;
    let mut api = config.api().clone();
    if let Some(host) = host {
        api = api.with_host(host);
    }
    if let Some(port) = port {
        api = api.with_port(port);
    }
    config = config.with_api(api);

    let credentials = Credentials::from_env();
    let host = config.api().host().clone();
    let port = *config.api().port();

    info!(%host, port, default_model = %config.models().default_model(), "Starting tictactoe_agents backend");
    let state = Arc::new(AppState::from_config(config, credentials));
    serve(state, &host, port).await
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tictactoe_agents=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
