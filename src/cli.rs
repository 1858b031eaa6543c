//! Command-line interface for tictactoe_agents.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tic-tac-toe against three cooperating LLM agents
#[derive(Parser, Debug)]
#[command(name = "tictactoe_agents")]
#[command(about = "Scout, Strategist and Executor agents playing tic-tac-toe over HTTP", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP backend
    Serve {
        /// Config file (JSON, or TOML by extension). Defaults to ./config.json when present
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Host to bind to (overrides config and HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the terminal dashboard against a running backend
    Dashboard {
        /// Backend URL. Defaults to the config's dashboard.server_url
        #[arg(long)]
        server_url: Option<String>,

        /// Config file for dashboard defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Send one JSON-RPC request to an agent endpoint
    Query {
        /// Agent id: scout, strategist or executor
        agent: String,

        /// Method, e.g. tools/list, or `summary` to list tools, resources and prompts
        method: String,

        /// Params as a JSON object
        #[arg(long)]
        params: Option<String>,

        /// Backend URL
        #[arg(long, default_value = "http://localhost:8000")]
        server_url: String,
    },
}
