//! Terminal dashboard for the agent backend.

mod app;
mod http_client;
mod ui;

pub use app::{AgentRow, Dashboard, LOG_LINES, key_to_cell};
pub use http_client::DashboardClient;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Log file the dashboard writes to instead of the terminal.
pub const LOG_FILE: &str = "tictactoe_dashboard.log";

/// Runs the dashboard until `q`.
pub async fn run_dashboard(server_url: String, poll_interval: Duration) -> Result<()> {
    // Logs go to a file so they do not corrupt the screen.
    let log_file = std::fs::File::create(LOG_FILE)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tictactoe_agents=debug")),
        )
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .try_init();

    info!(%server_url, "Starting dashboard");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let client = DashboardClient::new(server_url);
    let res = run_loop(&mut terminal, &client, poll_interval).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!(error = ?err, "Dashboard loop error");
    }
    res
}

/// Fetches everything the dashboard shows.
#[instrument(skip_all)]
pub async fn poll(client: &DashboardClient, dashboard: &mut Dashboard) {
    let game = match client.game_state().await {
        Ok(game) => game,
        Err(e) => {
            debug!(error = %e, "Poll failed");
            dashboard.disconnected(&e.to_string());
            return;
        }
    };

    let mut agents = Vec::new();
    match client.agent_statuses().await {
        Ok(statuses) => {
            for status in statuses {
                let metrics = client.agent_metrics(&status.agent_id).await.ok();
                agents.push(AgentRow { status, metrics });
            }
        }
        Err(e) => warn!(error = %e, "Agent status unavailable"),
    }

    let logs = client.recent_logs(LOG_LINES).await.unwrap_or_default();
    dashboard.refresh(game, agents, logs);
}

async fn request_ai_move(client: &DashboardClient, dashboard: &mut Dashboard) {
    dashboard.set_status("AI is thinking...");
    match client.ai_move().await {
        Ok(ai) => dashboard.ai_moved(&ai),
        Err(e) => dashboard.set_status(format!("AI move failed: {e}")),
    }
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    client: &DashboardClient,
    poll_interval: Duration,
) -> Result<()> {
    let mut dashboard = Dashboard::new(client.base_url());

    loop {
        poll(client, &mut dashboard).await;
        terminal.draw(|f| ui::draw(f, &dashboard))?;

        if !event::poll(poll_interval)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('q') => {
                info!("User quit");
                return Ok(());
            }
            KeyCode::Char('r') => match client.reset().await {
                Ok(()) => dashboard.set_status("New game. Press 1-9 to play X."),
                Err(e) => dashboard.set_status(format!("Reset failed: {e}")),
            },
            KeyCode::Char('a') => request_ai_move(client, &mut dashboard).await,
            KeyCode::Char(c) => {
                let Some((row, col)) = key_to_cell(c) else {
                    continue;
                };
                match client.make_move(row, col).await {
                    Ok(()) => {
                        info!(row, col, "Human move sent");
                        dashboard.set_status(format!("You played ({row}, {col})"));
                        // Show the human move before the agents start thinking.
                        poll(client, &mut dashboard).await;
                        terminal.draw(|f| ui::draw(f, &dashboard))?;
                        if !dashboard.game_over() {
                            request_ai_move(client, &mut dashboard).await;
                        }
                    }
                    Err(e) => dashboard.set_status(format!("Move rejected: {e}")),
                }
            }
            _ => {}
        }
    }
}
