//! Dashboard state, refreshed from the backend on every poll.

use crate::agents::AgentStatus;
use crate::metrics::AgentMetrics;
use crate::protocol_log::ProtocolLogEntry;
use crate::session::GameSnapshot;
use crate::state::AiMove;
use tracing::debug;

/// Protocol log entries shown at the bottom of the screen.
pub const LOG_LINES: usize = 8;

/// One agent row in the metrics table.
#[derive(Debug, Clone)]
pub struct AgentRow {
    /// Status from `/agents/status`.
    pub status: AgentStatus,
    /// Metrics, if the fetch succeeded.
    pub metrics: Option<AgentMetrics>,
}

/// What the dashboard draws.
#[derive(Debug, Clone)]
pub struct Dashboard {
    server_url: String,
    game: Option<GameSnapshot>,
    agents: Vec<AgentRow>,
    logs: Vec<ProtocolLogEntry>,
    status_message: String,
    connected: bool,
}

impl Dashboard {
    /// Empty dashboard for `server_url`.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            game: None,
            agents: Vec::new(),
            logs: Vec::new(),
            status_message: "Connecting...".to_string(),
            connected: false,
        }
    }

    /// Backend URL.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Last game snapshot.
    pub fn game(&self) -> Option<&GameSnapshot> {
        self.game.as_ref()
    }

    /// Agent rows.
    pub fn agents(&self) -> &[AgentRow] {
        &self.agents
    }

    /// Recent protocol log entries, oldest first.
    pub fn logs(&self) -> &[ProtocolLogEntry] {
        &self.logs
    }

    /// Status line.
    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// Whether the last poll reached the backend.
    pub fn connected(&self) -> bool {
        self.connected
    }

    /// Stores a fresh poll.
    pub fn refresh(&mut self, game: GameSnapshot, agents: Vec<AgentRow>, logs: Vec<ProtocolLogEntry>) {
        if !self.connected {
            self.status_message = "Connected. Press 1-9 to play X.".to_string();
        }
        self.connected = true;
        self.game = Some(game);
        self.agents = agents;
        self.logs = logs;
    }

    /// Records a failed poll.
    pub fn disconnected(&mut self, error: &str) {
        self.connected = false;
        self.status_message = format!("Backend unreachable: {error}");
    }

    /// Sets the status line.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    /// Describes an AI move on the status line.
    pub fn ai_moved(&mut self, ai: &AiMove) {
        debug!(cell = %ai.decision.cell, path = %ai.decision.path, "AI moved");
        self.status_message = format!(
            "AI played {} via {} in {} ms",
            ai.decision.cell, ai.decision.path, ai.decision.elapsed_ms
        );
        self.game = Some(ai.game.clone());
    }

    /// Whether the loaded game is finished.
    pub fn game_over(&self) -> bool {
        self.game.as_ref().is_some_and(|g| g.game_over)
    }

    /// Text for the game status panel.
    pub fn game_summary(&self) -> String {
        match &self.game {
            None => "No game loaded".to_string(),
            Some(g) if g.game_over => match g.winner {
                Some(winner) => format!("{winner} wins! Press r to play again."),
                None => "Draw! Press r to play again.".to_string(),
            },
            Some(g) => match g.current_player {
                Some(player) => format!("Move {} - {} to play", g.move_count + 1, player),
                None => "Waiting".to_string(),
            },
        }
    }
}

/// Maps keys `1`-`9` to `(row, col)`, reading the board left to right, top to bottom.
pub fn key_to_cell(key: char) -> Option<(usize, usize)> {
    let digit = key.to_digit(10)? as usize;
    (1..=9).contains(&digit).then(|| ((digit - 1) / 3, (digit - 1) % 3))
}
