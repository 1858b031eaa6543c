//! Stateless rendering of the dashboard.

use super::app::Dashboard;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table},
};
use tictactoe_core::Player;

/// Draws the whole dashboard.
pub fn draw(frame: &mut Frame, dashboard: &Dashboard) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Title
            Constraint::Length(11), // Board + agents
            Constraint::Length(3),  // Status
            Constraint::Min(5),     // Protocol log
        ])
        .split(frame.area());

    let connection = if dashboard.connected() { "online" } else { "offline" };
    let title = Paragraph::new(format!("Tic-Tac-Toe Agents  [{}: {}]", dashboard.server_url(), connection))
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, chunks[0]);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(40)])
        .split(chunks[1]);
    draw_board(frame, middle[0], dashboard);
    draw_agents(frame, middle[1], dashboard);

    let status = Paragraph::new(dashboard.status_message())
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("1-9 move | a AI move | r reset | q quit"));
    frame.render_widget(status, chunks[2]);

    draw_logs(frame, chunks[3], dashboard);
}

fn mark_span(cell: Option<Player>, index: usize) -> Span<'static> {
    match cell {
        Some(Player::X) => Span::styled(" X ", Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD)),
        Some(Player::O) => Span::styled(" O ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        None => Span::styled(format!(" {} ", index + 1), Style::default().fg(Color::DarkGray)),
    }
}

fn draw_board(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let mut lines = Vec::new();
    if let Some(game) = dashboard.game() {
        for (r, row) in game.board.iter().enumerate() {
            let mut spans = Vec::new();
            for (c, cell) in row.iter().enumerate() {
                if c > 0 {
                    spans.push(Span::styled("|", Style::default().fg(Color::DarkGray)));
                }
                spans.push(mark_span(*cell, r * 3 + c));
            }
            lines.push(Line::from(spans));
            if r < 2 {
                lines.push(Line::styled("---+---+---", Style::default().fg(Color::DarkGray)));
            }
        }
        lines.push(Line::from(""));
    }
    lines.push(Line::from(dashboard.game_summary()));

    let board = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Board (you are X)"));
    frame.render_widget(board, area);
}

fn draw_agents(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let header = Row::new(["Agent", "Model", "LLM", "Reqs", "Fail", "Fallb", "Avg ms"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = dashboard.agents().iter().map(|row| {
        let llm = if row.status.llm_available { "yes" } else { "no" };
        let (requests, failures, fallbacks, avg) = match &row.metrics {
            Some(m) => (
                m.request_count().to_string(),
                m.failure_count().to_string(),
                m.fallback_count().to_string(),
                format!("{:.0}", m.avg_response_time_ms()),
            ),
            None => ("-".into(), "-".into(), "-".into(), "-".into()),
        };
        Row::new([
            row.status.name.clone(),
            row.status.model.clone(),
            llm.to_string(),
            requests,
            failures,
            fallbacks,
            avg,
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(11),
            Constraint::Min(14),
            Constraint::Length(4),
            Constraint::Length(5),
            Constraint::Length(5),
            Constraint::Length(6),
            Constraint::Length(7),
        ],
    )
    .header(header)
    .block(Block::default().borders(Borders::ALL).title("Agents"));
    frame.render_widget(table, area);
}

fn draw_logs(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let lines: Vec<Line> = dashboard
        .logs()
        .iter()
        .map(|entry| {
            Line::from(vec![
                Span::styled(
                    entry.timestamp.format("%H:%M:%S ").to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(format!("{:<11}", entry.agent), Style::default().fg(Color::Green)),
                Span::raw(format!("{:<18} ", entry.message_type)),
                Span::raw(entry.data.to_string()),
            ])
        })
        .collect();
    let log = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Protocol log"));
    frame.render_widget(log, area);
}
