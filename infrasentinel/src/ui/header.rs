//! Top header: connection indicator, last update time, key hints.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::history::fmt_time;
use crate::ws::ConnectionState;

pub fn draw_header(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    host: &str,
    conn: ConnectionState,
    last_update: Option<&str>,
) {
    let (dot, label, color) = match conn {
        ConnectionState::Open => ("●", "Connected", Color::Green),
        ConnectionState::Connecting => ("◌", "Connecting", Color::Yellow),
        ConnectionState::Closed => ("●", "Disconnected", Color::Red),
    };
    let updated = last_update
        .map(|ts| format!("Updated: {}", fmt_time(ts)))
        .unwrap_or_else(|| "Updated: --:--:--".into());

    let line = Line::from(vec![
        Span::styled("InfraSentinel", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(" | {host}  ")),
        Span::styled(format!("{dot} {label}"), Style::default().fg(color)),
        Span::raw(format!("  | {updated}  ")),
        Span::styled(
            "(s sort, r/a/d refresh, 1-4 range, k kill, L logout, q quit)",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::BOTTOM)),
        area,
    );
}
