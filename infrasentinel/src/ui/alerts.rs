//! Recent alerts list.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::history::fmt_datetime;
use crate::types::Alert;
use crate::ui::util::alert_icon;

pub fn alert_line(a: &Alert) -> String {
    let head = format!(
        "{} {} at {:.1}% (threshold: {}%)",
        alert_icon(&a.metric_type),
        a.metric_type.to_uppercase(),
        a.value,
        a.threshold
    );
    match a.message.as_deref().map(str::trim) {
        Some(m) if !m.is_empty() => format!("{head}: {m}"),
        _ => head,
    }
}

pub fn draw_alerts(f: &mut ratatui::Frame<'_>, area: Rect, alerts: &[Alert]) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Recent Alerts ({})", alerts.len()));

    if alerts.is_empty() {
        let p = Paragraph::new(Span::styled("No recent alerts", Style::default().fg(Color::DarkGray)))
            .block(block);
        f.render_widget(p, area);
        return;
    }

    let lines: Vec<Line> = alerts
        .iter()
        .map(|a| {
            Line::from(vec![
                Span::styled(alert_line(a), Style::default().fg(Color::Red)),
                Span::styled(
                    format!("  {}", fmt_datetime(&a.created_at)),
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}
