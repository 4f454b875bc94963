//! CPU / memory / disk cards with threshold-colored gauges.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    widgets::{Block, Borders, Gauge},
};

use crate::types::MetricsPayload;
use crate::ui::theme::{CPU_COLOR, DISK_COLOR, MEM_COLOR};
use crate::ui::util::level_color;

pub fn draw_gauges(f: &mut ratatui::Frame<'_>, area: Rect, m: Option<&MetricsPayload>) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let cards = [
        ("CPU", m.map(|x| x.cpu), CPU_COLOR),
        ("Memory", m.map(|x| x.memory), MEM_COLOR),
        ("Disk", m.map(|x| x.disk), DISK_COLOR),
    ];
    for (slot, (title, value, color)) in cols.iter().zip(cards) {
        draw_card(f, *slot, title, value, color);
    }
}

fn draw_card(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    title: &str,
    value: Option<f64>,
    color: ratatui::style::Color,
) {
    let (label, ratio, fg) = match value {
        Some(v) => (format!("{v:.1}%"), bar_ratio(v), level_color(v, color)),
        None => ("--".to_string(), 0.0, color),
    };
    let g = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .gauge_style(Style::default().fg(fg))
        .ratio(ratio)
        .label(label);
    f.render_widget(g, area);
}

/// Values are displayed raw but the bar is clamped to [0, 100].
pub fn bar_ratio(v: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, 100.0) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_is_clamped() {
        assert_eq!(bar_ratio(50.0), 0.5);
        assert_eq!(bar_ratio(130.0), 1.0);
        assert_eq!(bar_ratio(-3.0), 0.0);
        assert_eq!(bar_ratio(f64::NAN), 0.0);
    }
}
