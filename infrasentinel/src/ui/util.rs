//! Small UI helpers: truncation, icons, threshold colors.

use ratatui::style::Color;

use crate::ui::theme::{DANGER_COLOR, WARN_COLOR};

pub fn truncate_middle(s: &str, max: usize) -> String {
    let n = s.chars().count();
    if n <= max { return s.to_string(); }
    if max <= 3 { return "...".into(); }
    let keep = max - 3;
    let left = keep / 2;
    let right = keep - left;
    let head: String = s.chars().take(left).collect();
    let tail: String = s.chars().skip(n - right).collect();
    format!("{head}...{tail}")
}

pub fn alert_icon(metric_type: &str) -> &'static str {
    match metric_type.to_ascii_lowercase().as_str() {
        "cpu" => "💻",
        "memory" => "🧠",
        "disk" => "💾",
        _ => "⚠️",
    }
}

/// Gauge color for a percentage: normal below 80, warning from 80, danger from 90.
pub fn level_color(pct: f64, normal: Color) -> Color {
    if pct >= 90.0 { DANGER_COLOR }
    else if pct >= 80.0 { WARN_COLOR }
    else { normal }
}
