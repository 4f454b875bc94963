//! Metrics history chart: cpu / memory / disk lines over the rolling window.

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
};

use crate::history::Series;
use crate::ui::theme::{CPU_COLOR, DISK_COLOR, MEM_COLOR};

fn points(values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f64, v.clamp(0.0, 100.0)))
        .collect()
}

/// First, middle and last labels; enough for a terminal-width axis.
fn x_labels(labels: &[String]) -> Vec<Span<'static>> {
    match labels.len() {
        0 => Vec::new(),
        1 => vec![Span::raw(labels[0].clone())],
        n => vec![
            Span::raw(labels[0].clone()),
            Span::raw(labels[n / 2].clone()),
            Span::raw(labels[n - 1].clone()),
        ],
    }
}

pub fn draw_metrics_chart(f: &mut ratatui::Frame<'_>, area: Rect, series: &Series, range: usize) {
    let cpu = points(&series.cpu);
    let mem = points(&series.memory);
    let disk = points(&series.disk);

    let datasets = vec![
        Dataset::default()
            .name("CPU %")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(CPU_COLOR))
            .data(&cpu),
        Dataset::default()
            .name("Memory %")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(MEM_COLOR))
            .data(&mem),
        Dataset::default()
            .name("Disk %")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(DISK_COLOR))
            .data(&disk),
    ];

    let x_max = (series.len().max(2) - 1) as f64;
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("System Metrics (last {range} samples)")),
        )
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, x_max])
                .labels(x_labels(&series.labels)),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, 100.0])
                .labels(vec![Span::raw("0%"), Span::raw("50%"), Span::raw("100%")]),
        );
    f.render_widget(chart, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_labels_pick_ends_and_middle() {
        let labels: Vec<String> = (0..5).map(|i| format!("t{i}")).collect();
        let spans = x_labels(&labels);
        let text: Vec<String> = spans.iter().map(|s| s.content.to_string()).collect();
        assert_eq!(text, vec!["t0", "t2", "t4"]);
        assert!(x_labels(&[]).is_empty());
    }

    #[test]
    fn points_are_clamped_for_display() {
        assert_eq!(points(&[150.0, -1.0]), vec![(0.0, 100.0), (1.0, 0.0)]);
    }
}
