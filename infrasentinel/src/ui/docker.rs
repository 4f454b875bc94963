//! Docker and Jenkins status, images and containers.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::history::fmt_datetime;
use crate::types::{DockerInfo, DockerSnapshot, JenkinsInfo};
use crate::ui::theme::{DANGER_COLOR, OK_COLOR, WARN_COLOR};

pub fn docker_summary(info: &DockerInfo) -> Vec<String> {
    if !info.available {
        return vec!["❌ Docker not available".into()];
    }
    vec![
        format!(
            "Containers: {}/{} running",
            info.containers.running, info.containers.total
        ),
        format!("Images: {}", info.images.total),
        format!(
            "Disk: images {}GB, containers {}GB, volumes {}GB",
            info.disk_usage.images, info.disk_usage.containers, info.disk_usage.volumes
        ),
    ]
}

/// Result text, icon and color for the last Jenkins build.
pub fn build_badge(result: Option<&str>) -> (&str, &'static str, Color) {
    match result {
        Some("SUCCESS") => ("SUCCESS", "✅", OK_COLOR),
        Some("FAILURE") => ("FAILURE", "❌", DANGER_COLOR),
        Some(other) => (other, "⏳", WARN_COLOR),
        None => ("IN_PROGRESS", "⏳", WARN_COLOR),
    }
}

fn jenkins_lines(j: &JenkinsInfo) -> Vec<Line<'static>> {
    if !j.available {
        return vec![Line::from("❌ Jenkins not accessible")];
    }
    let (text, icon, color) = build_badge(j.last_build.result.as_deref());
    vec![
        Line::from(format!("Job: {}", j.job_name)),
        Line::from(vec![
            Span::raw(format!("Build #{}: ", j.last_build.number)),
            Span::styled(format!("{icon} {text}"), Style::default().fg(color)),
        ]),
        Line::from(format!(
            "Duration: {}s  Health: {}%",
            j.last_build.duration, j.health_score
        )),
    ]
}

pub fn draw_docker(f: &mut ratatui::Frame<'_>, area: Rect, snap: Option<&DockerSnapshot>) {
    let Some(snap) = snap else {
        f.render_widget(
            Paragraph::new("Loading...").block(Block::default().borders(Borders::ALL).title("Docker / Jenkins")),
            area,
        );
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(3), Constraint::Min(3)])
        .split(area);
    let status = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    let docker_lines: Vec<Line> = docker_summary(&snap.info).into_iter().map(Line::from).collect();
    f.render_widget(
        Paragraph::new(docker_lines).block(Block::default().borders(Borders::ALL).title("Docker")),
        status[0],
    );
    f.render_widget(
        Paragraph::new(jenkins_lines(&snap.jenkins))
            .block(Block::default().borders(Borders::ALL).title("Jenkins")),
        status[1],
    );

    let hdr = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let images = snap.images.images.iter().map(|i| {
        Row::new(vec![
            Cell::from(i.id.clone()),
            Cell::from(format!("{}:{}", i.repository, i.tag)),
            Cell::from(format!("{}MB", i.size)),
            Cell::from(fmt_datetime(&i.created)),
        ])
    });
    let images_table = Table::new(
        images,
        [
            Constraint::Length(12),
            Constraint::Min(10),
            Constraint::Length(10),
            Constraint::Length(13),
        ],
    )
    .header(Row::new(vec!["ID", "Image", "Size", "Created"]).style(hdr))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Images ({})", snap.images.images.len())),
    );
    f.render_widget(images_table, rows[1]);

    let containers = snap.containers.containers.iter().map(|c| {
        let color = match c.state.as_str() {
            "running" => OK_COLOR,
            "exited" => DANGER_COLOR,
            _ => WARN_COLOR,
        };
        let ports = if c.ports.is_empty() { "-".to_string() } else { c.ports.clone() };
        Row::new(vec![
            Cell::from(c.name.clone()),
            Cell::from(c.image.clone()),
            Cell::from(c.status.clone()).style(Style::default().fg(color)),
            Cell::from(ports),
        ])
    });
    let containers_table = Table::new(
        containers,
        [
            Constraint::Percentage(25),
            Constraint::Percentage(35),
            Constraint::Length(9),
            Constraint::Min(5),
        ],
    )
    .header(Row::new(vec!["Name", "Image", "Status", "Ports"]).style(hdr))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Containers ({})", snap.containers.containers.len())),
    );
    f.render_widget(containers_table, rows[2]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_and_badges() {
        assert_eq!(docker_summary(&DockerInfo::default()), vec!["❌ Docker not available"]);
        let info: DockerInfo = serde_json::from_str(
            r#"{"available":true,"containers":{"total":4,"running":3,"paused":0,"stopped":1},"images":{"total":9},"disk_usage":{"images":1.5,"containers":0.1,"volumes":2.0}}"#,
        )
        .unwrap();
        let s = docker_summary(&info);
        assert_eq!(s[0], "Containers: 3/4 running");
        assert_eq!(s[1], "Images: 9");
        assert_eq!(s[2], "Disk: images 1.5GB, containers 0.1GB, volumes 2GB");

        assert_eq!(build_badge(Some("SUCCESS")).0, "SUCCESS");
        assert_eq!(build_badge(Some("ABORTED")).1, "⏳");
        assert_eq!(build_badge(None).0, "IN_PROGRESS");
    }
}
