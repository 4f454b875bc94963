//! Process table with per-cell coloring, a selected row, sort indicator, and a scrollbar.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::style::Modifier;
use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
};

use crate::types::{ProcessList, SortKey};
use crate::ui::theme::{SB_ARROW, SB_THUMB, SB_TRACK};
use crate::ui::util::truncate_middle;

// Keep the header widths here so drawing and hit-testing match.
const COLS: [Constraint; 6] = [
    Constraint::Length(7),      // PID
    Constraint::Percentage(35), // Name
    Constraint::Length(7),      // CPU %
    Constraint::Length(8),      // Mem %
    Constraint::Length(10),     // Status
    Constraint::Min(6),         // Owner
];

/// Rows visible below the header inside a bordered table of height `area_height`.
pub fn page_size(area_height: u16) -> usize {
    area_height.saturating_sub(3).max(1) as usize // borders (2) + header (1)
}

/// Scroll offset that keeps `selected` on screen.
pub fn follow_selection(offset: usize, selected: usize, page: usize) -> usize {
    if selected < offset {
        selected
    } else if selected >= offset + page {
        selected + 1 - page
    } else {
        offset
    }
}

pub fn draw_processes(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    list: Option<&ProcessList>,
    sort_by: SortKey,
    selected: usize,
    scroll_offset: usize,
) {
    let total = list.map(|l| l.total_count).unwrap_or(0);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("Processes ({total} total)"));
    f.render_widget(block, area);

    let inner = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };
    if inner.height < 1 || inner.width < 3 {
        return;
    }
    // Reserve 2 columns for the scrollbar
    let content = Rect {
        x: inner.x,
        y: inner.y,
        width: inner.width.saturating_sub(2),
        height: inner.height,
    };

    let rows_src = list.map(|l| l.processes.as_slice()).unwrap_or(&[]);
    if rows_src.is_empty() {
        let msg = if list.is_some() { "No processes found" } else { "Loading..." };
        f.render_widget(
            Paragraph::new(Span::styled(msg, Style::default().fg(Color::DarkGray))),
            content,
        );
        return;
    }

    let total_rows = rows_src.len();
    let viewport_rows = content.height.saturating_sub(1) as usize;
    let max_off = total_rows.saturating_sub(viewport_rows);
    let offset = scroll_offset.min(max_off);
    let show_n = total_rows.saturating_sub(offset).min(viewport_rows);
    let name_w = (content.width as usize * 35 / 100).max(4);

    let rows_iter = rows_src
        .iter()
        .enumerate()
        .skip(offset)
        .take(show_n)
        .map(|(ix, p)| {
            let cpu_fg = match p.cpu_percent {
                x if x < 25.0 => Color::Green,
                x if x < 60.0 => Color::Yellow,
                _ => Color::Red,
            };
            let mem_fg = match p.memory_percent {
                x if x < 5.0 => Color::Blue,
                x if x < 20.0 => Color::Magenta,
                _ => Color::Red,
            };
            let style = if ix == selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(p.pid.to_string()).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate_middle(&p.name, name_w)),
                Cell::from(format!("{:.1}%", p.cpu_percent)).style(Style::default().fg(cpu_fg)),
                Cell::from(format!("{:.2}%", p.memory_percent)).style(Style::default().fg(mem_fg)),
                Cell::from(p.status.clone()),
                Cell::from(p.username.clone().unwrap_or_else(|| "-".into())),
            ])
            .style(style)
        });

    // Header with sort indicator
    let cpu_hdr = match sort_by {
        SortKey::Cpu => "CPU •",
        _ => "CPU",
    };
    let mem_hdr = match sort_by {
        SortKey::Memory => "Mem •",
        _ => "Mem",
    };
    let header = Row::new(vec!["PID", "Name", cpu_hdr, mem_hdr, "Status", "User"]).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    let table = Table::new(rows_iter, COLS.to_vec())
        .header(header)
        .column_spacing(1);
    f.render_widget(table, content);

    let scroll_area = Rect {
        x: inner.x + inner.width.saturating_sub(1),
        y: inner.y,
        width: 1,
        height: inner.height,
    };
    draw_scrollbar(f, scroll_area, total_rows, viewport_rows, offset);
}

fn draw_scrollbar(
    f: &mut ratatui::Frame<'_>,
    scroll_area: Rect,
    total_rows: usize,
    viewport_rows: usize,
    offset: usize,
) {
    if scroll_area.height < 3 {
        return;
    }
    let track = (scroll_area.height - 2) as usize;
    let total = total_rows.max(1);
    let view = viewport_rows.clamp(1, total);
    let max_off = total.saturating_sub(view);

    let thumb_len = (track * view).div_ceil(total).max(1).min(track);
    let thumb_top = if max_off == 0 {
        0
    } else {
        ((track - thumb_len) * offset + max_off / 2) / max_off
    };

    let mut lines: Vec<Line> = Vec::with_capacity(scroll_area.height as usize);
    lines.push(Line::from(Span::styled("▲", Style::default().fg(SB_ARROW))));
    for i in 0..track {
        if i >= thumb_top && i < thumb_top + thumb_len {
            lines.push(Line::from(Span::styled("█", Style::default().fg(SB_THUMB))));
        } else {
            lines.push(Line::from(Span::styled("│", Style::default().fg(SB_TRACK))));
        }
    }
    lines.push(Line::from(Span::styled("▼", Style::default().fg(SB_ARROW))));
    f.render_widget(Paragraph::new(lines), scroll_area);
}

/// Move the selection (Up/Down/PageUp/PageDown/Home/End). Returns true if handled.
pub fn processes_handle_key(selected: &mut usize, key: KeyEvent, total_rows: usize, page: usize) -> bool {
    if total_rows == 0 {
        *selected = 0;
        return false;
    }
    let last = total_rows - 1;
    let page = page.max(1);
    match key.code {
        KeyCode::Up => *selected = selected.saturating_sub(1),
        KeyCode::Down => *selected = (*selected + 1).min(last),
        KeyCode::PageUp => *selected = selected.saturating_sub(page),
        KeyCode::PageDown => *selected = (*selected + page).min(last),
        KeyCode::Home => *selected = 0,
        KeyCode::End => *selected = last,
        _ => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn selection_moves_within_bounds() {
        let mut sel = 0;
        assert!(processes_handle_key(&mut sel, key(KeyCode::Up), 5, 2));
        assert_eq!(sel, 0);
        processes_handle_key(&mut sel, key(KeyCode::PageDown), 5, 2);
        assert_eq!(sel, 2);
        processes_handle_key(&mut sel, key(KeyCode::End), 5, 2);
        assert_eq!(sel, 4);
        processes_handle_key(&mut sel, key(KeyCode::Down), 5, 2);
        assert_eq!(sel, 4);
        assert!(!processes_handle_key(&mut sel, key(KeyCode::Char('x')), 5, 2));
        processes_handle_key(&mut sel, key(KeyCode::Home), 0, 2);
        assert_eq!(sel, 0);
    }

    #[test]
    fn offset_follows_selection() {
        assert_eq!(follow_selection(0, 3, 5), 0);
        assert_eq!(follow_selection(0, 7, 5), 3);
        assert_eq!(follow_selection(4, 2, 5), 2);
        assert_eq!(page_size(10), 7);
        assert_eq!(page_size(2), 1);
    }
}
