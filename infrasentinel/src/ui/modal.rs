//! Centered modal dialogs: kill confirmation and blocking notices.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

/// Process the operator is about to terminate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KillPrompt {
    pub pid: u32,
    pub name: String,
    pub force: bool,
}

pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

pub fn draw_kill_prompt(f: &mut ratatui::Frame<'_>, area: Rect, k: &KillPrompt) {
    let rect = centered(area, 54, 9);
    let check = if k.force { "[x]" } else { "[ ]" };
    let lines = vec![
        Line::from(format!("PID:  {}", k.pid)),
        Line::from(format!("Name: {}", k.name)),
        Line::from(""),
        Line::from(format!("{check} Force kill (SIGKILL)   (press f)")),
        Line::from(""),
        Line::from(vec![
            Span::styled("y/Enter", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(" terminate   "),
            Span::styled("n/Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" cancel"),
        ]),
    ];
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Terminate Process?")
                .border_style(Style::default().fg(Color::Red)),
        ),
        rect,
    );
}

pub fn draw_notice(f: &mut ratatui::Frame<'_>, area: Rect, text: &str) {
    let rect = centered(area, 60, 7);
    f.render_widget(Clear, rect);
    let lines = vec![
        Line::from(text.to_string()),
        Line::from(""),
        Line::from(Span::styled("press any key", Style::default().fg(Color::DarkGray))),
    ];
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Notice")),
        rect,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_fits_inside() {
        let r = centered(Rect::new(0, 0, 100, 40), 54, 9);
        assert_eq!((r.x, r.y, r.width, r.height), (23, 15, 54, 9));
        let small = centered(Rect::new(0, 0, 20, 5), 54, 9);
        assert_eq!((small.width, small.height), (20, 5));
    }
}
