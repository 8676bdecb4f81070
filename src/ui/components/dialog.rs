//! Modal dialog overlay
//!
//! One centered overlay serves both failure reports and save
//! confirmations; the kind picks the accent color, title, and the
//! dismiss hint shown on the bottom line.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const MAX_WIDTH: u16 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    /// Load, export, or template failure.
    Error,
    /// Confirmation after a successful export.
    Notice,
}

impl DialogKind {
    fn title(self) -> &'static str {
        match self {
            DialogKind::Error => "Error",
            DialogKind::Notice => "Metadata editor",
        }
    }

    fn accent(self) -> Color {
        match self {
            DialogKind::Error => Color::Red,
            DialogKind::Notice => Color::Green,
        }
    }

    fn hint(self) -> &'static str {
        match self {
            DialogKind::Error => "Enter or Esc to dismiss",
            DialogKind::Notice => "Enter to dismiss",
        }
    }
}

/// Render the overlay centered on the screen.
pub fn render(frame: &mut Frame, kind: DialogKind, message: &str) {
    let area = frame.area();
    let body = wrap(message, (MAX_WIDTH - 4) as usize);

    let widest = body
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0)
        .max(kind.title().len())
        .max(kind.hint().len()) as u16;
    let width = (widest + 4).min(MAX_WIDTH).min(area.width);
    let height = (body.len() as u16 + 5).min(area.height);
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    };
    frame.render_widget(Clear, popup);

    let mut lines = vec![Line::from("")];
    for text in body {
        lines.push(Line::from(text));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        kind.hint(),
        Style::default().fg(Color::DarkGray),
    )));

    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                format!(" {} ", kind.title()),
                Style::default()
                    .fg(kind.accent())
                    .add_modifier(Modifier::BOLD),
            ))
            .border_style(Style::default().fg(kind.accent()))
            .style(Style::default().bg(Color::Black)),
    );
    frame.render_widget(widget, popup);
}

/// Word-wrap the message, keeping explicit blank lines.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    for para in text.split('\n') {
        let mut line = String::new();
        for word in para.split_whitespace() {
            if !line.is_empty() && line.len() + 1 + word.len() > width {
                out.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        out.push(line);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn test_wrap_splits_to_width() {
        let lines = wrap("one two three four five six", 10);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= 10));
    }

    #[test]
    fn test_wrap_keeps_blank_lines() {
        assert_eq!(wrap("first\n\nsecond", 20), vec!["first", "", "second"]);
    }

    #[test]
    fn test_kinds_are_visually_distinct() {
        assert_ne!(DialogKind::Error.accent(), DialogKind::Notice.accent());
        assert_ne!(DialogKind::Error.title(), DialogKind::Notice.title());
    }
}
