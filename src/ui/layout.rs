//! Layout components (page tabs, content split, status bar)

use crate::app::App;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Split the screen into tabs row, form content, info panel, and a
/// reserved status line.
pub fn create_layout(area: Rect) -> (Rect, Rect, Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Page tabs
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    let content = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(62), // Form
            Constraint::Percentage(38), // Field documentation
        ])
        .split(rows[1]);

    (rows[0], content[0], content[1])
}

/// Draw one tab per template group.
pub fn draw_tabs(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans: Vec<Span> = vec![Span::raw(" ")];
    for (i, page) in app.session.pages.iter().enumerate() {
        let style = if i == app.selected_page {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {} ", page.label), style));
        spans.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Draw the status bar
pub fn draw_status_bar(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let status_area = Rect {
        x: 0,
        y: area.height.saturating_sub(1),
        width: area.width,
        height: 1,
    };

    let mut spans = vec![];

    let mode = if app.session.template_mode {
        Span::styled(" TEMPLATE ", Style::default().fg(Color::Yellow))
    } else {
        Span::styled(" EDIT ", Style::default().fg(Color::Green))
    };
    spans.push(mode);

    let hints = if app.editing {
        "type to edit  Enter:apply  Esc:cancel".to_string()
    } else if app.session.template_mode {
        "j/k:nav  Tab:page  Enter:edit  Space:include  +/-:dup/rm  ^S:save template  ^C:quit"
            .to_string()
    } else {
        "j/k:nav  Tab:page  Enter:edit  +/-:dup/rm  ^S:save  ^C:quit".to_string()
    };
    spans.push(Span::styled(hints, Style::default().fg(Color::DarkGray)));

    if let Some(name) = app
        .session
        .template
        .path
        .file_name()
        .and_then(|n| n.to_str())
    {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            name.to_string(),
            Style::default().fg(Color::Blue),
        ));
    }

    let status = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status, status_area);
}
