//! Form view: items and boxes of the selected page, plus the field
//! documentation panel.
//!
//! Flagging follows the generation engine: fields missing from the
//! source document render red, `$NULL` markers yellow, values failing
//! their validator light red.

use crate::app::{App, Row};
use crate::editor::item::{Fill, Item};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

pub fn draw(frame: &mut Frame, area: ratatui::layout::Rect, app: &App) {
    let rows = app.rows();
    let mut lines: Vec<Line> = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let selected = i == app.selected_row;
        let line = match row {
            Row::BoxHeader(id) => match app.session.boxes.get(id) {
                Some(bx) => box_line(bx, selected),
                None => Line::from(""),
            },
            Row::Field(id) => match app.session.item(*id) {
                Some(item) => item_line(item, selected, app),
                None => Line::from(""),
            },
        };
        lines.push(line);
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "template declares no fields for this page",
            Style::default().fg(Color::DarkGray),
        )));
    }

    // Keep the selected row visible.
    let visible = area.height.saturating_sub(2) as usize;
    let offset = app.selected_row.saturating_sub(visible.saturating_sub(1)) as u16;

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(page_title(app)))
        .scroll((offset, 0));
    frame.render_widget(widget, area);
}

fn page_title(app: &App) -> String {
    app.session
        .pages
        .get(app.selected_page)
        .map(|p| format!(" {} ", p.label))
        .unwrap_or_default()
}

fn box_line<'a>(bx: &'a crate::editor::group::BoxGroup, selected: bool) -> Line<'a> {
    let mut style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    if selected {
        style = style.add_modifier(Modifier::REVERSED);
    }
    let mut spans = vec![Span::styled(format!("▸ {}", bx.label), style)];
    if bx.can_add {
        spans.push(Span::styled(" [+]", Style::default().fg(Color::Green)));
    }
    if bx.can_remove {
        spans.push(Span::styled(" [-]", Style::default().fg(Color::Red)));
    }
    if bx.from_dummy {
        spans.push(Span::styled(
            " (no data)",
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

fn item_line<'a>(item: &'a Item, selected: bool, app: &App) -> Line<'a> {
    let mut spans: Vec<Span> = Vec::new();

    if item.has_checkbox {
        let mark = if item.is_checked { "[x] " } else { "[ ] " };
        spans.push(Span::styled(mark, Style::default().fg(Color::Yellow)));
    }

    let mut label_style = Style::default();
    if selected {
        label_style = label_style.add_modifier(Modifier::REVERSED);
    }
    spans.push(Span::styled(format!("{:<28}", item.label), label_style));

    let editing_here = selected && app.editing;
    let value_style = if editing_here {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        match item.fill {
            Fill::Missing => Style::default().fg(Color::Red),
            Fill::NullMarked => Style::default().fg(Color::Yellow),
            Fill::Normal if !item.validator.check(&item.value) => {
                Style::default().fg(Color::LightRed)
            }
            Fill::Normal => Style::default(),
        }
    };
    let shown = if editing_here {
        format!("{}▏", app.edit_buffer)
    } else if item.value.is_empty() {
        match item.fill {
            Fill::Missing => "<missing>".to_string(),
            Fill::NullMarked => "<null>".to_string(),
            Fill::Normal => String::new(),
        }
    } else {
        item.value.clone()
    };
    spans.push(Span::styled(shown, value_style));

    if item.can_add {
        spans.push(Span::styled(" +", Style::default().fg(Color::Green)));
    }
    if item.can_remove {
        spans.push(Span::styled(" -", Style::default().fg(Color::Red)));
    }
    Line::from(spans)
}

/// Documentation panel for the selected field.
pub fn draw_info(frame: &mut Frame, area: ratatui::layout::Rect, app: &App) {
    let text = app
        .selected_item()
        .and_then(|id| app.session.item(id))
        .map(|item| item.info.clone())
        .unwrap_or_else(|| "Select a field to see its documentation.".to_string());

    let widget = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(" Field "))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}
