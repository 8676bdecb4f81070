//! UI rendering

pub mod components;
pub mod editor_view;
pub mod layout;

use crate::app::App;
use crate::ui::components::dialog::{self, DialogKind};
use ratatui::Frame;

/// Draw the whole screen: tabs, form, documentation panel, status
/// bar, and any open dialog on top.
pub fn draw(frame: &mut Frame, app: &App) {
    let (tabs, content, info) = layout::create_layout(frame.area());
    layout::draw_tabs(frame, tabs, app);
    editor_view::draw(frame, content, app);
    editor_view::draw_info(frame, info, app);
    layout::draw_status_bar(frame, app);

    if let Some(message) = &app.error {
        dialog::render(frame, DialogKind::Error, message);
    } else if let Some(message) = &app.notice {
        dialog::render(frame, DialogKind::Notice, message);
    }
}
