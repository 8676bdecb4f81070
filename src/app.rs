//! Application state and key handling

use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::config::EditorConfig;
use crate::editor::group::BoxId;
use crate::editor::item::{Fill, ItemId};
use crate::editor::page::Unit;
use crate::editor::EditorSession;

/// One navigable row of the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Row {
    BoxHeader(BoxId),
    Field(ItemId),
}

pub struct App {
    pub session: EditorSession,
    pub config: EditorConfig,
    pub output_dir: Option<PathBuf>,
    pub output_name: Option<String>,
    pub selected_page: usize,
    pub selected_row: usize,
    pub editing: bool,
    pub edit_buffer: String,
    pub error: Option<String>,
    pub notice: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(
        session: EditorSession,
        config: EditorConfig,
        output_dir: Option<PathBuf>,
        output_name: Option<String>,
    ) -> Self {
        Self {
            session,
            config,
            output_dir,
            output_name,
            selected_page: 0,
            selected_row: 0,
            editing: false,
            edit_buffer: String::new(),
            error: None,
            notice: None,
            should_quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Rows of the selected page in display order: box headers
    /// followed by their items, bare items in between.
    pub fn rows(&self) -> Vec<Row> {
        let Some(page) = self.session.pages.get(self.selected_page) else {
            return Vec::new();
        };
        let mut rows = Vec::new();
        for unit in &page.units {
            match unit {
                Unit::Item(id) => rows.push(Row::Field(*id)),
                Unit::Box(bid) => {
                    rows.push(Row::BoxHeader(*bid));
                    if let Some(bx) = self.session.boxes.get(bid) {
                        for id in &bx.items {
                            rows.push(Row::Field(*id));
                        }
                    }
                }
            }
        }
        rows
    }

    pub fn selected_item(&self) -> Option<ItemId> {
        match self.rows().get(self.selected_row) {
            Some(Row::Field(id)) => Some(*id),
            _ => None,
        }
    }

    fn selected_box_header(&self) -> Option<BoxId> {
        match self.rows().get(self.selected_row) {
            Some(Row::BoxHeader(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // An open dialog swallows everything but its dismiss keys.
        if self.error.is_some() || self.notice.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.error = None;
                self.notice = None;
            }
            return Ok(());
        }

        if self.editing {
            self.handle_edit_key(key);
            return Ok(());
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => self.should_quit = true,
                KeyCode::Char('s') => self.save(),
                _ => {}
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab | KeyCode::Right => self.next_page(),
            KeyCode::BackTab | KeyCode::Left => self.prev_page(),
            KeyCode::Down | KeyCode::Char('j') => self.next_row(),
            KeyCode::Up | KeyCode::Char('k') => self.prev_row(),
            KeyCode::Enter => self.start_editing(),
            KeyCode::Char('+') => self.duplicate_selected(),
            KeyCode::Char('-') => self.remove_selected(),
            KeyCode::Char(' ') => self.toggle_selected(),
            _ => {}
        }
        Ok(())
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.editing = false;
                self.edit_buffer.clear();
            }
            KeyCode::Enter => self.commit_edit(),
            KeyCode::Backspace => {
                self.edit_buffer.pop();
            }
            KeyCode::Char(c) => {
                let accepts = self
                    .selected_item()
                    .and_then(|id| self.session.item(id))
                    .map(|item| item.validator.accepts_char(c))
                    .unwrap_or(false);
                if accepts {
                    self.edit_buffer.push(c);
                }
            }
            _ => {}
        }
    }

    fn start_editing(&mut self) {
        let Some(id) = self.selected_item() else {
            return;
        };
        let Some(item) = self.session.item(id) else {
            return;
        };
        if !item.edit_enabled {
            return;
        }
        self.edit_buffer = item.value.clone();
        self.editing = true;
    }

    fn commit_edit(&mut self) {
        if let Some(id) = self.selected_item() {
            let buffer = std::mem::take(&mut self.edit_buffer);
            if let Some(item) = self.session.item_mut(id) {
                item.value = buffer;
                item.fill = if item.value.is_empty() {
                    Fill::Missing
                } else {
                    Fill::Normal
                };
            }
        }
        self.editing = false;
    }

    fn next_page(&mut self) {
        if !self.session.pages.is_empty() {
            self.selected_page = (self.selected_page + 1) % self.session.pages.len();
            self.selected_row = 0;
        }
    }

    fn prev_page(&mut self) {
        if !self.session.pages.is_empty() {
            self.selected_page =
                (self.selected_page + self.session.pages.len() - 1) % self.session.pages.len();
            self.selected_row = 0;
        }
    }

    fn next_row(&mut self) {
        let count = self.rows().len();
        if count > 0 && self.selected_row + 1 < count {
            self.selected_row += 1;
        }
    }

    fn prev_row(&mut self) {
        self.selected_row = self.selected_row.saturating_sub(1);
    }

    fn duplicate_selected(&mut self) {
        let result = if let Some(id) = self.selected_item() {
            match self.session.item(id) {
                Some(item) if item.can_add => self.session.duplicate_item(id).map(|_| ()),
                _ => return,
            }
        } else if let Some(id) = self.selected_box_header() {
            match self.session.boxes.get(&id) {
                Some(bx) if bx.can_add => self.session.duplicate_box(id).map(|_| ()),
                _ => return,
            }
        } else {
            return;
        };
        if let Err(err) = result {
            self.error = Some(format!("{err:#}"));
        }
    }

    fn remove_selected(&mut self) {
        if let Some(id) = self.selected_item() {
            if self.session.item(id).is_some_and(|item| item.can_remove) {
                self.session.remove_item(id);
            }
        } else if let Some(id) = self.selected_box_header() {
            if self.session.boxes.get(&id).is_some_and(|bx| bx.can_remove) {
                self.session.remove_box(id);
            }
        }
        let count = self.rows().len();
        if self.selected_row >= count {
            self.selected_row = count.saturating_sub(1);
        }
    }

    fn toggle_selected(&mut self) {
        if !self.session.template_mode {
            return;
        }
        if let Some(id) = self.selected_item() {
            self.session.toggle_check(id);
        }
    }

    fn save(&mut self) {
        let result = if self.session.template_mode {
            self.session
                .export_template(self.output_dir.as_deref(), self.output_name.as_deref())
        } else {
            self.session
                .save_xml(self.output_dir.as_deref(), self.output_name.as_deref())
        };
        match result {
            Ok(path) => {
                self.notice = Some(format!("Saved to {}", path.display()));
                self.config.last_output_dir = path.parent().map(|p| p.display().to_string());
                if let Err(err) = self.config.save() {
                    tracing::warn!("cannot save config: {err}");
                }
            }
            Err(err) => self.error = Some(format!("{err:#}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetaValue;
    use crate::template::parser::parse_str;
    use pretty_assertions::assert_eq;

    const TEMPLATE: &str = "\
<md>
  <t>{{ md.identification.title }}</t>{# name=Title, group=Identification #}
  <a>{{ md.identification.abstract }}</a>{# name=Abstract, group=Identification #}
  <c>{{ md.contact }}</c>{# name=Contact, group=Contact, multiplicity=yes #}
</md>
";

    fn app() -> App {
        let session = EditorSession::new(
            parse_str(TEMPLATE).unwrap(),
            MetaValue::empty_object(),
            false,
        )
        .unwrap();
        App::new(session, EditorConfig::default(), None, None)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE)).unwrap();
    }

    #[test]
    fn test_page_navigation_resets_row() {
        let mut a = app();
        assert_eq!(a.session.pages.len(), 2);
        press(&mut a, KeyCode::Down);
        press(&mut a, KeyCode::Tab);
        assert_eq!(a.selected_page, 1);
        assert_eq!(a.selected_row, 0);
        press(&mut a, KeyCode::Tab);
        assert_eq!(a.selected_page, 0);
    }

    #[test]
    fn test_edit_flow_commits_value() {
        let mut a = app();
        press(&mut a, KeyCode::Enter);
        assert!(a.editing);
        for c in "Lakes".chars() {
            press(&mut a, KeyCode::Char(c));
        }
        press(&mut a, KeyCode::Enter);
        assert!(!a.editing);
        let id = a.selected_item().unwrap();
        let item = a.session.item(id).unwrap();
        assert_eq!(item.value, "Lakes");
        assert_eq!(item.fill, Fill::Normal);
    }

    #[test]
    fn test_edit_cancel_keeps_old_value() {
        let mut a = app();
        press(&mut a, KeyCode::Enter);
        press(&mut a, KeyCode::Char('x'));
        press(&mut a, KeyCode::Esc);
        let id = a.selected_item().unwrap();
        assert_eq!(a.session.item(id).unwrap().value, "");
    }

    #[test]
    fn test_plus_duplicates_repeated_field() {
        let mut a = app();
        press(&mut a, KeyCode::Tab);
        assert_eq!(a.rows().len(), 1);
        press(&mut a, KeyCode::Char('+'));
        assert_eq!(a.rows().len(), 2);
        // '+' on the remove-only clone does nothing.
        press(&mut a, KeyCode::Down);
        press(&mut a, KeyCode::Char('+'));
        assert_eq!(a.rows().len(), 2);
        press(&mut a, KeyCode::Char('-'));
        assert_eq!(a.rows().len(), 1);
        assert_eq!(a.selected_row, 0);
    }

    #[test]
    fn test_dialog_swallows_keys_until_dismissed() {
        let mut a = app();
        a.error = Some("boom".to_string());
        press(&mut a, KeyCode::Down);
        assert_eq!(a.selected_row, 0, "navigation blocked behind dialog");
        press(&mut a, KeyCode::Enter);
        assert!(a.error.is_none());
        press(&mut a, KeyCode::Down);
        assert_eq!(a.selected_row, 1);
    }
}
