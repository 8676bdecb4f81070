//! Editor session: form state generated from a template
//!
//! The session owns the parsed template, the loaded document, and the
//! arenas of live widgets (items, boxes, pages). Engines live in the
//! submodules: `generate` builds the form, `duplicate` clones and
//! removes repeated parts, `export` reads the form back into a fresh
//! document, and `template_def` rewrites the template itself in
//! template-definition mode.

pub mod duplicate;
pub mod export;
pub mod generate;
pub mod group;
pub mod item;
pub mod page;
pub mod template_def;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::editor::group::{BoxGroup, BoxId};
use crate::editor::item::{Item, ItemId};
use crate::editor::page::{Page, Unit};
use crate::metadata::{io, MetaValue};
use crate::template::{parser, ParsedTemplate};

pub struct EditorSession {
    pub template: ParsedTemplate,
    pub md: MetaValue,
    pub items: BTreeMap<ItemId, Item>,
    pub boxes: BTreeMap<BoxId, BoxGroup>,
    pub pages: Vec<Page>,
    /// Template-definition mode: items carry inclusion checkboxes and
    /// saving produces a rewritten template instead of a document.
    pub template_mode: bool,
    next_item: u32,
    next_box: u32,
}

impl EditorSession {
    /// Build a session from an already parsed template and document.
    pub fn new(template: ParsedTemplate, md: MetaValue, template_mode: bool) -> Result<Self> {
        let mut session = Self {
            template,
            md,
            items: BTreeMap::new(),
            boxes: BTreeMap::new(),
            pages: Vec::new(),
            template_mode,
            next_item: 0,
            next_box: 0,
        };
        generate::run(&mut session)?;
        Ok(session)
    }

    /// Parse the template, load the document (empty without a path)
    /// and generate the form.
    pub fn open(
        template_path: &Path,
        xml_path: Option<&Path>,
        template_mode: bool,
    ) -> Result<Self> {
        let template = parser::parse_file(template_path)?;
        let md = io::init_md(xml_path)?;
        Self::new(template, md, template_mode)
    }

    pub(crate) fn alloc_item_id(&mut self) -> ItemId {
        self.next_item += 1;
        ItemId(self.next_item)
    }

    pub(crate) fn alloc_box_id(&mut self) -> BoxId {
        self.next_box += 1;
        BoxId(self.next_box)
    }

    /// Index of the page with this label, creating it at the end when
    /// absent. Page order follows first appearance in the template.
    pub fn page_index(&mut self, label: &str) -> usize {
        if let Some(i) = self.pages.iter().position(|p| p.label == label) {
            return i;
        }
        self.pages.push(Page::new(label));
        self.pages.len() - 1
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(&id)
    }

    /// The box currently holding an item, if any.
    pub fn box_of(&self, id: ItemId) -> Option<BoxId> {
        self.boxes
            .values()
            .find(|b| b.items.contains(&id))
            .map(|b| b.id)
    }

    pub fn page_of_unit(&self, unit: Unit) -> Option<usize> {
        self.pages.iter().position(|p| p.units.contains(&unit))
    }

    /// Box shared by bare leaves that declare the same in-box label.
    /// The first declaring leaf's descriptor owns the box.
    pub(crate) fn find_or_create_leaf_box(
        &mut self,
        group: &str,
        label: &str,
        descriptor: usize,
    ) -> BoxId {
        if let Some(b) = self.boxes.values().find(|b| b.label == label) {
            return b.id;
        }
        let id = self.alloc_box_id();
        let bx = BoxGroup::new(id, label, descriptor, false, true);
        let p = self.page_index(group);
        self.pages[p].push(Unit::Box(id));
        self.boxes.insert(id, bx);
        id
    }

    /// Flip an item's inclusion checkbox and re-sync its enable state.
    pub fn toggle_check(&mut self, id: ItemId) {
        if let Some(item) = self.items.get_mut(&id) {
            if item.has_checkbox {
                item.is_checked = !item.is_checked;
            }
        }
        self.sync_checkbox(id);
    }

    fn sync_checkbox(&mut self, id: ItemId) {
        if let Some(item) = self.items.get_mut(&id) {
            if item.has_checkbox {
                item.edit_enabled = item.is_checked;
            }
        }
    }

    /// Normalize enable state after generation. The propagation is
    /// idempotent and runs twice, mirroring the double trigger the
    /// form performs on startup.
    pub fn refresh_checkboxes(&mut self) {
        let ids: Vec<ItemId> = self.items.keys().copied().collect();
        for _ in 0..2 {
            for id in &ids {
                self.sync_checkbox(*id);
            }
        }
    }

    pub fn duplicate_item(&mut self, id: ItemId) -> Result<ItemId> {
        duplicate::duplicate_item(self, id)
    }

    pub fn duplicate_box(&mut self, id: BoxId) -> Result<BoxId> {
        duplicate::duplicate_box(self, id)
    }

    pub fn remove_item(&mut self, id: ItemId) {
        duplicate::remove_item(self, id);
    }

    pub fn remove_box(&mut self, id: BoxId) {
        duplicate::remove_box(self, id);
    }

    /// Read the form back into a fresh document.
    pub fn export_document(&self) -> Result<MetaValue> {
        export::run(self)
    }

    /// Export the edited document through the template.
    pub fn save_xml(&self, out_dir: Option<&Path>, out_name: Option<&str>) -> Result<PathBuf> {
        let md = export::run(self)?;
        let path = io::save_to_xml(&md, None, &self.template.path, out_dir, out_name, false)?;
        Ok(path)
    }

    /// Template-definition save: rewrite the template so unchecked
    /// fields survive the render as inert fragments, render it, and
    /// drop the one-shot rewritten file.
    pub fn export_template(&self, out_dir: Option<&Path>, out_name: Option<&str>) -> Result<PathBuf> {
        let md = export::run(self)?;
        let (rewritten, tags) = template_def::define(self)?;
        let path = io::save_to_xml(&md, Some(&tags), &rewritten, out_dir, out_name, true)?;
        Ok(path)
    }

    /// Live widget instances per descriptor must always equal the
    /// descriptor's binding accounting. Exercised by tests after
    /// every mutating operation.
    #[cfg(test)]
    pub(crate) fn check_binding_invariant(&self) {
        use crate::template::Binding;
        for (i, d) in self.template.descriptors.iter().enumerate() {
            let bound: Vec<ItemId> = d
                .bound
                .iter()
                .flat_map(|b| match b {
                    Binding::Item(id) => vec![*id],
                    Binding::Group(ids) => ids.clone(),
                })
                .collect();
            for id in &bound {
                assert!(
                    self.items.contains_key(id),
                    "descriptor {i} holds a binding to a dead item {id:?}"
                );
            }
            let live = self
                .items
                .values()
                .filter(|it| it.descriptor == i)
                .count();
            assert_eq!(d.live_instances(), live, "descriptor {i} binding count");
        }
    }
}
