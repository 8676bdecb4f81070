//! Notebook pages
//!
//! One page per template group label, holding an ordered mix of bare
//! items and boxes. Duplicates are inserted right after the unit they
//! were cloned from so the on-screen order matches the export order.

use crate::editor::group::BoxId;
use crate::editor::item::ItemId;

/// One positional unit on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Item(ItemId),
    Box(BoxId),
}

#[derive(Debug, Clone)]
pub struct Page {
    pub label: String,
    pub units: Vec<Unit>,
}

impl Page {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            units: Vec::new(),
        }
    }

    pub fn push(&mut self, unit: Unit) {
        self.units.push(unit);
    }

    /// Insert directly after the origin unit, falling back to append.
    pub fn insert_after(&mut self, unit: Unit, after: Unit) {
        match self.units.iter().position(|u| *u == after) {
            Some(pos) => self.units.insert(pos + 1, unit),
            None => self.units.push(unit),
        }
    }

    pub fn remove(&mut self, unit: Unit) {
        self.units.retain(|u| *u != unit);
    }
}
