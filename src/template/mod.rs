//! Template descriptor model
//!
//! A parsed template is an ordered sequence of field descriptors, one
//! per value expression or control-flow statement, plus the parallel
//! raw tag-line sequence in which leading tab count encodes nesting
//! depth. The descriptors are the contract between the parser, the
//! form generator, and the export engine: generation accumulates the
//! live widget instances bound to each descriptor, and export reads
//! them back.

pub mod parser;
pub mod plan;
pub mod render;

use std::path::PathBuf;

use crate::editor::item::ItemId;

/// Widget instances accumulated on a descriptor during generation.
/// The `Group` arm holds one inner-loop repetition set per outer
/// repetition (the keyword case).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Item(ItemId),
    Group(Vec<ItemId>),
}

/// One template line worth of schema information.
#[derive(Debug, Clone, Default)]
pub struct FieldDescriptor {
    /// Display name of the field.
    pub name: String,
    /// Object-path expression for leaves, statement text for
    /// control-flow lines (`for c in md.contact`).
    pub tag: String,
    /// Page label this field belongs to.
    pub group: String,
    pub multiline: bool,
    pub multiplicity: bool,
    /// Titled-box membership: label of the composite group.
    pub inbox: Option<String>,
    /// Whether the box itself is duplicable.
    pub inbox_multi: bool,
    /// Documentation shown in the info panel.
    pub reference: Option<String>,
    pub description: Option<String>,
    pub example: Option<String>,
    pub value_type: Option<String>,
    /// Statement lines only: name of the record constructed per
    /// iteration. Presence means "fresh sub-object per repetition".
    pub object_ctor: Option<String>,
    pub is_statement: bool,
    /// Literal template fragment, used by the template-definition
    /// rewrite to find this descriptor's line again.
    pub raw_fragment: String,
    /// Enclosing statement text recorded during generation, replayed
    /// by the export engine and shown in the info panel.
    pub statements: Option<String>,
    /// Inner statement for double-nested blocks.
    pub statements1: Option<String>,
    /// Live widget instances currently bound to this descriptor.
    pub bound: Vec<Binding>,
}

impl FieldDescriptor {
    pub fn add_binding(&mut self, binding: Binding) {
        self.bound.push(binding);
    }

    /// Insert a binding directly after the binding holding `after`,
    /// falling back to append. Keeps duplicate ordering aligned with
    /// on-screen ordering.
    pub fn add_binding_after(&mut self, binding: Binding, after: ItemId) {
        let pos = self.bound.iter().position(|b| match b {
            Binding::Item(id) => *id == after,
            Binding::Group(ids) => ids.contains(&after),
        });
        match pos {
            Some(i) => self.bound.insert(i + 1, binding),
            None => self.bound.push(binding),
        }
    }

    /// Unbind a removed widget. Group bindings shrink; a group that
    /// loses its last member disappears entirely.
    pub fn remove_item(&mut self, id: ItemId) {
        self.bound.retain_mut(|b| match b {
            Binding::Item(item) => *item != id,
            Binding::Group(ids) => {
                ids.retain(|i| *i != id);
                !ids.is_empty()
            }
        });
    }

    /// Number of live widget instances bound to this descriptor.
    pub fn live_instances(&self) -> usize {
        self.bound
            .iter()
            .map(|b| match b {
                Binding::Item(_) => 1,
                Binding::Group(ids) => ids.len(),
            })
            .sum()
    }

    /// First bound item, looking inside groups. The template rewrite
    /// checks this one's checkbox state.
    pub fn first_item(&self) -> Option<ItemId> {
        self.bound.first().map(|b| match b {
            Binding::Item(id) => *id,
            Binding::Group(ids) => ids[0],
        })
    }
}

/// A fully parsed template: descriptor sequence, raw tag lines, and
/// the original text (kept for rendering and the rewrite pass).
#[derive(Debug, Clone, Default)]
pub struct ParsedTemplate {
    pub path: PathBuf,
    pub source: String,
    pub descriptors: Vec<FieldDescriptor>,
    /// One entry per descriptor; leading tabs encode nesting depth.
    pub tag_lines: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_binding_accounting() {
        let mut d = FieldDescriptor::default();
        d.add_binding(Binding::Item(ItemId(1)));
        d.add_binding(Binding::Group(vec![ItemId(2), ItemId(3)]));
        assert_eq!(d.live_instances(), 3);

        d.remove_item(ItemId(2));
        assert_eq!(d.live_instances(), 2);
        d.remove_item(ItemId(3));
        assert_eq!(d.bound.len(), 1, "emptied group binding disappears");
    }

    #[test]
    fn test_add_binding_after_keeps_order() {
        let mut d = FieldDescriptor::default();
        d.add_binding(Binding::Item(ItemId(1)));
        d.add_binding(Binding::Item(ItemId(3)));
        d.add_binding_after(Binding::Item(ItemId(2)), ItemId(1));
        let order: Vec<_> = d
            .bound
            .iter()
            .map(|b| match b {
                Binding::Item(id) => id.0,
                Binding::Group(_) => unreachable!(),
            })
            .collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn test_first_item_looks_into_groups() {
        let mut d = FieldDescriptor::default();
        d.add_binding(Binding::Group(vec![ItemId(7), ItemId(8)]));
        assert_eq!(d.first_item(), Some(ItemId(7)));
    }
}
