//! Titled box grouping repeated composite fields
//!
//! A box collects the items of one loop iteration (one contact, one
//! keyword set). Boxes carry their own add/remove affordances when the
//! template marks the composite as duplicable.

use crate::editor::item::ItemId;

/// Arena handle of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoxId(pub u32);

#[derive(Debug, Clone)]
pub struct BoxGroup {
    pub id: BoxId,
    pub label: String,
    /// Statement descriptor that spawned this box.
    pub descriptor: usize,
    pub items: Vec<ItemId>,
    pub can_add: bool,
    pub can_remove: bool,
    /// Created by dummy-loop substitution for absent repeated data.
    pub from_dummy: bool,
}

impl BoxGroup {
    /// First-iteration boxes get the add affordance, later ones get
    /// remove instead. Non-duplicable composites get neither.
    pub fn new(id: BoxId, label: &str, descriptor: usize, multi: bool, is_first: bool) -> Self {
        Self {
            id,
            label: label.to_string(),
            descriptor,
            items: Vec::new(),
            can_add: multi && is_first,
            can_remove: multi && !is_first,
            from_dummy: false,
        }
    }

    pub fn push(&mut self, item: ItemId) {
        self.items.push(item);
    }

    /// Insert directly after an existing member, falling back to
    /// append. Keeps a duplicated item next to its source.
    pub fn insert_after(&mut self, item: ItemId, after: ItemId) {
        match self.items.iter().position(|i| *i == after) {
            Some(pos) => self.items.insert(pos + 1, item),
            None => self.items.push(item),
        }
    }

    pub fn remove(&mut self, item: ItemId) {
        self.items.retain(|i| *i != item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_affordances() {
        let first = BoxGroup::new(BoxId(1), "Contact", 0, true, true);
        assert!(first.can_add && !first.can_remove);
        let later = BoxGroup::new(BoxId(2), "Contact", 0, true, false);
        assert!(!later.can_add && later.can_remove);
        let fixed = BoxGroup::new(BoxId(3), "Extent", 0, false, true);
        assert!(!fixed.can_add && !fixed.can_remove);
    }

    #[test]
    fn test_insert_after_keeps_neighbourhood() {
        let mut b = BoxGroup::new(BoxId(1), "Contact", 0, true, true);
        b.push(ItemId(1));
        b.push(ItemId(3));
        b.insert_after(ItemId(2), ItemId(1));
        assert_eq!(b.items, vec![ItemId(1), ItemId(2), ItemId(3)]);
        b.remove(ItemId(2));
        assert_eq!(b.items, vec![ItemId(1), ItemId(3)]);
    }
}
