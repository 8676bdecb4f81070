//! Duplication and removal of repeated form parts
//!
//! A clone is a fresh widget against the source's descriptor: it
//! starts empty, and it never carries a second add affordance — a
//! duplicated item is remove-only, a duplicated box is remove-only
//! while its items keep whatever add buttons the source items had.
//! New widgets are bound right after their source so on-screen order
//! and export order stay aligned.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};

use crate::editor::group::{BoxGroup, BoxId};
use crate::editor::item::{Item, ItemId};
use crate::editor::page::Unit;
use crate::editor::EditorSession;
use crate::template::Binding;

fn clone_item(
    session: &mut EditorSession,
    source: &Item,
    can_add: bool,
    can_remove: bool,
) -> ItemId {
    let descr = session.template.descriptors[source.descriptor].clone();
    let id = session.alloc_item_id();
    let mut item = Item::new(id, source.descriptor, &descr, false, session.template_mode);
    item.can_add = can_add;
    item.can_remove = can_remove;
    // Fresh widget: no value carries over, only the flags do.
    item.set_value(None);
    item.from_dummy = source.from_dummy;
    session.items.insert(id, item);
    id
}

pub(crate) fn duplicate_item(session: &mut EditorSession, source: ItemId) -> Result<ItemId> {
    let src = session
        .items
        .get(&source)
        .cloned()
        .ok_or_else(|| anyhow!("no such item"))?;
    let id = clone_item(session, &src, false, true);

    // Bind next to the source: inside its repetition set when the
    // source is grouped, as a sibling binding otherwise.
    let d = &mut session.template.descriptors[src.descriptor];
    let grouped = d.bound.iter_mut().find_map(|b| match b {
        Binding::Group(ids) if ids.contains(&source) => Some(ids),
        _ => None,
    });
    match grouped {
        Some(ids) => {
            let pos = ids
                .iter()
                .position(|i| *i == source)
                .map(|p| p + 1)
                .unwrap_or(ids.len());
            ids.insert(pos, id);
        }
        None => d.add_binding_after(Binding::Item(id), source),
    }

    if let Some(bx) = session.box_of(source) {
        if let Some(b) = session.boxes.get_mut(&bx) {
            b.insert_after(id, source);
        }
    } else if let Some(p) = session.page_of_unit(Unit::Item(source)) {
        session.pages[p].insert_after(Unit::Item(id), Unit::Item(source));
    }
    Ok(id)
}

pub(crate) fn duplicate_box(session: &mut EditorSession, source: BoxId) -> Result<BoxId> {
    let src = session
        .boxes
        .get(&source)
        .cloned()
        .ok_or_else(|| anyhow!("no such box"))?;

    let id = session.alloc_box_id();
    let mut bx = BoxGroup::new(id, &src.label, src.descriptor, true, false);
    bx.from_dummy = src.from_dummy;

    let mut clones: Vec<(ItemId, ItemId)> = Vec::new();
    for sid in &src.items {
        let Some(s) = session.items.get(sid).cloned() else {
            continue;
        };
        let nid = clone_item(session, &s, s.can_add, false);
        bx.push(nid);
        clones.push((*sid, nid));
    }

    // Grouped descriptors get one fresh repetition set placed after
    // the source's set; plain descriptors pair up binding by binding.
    let mut grouped_new: BTreeMap<usize, Vec<ItemId>> = BTreeMap::new();
    let mut grouped_anchor: BTreeMap<usize, ItemId> = BTreeMap::new();
    for (sid, nid) in &clones {
        let didx = match session.items.get(nid) {
            Some(item) => item.descriptor,
            None => continue,
        };
        let in_group = session.template.descriptors[didx]
            .bound
            .iter()
            .any(|b| matches!(b, Binding::Group(ids) if ids.contains(sid)));
        if in_group {
            grouped_new.entry(didx).or_default().push(*nid);
            grouped_anchor.entry(didx).or_insert(*sid);
        } else {
            session.template.descriptors[didx].add_binding_after(Binding::Item(*nid), *sid);
        }
    }
    for (didx, ids) in grouped_new {
        let anchor = grouped_anchor[&didx];
        session.template.descriptors[didx].add_binding_after(Binding::Group(ids), anchor);
    }

    if let Some(p) = session.page_of_unit(Unit::Box(source)) {
        session.pages[p].insert_after(Unit::Box(id), Unit::Box(source));
    }
    session.boxes.insert(id, bx);
    Ok(id)
}

pub(crate) fn remove_item(session: &mut EditorSession, id: ItemId) {
    let containing_box = session.box_of(id);
    if let Some(item) = session.items.remove(&id) {
        session.template.descriptors[item.descriptor].remove_item(id);
    }
    match containing_box {
        Some(bx) => {
            if let Some(b) = session.boxes.get_mut(&bx) {
                b.remove(id);
            }
        }
        None => {
            if let Some(p) = session.page_of_unit(Unit::Item(id)) {
                session.pages[p].remove(Unit::Item(id));
            }
        }
    }
}

/// Cascade: a box takes all its items and their bindings with it.
pub(crate) fn remove_box(session: &mut EditorSession, id: BoxId) {
    let Some(bx) = session.boxes.remove(&id) else {
        return;
    };
    for item_id in bx.items {
        if let Some(item) = session.items.remove(&item_id) {
            session.template.descriptors[item.descriptor].remove_item(item_id);
        }
    }
    if let Some(p) = session.page_of_unit(Unit::Box(id)) {
        session.pages[p].remove(Unit::Box(id));
    }
}
