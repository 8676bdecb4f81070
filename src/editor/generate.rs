//! Form generation
//!
//! Walks the control-flow plan once and materializes widgets: bare
//! items for plain fields, one box per loop iteration for composite
//! fields, and grouped repetition sets for double-nested loops. Each
//! created widget is bound to its descriptor so duplication and
//! export can find it again.
//!
//! Dummy-loop substitution: when a loop's source collection is absent
//! or empty, exactly one iteration is generated with every field
//! flagged as missing. Those widgets are marked so export can skip
//! them when they stay unedited.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};

use crate::editor::group::{BoxGroup, BoxId};
use crate::editor::item::{Item, ItemId};
use crate::editor::page::Unit;
use crate::editor::EditorSession;
use crate::metadata::path::{PathExpr, Scope};
use crate::metadata::MetaValue;
use crate::template::plan::{self, Block, Entry, ForSource, PlanNode, Statement};
use crate::template::Binding;

pub(crate) fn run(session: &mut EditorSession) -> Result<()> {
    let nodes = plan::build(&session.template.tag_lines)?;
    let md = session.md.clone();
    for node in &nodes {
        match node {
            PlanNode::Leaf(idx) => leaf(session, &md, *idx)?,
            PlanNode::Block(b) => block(session, &md, b)?,
        }
    }
    if session.template_mode {
        session.refresh_checkboxes();
    }
    Ok(())
}

/// Plain top-level field. A repeated field with list data yields one
/// item per element; absent data yields a single flagged item.
fn leaf(session: &mut EditorSession, md: &MetaValue, idx: usize) -> Result<()> {
    let descr = session.template.descriptors[idx].clone();
    let path = PathExpr::parse(&descr.tag)
        .ok_or_else(|| anyhow!("bad field path '{}'", descr.tag))?;
    let value = Scope::new(md).eval(&path);

    let values: Vec<Option<String>> = match &value {
        Some(MetaValue::List(items)) if descr.multiplicity => {
            items.iter().map(|v| Some(v.display())).collect()
        }
        Some(v) => vec![Some(v.display())],
        None => vec![None],
    };

    for (i, v) in values.iter().enumerate() {
        let id = session.alloc_item_id();
        let mut item = Item::new(id, idx, &descr, i == 0, session.template_mode);
        item.set_value(v.as_deref());
        // An unfilled repeated field is the dummy entry of its list.
        if descr.multiplicity && !item.is_valid {
            item.from_dummy = true;
        }
        session.template.descriptors[idx].add_binding(Binding::Item(id));
        session.items.insert(id, item);
        match &descr.inbox {
            Some(label) => {
                let bx = session.find_or_create_leaf_box(&descr.group, label, idx);
                if let Some(b) = session.boxes.get_mut(&bx) {
                    b.push(id);
                }
            }
            None => {
                let p = session.page_index(&descr.group);
                session.pages[p].push(Unit::Item(id));
            }
        }
    }
    Ok(())
}

/// Variable bindings for each iteration of a statement, plus whether
/// the single iteration is a dummy substitute for absent data.
fn iterations(stmt: &Statement, scope: &Scope) -> (Vec<Vec<(String, MetaValue)>>, bool) {
    match stmt {
        // Conditionals bind nothing; absent data simply evaluates to
        // missing values in the body.
        Statement::If { .. } => (vec![Vec::new()], false),
        Statement::For {
            vars,
            source: ForSource::Collection(path),
        } => match scope.eval(path) {
            Some(v) => {
                let elems: Vec<MetaValue> = v.iter_elements().into_iter().cloned().collect();
                if elems.is_empty() {
                    (vec![Vec::new()], true)
                } else {
                    (
                        elems
                            .into_iter()
                            .map(|e| vec![(vars[0].clone(), e)])
                            .collect(),
                        false,
                    )
                }
            }
            None => (vec![Vec::new()], true),
        },
        Statement::For {
            vars,
            source: ForSource::Zip(targets),
        } => {
            let lists: Vec<Vec<MetaValue>> = targets
                .iter()
                .map(|t| {
                    scope
                        .eval(t)
                        .map(|v| v.iter_elements().into_iter().cloned().collect())
                        .unwrap_or_default()
                })
                .collect();
            let n = lists.iter().map(Vec::len).min().unwrap_or(0);
            if n == 0 {
                return (vec![Vec::new()], true);
            }
            let rows = (0..n)
                .map(|i| {
                    vars.iter()
                        .cloned()
                        .zip(lists.iter().map(|l| l[i].clone()))
                        .collect()
                })
                .collect();
            (rows, false)
        }
    }
}

fn block(session: &mut EditorSession, md: &MetaValue, b: &Block) -> Result<()> {
    let stmt_descr = session.template.descriptors[b.stmt_idx].clone();
    let stmt_text = stmt_descr.tag.clone();

    let (rows, dummy) = iterations(&b.stmt, &Scope::new(md));

    for (i, binds) in rows.iter().enumerate() {
        let mut scope = Scope::new(md);
        for (name, value) in binds {
            scope.bind(name.clone(), value.clone());
        }

        // One box per iteration when the statement declares one.
        let box_id = match &stmt_descr.inbox {
            Some(label) => {
                let id = session.alloc_box_id();
                let mut bx =
                    BoxGroup::new(id, label, b.stmt_idx, stmt_descr.inbox_multi, i == 0);
                bx.from_dummy = dummy;
                let p = session.page_index(&stmt_descr.group);
                session.pages[p].push(Unit::Box(id));
                session.boxes.insert(id, bx);
                Some(id)
            }
            None => None,
        };

        for entry in &b.entries {
            match entry {
                Entry::Leaf(idx) => {
                    let descr = {
                        let d = &mut session.template.descriptors[*idx];
                        d.statements = Some(stmt_text.clone());
                        d.clone()
                    };
                    make_item(session, &scope, &descr, *idx, i == 0, dummy, box_id, None)?;
                }
                Entry::Inner(inner) => {
                    let inner_text = session.template.descriptors[inner.stmt_idx].tag.clone();
                    let (inner_rows, inner_dummy) = iterations(&inner.stmt, &scope);
                    // Each outer iteration contributes one repetition
                    // set per inner leaf descriptor.
                    let mut per_descr: BTreeMap<usize, Vec<ItemId>> = BTreeMap::new();
                    for (j, ibinds) in inner_rows.iter().enumerate() {
                        let mut iscope = scope.clone();
                        for (name, value) in ibinds {
                            iscope.bind(name.clone(), value.clone());
                        }
                        for idx in &inner.leaves {
                            let descr = {
                                let d = &mut session.template.descriptors[*idx];
                                d.statements = Some(stmt_text.clone());
                                d.statements1 = Some(inner_text.clone());
                                d.clone()
                            };
                            make_item(
                                session,
                                &iscope,
                                &descr,
                                *idx,
                                j == 0,
                                dummy || inner_dummy,
                                box_id,
                                Some(&mut per_descr),
                            )?;
                        }
                    }
                    for (idx, ids) in per_descr {
                        session.template.descriptors[idx].add_binding(Binding::Group(ids));
                    }
                }
            }
        }
    }
    Ok(())
}

/// Create one item, evaluate its value, place it, and bind it. Items
/// created for an inner repetition set are collected instead of bound
/// individually.
#[allow(clippy::too_many_arguments)]
fn make_item(
    session: &mut EditorSession,
    scope: &Scope,
    descr: &crate::template::FieldDescriptor,
    idx: usize,
    is_first: bool,
    dummy: bool,
    box_id: Option<BoxId>,
    grouped: Option<&mut BTreeMap<usize, Vec<ItemId>>>,
) -> Result<ItemId> {
    let path = PathExpr::parse(&descr.tag)
        .ok_or_else(|| anyhow!("bad field path '{}'", descr.tag))?;
    let text = scope.eval(&path).map(|v| v.display());

    let id = session.alloc_item_id();
    let mut item = Item::new(id, idx, descr, is_first, session.template_mode);
    item.set_value(text.as_deref());
    item.from_dummy = dummy;
    session.items.insert(id, item);

    match grouped {
        Some(map) => map.entry(idx).or_default().push(id),
        None => session.template.descriptors[idx].add_binding(Binding::Item(id)),
    }

    match box_id {
        Some(bx) => {
            if let Some(b) = session.boxes.get_mut(&bx) {
                b.push(id);
            }
        }
        None => {
            let p = session.page_index(&descr.group);
            session.pages[p].push(Unit::Item(id));
        }
    }
    Ok(id)
}
