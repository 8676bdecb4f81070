//! Export: form state back into a fresh document
//!
//! The inverse of generation, walking the same plan. Instead of
//! creating widgets it reads each descriptor's accumulated bindings
//! and writes sanitized values into a new metadata tree. Iteration
//! counts come from the binding lists, never re-derived from the
//! document, so the two walks cannot disagree.
//!
//! Widgets created by dummy-loop substitution are skipped while they
//! stay unedited; the collections they belong to still come out as
//! empty lists.

use anyhow::{anyhow, bail, Result};

use crate::editor::item::{Item, ItemId};
use crate::editor::EditorSession;
use crate::metadata::path::{PathExpr, Scope};
use crate::metadata::{init, MetaValue};
use crate::template::plan::{self, Block, Entry, ForSource, InnerBlock, PlanNode, Statement};
use crate::template::{Binding, FieldDescriptor};

pub(crate) fn run(session: &EditorSession) -> Result<MetaValue> {
    let mut md = MetaValue::empty_object();
    let directives = init::load_for_template(&session.template.path);
    init::apply(&mut md, &directives);

    let nodes = plan::build(&session.template.tag_lines)?;
    for node in &nodes {
        match node {
            PlanNode::Leaf(idx) => leaf(session, &mut md, *idx)?,
            PlanNode::Block(b) => block(session, &mut md, b)?,
        }
    }
    Ok(md)
}

/// Unedited dummy widgets stay out of the document.
fn exportable(item: &Item) -> bool {
    !(item.from_dummy && item.value.is_empty())
}

fn item_of<'a>(session: &'a EditorSession, binding: &Binding) -> Option<&'a Item> {
    match binding {
        Binding::Item(id) => session.items.get(id),
        Binding::Group(_) => None,
    }
}

/// Bound instances in generation order, groups flattened.
fn bound_ids(d: &FieldDescriptor) -> Vec<ItemId> {
    d.bound
        .iter()
        .flat_map(|b| match b {
            Binding::Item(id) => vec![*id],
            Binding::Group(ids) => ids.clone(),
        })
        .collect()
}

fn doc_path(d: &FieldDescriptor) -> Result<PathExpr> {
    let path =
        PathExpr::parse(&d.tag).ok_or_else(|| anyhow!("bad field path '{}'", d.tag))?;
    if !path.is_absolute() {
        bail!("field '{}' is not document-rooted", d.tag);
    }
    Ok(path)
}

/// Plain top-level field: one direct assignment, or appends into the
/// target list when the field is repeated.
fn leaf(session: &EditorSession, md: &mut MetaValue, idx: usize) -> Result<()> {
    let d = &session.template.descriptors[idx];
    let path = doc_path(d)?;
    let values: Vec<String> = d
        .bound
        .iter()
        .filter_map(|b| item_of(session, b))
        .filter(|it| exportable(it))
        .map(Item::value)
        .collect();
    if d.multiplicity {
        md.ensure_list(path.tail());
        for v in values {
            md.append_path(path.tail(), MetaValue::scalar(v));
        }
    } else if let Some(v) = values.first() {
        md.set_path(path.tail(), MetaValue::scalar(v.clone()));
    }
    Ok(())
}

fn block(session: &EditorSession, md: &mut MetaValue, b: &Block) -> Result<()> {
    let stmt_descr = &session.template.descriptors[b.stmt_idx];
    match &b.stmt {
        Statement::If { guard } => {
            for entry in &b.entries {
                match entry {
                    Entry::Inner(inner) => conditional_list(session, md, inner)?,
                    Entry::Leaf(idx) => {
                        // Direct assignment only while the guard holds
                        // on the document built so far.
                        let holds = Scope::new(md)
                            .eval(guard)
                            .is_some_and(|v| v.is_truthy());
                        if holds {
                            leaf(session, md, *idx)?;
                        }
                    }
                }
            }
        }
        Statement::For {
            vars,
            source: ForSource::Collection(path),
        } => {
            if !path.is_absolute() {
                bail!("loop source '{path}' is not document-rooted");
            }
            let n = b
                .first_leaf()
                .map(|idx| session.template.descriptors[idx].bound.len())
                .unwrap_or(0);
            md.ensure_list(path.tail());
            if stmt_descr.object_ctor.is_some() {
                for k in 0..n {
                    if let Some(obj) = build_record(session, b, &vars[0], k)? {
                        md.append_path(path.tail(), obj);
                    }
                }
            } else {
                // No constructor: iteration values append directly to
                // the one target list.
                for k in 0..n {
                    for entry in &b.entries {
                        let Entry::Leaf(idx) = entry else {
                            bail!("nested loop without a record constructor");
                        };
                        let d = &session.template.descriptors[*idx];
                        if let Some(item) = d.bound.get(k).and_then(|bd| item_of(session, bd)) {
                            if exportable(item) {
                                md.append_path(path.tail(), MetaValue::scalar(item.value()));
                            }
                        }
                    }
                }
            }
        }
        Statement::For {
            vars,
            source: ForSource::Zip(targets),
        } => {
            for entry in &b.entries {
                let Entry::Leaf(idx) = entry else {
                    bail!("nested statement inside a zip loop");
                };
                let d = &session.template.descriptors[*idx];
                let lp = PathExpr::parse(&d.tag)
                    .ok_or_else(|| anyhow!("bad field path '{}'", d.tag))?;
                let vi = vars
                    .iter()
                    .position(|v| *v == lp.root)
                    .ok_or_else(|| anyhow!("'{}' is not a zip loop variable", lp.root))?;
                let target = &targets[vi];
                md.ensure_list(target.tail());
                for bd in &d.bound {
                    if let Some(item) = item_of(session, bd) {
                        if exportable(item) {
                            md.append_path(target.tail(), MetaValue::scalar(item.value()));
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

/// One record of a constructor loop: leaf fields assigned into a
/// fresh sub-object, the inner repetition set gathered into its list,
/// in template order. Returns `None` when the whole iteration is an
/// unedited dummy.
fn build_record(
    session: &EditorSession,
    b: &Block,
    var: &str,
    k: usize,
) -> Result<Option<MetaValue>> {
    let mut obj = MetaValue::empty_object();
    let mut any = false;
    for entry in &b.entries {
        match entry {
            Entry::Leaf(idx) => {
                let d = &session.template.descriptors[*idx];
                let lp = PathExpr::parse(&d.tag)
                    .ok_or_else(|| anyhow!("bad field path '{}'", d.tag))?;
                if lp.root != var {
                    bail!("field '{}' is not rooted at loop variable '{var}'", d.tag);
                }
                if let Some(item) = d.bound.get(k).and_then(|bd| item_of(session, bd)) {
                    if exportable(item) {
                        obj.set_path(lp.tail(), MetaValue::scalar(item.value()));
                        any = true;
                    }
                }
            }
            Entry::Inner(inner) => {
                let Statement::For {
                    source: ForSource::Collection(ipath),
                    ..
                } = &inner.stmt
                else {
                    bail!("inner statement of a record loop must be a loop");
                };
                if ipath.root != var {
                    bail!("inner loop '{ipath}' is not rooted at loop variable '{var}'");
                }
                for idx in &inner.leaves {
                    let d = &session.template.descriptors[*idx];
                    let Some(Binding::Group(ids)) = d.bound.get(k) else {
                        continue;
                    };
                    let lp = PathExpr::parse(&d.tag)
                        .ok_or_else(|| anyhow!("bad field path '{}'", d.tag))?;
                    obj.ensure_list(ipath.tail());
                    for id in ids {
                        let Some(item) = session.items.get(id) else {
                            continue;
                        };
                        if !exportable(item) {
                            continue;
                        }
                        if lp.tail().is_empty() {
                            obj.append_path(ipath.tail(), MetaValue::scalar(item.value()));
                        } else {
                            let mut rec = MetaValue::empty_object();
                            rec.set_path(lp.tail(), MetaValue::scalar(item.value()));
                            obj.append_path(ipath.tail(), rec);
                        }
                        any = true;
                    }
                }
            }
        }
    }
    Ok(if any { Some(obj) } else { None })
}

/// Loop under a conditional: values land in one document-rooted list,
/// the very list the rendered guard will test. With a record
/// constructor on the loop, each repetition builds a fresh sub-object
/// keyed by the leaf path tails; without one, values append directly.
fn conditional_list(
    session: &EditorSession,
    md: &mut MetaValue,
    inner: &InnerBlock,
) -> Result<()> {
    let Statement::For {
        vars,
        source: ForSource::Collection(path),
    } = &inner.stmt
    else {
        bail!("conditional body must be a loop or plain fields");
    };
    if !path.is_absolute() {
        bail!("loop source '{path}' is not document-rooted");
    }
    md.ensure_list(path.tail());

    if session.template.descriptors[inner.stmt_idx]
        .object_ctor
        .is_some()
    {
        let n = inner
            .leaves
            .first()
            .map(|idx| bound_ids(&session.template.descriptors[*idx]).len())
            .unwrap_or(0);
        for j in 0..n {
            let mut obj = MetaValue::empty_object();
            let mut any = false;
            for idx in &inner.leaves {
                let d = &session.template.descriptors[*idx];
                let lp = PathExpr::parse(&d.tag)
                    .ok_or_else(|| anyhow!("bad field path '{}'", d.tag))?;
                if lp.root != vars[0] {
                    bail!(
                        "field '{}' is not rooted at loop variable '{}'",
                        d.tag,
                        vars[0]
                    );
                }
                let Some(item) = bound_ids(d).get(j).and_then(|id| session.items.get(id))
                else {
                    continue;
                };
                if exportable(item) {
                    obj.set_path(lp.tail(), MetaValue::scalar(item.value()));
                    any = true;
                }
            }
            if any {
                md.append_path(path.tail(), obj);
            }
        }
        return Ok(());
    }

    for idx in &inner.leaves {
        let d = &session.template.descriptors[*idx];
        for id in bound_ids(d) {
            let Some(item) = session.items.get(&id) else {
                continue;
            };
            if exportable(item) {
                md.append_path(path.tail(), MetaValue::scalar(item.value()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::xml;
    use crate::template::parser::parse_str;
    use pretty_assertions::assert_eq;

    fn segs(path: &str) -> Vec<String> {
        path.split('.').map(str::to_string).collect()
    }

    fn session(text: &str, md: MetaValue) -> EditorSession {
        EditorSession::new(parse_str(text).unwrap(), md, false).unwrap()
    }

    #[test]
    fn test_round_trip_preserves_loaded_values() {
        let template = "\
<md>
  <t>{{ md.identification.title }}</t>{# name=Title, group=Identification #}
{% for c in md.contact %}{# group=Contact, inbox=Contact, object=CI_ResponsibleParty, inboxmulti=yes #}
  <o>{{ c.organization }}</o>{# name=Org #}
  <e>{{ c.email }}</e>{# name=Email #}
{% endfor %}
</md>
";
        let source = "\
<gmd:MD_Metadata xmlns:gmd=\"x\">
  <identification><title>Lakes of Tyrol</title></identification>
  <contact><organization>GRASS</organization><email>g@osgeo.org</email></contact>
  <contact><organization>OSGeo</organization><email>info@osgeo.org</email></contact>
</gmd:MD_Metadata>";
        let md = xml::parse_document(source).unwrap();
        let s = session(template, md);
        let out = s.export_document().unwrap();

        assert_eq!(
            out.get_path(&segs("identification.title")),
            Some(&MetaValue::scalar("Lakes of Tyrol"))
        );
        let Some(MetaValue::List(contacts)) = out.get_path(&segs("contact")) else {
            panic!("contact list missing");
        };
        assert_eq!(contacts.len(), 2);
        assert_eq!(
            contacts[0].get_path(&segs("organization")),
            Some(&MetaValue::scalar("GRASS"))
        );
        assert_eq!(
            contacts[1].get_path(&segs("email")),
            Some(&MetaValue::scalar("info@osgeo.org"))
        );
    }

    #[test]
    fn test_unedited_dummy_is_excluded() {
        let s = session(
            "{% for c in md.contact %}{# group=Contact, inbox=Contact, object=CI_ResponsibleParty, inboxmulti=yes #}\n\
             <o>{{ c.organization }}</o>{# name=Org #}\n\
             {% endfor %}\n",
            MetaValue::empty_object(),
        );
        let out = s.export_document().unwrap();
        assert_eq!(
            out.get_path(&segs("contact")),
            Some(&MetaValue::List(Vec::new())),
            "list exists but the dummy record is not in it"
        );
    }

    #[test]
    fn test_edited_dummy_is_exported() {
        let mut s = session(
            "{% for c in md.contact %}{# group=Contact, inbox=Contact, object=CI_ResponsibleParty, inboxmulti=yes #}\n\
             <o>{{ c.organization }}</o>{# name=Org #}\n\
             {% endfor %}\n",
            MetaValue::empty_object(),
        );
        let id = *s.items.keys().next().unwrap();
        s.item_mut(id).unwrap().value = "Filled in".to_string();
        let out = s.export_document().unwrap();
        let Some(MetaValue::List(contacts)) = out.get_path(&segs("contact")) else {
            panic!("contact list missing");
        };
        assert_eq!(contacts.len(), 1);
        assert_eq!(
            contacts[0].get_path(&segs("organization")),
            Some(&MetaValue::scalar("Filled in"))
        );
    }

    #[test]
    fn test_zip_export_not_interleaved() {
        let template = "\
{% for s, e in zip(md.identification.temporal_start, md.identification.temporal_end) %}{# group=Temporal #}
  <s>{{ s }}</s>{# name=Start #}
  <e>{{ e }}</e>{# name=End #}
{% endfor %}
";
        let mut md = MetaValue::empty_object();
        for v in ["a", "b"] {
            md.append_path(&segs("identification.temporal_start"), MetaValue::scalar(v));
        }
        for v in ["1", "2"] {
            md.append_path(&segs("identification.temporal_end"), MetaValue::scalar(v));
        }
        let s = session(template, md);
        let out = s.export_document().unwrap();
        assert_eq!(
            out.get_path(&segs("identification.temporal_start")),
            Some(&MetaValue::List(vec![
                MetaValue::scalar("a"),
                MetaValue::scalar("b"),
            ]))
        );
        assert_eq!(
            out.get_path(&segs("identification.temporal_end")),
            Some(&MetaValue::List(vec![
                MetaValue::scalar("1"),
                MetaValue::scalar("2"),
            ]))
        );
    }

    #[test]
    fn test_keyword_records_keep_thesaurus_shape() {
        let template = "\
{% for kw in md.identification.keywords %}{# group=Keywords, inbox=Keywords, object=MD_Keywords, inboxmulti=yes #}
{% for k in kw.keywords %}
  <kw>{{ k }}</kw>{# name=Keyword, multiplicity=yes #}
{% endfor %}
  <t>{{ kw.thesaurus.title }}</t>{# name=Thesaurus title #}
  <d>{{ kw.thesaurus.date }}</d>{# name=Thesaurus date #}
{% endfor %}
";
        let mut md = MetaValue::empty_object();
        let mut set = MetaValue::empty_object();
        for k in ["lake", "water"] {
            set.append_path(&segs("keywords"), MetaValue::scalar(k));
        }
        set.set_path(&segs("thesaurus.title"), MetaValue::scalar("GEMET"));
        set.set_path(&segs("thesaurus.date"), MetaValue::scalar("2010-01-13"));
        md.append_path(&segs("identification.keywords"), set);

        let s = session(template, md);
        let out = s.export_document().unwrap();
        let Some(MetaValue::List(records)) = out.get_path(&segs("identification.keywords"))
        else {
            panic!("keyword records missing");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].get_path(&segs("keywords")),
            Some(&MetaValue::List(vec![
                MetaValue::scalar("lake"),
                MetaValue::scalar("water"),
            ]))
        );
        assert_eq!(
            records[0].get_path(&segs("thesaurus.title")),
            Some(&MetaValue::scalar("GEMET"))
        );
    }

    #[test]
    fn test_conditional_loop_fills_guarded_list() {
        let template = "\
{% if md.dataquality.conformancetitle|length %}
{% for t in md.dataquality.conformancetitle %}
  <t>{{ t }}</t>{# name=Conformance title, group=Quality, multiplicity=yes #}
{% endfor %}
{% endif %}
";
        let mut md = MetaValue::empty_object();
        for t in ["Reg 1089/2010", "Reg 1205/2008"] {
            md.append_path(&segs("dataquality.conformancetitle"), MetaValue::scalar(t));
        }
        let s = session(template, md);
        let out = s.export_document().unwrap();
        assert_eq!(
            out.get_path(&segs("dataquality.conformancetitle")),
            Some(&MetaValue::List(vec![
                MetaValue::scalar("Reg 1089/2010"),
                MetaValue::scalar("Reg 1205/2008"),
            ]))
        );
    }

    #[test]
    fn test_conditional_ctor_loop_builds_records() {
        let template = "\
{% if md.distribution.online|length %}
{% for o in md.distribution.online %}{# group=Distribution, object=CI_OnlineResource #}
  <url>{{ o.url }}</url>{# name=Online resource #}
{% endfor %}
{% endif %}
";
        let mut md = MetaValue::empty_object();
        let mut res = MetaValue::empty_object();
        res.set_path(&segs("url"), MetaValue::scalar("http://example.org/wms"));
        md.append_path(&segs("distribution.online"), res);

        let s = session(template, md);
        let out = s.export_document().unwrap();
        let Some(MetaValue::List(online)) = out.get_path(&segs("distribution.online"))
        else {
            panic!("online list missing");
        };
        assert_eq!(online.len(), 1);
        // The constructor keeps the field name: a record, not a bare
        // scalar.
        assert_eq!(
            online[0].get_path(&segs("url")),
            Some(&MetaValue::scalar("http://example.org/wms"))
        );
    }

    #[test]
    fn test_exported_values_are_sanitized() {
        let mut s = session(
            "<t>{{ md.identification.title }}</t>{# name=Title, group=Identification #}\n",
            MetaValue::empty_object(),
        );
        let id = *s.items.keys().next().unwrap();
        s.item_mut(id).unwrap().value = "a\n\"quoted\" <t>".to_string();
        let out = s.export_document().unwrap();
        assert_eq!(
            out.get_path(&segs("identification.title")),
            Some(&MetaValue::scalar("aquoted &lt;t&gt;"))
        );
    }
}
