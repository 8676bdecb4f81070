//! Template-definition rewrite
//!
//! Before a template-mode save, the original template text is
//! rewritten so the final render produces a new, partially resolved
//! template: checked fields stay live and get their current values
//! baked in, unchecked fields are swapped for indexed placeholders
//! whose literals are carried on a side list and re-emitted verbatim
//! by the renderer. Statement openers and closers of a preserved
//! block are swapped too, tracked with a nesting stack so an
//! unchecked field inside a preserved loop never closes it early.
//!
//! The rewritten text lands next to the original under an `EXPT`
//! prefixed name; the save path renders it once and deletes it.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::editor::EditorSession;

/// Rewrite the template. Returns the rewritten file path and the
/// side list of preserved literal fragments.
pub(crate) fn define(session: &EditorSession) -> Result<(PathBuf, Vec<String>)> {
    let descriptors = &session.template.descriptors;
    let mut out = String::new();
    let mut tags: Vec<String> = Vec::new();
    let mut cursor = 0;
    // One entry per open statement: was its opener preserved?
    let mut preserved_stack: Vec<bool> = Vec::new();

    for raw in session.template.source.lines() {
        let mut line = raw.to_string();

        if line.contains("{% endfor") || line.contains("{% endif") {
            if preserved_stack.pop().unwrap_or(false) {
                if let Some(frag) = fragment(&line, "{%", "%}") {
                    let ph = placeholder(&mut tags, &frag);
                    line = line.replace(&frag, &ph);
                }
            }
            out.push_str(&line);
            out.push('\n');
            continue;
        }

        let is_opener = line.contains("{% for") || line.contains("{% if");
        let matched = cursor < descriptors.len()
            && !descriptors[cursor].raw_fragment.is_empty()
            && line.contains(&descriptors[cursor].raw_fragment);

        if matched {
            let idx = cursor;
            cursor += 1;
            let preserve = !effective_checked(session, idx);
            if is_opener {
                preserved_stack.push(preserve);
            }
            if preserve {
                let frag = descriptors[idx].raw_fragment.clone();
                let ph = placeholder(&mut tags, &frag);
                line = line.replace(&frag, &ph);
                // The annotation must survive the render too, or the
                // produced template loses its field schema.
                if let Some(ann) = fragment(&line, "{#", "#}") {
                    let ph = placeholder(&mut tags, &ann);
                    line = line.replace(&ann, &ph);
                }
            }
        } else if is_opener {
            preserved_stack.push(false);
        }

        out.push_str(&line);
        out.push('\n');
    }

    let name = session
        .template
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("template.xml");
    let path = session.template.path.with_file_name(format!("EXPT{name}"));
    fs::write(&path, out).with_context(|| format!("cannot write {}", path.display()))?;
    tracing::info!("rewritten template at {}", path.display());
    Ok((path, tags))
}

/// A field counts as checked when its first bound item is checked.
/// Statement lines have no items of their own, so the first few
/// following descriptors answer for them.
fn effective_checked(session: &EditorSession, idx: usize) -> bool {
    let hi = (idx + 4).min(session.template.descriptors.len());
    for d in &session.template.descriptors[idx..hi] {
        if let Some(id) = d.first_item() {
            if let Some(item) = session.items.get(&id) {
                return item.is_checked;
            }
        }
    }
    true
}

fn placeholder(tags: &mut Vec<String>, literal: &str) -> String {
    tags.push(literal.to_string());
    format!("{{{{ owsTagList[{}] }}}}", tags.len() - 1)
}

/// Delimited fragment of a line, delimiters included.
fn fragment(line: &str, open: &str, close: &str) -> Option<String> {
    let start = line.find(open)?;
    let end = line[start..].find(close)? + start + close.len();
    Some(line[start..end].to_string())
}
