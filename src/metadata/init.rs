//! Export-time initialization directives
//!
//! The export engine starts from a fresh document, and a handful of
//! mandatory sub-objects and collections must exist before field
//! values are written into them. The reference implementation ran a
//! script-like payload for this; here the payload is data: a JSON
//! list of path/kind directives, embedded as a default and
//! overridable by a `config/init_md.json` next to the template.

use serde::Deserialize;
use std::path::Path;

use crate::metadata::MetaValue;

/// Default directives shipped with the editor.
const DEFAULT_INIT: &str = include_str!("../../config/init_md.json");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveKind {
    Object,
    List,
}

/// One pre-population instruction: make sure `path` exists as the
/// given shape before export writes begin.
#[derive(Debug, Clone, Deserialize)]
pub struct InitDirective {
    pub path: String,
    pub kind: DirectiveKind,
}

/// Parse a directive payload.
pub fn parse_directives(json: &str) -> Result<Vec<InitDirective>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Load directives for a template: `config/init_md.json` beside the
/// template when present, the embedded default otherwise.
pub fn load_for_template(template_path: &Path) -> Vec<InitDirective> {
    let local = template_path
        .parent()
        .map(|dir| dir.join("config").join("init_md.json"));
    if let Some(local) = local {
        if let Ok(text) = std::fs::read_to_string(&local) {
            match parse_directives(&text) {
                Ok(directives) => {
                    tracing::info!("using init directives from {}", local.display());
                    return directives;
                }
                Err(err) => {
                    tracing::warn!("ignoring malformed {}: {err}", local.display());
                }
            }
        }
    }
    parse_directives(DEFAULT_INIT).expect("embedded init_md.json is valid")
}

/// Apply directives to a fresh document.
pub fn apply(md: &mut MetaValue, directives: &[InitDirective]) {
    for d in directives {
        let segments: Vec<String> = d.path.split('.').map(str::to_string).collect();
        match d.kind {
            DirectiveKind::Object => md.ensure_object(&segments),
            DirectiveKind::List => md.ensure_list(&segments),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(path: &str) -> Vec<String> {
        path.split('.').map(str::to_string).collect()
    }

    #[test]
    fn test_embedded_default_parses() {
        let directives = parse_directives(DEFAULT_INIT).unwrap();
        assert!(!directives.is_empty());
    }

    #[test]
    fn test_apply_creates_shapes() {
        let directives = parse_directives(
            r#"[
                {"path": "identification", "kind": "object"},
                {"path": "identification.keywords", "kind": "list"},
                {"path": "contact", "kind": "list"}
            ]"#,
        )
        .unwrap();
        let mut md = MetaValue::empty_object();
        apply(&mut md, &directives);
        assert!(matches!(
            md.get_path(&segs("identification.keywords")),
            Some(MetaValue::List(_))
        ));
        assert!(matches!(
            md.get_path(&segs("contact")),
            Some(MetaValue::List(_))
        ));
    }

    #[test]
    fn test_apply_does_not_clobber_existing() {
        let directives = parse_directives(r#"[{"path": "contact", "kind": "list"}]"#).unwrap();
        let mut md = MetaValue::empty_object();
        md.append_path(&segs("contact"), MetaValue::scalar("kept"));
        apply(&mut md, &directives);
        assert_eq!(
            md.get_path(&segs("contact")),
            Some(&MetaValue::List(vec![MetaValue::scalar("kept")]))
        );
    }
}
