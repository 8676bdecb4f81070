//! Structural mapping from an XML document to the metadata tree
//!
//! The mapping is schema-free: namespace prefixes are stripped, the
//! gco-style value wrappers (`CharacterString`, `Date`, ...) collapse
//! into their text, elements with only text become scalars, repeated
//! sibling names are promoted to lists. The paths the templates
//! address are exactly the paths this mapping produces.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::metadata::MetaValue;
use std::collections::BTreeMap;

/// Single-child element names that are pure value wrappers and
/// collapse into their content.
const VALUE_WRAPPERS: &[&str] = &[
    "CharacterString",
    "Date",
    "DateTime",
    "Decimal",
    "Integer",
    "Real",
    "Boolean",
    "URL",
    "Anchor",
];

/// Parse an XML document into a metadata tree. Returns a descriptive
/// message on malformed input; the caller wraps it into a `LoadError`.
pub fn parse_document(xml: &str) -> Result<MetaValue, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    // Stack frame per open element: (local name, children, text).
    let mut stack: Vec<(String, BTreeMap<String, MetaValue>, String)> = Vec::new();
    let mut root: Option<MetaValue> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e.name().as_ref());
                stack.push((name, BTreeMap::new(), String::new()));
            }
            Ok(Event::Empty(ref e)) => {
                let name = local_name(e.name().as_ref());
                let value = MetaValue::scalar("");
                attach(&mut stack, &mut root, name, value);
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|err| err.to_string())?.to_string();
                if let Some((_, _, buf_text)) = stack.last_mut() {
                    buf_text.push_str(&text);
                }
            }
            Ok(Event::End(_)) => {
                let Some((name, children, text)) = stack.pop() else {
                    return Err("unexpected closing tag".to_string());
                };
                let value = finalize(children, text);
                attach(&mut stack, &mut root, name, value);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(err.to_string()),
        }
        buf.clear();
    }

    root.ok_or_else(|| "document has no root element".to_string())
}

fn local_name(qname: &[u8]) -> String {
    let name = String::from_utf8_lossy(qname);
    match name.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => name.to_string(),
    }
}

/// Turn a closed element into a value: text-only elements become
/// scalars, wrapper-only elements collapse, the rest are objects.
fn finalize(children: BTreeMap<String, MetaValue>, text: String) -> MetaValue {
    if children.is_empty() {
        return MetaValue::scalar(text.trim());
    }
    if children.len() == 1 {
        let (key, value) = children.iter().next().expect("len checked");
        if VALUE_WRAPPERS.contains(&key.as_str()) {
            return value.clone();
        }
    }
    MetaValue::Object(children)
}

/// Insert a finished child into its parent, promoting a repeated
/// sibling name to a list. The document root lands in `root`.
fn attach(
    stack: &mut [(String, BTreeMap<String, MetaValue>, String)],
    root: &mut Option<MetaValue>,
    name: String,
    value: MetaValue,
) {
    match stack.last_mut() {
        Some((_, children, _)) => match children.remove(&name) {
            None => {
                children.insert(name, value);
            }
            Some(MetaValue::List(mut items)) => {
                items.push(value);
                children.insert(name, MetaValue::List(items));
            }
            Some(existing) => {
                children.insert(name, MetaValue::List(vec![existing, value]));
            }
        },
        None => *root = Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn segs(path: &str) -> Vec<String> {
        path.split('.').map(str::to_string).collect()
    }

    #[test]
    fn test_text_element_becomes_scalar() {
        let md = parse_document("<md><title>Lakes</title></md>").unwrap();
        assert_eq!(md.get_path(&segs("title")), Some(&MetaValue::scalar("Lakes")));
    }

    #[test]
    fn test_namespace_prefixes_stripped() {
        let md = parse_document(
            "<gmd:md xmlns:gmd=\"urn:x\"><gmd:title>T</gmd:title></gmd:md>",
        )
        .unwrap();
        assert_eq!(md.get_path(&segs("title")), Some(&MetaValue::scalar("T")));
    }

    #[test]
    fn test_character_string_wrapper_collapses() {
        let md = parse_document(
            "<md><title><CharacterString>Lakes</CharacterString></title></md>",
        )
        .unwrap();
        assert_eq!(md.get_path(&segs("title")), Some(&MetaValue::scalar("Lakes")));
    }

    #[test]
    fn test_repeated_siblings_become_list() {
        let md = parse_document(
            "<md><contact><organization>A</organization></contact>\
             <contact><organization>B</organization></contact></md>",
        )
        .unwrap();
        match md.get_path(&segs("contact")) {
            Some(MetaValue::List(items)) => assert_eq!(items.len(), 2),
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_element_is_empty_scalar() {
        let md = parse_document("<md><abstract/></md>").unwrap();
        assert_eq!(md.get_path(&segs("abstract")), Some(&MetaValue::scalar("")));
    }

    #[test]
    fn test_malformed_document_is_error() {
        assert!(parse_document("<md><open></md>").is_err());
        assert!(parse_document("").is_err());
    }

    #[test]
    fn test_escaped_entities_unescape() {
        let md = parse_document("<md><title>a &amp; b</title></md>").unwrap();
        assert_eq!(md.get_path(&segs("title")), Some(&MetaValue::scalar("a & b")));
    }
}
