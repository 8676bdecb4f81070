//! Dynamic metadata value tree and dotted-path operations
//!
//! The editor does not hard-code the ISO 19115 object model. Loaded
//! documents become a tree of scalars, objects, and lists, and every
//! template expression addresses that tree through dotted paths. The
//! tree supports exactly the contract the engines need: path read,
//! path assignment with intermediate-object creation, and list append.

pub mod init;
pub mod io;
pub mod path;
pub mod xml;

use std::collections::BTreeMap;

/// One node of the metadata graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    Scalar(String),
    Object(BTreeMap<String, MetaValue>),
    List(Vec<MetaValue>),
}

impl Default for MetaValue {
    fn default() -> Self {
        MetaValue::Object(BTreeMap::new())
    }
}

impl MetaValue {
    /// Empty object node, the shape of a fresh document.
    pub fn empty_object() -> Self {
        MetaValue::Object(BTreeMap::new())
    }

    pub fn scalar(value: impl Into<String>) -> Self {
        MetaValue::Scalar(value.into())
    }

    /// Scalar rendering used for widget values and template output.
    /// Objects and lists have no direct text form.
    pub fn display(&self) -> String {
        match self {
            MetaValue::Scalar(s) => s.clone(),
            _ => String::new(),
        }
    }

    /// Truthiness for conditional statements: present and non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            MetaValue::Scalar(s) => !s.is_empty(),
            MetaValue::Object(map) => !map.is_empty(),
            MetaValue::List(items) => !items.is_empty(),
        }
    }

    /// Iteration view for loop statements. A list yields its elements;
    /// any other present value acts as a single-element collection,
    /// matching how the source object model tolerates singular tags.
    pub fn iter_elements(&self) -> Vec<&MetaValue> {
        match self {
            MetaValue::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    /// Read the value at a dotted path.
    pub fn get_path(&self, segments: &[String]) -> Option<&MetaValue> {
        let mut cur = self;
        for seg in segments {
            match cur {
                MetaValue::Object(map) => cur = map.get(seg)?,
                _ => return None,
            }
        }
        Some(cur)
    }

    /// Assign a value at a dotted path, creating missing intermediate
    /// objects. A non-object intermediate is replaced.
    pub fn set_path(&mut self, segments: &[String], value: MetaValue) {
        if segments.is_empty() {
            *self = value;
            return;
        }
        let mut cur = self;
        for seg in &segments[..segments.len() - 1] {
            if !matches!(cur, MetaValue::Object(_)) {
                *cur = MetaValue::empty_object();
            }
            let MetaValue::Object(map) = cur else {
                unreachable!()
            };
            cur = map
                .entry(seg.clone())
                .or_insert_with(MetaValue::empty_object);
        }
        if !matches!(cur, MetaValue::Object(_)) {
            *cur = MetaValue::empty_object();
        }
        let MetaValue::Object(map) = cur else {
            unreachable!()
        };
        map.insert(segments[segments.len() - 1].clone(), value);
    }

    /// Append a value to the list at a dotted path, creating the list
    /// (and intermediates) when missing. An existing scalar or object
    /// at the target is promoted to a single-element list first.
    pub fn append_path(&mut self, segments: &[String], value: MetaValue) {
        match self.get_path(segments) {
            Some(MetaValue::List(_)) => {}
            Some(existing) => {
                let promoted = MetaValue::List(vec![existing.clone()]);
                self.set_path(segments, promoted);
            }
            None => {
                self.set_path(segments, MetaValue::List(Vec::new()));
            }
        }
        if let Some(MetaValue::List(items)) = self.get_path_mut(segments) {
            items.push(value);
        }
    }

    /// Ensure an empty list exists at the path without disturbing an
    /// existing one. Used by the export-time init directives.
    pub fn ensure_list(&mut self, segments: &[String]) {
        if !matches!(self.get_path(segments), Some(MetaValue::List(_))) {
            self.set_path(segments, MetaValue::List(Vec::new()));
        }
    }

    /// Ensure an object exists at the path without disturbing one.
    pub fn ensure_object(&mut self, segments: &[String]) {
        if !matches!(self.get_path(segments), Some(MetaValue::Object(_))) {
            self.set_path(segments, MetaValue::empty_object());
        }
    }

    fn get_path_mut(&mut self, segments: &[String]) -> Option<&mut MetaValue> {
        let mut cur = self;
        for seg in segments {
            match cur {
                MetaValue::Object(map) => cur = map.get_mut(seg)?,
                _ => return None,
            }
        }
        Some(cur)
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
    fn test_set_path_creates_intermediates() {
        let mut md = MetaValue::empty_object();
        md.set_path(&segs("identification.title"), MetaValue::scalar("t"));
        assert_eq!(
            md.get_path(&segs("identification.title")),
            Some(&MetaValue::scalar("t"))
        );
    }

    #[test]
    fn test_set_path_replaces_scalar_intermediate() {
        let mut md = MetaValue::empty_object();
        md.set_path(&segs("a"), MetaValue::scalar("x"));
        md.set_path(&segs("a.b"), MetaValue::scalar("y"));
        assert_eq!(md.get_path(&segs("a.b")), Some(&MetaValue::scalar("y")));
    }

    #[test]
    fn test_append_path_creates_list() {
        let mut md = MetaValue::empty_object();
        md.append_path(&segs("contact"), MetaValue::scalar("one"));
        md.append_path(&segs("contact"), MetaValue::scalar("two"));
        assert_eq!(
            md.get_path(&segs("contact")),
            Some(&MetaValue::List(vec![
                MetaValue::scalar("one"),
                MetaValue::scalar("two"),
            ]))
        );
    }

    #[test]
    fn test_append_path_promotes_scalar_to_list() {
        let mut md = MetaValue::empty_object();
        md.set_path(&segs("hierarchy"), MetaValue::scalar("dataset"));
        md.append_path(&segs("hierarchy"), MetaValue::scalar("series"));
        assert_eq!(
            md.get_path(&segs("hierarchy")),
            Some(&MetaValue::List(vec![
                MetaValue::scalar("dataset"),
                MetaValue::scalar("series"),
            ]))
        );
    }

    #[test]
    fn test_ensure_list_keeps_existing_entries() {
        let mut md = MetaValue::empty_object();
        md.append_path(&segs("keywords"), MetaValue::scalar("kw"));
        md.ensure_list(&segs("keywords"));
        assert_eq!(
            md.get_path(&segs("keywords")),
            Some(&MetaValue::List(vec![MetaValue::scalar("kw")]))
        );
    }

    #[test]
    fn test_iter_elements_singular_value() {
        let v = MetaValue::scalar("only");
        assert_eq!(v.iter_elements().len(), 1);
    }

    #[test]
    fn test_truthiness() {
        assert!(!MetaValue::scalar("").is_truthy());
        assert!(MetaValue::scalar("x").is_truthy());
        assert!(!MetaValue::empty_object().is_truthy());
        assert!(!MetaValue::List(Vec::new()).is_truthy());
    }
}
