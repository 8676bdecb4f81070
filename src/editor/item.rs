//! Editable field state
//!
//! One `Item` binds one descriptor to one editable value plus its
//! decoration: label, add/remove affordances, and the inclusion
//! checkbox used by the template-definition mode. Items live in the
//! session arena and are referenced by id from descriptors, groups,
//! and pages.

use chrono::NaiveDate;

use crate::template::FieldDescriptor;

/// Arena handle of an item. Stable for the item's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub u32);

/// Visual fill state of the input control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fill {
    #[default]
    Normal,
    /// Source document had no value for this field.
    Missing,
    /// Source value was the `$NULL` marker left by the upstream
    /// harvester.
    NullMarked,
}

/// Input validation kind derived from the descriptor's `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validator {
    #[default]
    Free,
    Integer,
    Decimal,
    Email,
    Date,
}

impl Validator {
    pub fn for_type(value_type: Option<&str>) -> Self {
        match value_type {
            Some("integer") => Validator::Integer,
            Some("decimal") => Validator::Decimal,
            Some("email") => Validator::Email,
            Some("date") => Validator::Date,
            _ => Validator::Free,
        }
    }

    /// Keystroke gate for numeric kinds.
    pub fn accepts_char(&self, c: char) -> bool {
        match self {
            Validator::Integer => c.is_ascii_digit(),
            Validator::Decimal => c.is_ascii_digit() || c == '.',
            _ => !c.is_control(),
        }
    }

    /// Whole-value check, used to flag the field in the UI.
    pub fn check(&self, value: &str) -> bool {
        if value.is_empty() {
            return true;
        }
        match self {
            Validator::Free => true,
            Validator::Integer => value.chars().all(|c| c.is_ascii_digit()),
            Validator::Decimal => value.parse::<f64>().is_ok(),
            Validator::Email => {
                let Some((local, domain)) = value.split_once('@') else {
                    return false;
                };
                !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
            }
            Validator::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    /// Index of the bound descriptor in the template sequence.
    pub descriptor: usize,
    pub label: String,
    pub value: String,
    pub multiline: bool,
    /// The source document actually carried a value for this field.
    pub is_valid: bool,
    pub fill: Fill,
    pub can_add: bool,
    pub can_remove: bool,
    pub has_checkbox: bool,
    pub is_checked: bool,
    /// Checkbox-driven enable state in template-definition mode.
    pub edit_enabled: bool,
    /// Created by dummy-loop substitution for absent repeated data.
    pub from_dummy: bool,
    pub validator: Validator,
    /// Documentation shown in the info panel.
    pub info: String,
}

impl Item {
    /// Build an item for a descriptor. `is_first` is the
    /// mandatory-first marker: only the first repetition of a
    /// duplicable field carries the add affordance, later ones carry
    /// remove instead.
    pub fn new(
        id: ItemId,
        descriptor: usize,
        descr: &FieldDescriptor,
        is_first: bool,
        checkbox_mode: bool,
    ) -> Self {
        Self {
            id,
            descriptor,
            label: descr.name.clone(),
            value: String::new(),
            multiline: descr.multiline,
            is_valid: false,
            fill: Fill::Normal,
            can_add: descr.multiplicity && is_first,
            can_remove: descr.multiplicity && !is_first,
            has_checkbox: checkbox_mode,
            is_checked: false,
            edit_enabled: !checkbox_mode,
            from_dummy: false,
            validator: Validator::for_type(descr.value_type.as_deref()),
            info: build_info(descr),
        }
    }

    /// Load a value from the evaluated source expression. Absent or
    /// empty values flag the field and clear it; the `$NULL` marker
    /// does the same, except in template-definition mode, where it
    /// gets its own fill so the rewritten template can tell the two
    /// apart. Checkbox mode auto-checks flagged fields for inclusion.
    pub fn set_value(&mut self, value: Option<&str>) {
        match value {
            None | Some("") => {
                self.value.clear();
                self.fill = Fill::Missing;
                self.is_valid = false;
                if self.has_checkbox {
                    self.is_checked = true;
                    self.edit_enabled = true;
                }
            }
            Some("$NULL") => {
                self.value.clear();
                self.is_valid = false;
                if self.has_checkbox {
                    self.fill = Fill::NullMarked;
                    self.is_checked = true;
                    self.edit_enabled = true;
                } else {
                    self.fill = Fill::Missing;
                }
            }
            Some(v) => {
                self.value = v.to_string();
                self.fill = Fill::Normal;
                self.is_valid = true;
            }
        }
    }

    /// The exportable value: XML-reserved characters escaped, then
    /// newlines and both quote characters stripped so the value can
    /// be embedded anywhere in the rendered document.
    pub fn value(&self) -> String {
        sanitize(&self.value)
    }
}

/// Escape `&`, `<`, `>` and strip newlines and quotes.
pub fn sanitize(raw: &str) -> String {
    let escaped = raw
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    escaped
        .chars()
        .filter(|c| !matches!(c, '\n' | '\r' | '"' | '\''))
        .collect()
}

/// Info-panel text, assembled the same way the reference editor fed
/// its tooltips.
fn build_info(descr: &FieldDescriptor) -> String {
    let mut out = String::new();
    if let Some(r) = &descr.reference {
        out.push_str(r);
        out.push_str("\n\n");
    }
    if !descr.name.is_empty() {
        out.push_str("NAME:\n");
        out.push_str(&descr.name);
        out.push_str("\n\n");
    }
    if let Some(d) = &descr.description {
        out.push_str("DESCRIPTION:\n");
        out.push_str(d);
        out.push_str("\n\n");
    }
    if let Some(e) = &descr.example {
        out.push_str("EXAMPLE:\n");
        out.push_str(e);
        out.push_str("\n\n");
    }
    if let Some(t) = &descr.value_type {
        out.push_str("DATA TYPE:\n");
        out.push_str(t);
        out.push_str("\n\n");
    }
    if let Some(s) = &descr.statements {
        out.push_str("STATEMENT:\n");
        out.push_str(s);
        out.push('\n');
        if let Some(s1) = &descr.statements1 {
            out.push_str(s1);
            out.push('\n');
        }
        out.push('\n');
    }
    out.push_str("PATH:\n");
    out.push_str(&descr.tag);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn descr(multiplicity: bool) -> FieldDescriptor {
        FieldDescriptor {
            name: "Title".to_string(),
            tag: "md.identification.title".to_string(),
            multiplicity,
            ..Default::default()
        }
    }

    #[test]
    fn test_affordances_follow_first_marker() {
        let first = Item::new(ItemId(1), 0, &descr(true), true, false);
        assert!(first.can_add && !first.can_remove);

        let later = Item::new(ItemId(2), 0, &descr(true), false, false);
        assert!(!later.can_add && later.can_remove);

        let single = Item::new(ItemId(3), 0, &descr(false), true, false);
        assert!(!single.can_add && !single.can_remove);
    }

    #[test]
    fn test_set_value_states() {
        let mut item = Item::new(ItemId(1), 0, &descr(false), true, false);

        item.set_value(Some("Lakes"));
        assert!(item.is_valid);
        assert_eq!(item.fill, Fill::Normal);

        item.set_value(None);
        assert!(!item.is_valid);
        assert_eq!(item.fill, Fill::Missing);
        assert_eq!(item.value, "");

        item.set_value(Some("$NULL"));
        assert_eq!(item.fill, Fill::Missing, "plain mode treats $NULL as absent");
        assert_eq!(item.value, "");
    }

    #[test]
    fn test_null_marker_flagged_in_checkbox_mode_only() {
        let mut plain = Item::new(ItemId(1), 0, &descr(false), true, false);
        plain.set_value(Some("$NULL"));
        assert_eq!(plain.fill, Fill::Missing);

        let mut boxed = Item::new(ItemId(2), 0, &descr(false), true, true);
        boxed.set_value(Some("$NULL"));
        assert_eq!(boxed.fill, Fill::NullMarked);
        assert!(boxed.is_checked && boxed.edit_enabled);
    }

    #[test]
    fn test_template_mode_auto_checks_flagged_fields() {
        let mut item = Item::new(ItemId(1), 0, &descr(false), true, true);
        assert!(!item.edit_enabled, "checkbox mode starts disabled");
        item.set_value(None);
        assert!(item.is_checked && item.edit_enabled);
    }

    #[test]
    fn test_value_never_contains_newline_or_quotes() {
        let mut item = Item::new(ItemId(1), 0, &descr(false), true, false);
        item.value = "a\nb\"c'd\re".to_string();
        let v = item.value();
        assert!(!v.contains('\n') && !v.contains('"') && !v.contains('\''));
        assert_eq!(v, "abcde");
    }

    #[test]
    fn test_value_escapes_xml_reserved() {
        assert_eq!(sanitize("a<b>&c"), "a&lt;b&gt;&amp;c");
    }

    #[test]
    fn test_validators() {
        assert!(Validator::Integer.check("123"));
        assert!(!Validator::Integer.check("12a"));
        assert!(Validator::Decimal.check("3.25"));
        assert!(!Validator::Decimal.check("3.2.5"));
        assert!(Validator::Email.check("a@b.org"));
        assert!(!Validator::Email.check("nope"));
        assert!(Validator::Date.check("2014-06-01"));
        assert!(!Validator::Date.check("01.06.2014"));
        assert!(Validator::Free.check("anything"));
        // Empty is always acceptable; absence is flagged elsewhere.
        assert!(Validator::Date.check(""));
    }
}
