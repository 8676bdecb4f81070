//! Template scanner: annotated XML template -> descriptor sequence
//!
//! Recognized lines:
//!   `... {{ md.identification.title }} ... {# name=Title, group=... #}`
//!   `{% for c in md.contact %}{# group=Contact, inbox=Contact %#...}`
//!   `{% if md.identification %}` / `{% endfor %}` / `{% endif %}`
//!
//! Every `for`/`if` opener and every annotated value expression
//! yields one descriptor; `endfor`/`endif` only close nesting. The
//! produced tag line carries one leading tab per open statement, the
//! depth encoding both engines interpret.

use std::path::Path;

use crate::error::TemplateError;
use crate::template::{FieldDescriptor, ParsedTemplate};

/// Parse a template file.
pub fn parse_file(path: &Path) -> Result<ParsedTemplate, TemplateError> {
    let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut parsed = parse_str(&source)?;
    parsed.path = path.to_path_buf();
    Ok(parsed)
}

/// Parse template text.
pub fn parse_str(source: &str) -> Result<ParsedTemplate, TemplateError> {
    let mut descriptors: Vec<FieldDescriptor> = Vec::new();
    let mut tag_lines: Vec<String> = Vec::new();
    let mut explicit_group: Vec<bool> = Vec::new();
    let mut depth: usize = 0;
    let mut openers: Vec<&'static str> = Vec::new();

    for (lineno, line) in source.lines().enumerate() {
        let lineno = lineno + 1;

        if let Some(stmt) = extract_between(line, "{%", "%}") {
            let text = stmt.trim_matches('-').trim().to_string();
            let keyword = text.split_whitespace().next().unwrap_or_default();
            match keyword {
                "for" | "if" => {
                    let fragment = fragment_of(line, "{%", "%}");
                    let annotation = extract_between(line, "{#", "#}");
                    let mut descr = FieldDescriptor {
                        name: keyword.to_string(),
                        tag: text.clone(),
                        is_statement: true,
                        raw_fragment: fragment,
                        ..Default::default()
                    };
                    apply_annotation(&mut descr, annotation.as_deref(), lineno)?;
                    explicit_group.push(!descr.group.is_empty());
                    tag_lines.push(format!("{}{}", "\t".repeat(depth), text));
                    descriptors.push(descr);
                    depth += 1;
                    openers.push(if keyword == "for" { "for" } else { "if" });
                }
                "endfor" | "endif" => {
                    let expected = if keyword == "endfor" { "for" } else { "if" };
                    match openers.pop() {
                        Some(open) if open == expected => depth -= 1,
                        Some(open) => {
                            return Err(TemplateError::Syntax {
                                line: lineno,
                                message: format!("{keyword} closes an open {open}"),
                            })
                        }
                        None => {
                            return Err(TemplateError::Syntax {
                                line: lineno,
                                message: format!("{keyword} without an open statement"),
                            })
                        }
                    }
                }
                other => {
                    return Err(TemplateError::Syntax {
                        line: lineno,
                        message: format!("unknown statement '{other}'"),
                    })
                }
            }
            continue;
        }

        // Value line: an expression only counts with an annotation,
        // anything else is literal XML passed through by the renderer.
        if line.contains("{{") {
            let Some(annotation) = extract_between(line, "{#", "#}") else {
                continue;
            };
            let Some(expr) = extract_between(line, "{{", "}}") else {
                return Err(TemplateError::Syntax {
                    line: lineno,
                    message: "unterminated expression".to_string(),
                });
            };
            let expr = expr.trim().to_string();
            let mut descr = FieldDescriptor {
                name: expr
                    .rsplit('.')
                    .next()
                    .unwrap_or(expr.as_str())
                    .to_string(),
                tag: expr,
                raw_fragment: fragment_of(line, "{{", "}}"),
                ..Default::default()
            };
            apply_annotation(&mut descr, Some(&annotation), lineno)?;
            explicit_group.push(!descr.group.is_empty());
            tag_lines.push(format!("{}{}", "\t".repeat(depth), descr.tag));
            descriptors.push(descr);
        }
    }

    if !openers.is_empty() {
        return Err(TemplateError::Unbalanced(format!(
            "{} statement(s) left open",
            openers.len()
        )));
    }

    fill_groups(&mut descriptors, &explicit_group);

    Ok(ParsedTemplate {
        path: Default::default(),
        source: source.to_string(),
        descriptors,
        tag_lines,
    })
}

/// Inherit missing group labels: forward from the previous
/// descriptor, then statements take the group of their first leaf so
/// a block opening a new page lands on the right tab.
fn fill_groups(descriptors: &mut [FieldDescriptor], explicit: &[bool]) {
    let mut current = String::from("General");
    for (i, d) in descriptors.iter_mut().enumerate() {
        if explicit[i] {
            current = d.group.clone();
        } else {
            d.group = current.clone();
        }
    }
    // Backfill statements from their first leaf (reverse order lets
    // a statement chain pick the group up through inner statements).
    for i in (0..descriptors.len().saturating_sub(1)).rev() {
        if descriptors[i].is_statement && !explicit[i] {
            descriptors[i].group = descriptors[i + 1].group.clone();
        }
    }
}

fn extract_between(line: &str, open: &str, close: &str) -> Option<String> {
    let start = line.find(open)? + open.len();
    let end = line[start..].find(close)? + start;
    Some(line[start..end].to_string())
}

/// The literal fragment including its delimiters, e.g.
/// `{{ md.identification.title }}`.
fn fragment_of(line: &str, open: &str, close: &str) -> String {
    let start = line.find(open).unwrap_or(0);
    let end = line[start..]
        .find(close)
        .map(|i| start + i + close.len())
        .unwrap_or(line.len());
    line[start..end].to_string()
}

fn apply_annotation(
    descr: &mut FieldDescriptor,
    annotation: Option<&str>,
    lineno: usize,
) -> Result<(), TemplateError> {
    let Some(annotation) = annotation else {
        return Ok(());
    };
    for pair in annotation.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let Some((key, value)) = pair.split_once('=') else {
            return Err(TemplateError::Syntax {
                line: lineno,
                message: format!("annotation entry '{pair}' is not key=value"),
            });
        };
        let key = key.trim();
        let value = value.trim();
        match key {
            "name" => descr.name = value.to_string(),
            "group" => descr.group = value.to_string(),
            "ref" => descr.reference = Some(value.to_string()),
            "description" => descr.description = Some(value.to_string()),
            "example" => descr.example = Some(value.to_string()),
            "type" => descr.value_type = Some(value.to_string()),
            "object" => descr.object_ctor = Some(value.to_string()),
            "inbox" => descr.inbox = Some(value.to_string()),
            "multiline" => descr.multiline = truthy(value),
            "multiplicity" => descr.multiplicity = truthy(value),
            "inboxmulti" => descr.inbox_multi = truthy(value),
            other => {
                return Err(TemplateError::Syntax {
                    line: lineno,
                    message: format!("unknown annotation key '{other}'"),
                })
            }
        }
    }
    Ok(())
}

fn truthy(value: &str) -> bool {
    matches!(value, "yes" | "true" | "1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SIMPLE: &str = "\
<metadata>
  <title>{{ md.identification.title }}</title>{# name=Resource title, group=Identification, ref=Part B 1.1 #}
  <abstract>{{ md.identification.abstract }}</abstract>{# name=Abstract, group=Identification, multiline=yes #}
{% for c in md.contact %}{# group=Contact, inbox=Contact, object=ResponsibleParty, inboxmulti=yes #}
  <org>{{ c.organization }}</org>{# name=Organization #}
  <mail>{{ c.email }}</mail>{# name=E-mail, multiplicity=yes #}
{% endfor %}
</metadata>
";

    #[test]
    fn test_descriptor_sequence_and_depth() {
        let parsed = parse_str(SIMPLE).unwrap();
        assert_eq!(parsed.descriptors.len(), 5);
        assert_eq!(
            parsed.tag_lines,
            vec![
                "md.identification.title",
                "md.identification.abstract",
                "for c in md.contact",
                "\tc.organization",
                "\tc.email",
            ]
        );
    }

    #[test]
    fn test_annotation_fields() {
        let parsed = parse_str(SIMPLE).unwrap();
        let title = &parsed.descriptors[0];
        assert_eq!(title.name, "Resource title");
        assert_eq!(title.group, "Identification");
        assert_eq!(title.reference.as_deref(), Some("Part B 1.1"));
        assert!(!title.is_statement);

        let stmt = &parsed.descriptors[2];
        assert!(stmt.is_statement);
        assert_eq!(stmt.inbox.as_deref(), Some("Contact"));
        assert_eq!(stmt.object_ctor.as_deref(), Some("ResponsibleParty"));
        assert!(stmt.inbox_multi);

        let mail = &parsed.descriptors[4];
        assert!(mail.multiplicity);
        assert_eq!(mail.group, "Contact", "group inherited inside block");
    }

    #[test]
    fn test_raw_fragments_kept_verbatim() {
        let parsed = parse_str(SIMPLE).unwrap();
        assert_eq!(
            parsed.descriptors[0].raw_fragment,
            "{{ md.identification.title }}"
        );
        assert_eq!(parsed.descriptors[2].raw_fragment, "{% for c in md.contact %}");
    }

    #[test]
    fn test_unbalanced_statement_is_error() {
        let err = parse_str("{% for c in md.contact %}\n").unwrap_err();
        assert!(matches!(err, TemplateError::Unbalanced(_)));
    }

    #[test]
    fn test_mismatched_close_is_error() {
        let err = parse_str("{% for c in md.contact %}\n{% endif %}\n").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax { .. }));
    }

    #[test]
    fn test_unannotated_expression_is_passthrough() {
        let parsed = parse_str("<x>{{ owsTagList[0] }}</x>\n").unwrap();
        assert!(parsed.descriptors.is_empty());
    }

    #[test]
    fn test_nested_depth_two() {
        let text = "\
{% for kw in md.identification.keywords %}{# group=Keywords #}
{% for k in kw.keywords %}
  <kw>{{ k }}</kw>{# name=Keyword, multiplicity=yes #}
{% endfor %}
  <t>{{ kw.thesaurus.title }}</t>{# name=Thesaurus title #}
{% endfor %}
";
        let parsed = parse_str(text).unwrap();
        assert_eq!(
            parsed.tag_lines,
            vec![
                "for kw in md.identification.keywords",
                "\tfor k in kw.keywords",
                "\t\tk",
                "\tkw.thesaurus.title",
            ]
        );
    }

    #[test]
    fn test_statement_group_backfilled_from_leaf() {
        let text = "\
{% if md.identification %}
  <d>{{ md.identification.denominator }}</d>{# name=Scale, group=Quality #}
{% endif %}
";
        let parsed = parse_str(text).unwrap();
        assert_eq!(parsed.descriptors[0].group, "Quality");
    }
}
