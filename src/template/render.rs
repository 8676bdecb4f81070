//! Template renderer: metadata tree -> output document
//!
//! Replays the template's own control flow against the tree and
//! substitutes value expressions. `owsTagList[i]` expressions are
//! positional literal overrides: the template-definition mode uses
//! them to pass unchecked fragments through the render untouched.
//! Only the dialect subset the descriptors use is interpreted; this
//! is deliberately not a general template engine.

use crate::metadata::path::{PathExpr, Scope};
use crate::metadata::MetaValue;
use crate::template::plan::{parse_statement, ForSource, Statement};

enum RenderNode {
    Line(String),
    Block {
        stmt: Statement,
        body: Vec<RenderNode>,
    },
}

/// Render template text against a metadata tree, with an optional
/// positional override list.
pub fn render(
    source: &str,
    md: &MetaValue,
    overrides: Option<&[String]>,
) -> Result<String, String> {
    let nodes = parse_nodes(source)?;
    let mut out = String::new();
    let scope = Scope::new(md);
    render_nodes(&nodes, &scope, overrides, &mut out)?;
    Ok(out)
}

fn parse_nodes(source: &str) -> Result<Vec<RenderNode>, String> {
    let mut stack: Vec<(Statement, Vec<RenderNode>)> = Vec::new();
    let mut top: Vec<RenderNode> = Vec::new();

    for line in source.lines() {
        if let Some(inner) = between(line, "{%", "%}") {
            let text = inner.trim_matches('-').trim();
            let keyword = text.split_whitespace().next().unwrap_or_default();
            match keyword {
                "for" | "if" => {
                    let stmt = parse_statement(text)?;
                    stack.push((stmt, Vec::new()));
                }
                "endfor" | "endif" => {
                    let (stmt, body) = stack
                        .pop()
                        .ok_or_else(|| format!("'{keyword}' without open statement"))?;
                    let node = RenderNode::Block { stmt, body };
                    match stack.last_mut() {
                        Some((_, parent)) => parent.push(node),
                        None => top.push(node),
                    }
                }
                other => return Err(format!("unknown statement '{other}'")),
            }
            continue;
        }
        let node = RenderNode::Line(strip_comments(line));
        match stack.last_mut() {
            Some((_, body)) => body.push(node),
            None => top.push(node),
        }
    }

    if !stack.is_empty() {
        return Err(format!("{} statement(s) left open", stack.len()));
    }
    Ok(top)
}

fn render_nodes(
    nodes: &[RenderNode],
    scope: &Scope,
    overrides: Option<&[String]>,
    out: &mut String,
) -> Result<(), String> {
    for node in nodes {
        match node {
            RenderNode::Line(line) => {
                out.push_str(&substitute(line, scope, overrides)?);
                out.push('\n');
            }
            RenderNode::Block { stmt, body } => match stmt {
                Statement::If { guard } => {
                    if scope.eval(guard).is_some_and(|v| v.is_truthy()) {
                        render_nodes(body, scope, overrides, out)?;
                    }
                }
                Statement::For {
                    vars,
                    source: ForSource::Collection(path),
                } => {
                    let Some(collection) = scope.eval(path) else {
                        continue;
                    };
                    for element in collection.iter_elements() {
                        let mut inner = scope.clone();
                        inner.bind(vars[0].clone(), element.clone());
                        render_nodes(body, &inner, overrides, out)?;
                    }
                }
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
                    for i in 0..n {
                        let mut inner = scope.clone();
                        for (var, list) in vars.iter().zip(&lists) {
                            inner.bind(var.clone(), list[i].clone());
                        }
                        render_nodes(body, &inner, overrides, out)?;
                    }
                }
            },
        }
    }
    Ok(())
}

/// Replace every `{{ expr }}` in a line.
fn substitute(line: &str, scope: &Scope, overrides: Option<&[String]>) -> Result<String, String> {
    let mut out = String::new();
    let mut rest = line;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| format!("unterminated expression in line '{line}'"))?;
        let expr = after[..end].trim();
        out.push_str(&eval_expr(expr, scope, overrides)?);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn eval_expr(expr: &str, scope: &Scope, overrides: Option<&[String]>) -> Result<String, String> {
    if let Some(idx) = expr
        .strip_prefix("owsTagList[")
        .and_then(|s| s.strip_suffix(']'))
    {
        let idx: usize = idx
            .trim()
            .parse()
            .map_err(|_| format!("bad override index '{expr}'"))?;
        let overrides = overrides.ok_or_else(|| "no override list bound".to_string())?;
        return overrides
            .get(idx)
            .cloned()
            .ok_or_else(|| format!("override index {idx} out of range"));
    }
    let path = PathExpr::parse(expr).ok_or_else(|| format!("bad expression '{expr}'"))?;
    Ok(scope.eval(&path).map(|v| v.display()).unwrap_or_default())
}

/// Drop `{# ... #}` annotation comments from an emitted line.
fn strip_comments(line: &str) -> String {
    let mut out = String::new();
    let mut rest = line;
    while let Some(start) = rest.find("{#") {
        out.push_str(&rest[..start]);
        match rest[start..].find("#}") {
            Some(end) => rest = &rest[start + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

fn between(line: &str, open: &str, close: &str) -> Option<String> {
    let start = line.find(open)? + open.len();
    let end = line[start..].find(close)? + start;
    Some(line[start..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn segs(path: &str) -> Vec<String> {
        path.split('.').map(str::to_string).collect()
    }

    #[test]
    fn test_scalar_substitution_and_comment_stripping() {
        let mut md = MetaValue::empty_object();
        md.set_path(&segs("identification.title"), MetaValue::scalar("Lakes"));
        let out = render(
            "<t>{{ md.identification.title }}</t>{# name=Title #}\n",
            &md,
            None,
        )
        .unwrap();
        assert_eq!(out, "<t>Lakes</t>\n");
    }

    #[test]
    fn test_absent_value_renders_empty() {
        let md = MetaValue::empty_object();
        let out = render("<t>{{ md.missing }}</t>\n", &md, None).unwrap();
        assert_eq!(out, "<t></t>\n");
    }

    #[test]
    fn test_for_loop_replays_collection() {
        let mut md = MetaValue::empty_object();
        md.append_path(&segs("contact"), MetaValue::scalar("A"));
        md.append_path(&segs("contact"), MetaValue::scalar("B"));
        let out = render(
            "{% for c in md.contact %}\n<c>{{ c }}</c>\n{% endfor %}\n",
            &md,
            None,
        )
        .unwrap();
        assert_eq!(out, "<c>A</c>\n<c>B</c>\n");
    }

    #[test]
    fn test_for_over_absent_collection_renders_nothing() {
        let md = MetaValue::empty_object();
        let out = render(
            "{% for c in md.contact %}\n<c>{{ c }}</c>\n{% endfor %}\n",
            &md,
            None,
        )
        .unwrap();
        assert_eq!(out, "");
    }

    #[test]
    fn test_if_guard() {
        let mut md = MetaValue::empty_object();
        md.set_path(&segs("identification.title"), MetaValue::scalar("x"));
        let tpl = "{% if md.identification %}\n<y/>\n{% endif %}\n{% if md.nothing %}\n<n/>\n{% endif %}\n";
        let out = render(tpl, &md, None).unwrap();
        assert_eq!(out, "<y/>\n");
    }

    #[test]
    fn test_zip_pairs_positionally() {
        let mut md = MetaValue::empty_object();
        for v in ["a", "b"] {
            md.append_path(&segs("start"), MetaValue::scalar(v));
        }
        for v in ["1", "2"] {
            md.append_path(&segs("end"), MetaValue::scalar(v));
        }
        let out = render(
            "{% for s, e in zip(md.start, md.end) %}\n<p>{{ s }}-{{ e }}</p>\n{% endfor %}\n",
            &md,
            None,
        )
        .unwrap();
        assert_eq!(out, "<p>a-1</p>\n<p>b-2</p>\n");
    }

    #[test]
    fn test_override_passthrough_is_literal() {
        let md = MetaValue::empty_object();
        let overrides = vec!["{{ md.identification.title }}".to_string()];
        let out = render("<t>{{ owsTagList[0] }}</t>\n", &md, Some(&overrides)).unwrap();
        assert_eq!(out, "<t>{{ md.identification.title }}</t>\n");
    }

    #[test]
    fn test_override_out_of_range_is_error() {
        let md = MetaValue::empty_object();
        assert!(render("{{ owsTagList[3] }}\n", &md, Some(&[])).is_err());
    }
}
