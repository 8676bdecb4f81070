//! Control-flow plan over the descriptor sequence
//!
//! The tab-depth-tagged tag lines are folded once into a structured
//! plan: leaves, blocks, and at most one inner block per block (the
//! nesting limit of the reference templates). Each node owns exactly
//! the descriptor indices it consumes, so the generation and export
//! visitors can never disagree about where a block begins or ends.

use crate::error::TemplateError;
use crate::metadata::path::PathExpr;

/// Collection a `for` statement iterates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForSource {
    Collection(PathExpr),
    /// Positional pairing of several collections.
    Zip(Vec<PathExpr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    For { vars: Vec<String>, source: ForSource },
    If { guard: PathExpr },
}

/// Inner block of a double-nested statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerBlock {
    pub stmt_idx: usize,
    pub stmt: Statement,
    pub leaves: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Leaf(usize),
    Inner(InnerBlock),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub stmt_idx: usize,
    pub stmt: Statement,
    pub entries: Vec<Entry>,
}

impl Block {
    /// First leaf descriptor in the body, inner blocks included.
    /// Iteration counts key off this descriptor's binding count.
    pub fn first_leaf(&self) -> Option<usize> {
        self.entries.iter().find_map(|e| match e {
            Entry::Leaf(idx) => Some(*idx),
            Entry::Inner(inner) => inner.leaves.first().copied(),
        })
    }

    /// Leaves that follow the inner block (the thesaurus tail of the
    /// keyword case).
    pub fn leaves_after_inner(&self) -> Vec<usize> {
        let mut seen_inner = false;
        let mut out = Vec::new();
        for e in &self.entries {
            match e {
                Entry::Inner(_) => seen_inner = true,
                Entry::Leaf(idx) if seen_inner => out.push(*idx),
                Entry::Leaf(_) => {}
            }
        }
        out
    }

    pub fn inner(&self) -> Option<&InnerBlock> {
        self.entries.iter().find_map(|e| match e {
            Entry::Inner(inner) => Some(inner),
            Entry::Leaf(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanNode {
    Leaf(usize),
    Block(Block),
}

/// Parse one statement text (tabs already stripped).
pub fn parse_statement(text: &str) -> Result<Statement, String> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("for ") {
        let (vars_part, source_part) = rest
            .split_once(" in ")
            .ok_or_else(|| format!("'for' without 'in': {text}"))?;
        let vars: Vec<String> = vars_part
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if vars.is_empty() {
            return Err(format!("'for' without loop variables: {text}"));
        }
        let source_part = source_part.trim();
        let source = if let Some(inner) = source_part
            .strip_prefix("zip(")
            .and_then(|s| s.strip_suffix(')'))
        {
            let targets: Result<Vec<PathExpr>, String> = inner
                .split(',')
                .map(|p| {
                    PathExpr::parse(p).ok_or_else(|| format!("bad zip member '{}'", p.trim()))
                })
                .collect();
            let targets = targets?;
            if targets.len() != vars.len() {
                return Err(format!(
                    "zip arity mismatch: {} variables, {} collections",
                    vars.len(),
                    targets.len()
                ));
            }
            ForSource::Zip(targets)
        } else {
            ForSource::Collection(
                PathExpr::parse(source_part)
                    .ok_or_else(|| format!("bad loop source '{source_part}'"))?,
            )
        };
        return Ok(Statement::For { vars, source });
    }
    if let Some(rest) = text.strip_prefix("if ") {
        let guard =
            PathExpr::parse(rest).ok_or_else(|| format!("bad condition '{}'", rest.trim()))?;
        return Ok(Statement::If { guard });
    }
    Err(format!("not a statement: {text}"))
}

fn depth_of(line: &str) -> usize {
    line.bytes().take_while(|b| *b == b'\t').count()
}

fn is_statement_text(text: &str) -> bool {
    text.starts_with("for ") || text.starts_with("if ")
}

/// Fold the tag-line sequence into the plan.
pub fn build(tag_lines: &[String]) -> Result<Vec<PlanNode>, TemplateError> {
    let mut nodes = Vec::new();
    let mut i = 0;
    let syntax = |i: usize, message: String| TemplateError::Syntax {
        line: i + 1,
        message,
    };

    while i < tag_lines.len() {
        let line = &tag_lines[i];
        let depth = depth_of(line);
        let text = line.trim_start_matches('\t');

        if depth > 0 {
            return Err(syntax(i, "nested line outside any statement".to_string()));
        }

        if !is_statement_text(text) {
            nodes.push(PlanNode::Leaf(i));
            i += 1;
            continue;
        }

        let stmt = parse_statement(text).map_err(|m| syntax(i, m))?;
        let stmt_idx = i;
        i += 1;
        let mut entries = Vec::new();

        while i < tag_lines.len() && depth_of(&tag_lines[i]) >= 1 {
            let d = depth_of(&tag_lines[i]);
            let t = tag_lines[i].trim_start_matches('\t');
            if d == 1 && is_statement_text(t) {
                let inner_stmt = parse_statement(t).map_err(|m| syntax(i, m))?;
                let inner_idx = i;
                i += 1;
                let mut leaves = Vec::new();
                while i < tag_lines.len() && depth_of(&tag_lines[i]) >= 2 {
                    leaves.push(i);
                    i += 1;
                }
                entries.push(Entry::Inner(InnerBlock {
                    stmt_idx: inner_idx,
                    stmt: inner_stmt,
                    leaves,
                }));
            } else if d == 1 {
                entries.push(Entry::Leaf(i));
                i += 1;
            } else {
                return Err(syntax(i, "depth-two line without an inner statement".to_string()));
            }
        }

        nodes.push(PlanNode::Block(Block {
            stmt_idx,
            stmt,
            entries,
        }));
    }

    Ok(nodes)
}
