//! Dotted-path expressions and their evaluation scope
//!
//! Template expressions are dotted attribute chains rooted either at
//! the document (`md.identification.title`) or at a loop variable
//! (`c.organization`, bare `k`). Evaluation resolves them dynamically
//! against the live tree, so an absent branch is an absent value, not
//! an error.

use crate::metadata::MetaValue;

/// The document root name every absolute expression starts with.
pub const DOC_ROOT: &str = "md";

/// A parsed dotted chain: `root.seg1.seg2...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    pub root: String,
    pub segments: Vec<String>,
}

impl PathExpr {
    /// Parse a dotted chain. A trailing `|length` filter is accepted
    /// and dropped: presence of the collection is what the engines
    /// test for.
    pub fn parse(expr: &str) -> Option<Self> {
        let expr = expr.trim().trim_end_matches("|length").trim();
        if expr.is_empty() {
            return None;
        }
        let mut parts = expr.split('.').map(str::trim);
        let root = parts.next()?.to_string();
        if root.is_empty() || !is_ident(&root) {
            return None;
        }
        let mut segments = Vec::new();
        for p in parts {
            if p.is_empty() || !is_ident(p) {
                return None;
            }
            segments.push(p.to_string());
        }
        Some(Self { root, segments })
    }

    /// Whether the chain is rooted at the document.
    pub fn is_absolute(&self) -> bool {
        self.root == DOC_ROOT
    }

    /// The path below the root, e.g. the assignment target on a
    /// freshly constructed sub-object.
    pub fn tail(&self) -> &[String] {
        &self.segments
    }
}

impl std::fmt::Display for PathExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.root)?;
        for seg in &self.segments {
            write!(f, ".{seg}")?;
        }
        Ok(())
    }
}

fn is_ident(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Evaluation scope: the document root plus loop-variable bindings.
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    root: &'a MetaValue,
    vars: Vec<(String, MetaValue)>,
}

impl<'a> Scope<'a> {
    pub fn new(root: &'a MetaValue) -> Self {
        Self {
            root,
            vars: Vec::new(),
        }
    }

    /// Bind a loop variable; later bindings shadow earlier ones.
    pub fn bind(&mut self, name: impl Into<String>, value: MetaValue) {
        self.vars.push((name.into(), value));
    }

    /// Resolve an expression to a cloned value, or `None` when any
    /// part of the chain is absent.
    pub fn eval(&self, expr: &PathExpr) -> Option<MetaValue> {
        let base: &MetaValue = if expr.is_absolute() {
            self.root
        } else {
            let (_, v) = self
                .vars
                .iter()
                .rev()
                .find(|(name, _)| *name == expr.root)?;
            v
        };
        base.get_path(&expr.segments).cloned()
    }
}
