//! Error taxonomy for metadata load/save and template handling

use std::path::PathBuf;
use thiserror::Error;

/// Source document could not be read or parsed.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read metadata file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed XML in {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Template read, render, or output write failed.
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("cannot read template {path}: {source}")]
    TemplateRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("template rendering failed: {0}")]
    Render(String),
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Template text could not be turned into a descriptor sequence or plan.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("cannot read template {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("unbalanced control flow: {0}")]
    Unbalanced(String),
}
