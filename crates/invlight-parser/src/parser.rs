//! Rule file loading: `.ifl` discovery and whole-file parsing.

use std::path::{Path, PathBuf};

use crate::ast::Expr;
use crate::error::Result;
use crate::expr::parse_expression;

/// File extension that marks a file as a rule file.
pub const RULE_FILE_EXTENSION: &str = "ifl";

/// Parse the full text of one rule file.
///
/// A leading UTF-8 byte order mark is ignored.
pub fn parse_rule(text: &str) -> Result<Expr> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    parse_expression(text)
}

/// Read and parse a single rule file.
pub fn parse_rule_file(path: &Path) -> Result<Expr> {
    let content = std::fs::read_to_string(path)?;
    parse_rule(&content)
}

/// Whether `path` carries the rule file extension (ASCII case-insensitive).
pub fn is_rule_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(RULE_FILE_EXTENSION))
}

/// List the rule files directly inside `dir` (not recursive), sorted by file name.
pub fn rule_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && is_rule_file(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
