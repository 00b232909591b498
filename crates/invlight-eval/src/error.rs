//! Evaluation-specific error types.

use std::path::PathBuf;

use invlight_parser::{IflParserError, Position};
use thiserror::Error;

use crate::schema::AttrKind;

/// Errors that can occur during rule compilation, item construction, or
/// rule set loading.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The rule text is not well-formed.
    #[error("parse error: {0}")]
    Parser(#[from] IflParserError),

    /// The rule references an attribute that is not in the registry.
    #[error(
        "unknown attribute '{name}' at line {line}, column {column}{}",
        did_you_mean(.suggestion)
    )]
    UnknownAttribute {
        name: String,
        line: usize,
        column: usize,
        suggestion: Option<&'static str>,
    },

    /// A literal's type does not fit the attribute it is compared with.
    #[error(
        "attribute '{attribute}' expects {kind} value, found {found} literal at line {line}, column {column}"
    )]
    TypeMismatch {
        attribute: String,
        kind: AttrKind,
        found: &'static str,
        line: usize,
        column: usize,
    },

    /// The operator is not defined for the attribute's kind.
    #[error(
        "operator '{op}' cannot be applied to '{attribute}' ({kind}) at line {line}, column {column}"
    )]
    UnsupportedOperator {
        op: String,
        attribute: String,
        kind: AttrKind,
        line: usize,
        column: usize,
    },

    /// A rarity literal that names no rarity.
    #[error(
        "unknown rarity \"{value}\" at line {line}, column {column} (expected Normal, Magic, Rare or Unique)"
    )]
    UnknownRarity {
        value: String,
        line: usize,
        column: usize,
    },

    /// A `matches` pattern failed to compile.
    #[error("invalid regex \"{pattern}\" at line {line}, column {column}: {source}")]
    InvalidRegex {
        pattern: String,
        line: usize,
        column: usize,
        #[source]
        source: regex::Error,
    },

    /// An item record could not be built.
    #[error("invalid item record: {0}")]
    InvalidItem(String),

    /// The rule directory could not be listed.
    #[error("cannot list rule directory {}: {source}", .path.display())]
    RuleDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A rule set command referenced an entry that does not exist.
    #[error("rule entry index {index} out of range (have {len} entries)")]
    InvalidEntryIndex { index: usize, len: usize },

    /// Settings could not be (de)serialized.
    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EvalError {
    /// Source position in the rule text, for compile errors.
    pub fn position(&self) -> Option<Position> {
        match self {
            EvalError::Parser(e) => e.position(),
            EvalError::UnknownAttribute { line, column, .. }
            | EvalError::TypeMismatch { line, column, .. }
            | EvalError::UnsupportedOperator { line, column, .. }
            | EvalError::UnknownRarity { line, column, .. }
            | EvalError::InvalidRegex { line, column, .. } => Some(Position::new(*line, *column)),
            _ => None,
        }
    }
}

fn did_you_mean(suggestion: &Option<&'static str>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{name}'?)"),
        None => String::new(),
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, EvalError>;
