use thiserror::Error;

use crate::ast::Position;

/// Errors that can occur while parsing filter expression text.
#[derive(Debug, Error)]
pub enum IflParserError {
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("invalid number literal '{literal}' at line {line}, column {column}")]
    InvalidNumber {
        literal: String,
        line: usize,
        column: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IflParserError {
    /// Source position of the error, if it has one.
    pub fn position(&self) -> Option<Position> {
        match self {
            IflParserError::Syntax { line, column, .. }
            | IflParserError::InvalidNumber { line, column, .. } => {
                Some(Position::new(*line, *column))
            }
            IflParserError::Io(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, IflParserError>;
