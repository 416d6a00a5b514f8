use std::io;
use thiserror::Error;

use crate::diagnostics::NodePath;

#[derive(Debug, Error)]
pub enum Adl2GestaltError {
    #[error("Syntax error on line {line}: expected {expected}, found {found}")]
    Syntax {
        line: usize,
        expected: String,
        found: String,
    },

    #[error("Structure error on line {line}: {reason}")]
    Structure { line: usize, reason: String },

    #[error("Bad value for field '{field}' on line {line}: {value:?} is not {expected}")]
    Value {
        line: usize,
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("Color index {index} on line {line} is outside the color table (0..{available})")]
    ColorIndex {
        line: usize,
        index: i64,
        available: usize,
    },

    #[error("Widget {path} is missing mandatory attribute '{field}'")]
    AttributeMapping { path: NodePath, field: &'static str },

    #[error("IO Error: {0}")]
    IO(#[from] io::Error),
}

impl Adl2GestaltError {
    pub(crate) fn syntax(
        line: usize,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Adl2GestaltError::Syntax {
            line,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn structure(line: usize, reason: impl Into<String>) -> Self {
        Adl2GestaltError::Structure {
            line,
            reason: reason.into(),
        }
    }
}
