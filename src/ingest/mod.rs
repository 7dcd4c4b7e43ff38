pub mod loader;
pub mod pool;
pub mod python;
pub mod render;
pub mod syntax;

pub use python::{parse_source, PythonParser};
pub use render::RenderError;
pub use syntax::{LineSpan, SyntaxNode, SyntaxTree};

use crate::error_codes;
use serde::{Deserialize, Serialize};

/// One source file handed to the chunkers.
///
/// Produced by a loader (see [`loader::load_python_files`]) or by the
/// caller directly; the chunking layer never touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Path used as the chunk `source` and in chunk ids
    pub path: String,
    /// Raw file text
    pub text: String,
}

impl SourceDocument {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// Source text could not be turned into a syntax tree.
///
/// Failure is all-or-nothing per file; strategies decide how to degrade.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("syntax error at line {line}")]
    Syntax { line: usize },

    #[error("failed to load Python grammar: {0}")]
    Language(String),

    #[error("parser produced no tree")]
    NoTree,

    #[error("nesting deeper than {limit} levels at line {line}")]
    TooDeep { line: usize, limit: usize },
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::Syntax { .. } => error_codes::CKG_PARSE_001_SYNTAX,
            ParseError::Language(_) => error_codes::CKG_PARSE_002_LANGUAGE,
            ParseError::NoTree => error_codes::CKG_PARSE_003_NO_TREE,
            ParseError::TooDeep { .. } => error_codes::CKG_PARSE_004_TOO_DEEP,
        }
    }
}
