//! Strategy registry keyed by name.

use super::{
    Chunker, ContextEnrichedChunker, FunctionChunker, GraphRelationalChunker, StructuralAstChunker,
};
use crate::error_codes;

/// Registered strategy names, in registry order.
const STRATEGIES: [&str; 4] = ["function", "ast", "context", "graph"];

/// Requested strategy name is not registered.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("unknown chunking strategy: {name}. Available: {available}")]
pub struct UnknownStrategyError {
    pub name: String,
    pub available: String,
}

impl UnknownStrategyError {
    pub fn code(&self) -> &'static str {
        error_codes::CKG_STRAT_001_UNKNOWN
    }
}

/// Strategy lookup.
pub struct ChunkFactory;

impl ChunkFactory {
    /// Exact, case-sensitive lookup. Never falls back to a default.
    pub fn create(name: &str) -> Result<Chunker, UnknownStrategyError> {
        match name {
            "function" => Ok(Chunker::Function(FunctionChunker)),
            "ast" => Ok(Chunker::StructuralAst(StructuralAstChunker)),
            "context" => Ok(Chunker::ContextEnriched(ContextEnrichedChunker)),
            "graph" => Ok(Chunker::GraphRelational(GraphRelationalChunker)),
            _ => Err(UnknownStrategyError {
                name: name.to_string(),
                available: STRATEGIES.join(", "),
            }),
        }
    }

    pub fn available() -> &'static [&'static str] {
        &STRATEGIES
    }
}
