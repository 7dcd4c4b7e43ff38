//! Chunkgraph: structural chunking and code knowledge graphs for Python repositories
//!
//! Source files are parsed with tree-sitter, lowered into a small
//! declaration tree, and cut into chunks by one of four strategies. The
//! `graph` strategy also records calls, inheritance, containment and
//! imports between named entities in an embedded SQLite graph.
//!
//! # Position Conventions
//!
//! - **Line positions**: 1-indexed, inclusive on both ends
//! - A declaration's span starts at its `def`/`class` line; decorator
//!   lines are not part of the chunk text
//!
//! # Pipeline
//!
//! ```text
//! SourceDocument → ingest::parse_source → SyntaxTree
//!                → entities::extract / relations::RelationExtractor
//!                → ChunkingStrategy::split → Vec<Chunk>
//!                → VectorStore (external) | CodeKnowledgeGraph::add_entities
//! ```
//!
//! # Example
//!
//! ```rust
//! use chunkgraph::{ChunkFactory, ChunkingStrategy, SourceDocument};
//!
//! let docs = vec![SourceDocument::new("m.py", "def f():\n    return 1\n")];
//! let chunker = ChunkFactory::create("function").unwrap();
//! let chunks = chunker.split(&docs);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].text, "def f():\n    return 1");
//! ```

pub mod chunking;
pub mod common;
pub mod config;
pub mod entities;
pub mod error_codes;
pub mod graph;
pub mod ingest;
pub mod relations;
pub mod retrieval;

pub use chunking::{
    collection_name, Chunk, ChunkFactory, ChunkKind, Chunker, ChunkingStrategy,
    UnknownStrategyError,
};
pub use config::{ConfigError, IndexConfig};
pub use entities::{ClassEntity, FunctionEntity};
pub use graph::{
    CodeKnowledgeGraph, FileWriteFailure, GraphNode, GraphStoreError, GraphWriteReport,
};
pub use ingest::{ParseError, PythonParser, RenderError, SourceDocument};
pub use relations::{Relation, RelationKind};
pub use retrieval::{IndexReport, RetrievalPipeline, SearchOptions, VectorStore};
