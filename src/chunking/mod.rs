//! Chunking strategies
//!
//! A strategy turns source documents into [`Chunk`]s: text for embedding
//! plus a metadata mapping. The set of strategies is closed; callers pick
//! one by name through [`ChunkFactory`].
//!
//! # Strategies
//!
//! | Name | Units | Text | Parse failure |
//! |------|-------|------|---------------|
//! | `function` | top-level defs and classes | verbatim | whole file as one chunk |
//! | `ast` | top-level classes, every def | enriched header + verbatim | no chunks |
//! | `context` | as `ast`, sorted by line, linked | enriched header + verbatim | no chunks |
//! | `graph` | top-level classes and defs | verbatim, relations in metadata | no chunks |

pub mod collection;
pub mod context;
pub mod factory;
pub mod function;
pub mod graph;
pub mod structural;

pub use collection::collection_name;
pub use context::ContextEnrichedChunker;
pub use factory::{ChunkFactory, UnknownStrategyError};
pub use function::FunctionChunker;
pub use graph::GraphRelationalChunker;
pub use structural::StructuralAstChunker;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ingest::syntax::LineSpan;
use crate::ingest::SourceDocument;

/// Kind of declaration a chunk was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Function,
    Class,
}

impl ChunkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkKind::Function => "function",
            ChunkKind::Class => "class",
        }
    }
}

/// Unit of text prepared for embedding.
///
/// `text` ends with the verbatim source lines `span.start_line..=span.end_line`;
/// enriching strategies only prepend to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_path: String,
    /// `None` only for the whole-file fallback
    pub kind: Option<ChunkKind>,
    /// `None` only for the whole-file fallback
    pub span: Option<LineSpan>,
    pub name: Option<String>,
    /// Strategy-specific fields
    pub extra: Map<String, Value>,
}

impl Chunk {
    /// Chunk cut from a declaration.
    pub fn declaration(
        doc: &SourceDocument,
        kind: ChunkKind,
        name: &str,
        span: LineSpan,
        text: String,
    ) -> Self {
        Self {
            text,
            source_path: doc.path.clone(),
            kind: Some(kind),
            span: Some(span),
            name: Some(name.to_string()),
            extra: Map::new(),
        }
    }

    /// The entire file as one chunk, carrying only its source path.
    pub fn whole_file(doc: &SourceDocument) -> Self {
        Self {
            text: doc.text.clone(),
            source_path: doc.path.clone(),
            kind: None,
            span: None,
            name: None,
            extra: Map::new(),
        }
    }

    pub fn start_line(&self) -> Option<usize> {
        self.span.map(|s| s.start_line)
    }

    pub fn end_line(&self) -> Option<usize> {
        self.span.map(|s| s.end_line)
    }

    /// String-valued extra field.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// List-of-strings extra field; missing or mistyped fields read as empty.
    pub fn extra_strings(&self, key: &str) -> Vec<String> {
        match self.extra.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Flat metadata mapping handed to the vector layer.
    pub fn metadata(&self) -> Map<String, Value> {
        let mut meta = Map::new();
        meta.insert("source".into(), Value::from(self.source_path.clone()));
        if let Some(kind) = self.kind {
            meta.insert("chunk_type".into(), Value::from(kind.as_str()));
        }
        if let Some(span) = self.span {
            meta.insert("start_line".into(), Value::from(span.start_line));
            meta.insert("end_line".into(), Value::from(span.end_line));
        }
        if let Some(name) = &self.name {
            meta.insert("name".into(), Value::from(name.clone()));
        }
        for (key, value) in &self.extra {
            meta.insert(key.clone(), value.clone());
        }
        meta
    }
}

/// A chunking policy.
///
/// Implementations are stateless; documents are split independently and
/// may be processed on any thread.
pub trait ChunkingStrategy: Sync {
    /// Stable name used for registry lookup and collection naming.
    fn name(&self) -> &'static str;

    /// Chunks of one document. Parse failures are handled here.
    fn split_document(&self, doc: &SourceDocument) -> Vec<Chunk>;

    /// Chunks of all documents, in document order.
    fn split(&self, documents: &[SourceDocument]) -> Vec<Chunk> {
        let per_doc: Vec<Vec<Chunk>> = documents
            .par_iter()
            .map(|doc| {
                let chunks = self.split_document(doc);
                tracing::debug!(
                    strategy = self.name(),
                    path = %doc.path,
                    chunks = chunks.len(),
                    "split document"
                );
                chunks
            })
            .collect();
        let chunks: Vec<Chunk> = per_doc.into_iter().flatten().collect();
        tracing::info!(
            strategy = self.name(),
            documents = documents.len(),
            chunks = chunks.len(),
            "split batch"
        );
        chunks
    }
}

/// The registered strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunker {
    Function(FunctionChunker),
    StructuralAst(StructuralAstChunker),
    ContextEnriched(ContextEnrichedChunker),
    GraphRelational(GraphRelationalChunker),
}

impl ChunkingStrategy for Chunker {
    fn name(&self) -> &'static str {
        match self {
            Chunker::Function(c) => c.name(),
            Chunker::StructuralAst(c) => c.name(),
            Chunker::ContextEnriched(c) => c.name(),
            Chunker::GraphRelational(c) => c.name(),
        }
    }

    fn split_document(&self, doc: &SourceDocument) -> Vec<Chunk> {
        match self {
            Chunker::Function(c) => c.split_document(doc),
            Chunker::StructuralAst(c) => c.split_document(doc),
            Chunker::ContextEnriched(c) => c.split_document(doc),
            Chunker::GraphRelational(c) => c.split_document(doc),
        }
    }
}

/// Verbatim lines of a declaration.
pub(crate) fn code_text(doc: &SourceDocument, span: LineSpan) -> String {
    crate::common::slice_lines(&doc.text, span.start_line, span.end_line).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_file_metadata_has_only_source() {
        let doc = SourceDocument::new("bad.py", "def broken(:\n");
        let chunk = Chunk::whole_file(&doc);
        let meta = chunk.metadata();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta["source"], "bad.py");
    }

    #[test]
    fn test_declaration_metadata_merges_extra() {
        let doc = SourceDocument::new("m.py", "def f():\n    pass\n");
        let mut chunk = Chunk::declaration(
            &doc,
            ChunkKind::Function,
            "f",
            LineSpan::new(1, 2),
            "def f():\n    pass".into(),
        );
        chunk.extra.insert("complexity".into(), Value::from(1));
        let meta = chunk.metadata();
        assert_eq!(meta["chunk_type"], "function");
        assert_eq!(meta["start_line"], 1);
        assert_eq!(meta["end_line"], 2);
        assert_eq!(meta["name"], "f");
        assert_eq!(meta["complexity"], 1);
    }

    #[test]
    fn test_extra_strings_tolerates_missing() {
        let doc = SourceDocument::new("m.py", "");
        let chunk = Chunk::whole_file(&doc);
        assert!(chunk.extra_strings("calls").is_empty());
        assert_eq!(chunk.extra_str("entity_type"), None);
    }
}
