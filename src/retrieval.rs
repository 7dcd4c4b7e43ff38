//! Indexing and retrieval over an external vector store
//!
//! Embedding and similarity search live behind [`VectorStore`]; this module
//! decides what gets indexed where and how hits are expanded:
//!
//! - `context`: each hit is followed by its previous and next chunks
//! - `graph`: hit names seed a CALLS traversal in the graph store
//! - otherwise: plain similarity hits
//!
//! Result counts and traversal depth are per-call [`SearchOptions`].

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;

use crate::chunking::{collection_name, Chunk, ChunkFactory, Chunker, ChunkingStrategy};
use crate::config::IndexConfig;
use crate::graph::CodeKnowledgeGraph;
use crate::ingest::SourceDocument;

/// Embedding-backed chunk storage, keyed by collection name.
pub trait VectorStore {
    /// Store chunks, returning one id per chunk in order.
    fn add_chunks(&mut self, collection: &str, chunks: &[Chunk]) -> Result<Vec<String>>;

    /// Up to `k` chunks most similar to `query`, best first.
    fn similarity_search(&self, collection: &str, query: &str, k: usize) -> Result<Vec<Chunk>>;

    /// Chunk whose `chunk_id` metadata equals `chunk_id`.
    fn get_by_chunk_id(&self, collection: &str, chunk_id: &str) -> Result<Option<Chunk>>;
}

/// Per-call retrieval settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Vector hits to fetch
    pub k: usize,
    /// CALLS hops for graph expansion
    pub graph_depth: usize,
}

impl SearchOptions {
    pub fn from_config(config: &IndexConfig) -> Self {
        Self {
            k: config.retrieval_k,
            graph_depth: config.graph_depth,
        }
    }
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from_config(&IndexConfig::default())
    }
}

/// Outcome of [`RetrievalPipeline::index_documents`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub documents: usize,
    pub chunks: usize,
    /// Ids returned by the vector store
    pub ids: Vec<String>,
    /// Chunks written to the graph store (`graph` strategy only)
    pub graph_entities: Option<usize>,
    /// Graph stage failure; vector indexing still ran
    pub graph_error: Option<String>,
    /// Files whose graph writes were rolled back, with the error
    pub graph_file_errors: Vec<(String, String)>,
}

/// Chunker, collection and optional graph store for one configuration.
pub struct RetrievalPipeline<S: VectorStore> {
    chunker: Chunker,
    collection: String,
    store: S,
    graph: Option<CodeKnowledgeGraph>,
}

impl<S: VectorStore> RetrievalPipeline<S> {
    /// Resolve the strategy and collection; open the graph store for `graph`.
    ///
    /// # Errors
    /// Unknown strategy name, or a graph store that cannot be opened.
    pub fn new(config: &IndexConfig, store: S) -> Result<Self> {
        let chunker = ChunkFactory::create(&config.strategy)?;
        let collection = collection_name(
            config.source_identifier.as_deref(),
            chunker.name(),
            &config.embedding_model,
        );
        let graph = if matches!(chunker, Chunker::GraphRelational(_)) {
            Some(CodeKnowledgeGraph::open(&config.graph_db_path).with_context(|| {
                format!("failed to open graph store {}", config.graph_db_path.display())
            })?)
        } else {
            None
        };
        tracing::info!(
            strategy = chunker.name(),
            collection = %collection,
            "retrieval pipeline ready"
        );
        Ok(Self {
            chunker,
            collection,
            store,
            graph,
        })
    }

    /// Use an already-open graph store instead of the configured path.
    pub fn with_graph(mut self, graph: CodeKnowledgeGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    pub fn graph(&self) -> Option<&CodeKnowledgeGraph> {
        self.graph.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Chunk documents, build the graph (graph strategy), then hand the
    /// chunks to the vector store.
    ///
    /// A graph failure is logged and reported; it does not stop vector
    /// indexing. Files that fail individually are listed in
    /// `graph_file_errors` while the other files still reach the graph.
    pub fn index_documents(&mut self, documents: &[SourceDocument]) -> Result<IndexReport> {
        let chunks = self.chunker.split(documents);
        let mut report = IndexReport {
            documents: documents.len(),
            chunks: chunks.len(),
            ..IndexReport::default()
        };

        if let Some(graph) = &self.graph {
            match graph.add_entities(&chunks) {
                Ok(outcome) => {
                    tracing::info!(
                        entities = outcome.written,
                        failed_files = outcome.failures.len(),
                        "built code knowledge graph"
                    );
                    report.graph_entities = Some(outcome.written);
                    report.graph_file_errors = outcome
                        .failures
                        .into_iter()
                        .map(|f| (f.source_path, f.error.to_string()))
                        .collect();
                }
                Err(e) => {
                    tracing::warn!(code = e.code(), "graph indexing failed: {}", e);
                    report.graph_error = Some(e.to_string());
                }
            }
        }

        report.ids = self
            .store
            .add_chunks(&self.collection, &chunks)
            .with_context(|| format!("failed to index chunks into {}", self.collection))?;
        tracing::info!(indexed = report.ids.len(), collection = %self.collection, "indexed chunks");
        Ok(report)
    }

    /// Similarity search, expanded through the graph for `graph`.
    pub fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<Chunk>> {
        let hits = self
            .store
            .similarity_search(&self.collection, query, options.k)?;

        let Some(graph) = &self.graph else {
            return Ok(hits);
        };
        let names: Vec<&str> = hits.iter().filter_map(|c| c.name.as_deref()).collect();
        if names.is_empty() {
            return Ok(hits);
        }
        let expanded = graph
            .hybrid_search(&names, options.graph_depth)
            .context("graph expansion failed")?;
        Ok(expanded.into_iter().map(|n| n.into_chunk()).collect())
    }

    /// Similarity hits, each followed by its stored neighbors.
    ///
    /// Neighbors are not de-duplicated: adjacent hits may repeat chunks.
    pub fn search_with_context(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        let hits = self.store.similarity_search(&self.collection, query, k)?;
        let mut expanded = Vec::with_capacity(hits.len() * 3);
        for hit in hits {
            let neighbors: Vec<String> = ["prev_chunk_id", "next_chunk_id"]
                .iter()
                .filter_map(|key| match hit.extra.get(*key) {
                    Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
                    _ => None,
                })
                .collect();
            expanded.push(hit);
            for id in neighbors {
                if let Some(chunk) = self.store.get_by_chunk_id(&self.collection, &id)? {
                    expanded.push(chunk);
                }
            }
        }
        Ok(expanded)
    }

    /// Strategy-appropriate retrieval.
    pub fn retrieve(&self, query: &str, options: SearchOptions) -> Result<Vec<Chunk>> {
        match self.chunker {
            Chunker::ContextEnriched(_) => self.search_with_context(query, options.k),
            Chunker::GraphRelational(_) => self.search(query, options),
            _ => self
                .store
                .similarity_search(&self.collection, query, options.k),
        }
    }
}

/// Render retrieved chunks as `Source: {metadata}\nContent: {text}` blocks.
pub fn format_results(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| {
            format!(
                "Source: {}\nContent: {}",
                Value::Object(c.metadata()),
                c.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
