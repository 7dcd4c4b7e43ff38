//! Integration tests for the retrieval pipeline against an in-memory store.

use anyhow::Result;
use chunkgraph::{Chunk, IndexConfig, RetrievalPipeline, SearchOptions, SourceDocument, VectorStore};
use std::collections::HashMap;
use tempfile::TempDir;

/// Ranks chunks by how many query words their text contains.
#[derive(Default)]
struct KeywordStore {
    collections: HashMap<String, Vec<Chunk>>,
}

impl VectorStore for KeywordStore {
    fn add_chunks(&mut self, collection: &str, chunks: &[Chunk]) -> Result<Vec<String>> {
        let stored = self.collections.entry(collection.to_string()).or_default();
        let start = stored.len();
        stored.extend(chunks.iter().cloned());
        Ok((start..stored.len()).map(|i| format!("{}-{}", collection, i)).collect())
    }

    fn similarity_search(&self, collection: &str, query: &str, k: usize) -> Result<Vec<Chunk>> {
        let Some(chunks) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        let words: Vec<&str> = query.split_whitespace().collect();
        let mut scored: Vec<(usize, &Chunk)> = chunks
            .iter()
            .map(|c| (words.iter().filter(|w| c.text.contains(*w)).count(), c))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(k).map(|(_, c)| c.clone()).collect())
    }

    fn get_by_chunk_id(&self, collection: &str, chunk_id: &str) -> Result<Option<Chunk>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|chunks| chunks.iter().find(|c| c.extra_str("chunk_id") == Some(chunk_id)))
            .cloned())
    }
}

/// Store whose writes always fail.
struct BrokenStore;

impl VectorStore for BrokenStore {
    fn add_chunks(&mut self, _collection: &str, _chunks: &[Chunk]) -> Result<Vec<String>> {
        anyhow::bail!("store offline")
    }

    fn similarity_search(&self, _collection: &str, _query: &str, _k: usize) -> Result<Vec<Chunk>> {
        Ok(Vec::new())
    }

    fn get_by_chunk_id(&self, _collection: &str, _chunk_id: &str) -> Result<Option<Chunk>> {
        Ok(None)
    }
}

const APP_SRC: &str = "\
def load_config(path):
    return parse(read(path))

def read(path):
    return open(path).read()

def parse(text):
    return validate(text.split())

def validate(items):
    return items
";

fn graph_config(dir: &TempDir) -> IndexConfig {
    IndexConfig {
        strategy: "graph".into(),
        source_identifier: Some("app".into()),
        graph_db_path: dir.path().join("graph.db"),
        ..IndexConfig::default()
    }
}

fn names(chunks: &[Chunk]) -> Vec<&str> {
    chunks.iter().filter_map(|c| c.name.as_deref()).collect()
}

#[test]
fn test_graph_pipeline_indexes_both_stores() {
    let dir = TempDir::new().unwrap();
    let mut pipeline =
        RetrievalPipeline::new(&graph_config(&dir), KeywordStore::default()).unwrap();
    assert_eq!(pipeline.collection(), "app_graph_all_mpnet_base_v2");

    let report = pipeline
        .index_documents(&[SourceDocument::new("app.py", APP_SRC)])
        .unwrap();
    assert_eq!(report.documents, 1);
    assert_eq!(report.chunks, 4);
    assert_eq!(report.ids.len(), 4);
    assert_eq!(report.graph_entities, Some(4));
    assert_eq!(report.graph_error, None);
    assert!(report.graph_file_errors.is_empty());

    let graph = pipeline.graph().unwrap();
    assert_eq!(graph.path(), Some(dir.path().canonicalize().unwrap().join("graph.db").as_path()));
}

#[test]
fn test_graph_file_failure_is_reported_per_file() {
    let dir = TempDir::new().unwrap();
    let config = graph_config(&dir);
    let mut pipeline = RetrievalPipeline::new(&config, KeywordStore::default()).unwrap();
    rusqlite::Connection::open(&config.graph_db_path)
        .unwrap()
        .execute_batch("DROP TABLE INHERITS_FROM")
        .unwrap();

    let report = pipeline
        .index_documents(&[
            SourceDocument::new("models.py", "class User(Base):\n    pass\n"),
            SourceDocument::new("app.py", APP_SRC),
        ])
        .unwrap();
    assert_eq!(report.chunks, 5);
    assert_eq!(report.ids.len(), 5);
    assert_eq!(report.graph_error, None);
    assert_eq!(report.graph_entities, Some(4));
    assert_eq!(report.graph_file_errors.len(), 1);
    assert_eq!(report.graph_file_errors[0].0, "models.py");

    let graph = pipeline.graph().unwrap();
    assert!(graph.get_node("User").unwrap().is_none());
    assert!(graph.get_node("load_config").unwrap().is_some());
}

#[test]
fn test_graph_search_expands_call_chain() {
    let dir = TempDir::new().unwrap();
    let mut pipeline =
        RetrievalPipeline::new(&graph_config(&dir), KeywordStore::default()).unwrap();
    pipeline
        .index_documents(&[SourceDocument::new("app.py", APP_SRC)])
        .unwrap();

    let one_hop = SearchOptions { k: 1, graph_depth: 1 };
    let results = pipeline.search("load_config", one_hop).unwrap();
    assert_eq!(names(&results), vec!["load_config", "parse", "read"]);

    let two_hops = SearchOptions { k: 1, graph_depth: 2 };
    let results = pipeline.retrieve("load_config", two_hops).unwrap();
    assert_eq!(names(&results), vec!["load_config", "parse", "read", "validate"]);
    assert!(results.iter().all(|c| c.source_path == "app.py"));
    assert_eq!(results[3].text, "def validate(items):\n    return items");
}

#[test]
fn test_graph_search_without_hits() {
    let dir = TempDir::new().unwrap();
    let mut pipeline =
        RetrievalPipeline::new(&graph_config(&dir), KeywordStore::default()).unwrap();
    pipeline
        .index_documents(&[SourceDocument::new("app.py", APP_SRC)])
        .unwrap();
    assert!(pipeline
        .search("nothing_matches_this", SearchOptions::default())
        .unwrap()
        .is_empty());
}

#[test]
fn test_store_failure_is_an_error() {
    let dir = TempDir::new().unwrap();
    let mut pipeline = RetrievalPipeline::new(&graph_config(&dir), BrokenStore).unwrap();
    let err = pipeline
        .index_documents(&[SourceDocument::new("app.py", APP_SRC)])
        .unwrap_err();
    assert!(format!("{:#}", err).contains("store offline"));
    // the graph stage ran before the store failed
    assert_eq!(pipeline.graph().unwrap().node_count().unwrap(), 4);
}

#[test]
fn test_non_graph_strategies_open_no_graph() {
    let dir = TempDir::new().unwrap();
    let config = IndexConfig {
        strategy: "ast".into(),
        graph_db_path: dir.path().join("unused.db"),
        ..IndexConfig::default()
    };
    let pipeline = RetrievalPipeline::new(&config, KeywordStore::default()).unwrap();
    assert!(pipeline.graph().is_none());
    assert!(!dir.path().join("unused.db").exists());
}

#[test]
fn test_config_file_drives_pipeline() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("index.toml");
    std::fs::write(
        &config_path,
        "strategy = \"context\"\nsource_identifier = \"docs\"\nembedding_model = \"org/MiniLM-L6\"\nretrieval_k = 1\n",
    )
    .unwrap();

    let config = IndexConfig::load(&config_path).unwrap();
    let mut pipeline = RetrievalPipeline::new(&config, KeywordStore::default()).unwrap();
    assert_eq!(pipeline.collection(), "docs_context_MiniLM_L6");

    pipeline
        .index_documents(&[SourceDocument::new("app.py", APP_SRC)])
        .unwrap();
    let results = pipeline
        .retrieve("open(path)", SearchOptions::from_config(&config))
        .unwrap();
    assert_eq!(names(&results), vec!["read", "load_config", "parse"]);
}

#[test]
fn test_with_graph_replaces_configured_store() {
    let dir = TempDir::new().unwrap();
    let memory = chunkgraph::CodeKnowledgeGraph::open_in_memory().unwrap();
    let mut pipeline = RetrievalPipeline::new(&graph_config(&dir), KeywordStore::default())
        .unwrap()
        .with_graph(memory.clone());
    assert_eq!(pipeline.graph().unwrap().path(), None);

    pipeline
        .index_documents(&[SourceDocument::new("app.py", APP_SRC)])
        .unwrap();
    assert_eq!(memory.node_count().unwrap(), 4);
}
