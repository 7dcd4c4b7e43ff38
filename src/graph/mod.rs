//! Code knowledge graph persisted in an embedded SQLite file
//!
//! Nodes are entities keyed by plain name; edges are typed relations
//! between names. Names referenced by a relation but never defined are
//! stored as stub nodes without content and are filtered out of every
//! query result.
pub mod query;
pub mod registry;
pub mod schema;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::chunking::graph::{entity_type_of, relations_of};
use crate::chunking::{Chunk, ChunkKind};
use crate::error_codes;
use crate::ingest::syntax::LineSpan;
use crate::relations::RelationKind;
use registry::SharedConnection;

/// Storage failure other than an idempotent "already exists".
#[derive(Debug, thiserror::Error)]
pub enum GraphStoreError {
    #[error("graph store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("graph store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("graph store handle poisoned by a panicked writer")]
    Poisoned,
}

impl GraphStoreError {
    pub fn code(&self) -> &'static str {
        match self {
            GraphStoreError::Sqlite(_) => error_codes::CKG_GRAPH_001_STORAGE,
            GraphStoreError::Io(_) => error_codes::CKG_GRAPH_002_IO,
            GraphStoreError::Poisoned => error_codes::CKG_GRAPH_003_POISONED,
        }
    }
}

/// A file whose chunks were rolled back by [`CodeKnowledgeGraph::add_entities`].
#[derive(Debug)]
pub struct FileWriteFailure {
    pub source_path: String,
    pub error: GraphStoreError,
}

/// Outcome of [`CodeKnowledgeGraph::add_entities`].
#[derive(Debug, Default)]
pub struct GraphWriteReport {
    /// Named chunks committed
    pub written: usize,
    /// Files rolled back, in input order
    pub failures: Vec<FileWriteFailure>,
}

impl GraphWriteReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A persisted entity row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub name: String,
    pub entity_type: Option<String>,
    pub source_path: Option<String>,
    pub start_line: Option<usize>,
    pub end_line: Option<usize>,
    pub content: Option<String>,
}

impl GraphNode {
    pub(crate) const COLUMNS: &'static str =
        "name, entity_type, source, start_line, end_line, content";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let line = |v: Option<i64>| v.and_then(|v| usize::try_from(v).ok());
        Ok(Self {
            name: row.get(0)?,
            entity_type: row.get(1)?,
            source_path: row.get(2)?,
            start_line: line(row.get(3)?),
            end_line: line(row.get(4)?),
            content: row.get(5)?,
        })
    }

    /// Defined entity, as opposed to a stub created as a relation target.
    pub fn has_content(&self) -> bool {
        self.content.as_deref().is_some_and(|c| !c.is_empty())
    }

    /// Present the node as a chunk for the retrieval layer.
    pub fn into_chunk(self) -> Chunk {
        let kind = match self.entity_type.as_deref() {
            Some("function") => Some(ChunkKind::Function),
            Some("class") => Some(ChunkKind::Class),
            _ => None,
        };
        let span = match (self.start_line, self.end_line) {
            (Some(start), Some(end)) if start > 0 => Some(LineSpan::new(start, end)),
            _ => None,
        };
        let mut extra = serde_json::Map::new();
        if let Some(entity_type) = &self.entity_type {
            extra.insert("entity_type".into(), entity_type.clone().into());
        }
        Chunk {
            text: self.content.unwrap_or_default(),
            source_path: self.source_path.unwrap_or_default(),
            kind,
            span,
            name: Some(self.name),
            extra,
        }
    }
}

/// Handle to a graph store.
///
/// Handles opened on the same path share one connection (see
/// [`registry`]); cloning a handle is cheap.
#[derive(Clone)]
pub struct CodeKnowledgeGraph {
    conn: SharedConnection,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for CodeKnowledgeGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeKnowledgeGraph")
            .field("path", &self.path)
            .finish()
    }
}

impl CodeKnowledgeGraph {
    /// Open (or create) the store at `db_path`, reusing the process-wide
    /// connection if one is already open for that path.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, GraphStoreError> {
        let (path, conn) = registry::acquire(db_path.as_ref())?;
        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Private in-memory store, not shared through the registry.
    pub fn open_in_memory() -> Result<Self, GraphStoreError> {
        let conn = Connection::open_in_memory()?;
        schema::ensure_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Canonical database path; `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn with_conn<R>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<R, GraphStoreError>,
    ) -> Result<R, GraphStoreError> {
        let mut conn = self.conn.lock().map_err(|_| GraphStoreError::Poisoned)?;
        f(&mut conn)
    }

    /// Upsert nodes and relation edges from graph-strategy chunks.
    ///
    /// # Behavior
    /// 1. Chunks without a name are skipped
    /// 2. The named node is upserted; its attributes are overwritten
    /// 3. Every relation target gets a stub node unless it already exists
    /// 4. Edges are inserted once; repeats are ignored
    ///
    /// Chunks are grouped by source file, in first-seen order, and each
    /// file is written in its own transaction. A failing file is rolled
    /// back and recorded in the report; the remaining files are still
    /// written.
    ///
    /// # Errors
    /// Only a poisoned handle fails the whole call.
    pub fn add_entities(&self, chunks: &[Chunk]) -> Result<GraphWriteReport, GraphStoreError> {
        let mut files: Vec<(&str, Vec<&Chunk>)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for chunk in chunks.iter().filter(|c| c.name.is_some()) {
            let path = chunk.source_path.as_str();
            let slot = *index.entry(path).or_insert_with(|| {
                files.push((path, Vec::new()));
                files.len() - 1
            });
            files[slot].1.push(chunk);
        }

        let mut report = GraphWriteReport::default();
        self.with_conn(|conn| {
            for (path, group) in &files {
                match write_file(conn, group) {
                    Ok(()) => report.written += group.len(),
                    Err(e) => {
                        tracing::warn!(code = e.code(), file = %path, "graph write failed: {}", e);
                        report.failures.push(FileWriteFailure {
                            source_path: path.to_string(),
                            error: e,
                        });
                    }
                }
            }
            Ok(())
        })?;
        tracing::debug!(
            chunks = report.written,
            failed_files = report.failures.len(),
            "added entities to graph"
        );
        Ok(report)
    }

    /// Delete every node and edge.
    pub fn clear(&self) -> Result<(), GraphStoreError> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            for kind in RelationKind::ALL {
                tx.execute(&format!("DELETE FROM {}", kind.table()), [])?;
            }
            tx.execute("DELETE FROM Entity", [])?;
            tx.commit()?;
            Ok(())
        })?;
        tracing::info!("cleared graph store");
        Ok(())
    }

    /// Number of nodes, stubs included.
    pub fn node_count(&self) -> Result<usize, GraphStoreError> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM Entity", [], |row| row.get(0))?;
            Ok(n as usize)
        })
    }

    /// Number of edges across all relation kinds.
    pub fn edge_count(&self) -> Result<usize, GraphStoreError> {
        let mut total = 0;
        for kind in RelationKind::ALL {
            total += self.edge_count_of(kind)?;
        }
        Ok(total)
    }

    pub fn edge_count_of(&self, kind: RelationKind) -> Result<usize, GraphStoreError> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", kind.table()),
                [],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
    }

    /// Node by name, stub or not.
    pub fn get_node(&self, name: &str) -> Result<Option<GraphNode>, GraphStoreError> {
        self.with_conn(|conn| {
            let node = conn
                .query_row(
                    &format!("SELECT {} FROM Entity WHERE name = ?1", GraphNode::COLUMNS),
                    params![name],
                    GraphNode::from_row,
                )
                .optional()?;
            Ok(node)
        })
    }
}

/// Write one file's chunks in a single transaction.
fn write_file(conn: &mut Connection, chunks: &[&Chunk]) -> Result<(), GraphStoreError> {
    let tx = conn.transaction()?;
    for chunk in chunks {
        let Some(name) = chunk.name.as_deref() else {
            continue;
        };
        tx.execute(
            "INSERT INTO Entity (name, entity_type, source, start_line, end_line, content)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(name) DO UPDATE SET
                    entity_type = excluded.entity_type,
                    source = excluded.source,
                    start_line = excluded.start_line,
                    end_line = excluded.end_line,
                    content = excluded.content",
            params![
                name,
                entity_type_of(chunk),
                chunk.source_path,
                chunk.start_line().unwrap_or(0) as i64,
                chunk.end_line().unwrap_or(0) as i64,
                chunk.text,
            ],
        )?;
        for relation in relations_of(chunk) {
            for endpoint in [&relation.from_name, &relation.to_name] {
                tx.execute(
                    "INSERT OR IGNORE INTO Entity (name) VALUES (?1)",
                    params![endpoint],
                )?;
            }
            tx.execute(
                &format!(
                    "INSERT OR IGNORE INTO {} (from_name, to_name) VALUES (?1, ?2)",
                    relation.kind.table()
                ),
                params![relation.from_name, relation.to_name],
            )?;
        }
    }
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{ChunkingStrategy, GraphRelationalChunker};
    use crate::ingest::SourceDocument;

    fn graph_chunks(src: &str) -> Vec<Chunk> {
        GraphRelationalChunker.split_document(&SourceDocument::new("m.py", src))
    }

    #[test]
    fn test_add_entities_creates_stubs() {
        let graph = CodeKnowledgeGraph::open_in_memory().unwrap();
        let chunks = graph_chunks("import os\n\nclass A(Base):\n    def m(self):\n        pass\n");
        assert_eq!(graph.add_entities(&chunks).unwrap().written, 1);

        // A, plus stubs Base, m, os
        assert_eq!(graph.node_count().unwrap(), 4);
        assert_eq!(graph.edge_count().unwrap(), 3);
        let base = graph.get_node("Base").unwrap().unwrap();
        assert!(!base.has_content());
        assert_eq!(base.entity_type, None);

        let a = graph.get_node("A").unwrap().unwrap();
        assert_eq!(a.entity_type.as_deref(), Some("class"));
        assert_eq!(a.start_line, Some(3));
        assert_eq!(a.end_line, Some(5));
    }

    #[test]
    fn test_upsert_overwrites_node() {
        let graph = CodeKnowledgeGraph::open_in_memory().unwrap();
        graph.add_entities(&graph_chunks("def f():\n    return 1\n")).unwrap();
        graph.add_entities(&graph_chunks("\n\ndef f():\n    return 2\n")).unwrap();

        let f = graph.get_node("f").unwrap().unwrap();
        assert_eq!(f.content.as_deref(), Some("def f():\n    return 2"));
        assert_eq!(f.start_line, Some(3));
        assert_eq!(graph.node_count().unwrap(), 1);
    }

    #[test]
    fn test_stub_does_not_clobber_defined_node() {
        let graph = CodeKnowledgeGraph::open_in_memory().unwrap();
        graph.add_entities(&graph_chunks("def g():\n    return 1\n")).unwrap();
        // f -> g recorded from a second file; g keeps its content
        let chunks = graph_chunks("def f():\n    return g()\n\ndef g():\n    pass\n");
        graph.add_entities(&chunks[..1]).unwrap();
        let g = graph.get_node("g").unwrap().unwrap();
        assert_eq!(g.content.as_deref(), Some("def g():\n    return 1"));
    }

    #[test]
    fn test_unnamed_chunks_skipped() {
        let graph = CodeKnowledgeGraph::open_in_memory().unwrap();
        let doc = SourceDocument::new("bad.py", "def f(:\n");
        let report = graph.add_entities(&[Chunk::whole_file(&doc)]).unwrap();
        assert_eq!(report.written, 0);
        assert!(report.is_complete());
        assert_eq!(graph.node_count().unwrap(), 0);
    }

    #[test]
    fn test_failed_file_does_not_block_others() {
        let graph = CodeKnowledgeGraph::open_in_memory().unwrap();
        graph
            .with_conn(|conn| {
                conn.execute_batch("DROP TABLE INHERITS_FROM")?;
                Ok(())
            })
            .unwrap();

        let mut chunks = GraphRelationalChunker
            .split_document(&SourceDocument::new("a.py", "class A(Base):\n    pass\n"));
        chunks.extend(GraphRelationalChunker.split_document(&SourceDocument::new(
            "b.py",
            "def f():\n    return g()\n\ndef g():\n    pass\n",
        )));

        let report = graph.add_entities(&chunks).unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source_path, "a.py");
        assert_eq!(report.failures[0].error.code(), error_codes::CKG_GRAPH_001_STORAGE);

        // a.py rolled back as a whole, including its stub
        assert!(graph.get_node("A").unwrap().is_none());
        assert!(graph.get_node("Base").unwrap().is_none());
        assert!(graph.get_node("f").unwrap().unwrap().has_content());
        assert_eq!(graph.edge_count_of(RelationKind::Calls).unwrap(), 1);
    }

    #[test]
    fn test_clear() {
        let graph = CodeKnowledgeGraph::open_in_memory().unwrap();
        graph
            .add_entities(&graph_chunks("def f():\n    return g()\n\ndef g():\n    pass\n"))
            .unwrap();
        assert!(graph.edge_count().unwrap() > 0);
        graph.clear().unwrap();
        assert_eq!(graph.node_count().unwrap(), 0);
        assert_eq!(graph.edge_count().unwrap(), 0);
    }

    #[test]
    fn test_node_into_chunk() {
        let node = GraphNode {
            name: "f".into(),
            entity_type: Some("function".into()),
            source_path: Some("m.py".into()),
            start_line: Some(1),
            end_line: Some(2),
            content: Some("def f():\n    pass".into()),
        };
        let chunk = node.into_chunk();
        assert_eq!(chunk.kind, Some(ChunkKind::Function));
        assert_eq!(chunk.span, Some(LineSpan::new(1, 2)));
        assert_eq!(chunk.metadata()["entity_type"], "function");
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(GraphStoreError::Poisoned.code(), "CKG-GRAPH-003");
    }
}
