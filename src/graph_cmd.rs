//! Graph command implementation
//!
//! Builds and queries a code knowledge graph file.

use anyhow::Result;
use chunkgraph::ingest::loader::load_python_files;
use chunkgraph::{ChunkingStrategy, CodeKnowledgeGraph, GraphNode};
use chunkgraph::chunking::GraphRelationalChunker;
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Graph query kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphQuery {
    /// Forward CALLS traversal
    Calls,
    /// Direct callers
    Callers,
    /// Class plus contained methods
    Class,
}

/// Index Python sources into the graph at `db_path`.
///
/// Existing nodes are upserted; nothing is cleared first. A file that
/// fails to write is reported on stderr and the rest are kept.
pub fn run_index(db_path: &Path, paths: &[PathBuf]) -> Result<()> {
    let graph = CodeKnowledgeGraph::open(db_path)?;
    let documents = load_python_files(paths)?;
    let chunks = GraphRelationalChunker.split(&documents);
    let outcome = graph.add_entities(&chunks)?;
    for failure in &outcome.failures {
        eprintln!("graph write failed for {}: {}", failure.source_path, failure.error);
    }

    let summary = json!({
        "documents": documents.len(),
        "chunks": chunks.len(),
        "entities_written": outcome.written,
        "failed_files": outcome.failures.len(),
        "nodes": graph.node_count()?,
        "edges": graph.edge_count()?,
    });
    println!("{}", summary);
    Ok(())
}

/// Run one traversal query and print matching nodes as JSON lines.
pub fn run_query(db_path: &Path, query: GraphQuery, name: &str, depth: usize) -> Result<()> {
    let graph = CodeKnowledgeGraph::open(db_path)?;
    let nodes = match query {
        GraphQuery::Calls => graph.get_call_chain(name, depth)?,
        GraphQuery::Callers => graph.get_callers(name)?,
        GraphQuery::Class => graph.get_class_with_methods(name)?,
    };
    print_nodes(&nodes)?;
    eprintln!("{} node(s)", nodes.len());
    Ok(())
}

/// Delete all nodes and edges.
pub fn run_clear(db_path: &Path) -> Result<()> {
    let graph = CodeKnowledgeGraph::open(db_path)?;
    graph.clear()?;
    eprintln!("Cleared {}", db_path.display());
    Ok(())
}

fn print_nodes(nodes: &[GraphNode]) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for node in nodes {
        writeln!(out, "{}", serde_json::to_string(node)?)?;
    }
    out.flush()?;
    Ok(())
}
