//! Chunk command implementation
//!
//! Splits Python files with one strategy and prints each chunk as a JSON line.

use anyhow::Result;
use chunkgraph::ingest::loader::load_python_files;
use chunkgraph::{ChunkFactory, ChunkingStrategy};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;

/// Run the chunk command
///
/// # Arguments
/// * `strategy` - Registered strategy name
/// * `paths` - Files or directories to load `.py` sources from
///
/// # Output
/// One `{"text": ..., "metadata": {...}}` object per line on stdout.
pub fn run_chunk(strategy: &str, paths: &[PathBuf]) -> Result<()> {
    let chunker = ChunkFactory::create(strategy)?;
    let documents = load_python_files(paths)?;
    let chunks = chunker.split(&documents);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for chunk in &chunks {
        let line = json!({
            "text": chunk.text,
            "metadata": chunk.metadata(),
        });
        writeln!(out, "{}", line)?;
    }
    out.flush()?;

    eprintln!(
        "Split {} file(s) into {} chunk(s) using {} strategy",
        documents.len(),
        chunks.len(),
        chunker.name()
    );
    Ok(())
}
