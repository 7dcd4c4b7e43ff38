//! Context-enriched strategy: structural chunks linked to their neighbors.

use serde_json::Value;

use super::structural::structural_chunks;
use super::{Chunk, ChunkingStrategy};
use crate::ingest::SourceDocument;

/// Structural chunks sorted by start line within each file, each carrying
/// `chunk_id`, `prev_chunk_id` and `next_chunk_id`.
///
/// Ids are `"{path}:{start_line}"`; neighbors at either end are null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextEnrichedChunker;

pub fn chunk_id(path: &str, start_line: usize) -> String {
    format!("{}:{}", path, start_line)
}

impl ChunkingStrategy for ContextEnrichedChunker {
    fn name(&self) -> &'static str {
        "context"
    }

    fn split_document(&self, doc: &SourceDocument) -> Vec<Chunk> {
        let Some(mut chunks) = structural_chunks(doc) else {
            return Vec::new();
        };
        // Stable: ties keep class-before-function order
        chunks.sort_by_key(|c| c.start_line().unwrap_or(0));

        let ids: Vec<String> = chunks
            .iter()
            .map(|c| chunk_id(&doc.path, c.start_line().unwrap_or(0)))
            .collect();

        for (i, chunk) in chunks.iter_mut().enumerate() {
            let prev = i.checked_sub(1).map(|p| ids[p].clone());
            let next = ids.get(i + 1).cloned();
            chunk.extra.insert("chunk_id".into(), Value::from(ids[i].clone()));
            chunk
                .extra
                .insert("prev_chunk_id".into(), prev.map(Value::from).unwrap_or(Value::Null));
            chunk
                .extra
                .insert("next_chunk_id".into(), next.map(Value::from).unwrap_or(Value::Null));
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_and_linked() {
        let src = "\
def first():
    pass

class A:
    def m(self):
        pass

def last():
    pass
";
        let doc = SourceDocument::new("pkg/mod.py", src);
        let chunks = ContextEnrichedChunker.split_document(&doc);
        let names: Vec<&str> = chunks.iter().filter_map(|c| c.name.as_deref()).collect();
        assert_eq!(names, vec!["first", "A", "m", "last"]);

        assert_eq!(chunks[0].extra["chunk_id"], "pkg/mod.py:1");
        assert_eq!(chunks[0].extra["prev_chunk_id"], Value::Null);
        assert_eq!(chunks[0].extra["next_chunk_id"], "pkg/mod.py:4");
        assert_eq!(chunks[2].extra["prev_chunk_id"], "pkg/mod.py:4");
        assert_eq!(chunks[2].extra["next_chunk_id"], "pkg/mod.py:8");
        assert_eq!(chunks[3].extra["next_chunk_id"], Value::Null);
    }

    #[test]
    fn test_single_chunk_has_no_neighbors() {
        let doc = SourceDocument::new("one.py", "def only():\n    pass\n");
        let chunks = ContextEnrichedChunker.split_document(&doc);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].extra["prev_chunk_id"], Value::Null);
        assert_eq!(chunks[0].extra["next_chunk_id"], Value::Null);
        assert_eq!(chunks[0].metadata()["chunk_id"], "one.py:1");
    }
}
