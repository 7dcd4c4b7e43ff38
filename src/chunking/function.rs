//! Baseline strategy: top-level functions and classes as verbatim text.

use super::{code_text, Chunk, ChunkKind, ChunkingStrategy};
use crate::ingest::syntax::SyntaxNode;
use crate::ingest::{parse_source, SourceDocument};

/// Emits one chunk per top-level `def`/`class`, in source order.
///
/// Nested definitions stay inside their parent's chunk. A file that fails
/// to parse becomes a single chunk holding the entire text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FunctionChunker;

impl ChunkingStrategy for FunctionChunker {
    fn name(&self) -> &'static str {
        "function"
    }

    fn split_document(&self, doc: &SourceDocument) -> Vec<Chunk> {
        let tree = match parse_source(&doc.text) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!(
                    path = %doc.path,
                    code = e.code(),
                    "parse failed, emitting whole file: {}",
                    e
                );
                return vec![Chunk::whole_file(doc)];
            }
        };

        tree.body
            .iter()
            .filter_map(|node| match node {
                SyntaxNode::FunctionDecl(f) => Some((ChunkKind::Function, f.name.as_str(), f.span)),
                SyntaxNode::ClassDecl(c) => Some((ChunkKind::Class, c.name.as_str(), c.span)),
                _ => None,
            })
            .map(|(kind, name, span)| {
                Chunk::declaration(doc, kind, name, span, code_text(doc, span))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_only() {
        let src = "import os\n\n@dec\ndef f():\n    def inner():\n        pass\n\nclass A:\n    def m(self):\n        pass\n";
        let doc = SourceDocument::new("m.py", src);
        let chunks = FunctionChunker.split_document(&doc);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].name.as_deref(), Some("f"));
        assert_eq!(chunks[0].text, "def f():\n    def inner():\n        pass");
        assert_eq!(chunks[1].kind, Some(ChunkKind::Class));
        assert_eq!(chunks[1].start_line(), Some(8));
        assert_eq!(chunks[1].end_line(), Some(10));
    }

    #[test]
    fn test_no_declarations_no_chunks() {
        let doc = SourceDocument::new("m.py", "x = 1\n");
        assert!(FunctionChunker.split_document(&doc).is_empty());
    }

    #[test]
    fn test_syntax_error_whole_file() {
        let src = "def f(:\n    return\n";
        let doc = SourceDocument::new("bad.py", src);
        let chunks = FunctionChunker.split_document(&doc);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, src);
        assert_eq!(chunks[0].span, None);
    }
}
