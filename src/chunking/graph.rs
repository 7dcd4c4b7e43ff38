//! Graph strategy: declaration chunks carrying relation metadata.

use serde_json::{json, Map, Value};

use super::{code_text, Chunk, ChunkKind, ChunkingStrategy};
use crate::entities::direct_methods;
use crate::ingest::syntax::SyntaxNode;
use crate::ingest::{parse_source, SourceDocument};
use crate::relations::{Relation, RelationExtractor, RelationKind};

/// Emits top-level classes, then top-level functions, as verbatim text.
///
/// Extra fields:
/// - `entity_type`: `"class"` or `"function"`
/// - `calls`: sorted callee names defined in the same file
/// - `imports`: modules imported at the top of the file
/// - `inherits_from`, `contains_methods`: classes only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphRelationalChunker;

impl ChunkingStrategy for GraphRelationalChunker {
    fn name(&self) -> &'static str {
        "graph"
    }

    fn split_document(&self, doc: &SourceDocument) -> Vec<Chunk> {
        let tree = match parse_source(&doc.text) {
            Ok(tree) => tree,
            Err(e) => {
                tracing::warn!(
                    path = %doc.path,
                    code = e.code(),
                    "parse failed, skipping file: {}",
                    e
                );
                return Vec::new();
            }
        };
        let relations = RelationExtractor::new(&tree);

        let mut chunks = Vec::new();
        for node in &tree.body {
            if let SyntaxNode::ClassDecl(class) = node {
                let mut chunk = Chunk::declaration(
                    doc,
                    ChunkKind::Class,
                    &class.name,
                    class.span,
                    code_text(doc, class.span),
                );
                let methods: Vec<&str> = direct_methods(class).map(|m| m.name.as_str()).collect();
                let mut extra = Map::new();
                extra.insert("entity_type".into(), json!("class"));
                extra.insert("inherits_from".into(), json!(class.bases));
                extra.insert("contains_methods".into(), json!(methods));
                extra.insert("calls".into(), json!(relations.calls_of(node)));
                extra.insert("imports".into(), json!(relations.imports()));
                chunk.extra = extra;
                chunks.push(chunk);
            }
        }
        for node in &tree.body {
            if let SyntaxNode::FunctionDecl(function) = node {
                let mut chunk = Chunk::declaration(
                    doc,
                    ChunkKind::Function,
                    &function.name,
                    function.span,
                    code_text(doc, function.span),
                );
                let mut extra = Map::new();
                extra.insert("entity_type".into(), json!("function"));
                extra.insert("calls".into(), json!(relations.calls_of(node)));
                extra.insert("imports".into(), json!(relations.imports()));
                chunk.extra = extra;
                chunks.push(chunk);
            }
        }
        chunks
    }
}

/// Relations a graph chunk asserts from its own name.
///
/// Chunks without a name assert nothing.
pub fn relations_of(chunk: &Chunk) -> Vec<Relation> {
    let Some(name) = chunk.name.as_deref() else {
        return Vec::new();
    };
    let fields = [
        ("calls", RelationKind::Calls),
        ("inherits_from", RelationKind::InheritsFrom),
        ("contains_methods", RelationKind::Contains),
        ("imports", RelationKind::Imports),
    ];
    let mut out = Vec::new();
    for (field, kind) in fields {
        for target in chunk.extra_strings(field) {
            out.push(Relation::new(name, target, kind));
        }
    }
    out
}

/// `entity_type` of a graph chunk, `"unknown"` when absent.
pub fn entity_type_of(chunk: &Chunk) -> String {
    match chunk.extra.get("entity_type") {
        Some(Value::String(s)) => s.clone(),
        _ => "unknown".to_string(),
    }
}
