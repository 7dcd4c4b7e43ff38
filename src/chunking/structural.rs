//! Structural strategy: entity chunks with an enriched text header.

use serde_json::{json, Map, Value};

use super::{code_text, Chunk, ChunkKind, ChunkingStrategy};
use crate::entities::{extract, ClassEntity, FunctionEntity};
use crate::ingest::{parse_source, SourceDocument};

/// Emits every top-level class, then every function found anywhere in the
/// file (methods and nested functions included).
///
/// Method bodies therefore appear twice: inside their class chunk and as
/// their own function chunk. Files that fail to parse yield no chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructuralAstChunker;

impl ChunkingStrategy for StructuralAstChunker {
    fn name(&self) -> &'static str {
        "ast"
    }

    fn split_document(&self, doc: &SourceDocument) -> Vec<Chunk> {
        structural_chunks(doc).unwrap_or_default()
    }
}

/// Classes then functions, or `None` when the file does not parse.
pub(crate) fn structural_chunks(doc: &SourceDocument) -> Option<Vec<Chunk>> {
    let tree = match parse_source(&doc.text) {
        Ok(tree) => tree,
        Err(e) => {
            tracing::warn!(path = %doc.path, code = e.code(), "parse failed, skipping file: {}", e);
            return None;
        }
    };
    let extracted = extract(&tree);

    let mut chunks = Vec::with_capacity(extracted.classes.len() + extracted.functions.len());
    chunks.extend(extracted.classes.iter().map(|c| class_chunk(doc, c)));
    chunks.extend(extracted.functions.iter().map(|f| function_chunk(doc, f)));
    Some(chunks)
}

fn function_chunk(doc: &SourceDocument, entity: &FunctionEntity) -> Chunk {
    let code = code_text(doc, entity.span);
    let text = enhanced_function_text(entity, &code);
    let mut chunk = Chunk::declaration(doc, ChunkKind::Function, &entity.name, entity.span, text);
    chunk.extra = function_extra(entity);
    chunk
}

fn class_chunk(doc: &SourceDocument, entity: &ClassEntity) -> Chunk {
    let code = code_text(doc, entity.span);
    let text = enhanced_class_text(entity, &code);
    let mut chunk = Chunk::declaration(doc, ChunkKind::Class, &entity.name, entity.span, text);
    chunk.extra = class_extra(entity);
    chunk
}

fn function_extra(entity: &FunctionEntity) -> Map<String, Value> {
    let mut extra = Map::new();
    extra.insert("signature".into(), json!(entity.signature));
    extra.insert("docstring".into(), json!(entity.docstring));
    extra.insert("decorators".into(), json!(entity.decorators));
    extra.insert("complexity".into(), json!(entity.complexity));
    extra.insert("is_async".into(), json!(entity.is_async));
    extra
}

fn class_extra(entity: &ClassEntity) -> Map<String, Value> {
    let mut extra = Map::new();
    extra.insert("base_classes".into(), json!(entity.base_names));
    extra.insert("methods".into(), json!(entity.method_names));
    extra.insert("decorators".into(), json!(entity.decorators));
    extra.insert("docstring".into(), json!(entity.docstring));
    extra.insert("complexity".into(), json!(entity.complexity));
    extra
}

/// Header lines followed by `Code:` and the verbatim code.
pub fn enhanced_function_text(entity: &FunctionEntity, code: &str) -> String {
    let mut parts = Vec::new();
    if !entity.decorators.is_empty() {
        parts.push(format!("Decorators: {}", entity.decorators.join(", ")));
    }
    parts.push(format!("Signature: {}", entity.signature));
    if let Some(doc) = entity.docstring.as_deref().filter(|d| !d.is_empty()) {
        parts.push(format!("Documentation: {}", doc));
    }
    if entity.complexity > 1 {
        parts.push(format!("Complexity: {}", entity.complexity));
    }
    parts.push(format!("Code:\n{}", code));
    parts.join("\n")
}

/// Header lines followed by `Code:` and the verbatim code.
pub fn enhanced_class_text(entity: &ClassEntity, code: &str) -> String {
    let mut parts = vec![format!("Class: {}", entity.name)];
    if !entity.base_names.is_empty() {
        parts.push(format!("Inherits from: {}", entity.base_names.join(", ")));
    }
    if !entity.decorators.is_empty() {
        parts.push(format!("Decorators: {}", entity.decorators.join(", ")));
    }
    if let Some(doc) = entity.docstring.as_deref().filter(|d| !d.is_empty()) {
        parts.push(format!("Documentation: {}", doc));
    }
    if !entity.method_names.is_empty() {
        parts.push(format!("Methods: {}", entity.method_names.join(", ")));
    }
    if entity.complexity > 1 {
        parts.push(format!("Complexity: {}", entity.complexity));
    }
    parts.push(format!("Code:\n{}", code));
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "\
class A(B):
    \"\"\"Base thing.\"\"\"

    def m1(self):
        return 1

    def m2(self, x):
        if x:
            return 2

@cache
def helper(n: int = 3) -> int:
    return n
";

    #[test]
    fn test_class_then_functions() {
        let doc = SourceDocument::new("a.py", SRC);
        let chunks = StructuralAstChunker.split_document(&doc);
        let names: Vec<&str> = chunks.iter().filter_map(|c| c.name.as_deref()).collect();
        assert_eq!(names, vec!["A", "helper", "m1", "m2"]);
        assert_eq!(chunks[0].kind, Some(ChunkKind::Class));
    }

    #[test]
    fn test_enhanced_function_text() {
        let doc = SourceDocument::new("a.py", SRC);
        let chunks = StructuralAstChunker.split_document(&doc);
        let helper = chunks.iter().find(|c| c.name.as_deref() == Some("helper")).unwrap();
        assert_eq!(
            helper.text,
            "Decorators: cache\nSignature: def helper(n: int = 3) -> int:\nCode:\ndef helper(n: int = 3) -> int:\n    return n"
        );
        assert_eq!(helper.extra["complexity"], 1);
        assert_eq!(helper.extra["docstring"], Value::Null);
    }

    #[test]
    fn test_enhanced_class_text() {
        let doc = SourceDocument::new("a.py", SRC);
        let chunks = StructuralAstChunker.split_document(&doc);
        let class = &chunks[0];
        let header: Vec<&str> = class.text.lines().take(6).collect();
        assert_eq!(
            header,
            vec![
                "Class: A",
                "Inherits from: B",
                "Documentation: Base thing.",
                "Methods: m1, m2",
                "Complexity: 4",
                "Code:",
            ]
        );
        assert!(class.text.ends_with("        if x:\n            return 2"));
    }

    #[test]
    fn test_parse_failure_no_chunks() {
        let doc = SourceDocument::new("bad.py", "class A(:\n    pass\n");
        assert!(StructuralAstChunker.split_document(&doc).is_empty());
    }
}
