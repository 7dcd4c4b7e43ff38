//! Relation extraction between named entities of one file
//!
//! Resolution is by bare identifier within the file: no symbol table, no
//! import following, no type inference. A call to `obj.save()` links to any
//! `save` defined in the same file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ingest::syntax::{SyntaxNode, SyntaxTree};

/// Edge type between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    Calls,
    InheritsFrom,
    Contains,
    Imports,
}

impl RelationKind {
    pub const ALL: [RelationKind; 4] = [
        RelationKind::Calls,
        RelationKind::InheritsFrom,
        RelationKind::Contains,
        RelationKind::Imports,
    ];

    /// Relation table name in the graph store.
    pub fn table(&self) -> &'static str {
        match self {
            RelationKind::Calls => "CALLS",
            RelationKind::InheritsFrom => "INHERITS_FROM",
            RelationKind::Contains => "CONTAINS",
            RelationKind::Imports => "IMPORTS",
        }
    }
}

/// A fact about a directed relation between two names
///
/// Pure data structure. Names are plain identifiers, not qualified paths.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub from_name: String,
    pub to_name: String,
    pub kind: RelationKind,
}

impl Relation {
    pub fn new(
        from_name: impl Into<String>,
        to_name: impl Into<String>,
        kind: RelationKind,
    ) -> Self {
        Self {
            from_name: from_name.into(),
            to_name: to_name.into(),
            kind,
        }
    }
}

/// File-scoped relation context
///
/// Built once per file; holds every defined name (functions, methods,
/// nested functions and classes at any depth) and the modules imported at
/// top level.
#[derive(Debug, Clone, Default)]
pub struct RelationExtractor {
    known_names: BTreeSet<String>,
    imports: Vec<String>,
}

impl RelationExtractor {
    pub fn new(tree: &SyntaxTree) -> Self {
        let known_names = tree
            .walk()
            .filter_map(|node| match node {
                SyntaxNode::FunctionDecl(f) => Some(f.name.clone()),
                SyntaxNode::ClassDecl(c) => Some(c.name.clone()),
                _ => None,
            })
            .collect();

        let mut imports: Vec<String> = Vec::new();
        for node in &tree.body {
            if let SyntaxNode::Import(import) = node {
                for module in &import.modules {
                    if !imports.contains(module) {
                        imports.push(module.clone());
                    }
                }
            }
        }

        Self {
            known_names,
            imports,
        }
    }

    pub fn known_names(&self) -> &BTreeSet<String> {
        &self.known_names
    }

    /// Top-level imported modules, first-seen order, de-duplicated.
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// Calls made anywhere under `node` that resolve to names in this file.
    pub fn calls_of(&self, node: &SyntaxNode) -> BTreeSet<String> {
        find_calls(node, &self.known_names)
    }
}

/// Collect callee names under `node` that appear in `known_names`.
///
/// Direct calls contribute their identifier, attribute calls their trailing
/// attribute name. Calls through any other expression are ignored.
pub fn find_calls(node: &SyntaxNode, known_names: &BTreeSet<String>) -> BTreeSet<String> {
    node.descendants()
        .filter_map(|n| match n {
            SyntaxNode::Call(call) => call.target.resolvable_name(),
            _ => None,
        })
        .filter(|name| known_names.contains(*name))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::PythonParser;

    fn parse(src: &str) -> SyntaxTree {
        PythonParser::new().unwrap().parse(src).unwrap()
    }

    #[test]
    fn test_known_names_cover_all_depths() {
        let tree = parse("class A:\n    def m(self):\n        def inner():\n            pass\n\ndef f():\n    pass\n");
        let extractor = RelationExtractor::new(&tree);
        let names: Vec<&str> = extractor.known_names().iter().map(String::as_str).collect();
        assert_eq!(names, vec!["A", "f", "inner", "m"]);
    }

    #[test]
    fn test_find_calls_filters_unknown() {
        let src = "\
def f():
    g()
    print('x')
    self.helper()
    obj.unknown()
    return g()

def g():
    return 1

def helper():
    pass
";
        let tree = parse(src);
        let extractor = RelationExtractor::new(&tree);
        let calls = extractor.calls_of(&tree.body[0]);
        let calls: Vec<&str> = calls.iter().map(String::as_str).collect();
        assert_eq!(calls, vec!["g", "helper"]);
    }

    #[test]
    fn test_class_instantiation_is_a_call() {
        let tree = parse("class Model:\n    pass\n\ndef build():\n    return Model()\n");
        let extractor = RelationExtractor::new(&tree);
        let calls = extractor.calls_of(&tree.body[1]);
        assert!(calls.contains("Model"));
    }

    #[test]
    fn test_imports_top_level_only() {
        let src = "import os\nfrom pkg.sub import x\nimport os\n\ndef f():\n    import json\n";
        let tree = parse(src);
        let extractor = RelationExtractor::new(&tree);
        assert_eq!(extractor.imports(), &["os".to_string(), "pkg.sub".to_string()]);
    }

    #[test]
    fn test_relation_tables() {
        let tables: Vec<&str> = RelationKind::ALL.iter().map(|k| k.table()).collect();
        assert_eq!(tables, vec!["CALLS", "INHERITS_FROM", "CONTAINS", "IMPORTS"]);
    }
}
