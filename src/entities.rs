//! Function and class entities derived from a [`SyntaxTree`].
//!
//! Classes come from the module body only. Functions come from a
//! breadth-first walk of the whole tree, so methods and nested functions
//! are emitted as standalone entities as well (they overlap with the
//! class that contains them).

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::ingest::syntax::{ClassDecl, FunctionDecl, LineSpan, SyntaxNode, SyntaxTree};

/// A `def` / `async def` with derived metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionEntity {
    pub name: String,
    pub signature: String,
    pub span: LineSpan,
    pub docstring: Option<String>,
    pub decorators: Vec<String>,
    /// McCabe-style approximation, always >= 1
    pub complexity: u32,
    pub is_async: bool,
}

impl FunctionEntity {
    pub fn from_decl(decl: &FunctionDecl) -> Self {
        Self {
            name: decl.name.clone(),
            signature: signature(decl),
            span: decl.span,
            docstring: decl.docstring.clone(),
            decorators: decl.decorators.clone(),
            complexity: function_complexity(decl),
            is_async: decl.is_async,
        }
    }
}

/// A `class` with derived metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntity {
    pub name: String,
    pub span: LineSpan,
    pub docstring: Option<String>,
    pub base_names: Vec<String>,
    pub decorators: Vec<String>,
    /// Methods defined directly in the class body, in source order
    pub method_names: Vec<String>,
    /// 1 + sum of direct method complexities
    pub complexity: u32,
}

impl ClassEntity {
    pub fn from_decl(decl: &ClassDecl) -> Self {
        let methods: Vec<&FunctionDecl> = direct_methods(decl).collect();
        Self {
            name: decl.name.clone(),
            span: decl.span,
            docstring: decl.docstring.clone(),
            base_names: decl.bases.clone(),
            decorators: decl.decorators.clone(),
            method_names: methods.iter().map(|m| m.name.clone()).collect(),
            complexity: 1 + methods.iter().map(|m| function_complexity(m)).sum::<u32>(),
        }
    }
}

/// Entities of one file: top-level classes, then every function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub classes: Vec<ClassEntity>,
    pub functions: Vec<FunctionEntity>,
}

/// Materialize entities from a parsed file.
pub fn extract(tree: &SyntaxTree) -> Extracted {
    let classes = tree
        .body
        .iter()
        .filter_map(|node| match node {
            SyntaxNode::ClassDecl(c) => Some(ClassEntity::from_decl(c)),
            _ => None,
        })
        .collect();

    // Breadth-first, matching the order a level-by-level walk discovers
    // definitions: all top-level functions and methods before nested ones.
    let mut functions = Vec::new();
    let mut queue: VecDeque<&SyntaxNode> = tree.body.iter().collect();
    while let Some(node) = queue.pop_front() {
        if let SyntaxNode::FunctionDecl(f) = node {
            functions.push(FunctionEntity::from_decl(f));
        }
        queue.extend(node.children());
    }

    Extracted { classes, functions }
}

/// Functions defined directly in a class body.
pub fn direct_methods(decl: &ClassDecl) -> impl Iterator<Item = &FunctionDecl> {
    decl.children.iter().filter_map(|node| match node {
        SyntaxNode::FunctionDecl(f) => Some(f),
        _ => None,
    })
}

/// `def name(positional, *var, keyword_only, **kw) -> ret:`
///
/// Parameters are grouped by role; declaration order is kept within a group.
pub fn signature(decl: &FunctionDecl) -> String {
    let mut params: Vec<_> = decl.params.iter().collect();
    params.sort_by_key(|p| p.kind);
    let params: Vec<String> = params.iter().map(|p| p.render()).collect();

    let prefix = if decl.is_async { "async def" } else { "def" };
    let returns = decl
        .return_type
        .as_ref()
        .map(|r| format!(" -> {}", r))
        .unwrap_or_default();
    format!("{} {}({}){}:", prefix, decl.name, params.join(", "), returns)
}

/// 1 + number of branching constructs anywhere under the function,
/// nested definitions included.
pub fn function_complexity(decl: &FunctionDecl) -> u32 {
    let branches = decl
        .children
        .iter()
        .flat_map(SyntaxNode::descendants)
        .filter(|node| matches!(node, SyntaxNode::Other(o) if o.kind.is_branching()))
        .count();
    1 + branches as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::PythonParser;

    fn extract_src(src: &str) -> Extracted {
        let tree = PythonParser::new().unwrap().parse(src).unwrap();
        extract(&tree)
    }

    #[test]
    fn test_signature_grouping() {
        let src = "async def f(a, b: int = 1, *args, c, d=4, **kw) -> Dict[str, int]:\n    pass\n";
        let e = extract_src(src);
        assert_eq!(
            e.functions[0].signature,
            "async def f(a, b: int = 1, *args, c, d = 4, **kw) -> Dict[str, int]:"
        );
        assert!(e.functions[0].is_async);
    }

    #[test]
    fn test_signature_no_params() {
        let e = extract_src("def g():\n    return 1\n");
        assert_eq!(e.functions[0].signature, "def g():");
        assert_eq!(e.functions[0].complexity, 1);
    }

    #[test]
    fn test_complexity_if_for_boolean() {
        let src = "\
def f(xs, a, b):
    if a and b:
        for x in xs:
            print(x)
";
        let e = extract_src(src);
        assert_eq!(e.functions[0].complexity, 4);
    }

    #[test]
    fn test_complexity_counts_each_branch() {
        let src = "\
def f(x):
    if x:
        pass
    elif x > 1:
        pass
    while x:
        x -= 1
    try:
        pass
    except ValueError:
        pass
    except KeyError:
        pass
    return x or 1 or 2
";
        let e = extract_src(src);
        // if + elif + while + try + 2 except + 2 boolean terms
        assert_eq!(e.functions[0].complexity, 9);
    }

    #[test]
    fn test_methods_are_duplicated_as_functions() {
        let src = "\
class A(B):
    \"\"\"A class.\"\"\"

    def m1(self):
        if self:
            pass

    def m2(self):
        pass

def top():
    def inner():
        pass
";
        let e = extract_src(src);
        assert_eq!(e.classes.len(), 1);
        let class = &e.classes[0];
        assert_eq!(class.base_names, vec!["B"]);
        assert_eq!(class.method_names, vec!["m1", "m2"]);
        assert_eq!(class.docstring.as_deref(), Some("A class."));
        assert_eq!(class.complexity, 1 + 2 + 1);

        let names: Vec<&str> = e.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["top", "m1", "m2", "inner"]);
    }

    #[test]
    fn test_nested_classes_not_extracted() {
        let e = extract_src("def f():\n    class Local:\n        pass\n");
        assert!(e.classes.is_empty());
        assert_eq!(e.functions.len(), 1);
    }
}
