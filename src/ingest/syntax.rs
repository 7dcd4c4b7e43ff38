//! Declaration tree produced by the Python adapter.
//!
//! The concrete tree-sitter tree is lowered into a small tagged union that
//! keeps only what extraction needs: declarations, imports, call sites and
//! the branching constructs that feed complexity scoring. Everything else
//! collapses into [`SyntaxNode::Other`] with [`OtherKind::Statement`].
//!
//! Nodes are built once per parse and never mutated afterwards.

use serde::{Deserialize, Serialize};

/// Inclusive, 1-indexed line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineSpan {
    pub start_line: usize,
    pub end_line: usize,
}

impl LineSpan {
    pub fn new(start_line: usize, end_line: usize) -> Self {
        Self {
            start_line,
            end_line: end_line.max(start_line),
        }
    }

    /// Build a span from a tree-sitter node.
    ///
    /// A node whose end sits at column 0 of a later row (trailing newline
    /// swallowed by the node) ends on the previous row.
    pub fn of_node(node: &tree_sitter::Node) -> Self {
        Self::from_points(node.start_position(), node.end_position())
    }

    /// Span of a `def`/`class`, ending at its last non-comment token.
    ///
    /// tree-sitter attaches comments that follow the last statement at
    /// body indentation to the body; they are not part of the declaration.
    pub fn of_declaration(node: &tree_sitter::Node) -> Self {
        let mut last = *node;
        loop {
            let mut next = None;
            for i in (0..last.child_count()).rev() {
                match last.child(i) {
                    Some(child) if child.kind() != "comment" => {
                        next = Some(child);
                        break;
                    }
                    _ => {}
                }
            }
            match next {
                Some(child) => last = child,
                None => break,
            }
        }
        Self::from_points(node.start_position(), last.end_position())
    }

    fn from_points(start: tree_sitter::Point, end: tree_sitter::Point) -> Self {
        let end_row = if end.column == 0 && end.row > start.row {
            end.row - 1
        } else {
            end.row
        };
        Self::new(start.row + 1, end_row + 1)
    }
}

/// Role of a parameter in a function signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParamKind {
    /// Plain or positional-only parameter
    Positional,
    /// `*args`
    VarPositional,
    /// Parameter after `*` or `*args`
    KeywordOnly,
    /// `**kwargs`
    VarKeyword,
}

/// A rendered function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub kind: ParamKind,
    /// Name without the `*`/`**` prefix
    pub name: String,
    pub annotation: Option<String>,
    pub default: Option<String>,
}

impl Param {
    /// Render as it appears in a signature: `*name: T`, `x: int = 5`, `y = 2`.
    pub fn render(&self) -> String {
        let prefix = match self.kind {
            ParamKind::VarPositional => "*",
            ParamKind::VarKeyword => "**",
            ParamKind::Positional | ParamKind::KeywordOnly => "",
        };
        let mut out = format!("{}{}", prefix, self.name);
        if let Some(annotation) = &self.annotation {
            out.push_str(": ");
            out.push_str(annotation);
        }
        if let Some(default) = &self.default {
            out.push_str(" = ");
            out.push_str(default);
        }
        out
    }
}

/// `def` / `async def`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    pub span: LineSpan,
    pub is_async: bool,
    pub params: Vec<Param>,
    pub return_type: Option<String>,
    pub decorators: Vec<String>,
    pub docstring: Option<String>,
    /// Lowered decorators, parameters, return annotation and body, in source order
    pub children: Vec<SyntaxNode>,
}

/// `class`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub name: String,
    pub span: LineSpan,
    /// Positional bases as written; keyword arguments such as `metaclass=` are excluded
    pub bases: Vec<String>,
    pub decorators: Vec<String>,
    pub docstring: Option<String>,
    /// Lowered decorators, base list and body, in source order
    pub children: Vec<SyntaxNode>,
}

/// `import a.b` / `from a.b import c`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    pub span: LineSpan,
    /// Module names referenced by the statement; relative dots stripped
    pub modules: Vec<String>,
}

/// What a call expression invokes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    /// `foo(...)`
    Name(String),
    /// `obj.attr(...)`; only the trailing attribute is kept
    Attribute(String),
    /// Anything else: `f()()`, `table[k](...)`, `(lambda: 0)()`
    Dynamic,
}

impl CallTarget {
    /// The plain identifier used for name-based resolution, if any.
    pub fn resolvable_name(&self) -> Option<&str> {
        match self {
            CallTarget::Name(name) | CallTarget::Attribute(name) => Some(name),
            CallTarget::Dynamic => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub span: LineSpan,
    pub target: CallTarget,
    /// Lowered callee expression and arguments (nested calls live here)
    pub children: Vec<SyntaxNode>,
}

/// Constructs that are neither declarations, imports nor calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtherKind {
    /// `if` / `elif`
    Conditional,
    /// `for` / `while`
    Loop,
    /// `try`
    Try,
    /// `except` / `except*`
    ExceptHandler,
    /// One binary `and` / `or`
    BooleanOperator,
    /// Any other statement
    Statement,
}

impl OtherKind {
    /// Whether this construct adds a decision point to complexity.
    pub fn is_branching(&self) -> bool {
        !matches!(self, OtherKind::Statement)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtherNode {
    pub kind: OtherKind,
    pub span: LineSpan,
    pub children: Vec<SyntaxNode>,
}

/// Lowered syntax node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxNode {
    FunctionDecl(FunctionDecl),
    ClassDecl(ClassDecl),
    Import(ImportDecl),
    Call(CallSite),
    Other(OtherNode),
}

impl SyntaxNode {
    pub fn span(&self) -> LineSpan {
        match self {
            SyntaxNode::FunctionDecl(f) => f.span,
            SyntaxNode::ClassDecl(c) => c.span,
            SyntaxNode::Import(i) => i.span,
            SyntaxNode::Call(c) => c.span,
            SyntaxNode::Other(o) => o.span,
        }
    }

    /// Direct children. Imports have none.
    pub fn children(&self) -> &[SyntaxNode] {
        match self {
            SyntaxNode::FunctionDecl(f) => &f.children,
            SyntaxNode::ClassDecl(c) => &c.children,
            SyntaxNode::Import(_) => &[],
            SyntaxNode::Call(c) => &c.children,
            SyntaxNode::Other(o) => &o.children,
        }
    }

    /// Pre-order iterator over this node and all of its descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Pre-order traversal; see [`SyntaxNode::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

/// Result of parsing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxTree {
    /// Lowered module body, in source order
    pub body: Vec<SyntaxNode>,
}

impl SyntaxTree {
    /// Pre-order traversal over every node in the module.
    pub fn walk(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.body.iter().flat_map(SyntaxNode::descendants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stmt(line: usize, children: Vec<SyntaxNode>) -> SyntaxNode {
        SyntaxNode::Other(OtherNode {
            kind: OtherKind::Statement,
            span: LineSpan::new(line, line),
            children,
        })
    }

    #[test]
    fn test_line_span_never_inverted() {
        let span = LineSpan::new(5, 3);
        assert_eq!(span.start_line, 5);
        assert_eq!(span.end_line, 5);
    }

    #[test]
    fn test_param_render() {
        let p = Param {
            kind: ParamKind::Positional,
            name: "x".into(),
            annotation: Some("int".into()),
            default: Some("5".into()),
        };
        assert_eq!(p.render(), "x: int = 5");

        let p = Param {
            kind: ParamKind::VarKeyword,
            name: "kw".into(),
            annotation: None,
            default: None,
        };
        assert_eq!(p.render(), "**kw");
    }

    #[test]
    fn test_descendants_preorder() {
        let tree = SyntaxTree {
            body: vec![
                stmt(1, vec![stmt(2, vec![]), stmt(3, vec![])]),
                stmt(4, vec![]),
            ],
        };
        let lines: Vec<usize> = tree.walk().map(|n| n.span().start_line).collect();
        assert_eq!(lines, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_call_target_resolvable_name() {
        assert_eq!(CallTarget::Name("f".into()).resolvable_name(), Some("f"));
        assert_eq!(CallTarget::Attribute("m".into()).resolvable_name(), Some("m"));
        assert_eq!(CallTarget::Dynamic.resolvable_name(), None);
    }
}
