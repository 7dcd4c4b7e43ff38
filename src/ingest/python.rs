//! Python syntax tree adapter using tree-sitter-python.
//!
//! Parses one file and lowers the concrete tree into [`SyntaxTree`]:
//! functions, classes, imports, calls and branching constructs, each with
//! 1-based inclusive line spans. A tree with any ERROR or MISSING node is
//! rejected as a whole; there is no partial recovery.

use super::pool;
use super::render::{decode_string_literal, node_text, render_decorator, render_or_placeholder};
use super::syntax::{
    CallSite, CallTarget, ClassDecl, FunctionDecl, ImportDecl, LineSpan, OtherKind, OtherNode,
    Param, ParamKind, SyntaxNode, SyntaxTree,
};
use super::ParseError;

/// Parser that turns Python source text into a [`SyntaxTree`].
///
/// Pure function: Input text → Output tree or [`ParseError`].
/// No filesystem access. No global state.
pub struct PythonParser {
    parser: tree_sitter::Parser,
}

impl PythonParser {
    /// Create a new parser for Python source code.
    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            parser: pool::new_python_parser()?,
        })
    }

    /// Parse and lower one file.
    pub fn parse(&mut self, text: &str) -> Result<SyntaxTree, ParseError> {
        Self::parse_with_parser(&mut self.parser, text)
    }

    /// Parse using an external parser (for parser pooling).
    pub fn parse_with_parser(
        parser: &mut tree_sitter::Parser,
        text: &str,
    ) -> Result<SyntaxTree, ParseError> {
        let tree = parser.parse(text, None).ok_or(ParseError::NoTree)?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(ParseError::Syntax {
                line: first_error_line(&root),
            });
        }
        check_structure(&root)?;

        let source = text.as_bytes();
        Ok(SyntaxTree {
            body: lower_children(&root, source),
        })
    }
}

/// Parse with this thread's pooled parser.
pub fn parse_source(text: &str) -> Result<SyntaxTree, ParseError> {
    pool::with_python_parser(|parser| PythonParser::parse_with_parser(parser, text))?
}

/// 1-based line of the first ERROR or MISSING node in document order.
fn first_error_line(root: &tree_sitter::Node) -> usize {
    let mut stack = vec![*root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return node.start_position().row + 1;
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    root.start_position().row + 1
}

/// Deepest concrete-tree nesting accepted before lowering.
///
/// Lowering recurses once per level, so anything deeper is rejected up
/// front instead of exhausting the thread's stack.
pub const MAX_NESTING_DEPTH: usize = 400;

/// Reject trees tree-sitter accepts but Python does not, and trees too
/// deep to lower.
///
/// - a `block` with no statements (`def f():` at end of file, or an
///   unindented body)
/// - Python 2 `print`/`exec` statements
///
/// Walks iteratively in document order, so the first offending node wins.
fn check_structure(root: &tree_sitter::Node) -> Result<(), ParseError> {
    let mut stack = vec![(*root, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        let line = node.start_position().row + 1;
        if depth > MAX_NESTING_DEPTH {
            return Err(ParseError::TooDeep {
                line,
                limit: MAX_NESTING_DEPTH,
            });
        }
        match node.kind() {
            "print_statement" | "exec_statement" => return Err(ParseError::Syntax { line }),
            "block" if !has_statement(&node) => return Err(ParseError::Syntax { line }),
            _ => {}
        }

        let mut cursor = node.walk();
        let children: Vec<_> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
    }
    Ok(())
}

fn has_statement(block: &tree_sitter::Node) -> bool {
    let mut cursor = block.walk();
    let found = block
        .named_children(&mut cursor)
        .any(|c| c.kind() != "comment");
    found
}

fn lower_children(node: &tree_sitter::Node, source: &[u8]) -> Vec<SyntaxNode> {
    let mut cursor = node.walk();
    let mut out = Vec::new();
    for child in node.named_children(&mut cursor) {
        out.extend(lower(&child, source));
    }
    out
}

fn lower(node: &tree_sitter::Node, source: &[u8]) -> Vec<SyntaxNode> {
    match node.kind() {
        "comment" => Vec::new(),
        "function_definition" => lower_function(node, source, Vec::new(), Vec::new())
            .map(SyntaxNode::FunctionDecl)
            .into_iter()
            .collect(),
        "class_definition" => lower_class(node, source, Vec::new(), Vec::new())
            .map(SyntaxNode::ClassDecl)
            .into_iter()
            .collect(),
        "decorated_definition" => lower_decorated(node, source),
        "import_statement" | "import_from_statement" | "future_import_statement" => {
            vec![SyntaxNode::Import(lower_import(node, source))]
        }
        "call" => vec![SyntaxNode::Call(lower_call(node, source))],
        "if_statement" | "elif_clause" => vec![other(node, source, OtherKind::Conditional)],
        "for_statement" | "while_statement" => vec![other(node, source, OtherKind::Loop)],
        "try_statement" => vec![other(node, source, OtherKind::Try)],
        "except_clause" | "except_group_clause" => {
            vec![other(node, source, OtherKind::ExceptHandler)]
        }
        "boolean_operator" => vec![other(node, source, OtherKind::BooleanOperator)],
        kind if kind.ends_with("_statement") => vec![other(node, source, OtherKind::Statement)],
        _ => lower_children(node, source),
    }
}

fn other(node: &tree_sitter::Node, source: &[u8], kind: OtherKind) -> SyntaxNode {
    SyntaxNode::Other(OtherNode {
        kind,
        span: LineSpan::of_node(node),
        children: lower_children(node, source),
    })
}

fn lower_decorated(node: &tree_sitter::Node, source: &[u8]) -> Vec<SyntaxNode> {
    let mut decorators = Vec::new();
    let mut decorator_nodes = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "decorator" {
            decorators.push(render_decorator(&child, source));
            decorator_nodes.extend(lower_children(&child, source));
        }
    }

    let Some(definition) = node.child_by_field_name("definition") else {
        return decorator_nodes;
    };
    let lowered = match definition.kind() {
        "function_definition" => lower_function(&definition, source, decorators, decorator_nodes)
            .map(SyntaxNode::FunctionDecl),
        "class_definition" => lower_class(&definition, source, decorators, decorator_nodes)
            .map(SyntaxNode::ClassDecl),
        _ => None,
    };
    match lowered {
        Some(decl) => vec![decl],
        None => lower_children(node, source),
    }
}

fn identifier(node: &tree_sitter::Node, field: &str, source: &[u8]) -> Option<String> {
    let child = node.child_by_field_name(field)?;
    node_text(&child, source).ok().map(str::to_string)
}

fn lower_function(
    node: &tree_sitter::Node,
    source: &[u8],
    decorators: Vec<String>,
    mut children: Vec<SyntaxNode>,
) -> Option<FunctionDecl> {
    let name = identifier(node, "name", source)?;

    let mut cursor = node.walk();
    let is_async = node.children(&mut cursor).any(|c| c.kind() == "async");

    let params = match node.child_by_field_name("parameters") {
        Some(parameters) => {
            children.extend(lower_children(&parameters, source));
            lower_params(&parameters, source)
        }
        None => Vec::new(),
    };

    let return_type = node.child_by_field_name("return_type").map(|ret| {
        children.extend(lower(&ret, source));
        render_or_placeholder(&ret, source)
    });

    let body = node.child_by_field_name("body");
    let docstring = body.as_ref().and_then(|b| docstring_of(b, source));
    if let Some(body) = &body {
        children.extend(lower_children(body, source));
    }

    Some(FunctionDecl {
        name,
        span: LineSpan::of_declaration(node),
        is_async,
        params,
        return_type,
        decorators,
        docstring,
        children,
    })
}

fn lower_class(
    node: &tree_sitter::Node,
    source: &[u8],
    decorators: Vec<String>,
    mut children: Vec<SyntaxNode>,
) -> Option<ClassDecl> {
    let name = identifier(node, "name", source)?;

    let mut bases = Vec::new();
    if let Some(superclasses) = node.child_by_field_name("superclasses") {
        let mut cursor = superclasses.walk();
        for arg in superclasses.named_children(&mut cursor) {
            match arg.kind() {
                "keyword_argument" | "dictionary_splat" | "comment" => {}
                _ => bases.push(render_or_placeholder(&arg, source)),
            }
        }
        children.extend(lower_children(&superclasses, source));
    }

    let body = node.child_by_field_name("body");
    let docstring = body.as_ref().and_then(|b| docstring_of(b, source));
    if let Some(body) = &body {
        children.extend(lower_children(body, source));
    }

    Some(ClassDecl {
        name,
        span: LineSpan::of_declaration(node),
        bases,
        decorators,
        docstring,
        children,
    })
}

/// Parameters in declaration order, classified by role.
///
/// Plain parameters after a bare `*` or a `*args` are keyword-only.
fn lower_params(parameters: &tree_sitter::Node, source: &[u8]) -> Vec<Param> {
    let mut params = Vec::new();
    let mut keyword_only = false;
    let plain = |keyword_only: bool| {
        if keyword_only {
            ParamKind::KeywordOnly
        } else {
            ParamKind::Positional
        }
    };

    let mut cursor = parameters.walk();
    for child in parameters.children(&mut cursor) {
        match child.kind() {
            "keyword_separator" | "*" => keyword_only = true,
            "list_splat_pattern" => {
                keyword_only = true;
                params.push(splat(&child, source, ParamKind::VarPositional, None));
            }
            "dictionary_splat_pattern" => {
                params.push(splat(&child, source, ParamKind::VarKeyword, None));
            }
            "typed_parameter" => {
                let type_node = child.child_by_field_name("type");
                let annotation = type_node.map(|t| render_or_placeholder(&t, source));
                let mut inner_cursor = child.walk();
                let pattern = child
                    .named_children(&mut inner_cursor)
                    .find(|n| Some(n.id()) != type_node.map(|t| t.id()) && n.kind() != "comment");
                let Some(pattern) = pattern else { continue };
                match pattern.kind() {
                    "list_splat_pattern" => {
                        keyword_only = true;
                        params.push(splat(&pattern, source, ParamKind::VarPositional, annotation));
                    }
                    "dictionary_splat_pattern" => {
                        params.push(splat(&pattern, source, ParamKind::VarKeyword, annotation));
                    }
                    _ => params.push(Param {
                        kind: plain(keyword_only),
                        name: render_or_placeholder(&pattern, source),
                        annotation,
                        default: None,
                    }),
                }
            }
            "default_parameter" | "typed_default_parameter" => {
                let Some(name) = child.child_by_field_name("name") else {
                    continue;
                };
                params.push(Param {
                    kind: plain(keyword_only),
                    name: render_or_placeholder(&name, source),
                    annotation: child
                        .child_by_field_name("type")
                        .map(|t| render_or_placeholder(&t, source)),
                    default: child
                        .child_by_field_name("value")
                        .map(|v| render_or_placeholder(&v, source)),
                });
            }
            "identifier" | "tuple_pattern" => params.push(Param {
                kind: plain(keyword_only),
                name: render_or_placeholder(&child, source),
                annotation: None,
                default: None,
            }),
            // `(`, `)`, `,`, `/`, positional_separator, comments
            _ => {}
        }
    }
    params
}

fn splat(
    node: &tree_sitter::Node,
    source: &[u8],
    kind: ParamKind,
    annotation: Option<String>,
) -> Param {
    let rendered = render_or_placeholder(node, source);
    Param {
        kind,
        name: rendered.trim_start_matches('*').trim().to_string(),
        annotation,
        default: None,
    }
}

/// Value of the leading bare string statement of a block, if any.
fn docstring_of(body: &tree_sitter::Node, source: &[u8]) -> Option<String> {
    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" {
        return None;
    }

    let mut inner = first.walk();
    let exprs: Vec<_> = first
        .named_children(&mut inner)
        .filter(|n| n.kind() != "comment")
        .collect();
    let [expr] = exprs.as_slice() else {
        return None;
    };

    match expr.kind() {
        "string" => decode_string_literal(node_text(expr, source).ok()?),
        "concatenated_string" => {
            let mut parts_cursor = expr.walk();
            let mut value = String::new();
            for part in expr.named_children(&mut parts_cursor) {
                if part.kind() != "string" {
                    continue;
                }
                value.push_str(&decode_string_literal(node_text(&part, source).ok()?)?);
            }
            Some(value)
        }
        _ => None,
    }
}

fn lower_import(node: &tree_sitter::Node, source: &[u8]) -> ImportDecl {
    let mut modules = Vec::new();
    match node.kind() {
        "import_statement" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                let module = match child.kind() {
                    "dotted_name" => Some(child),
                    "aliased_import" => child.child_by_field_name("name"),
                    _ => None,
                };
                if let Some(text) = module.and_then(|m| node_text(&m, source).ok()) {
                    modules.push(text.to_string());
                }
            }
        }
        "import_from_statement" => {
            if let Some(module) = node.child_by_field_name("module_name") {
                if let Ok(text) = node_text(&module, source) {
                    let name = text.trim_start_matches('.').trim();
                    if !name.is_empty() {
                        modules.push(name.to_string());
                    }
                }
            }
        }
        _ => modules.push("__future__".to_string()),
    }
    ImportDecl {
        span: LineSpan::of_node(node),
        modules,
    }
}

fn lower_call(node: &tree_sitter::Node, source: &[u8]) -> CallSite {
    let mut children = Vec::new();
    let target = match node.child_by_field_name("function") {
        Some(function) => {
            children.extend(lower(&function, source));
            match function.kind() {
                "identifier" => node_text(&function, source)
                    .map(|t| CallTarget::Name(t.to_string()))
                    .unwrap_or(CallTarget::Dynamic),
                "attribute" => function
                    .child_by_field_name("attribute")
                    .and_then(|a| node_text(&a, source).ok())
                    .map(|t| CallTarget::Attribute(t.to_string()))
                    .unwrap_or(CallTarget::Dynamic),
                _ => CallTarget::Dynamic,
            }
        }
        None => CallTarget::Dynamic,
    };
    if let Some(arguments) = node.child_by_field_name("arguments") {
        children.extend(lower(&arguments, source));
    }
    CallSite {
        span: LineSpan::of_node(node),
        target,
        children,
    }
}
