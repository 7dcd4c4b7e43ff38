//! Source text reconstruction for annotations, defaults, decorators and
//! docstring literals.
//!
//! Rendering is best-effort: callers that cannot get text for a node use
//! [`placeholder`] instead of failing the whole extraction.

use crate::common::safe_slice;
use crate::error_codes;

/// Failure to reconstruct the text of a node.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("{kind} node at line {line} is not valid UTF-8")]
    InvalidUtf8 { kind: &'static str, line: usize },

    #[error("{kind} node at line {line} lies outside the source")]
    OutOfBounds { kind: &'static str, line: usize },
}

impl RenderError {
    pub fn code(&self) -> &'static str {
        match self {
            RenderError::InvalidUtf8 { .. } => error_codes::CKG_RNDR_001_INVALID_UTF8,
            RenderError::OutOfBounds { .. } => error_codes::CKG_RNDR_002_OUT_OF_BOUNDS,
        }
    }
}

/// Raw source text of a node.
pub fn node_text<'a>(node: &tree_sitter::Node, source: &'a [u8]) -> Result<&'a str, RenderError> {
    let line = node.start_position().row + 1;
    let bytes = safe_slice(source, node.start_byte(), node.end_byte()).ok_or(
        RenderError::OutOfBounds {
            kind: node.kind(),
            line,
        },
    )?;
    std::str::from_utf8(bytes).map_err(|_| RenderError::InvalidUtf8 {
        kind: node.kind(),
        line,
    })
}

/// Expression text normalized onto a single line.
pub fn render_expr(node: &tree_sitter::Node, source: &[u8]) -> Result<String, RenderError> {
    node_text(node, source).map(crate::common::single_line)
}

/// Coarse stand-in used when a node cannot be rendered.
pub fn placeholder(node: &tree_sitter::Node) -> String {
    format!("<{}>", node.kind())
}

/// Render, falling back to the placeholder and logging the failure.
pub fn render_or_placeholder(node: &tree_sitter::Node, source: &[u8]) -> String {
    match render_expr(node, source) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(code = e.code(), "render failed: {}", e);
            placeholder(node)
        }
    }
}

/// Render a `decorator` node without its leading `@`.
pub fn render_decorator(node: &tree_sitter::Node, source: &[u8]) -> String {
    let mut cursor = node.walk();
    let expr = node
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment");
    match expr {
        Some(expr) => render_or_placeholder(&expr, source),
        None => match render_expr(node, source) {
            Ok(text) => text.trim_start_matches('@').trim().to_string(),
            Err(_) => placeholder(node),
        },
    }
}

/// Evaluate a string literal the way the interpreter would for a docstring.
///
/// Returns `None` for bytes and f-string literals, which are never
/// docstrings, and for text that is not a recognizable literal.
pub fn decode_string_literal(literal: &str) -> Option<String> {
    let quote_at = literal.find(['"', '\''])?;
    let prefix = literal[..quote_at].to_ascii_lowercase();
    if prefix.contains('f') || prefix.contains('b') {
        return None;
    }
    if !prefix.chars().all(|c| c == 'r' || c == 'u') {
        return None;
    }
    let raw = prefix.contains('r');
    let quoted = &literal[quote_at..];

    let quote = if quoted.starts_with("\"\"\"") {
        "\"\"\""
    } else if quoted.starts_with("'''") {
        "'''"
    } else if quoted.starts_with('"') {
        "\""
    } else {
        "'"
    };
    if quoted.len() < quote.len() * 2 || !quoted.ends_with(quote) {
        return None;
    }
    let body = &quoted[quote.len()..quoted.len() - quote.len()];

    if raw {
        Some(body.to_string())
    } else {
        Some(unescape(body))
    }
}

fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            '\n' => {}
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{0b}'),
            'x' => push_hex(&mut out, &mut chars, 2, "\\x"),
            'u' => push_hex(&mut out, &mut chars, 4, "\\u"),
            'U' => push_hex(&mut out, &mut chars, 8, "\\U"),
            '0'..='7' => {
                let mut value = next.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
            }
            other => {
                // Unknown escapes (including \N{...}) are kept verbatim
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

fn push_hex(
    out: &mut String,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    digits: usize,
    original: &str,
) {
    let mut hex = String::with_capacity(digits);
    for _ in 0..digits {
        match chars.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                hex.push(*c);
                chars.next();
            }
            _ => break,
        }
    }
    let decoded = if hex.len() == digits {
        u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32)
    } else {
        None
    };
    match decoded {
        Some(c) => out.push(c),
        None => {
            out.push_str(original);
            out.push_str(&hex);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_literals() {
        assert_eq!(decode_string_literal("\"hello\"").as_deref(), Some("hello"));
        assert_eq!(decode_string_literal("'hello'").as_deref(), Some("hello"));
        assert_eq!(
            decode_string_literal("\"\"\"Multi\n    line.\"\"\"").as_deref(),
            Some("Multi\n    line.")
        );
        assert_eq!(decode_string_literal("''''''").as_deref(), Some(""));
    }

    #[test]
    fn test_decode_escapes() {
        assert_eq!(decode_string_literal(r#""a\tb\n""#).as_deref(), Some("a\tb\n"));
        assert_eq!(decode_string_literal(r#""it\'s""#).as_deref(), Some("it's"));
        assert_eq!(decode_string_literal(r#""\x41é""#).as_deref(), Some("A\u{e9}"));
        assert_eq!(decode_string_literal(r#""\101""#).as_deref(), Some("A"));
        assert_eq!(decode_string_literal(r#""\d""#).as_deref(), Some("\\d"));
        assert_eq!(decode_string_literal("\"a\\\nb\"").as_deref(), Some("ab"));
    }

    #[test]
    fn test_decode_prefixes() {
        assert_eq!(decode_string_literal(r#"r"\d+""#).as_deref(), Some("\\d+"));
        assert_eq!(decode_string_literal(r#"u"x""#).as_deref(), Some("x"));
        assert_eq!(decode_string_literal(r#"Rb"x""#), None);
        assert_eq!(decode_string_literal(r#"f"x""#), None);
        assert_eq!(decode_string_literal(r#"b"x""#), None);
    }

    #[test]
    fn test_decode_rejects_non_literals() {
        assert_eq!(decode_string_literal("value"), None);
        assert_eq!(decode_string_literal("\"unterminated"), None);
    }

    #[test]
    fn test_render_error_codes() {
        let e = RenderError::InvalidUtf8 { kind: "type", line: 3 };
        assert_eq!(e.code(), "CKG-RNDR-001");
        assert_eq!(e.to_string(), "type node at line 3 is not valid UTF-8");
    }
}
