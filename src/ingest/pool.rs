//! Thread-local parser pool for reusing tree-sitter Parser instances.
//!
//! Chunking a batch runs documents on rayon workers; each worker thread
//! keeps one Python parser and reuses it for every file it handles.
//!
//! - Thread-local storage: no locks, no sharing between threads
//! - Lazy initialization: parser created on first use per thread

use super::ParseError;
use std::cell::RefCell;

thread_local! {
    static PYTHON_PARSER: RefCell<Option<tree_sitter::Parser>> = const { RefCell::new(None) };
}

/// Create a parser configured for the Python grammar.
pub fn new_python_parser() -> Result<tree_sitter::Parser, ParseError> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_python::language())
        .map_err(|e| ParseError::Language(e.to_string()))?;
    Ok(parser)
}

/// Run `f` with this thread's Python parser, creating it on first use.
pub fn with_python_parser<F, R>(f: F) -> Result<R, ParseError>
where
    F: FnOnce(&mut tree_sitter::Parser) -> R,
{
    PYTHON_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(new_python_parser()?);
        }
        match slot.as_mut() {
            Some(parser) => Ok(f(parser)),
            None => Err(ParseError::Language("parser slot empty after initialization".into())),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_reused_within_thread() {
        let first = with_python_parser(|p| p as *const tree_sitter::Parser as usize).unwrap();
        let second = with_python_parser(|p| p as *const tree_sitter::Parser as usize).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_pooled_parser_parses() {
        let has_error = with_python_parser(|p| {
            p.parse("def f():\n    return 1\n", None)
                .map(|t| t.root_node().has_error())
        })
        .unwrap();
        assert_eq!(has_error, Some(false));
    }
}
