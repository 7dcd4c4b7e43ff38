//! Stable error codes
//!
//! Error codes follow the pattern: CKG-{CATEGORY}-{3-digit number}
//!
//! Categories (1-5 uppercase letters):
//! - PARSE: source could not be turned into a syntax tree
//! - RNDR: declaration text could not be reconstructed
//! - GRAPH: graph store failures
//! - STRAT: chunking strategy lookup
//! - CFG: configuration loading
//!
//! Each error code is stable and should not be reused.

/// Source contains syntax errors
pub const CKG_PARSE_001_SYNTAX: &str = "CKG-PARSE-001";

/// Grammar could not be loaded into the parser
pub const CKG_PARSE_002_LANGUAGE: &str = "CKG-PARSE-002";

/// Parser produced no tree (cancelled or timed out)
pub const CKG_PARSE_003_NO_TREE: &str = "CKG-PARSE-003";

/// Source nests deeper than the lowering limit
pub const CKG_PARSE_004_TOO_DEEP: &str = "CKG-PARSE-004";

/// Node text is not valid UTF-8
pub const CKG_RNDR_001_INVALID_UTF8: &str = "CKG-RNDR-001";

/// Node span lies outside the source
pub const CKG_RNDR_002_OUT_OF_BOUNDS: &str = "CKG-RNDR-002";

/// Storage engine failure
pub const CKG_GRAPH_001_STORAGE: &str = "CKG-GRAPH-001";

/// Storage directory could not be prepared
pub const CKG_GRAPH_002_IO: &str = "CKG-GRAPH-002";

/// Shared store handle poisoned by a panicking writer
pub const CKG_GRAPH_003_POISONED: &str = "CKG-GRAPH-003";

/// Requested chunking strategy is not registered
pub const CKG_STRAT_001_UNKNOWN: &str = "CKG-STRAT-001";

/// Configuration file could not be read
pub const CKG_CFG_001_READ: &str = "CKG-CFG-001";

/// Configuration file is not valid TOML for the expected shape
pub const CKG_CFG_002_PARSE: &str = "CKG-CFG-002";

/// Error code documentation
///
/// | Code | Description | Remediation |
/// |------|-------------|-------------|
/// | CKG-PARSE-001 | Syntax error in source | File is skipped or emitted whole depending on strategy |
/// | CKG-PARSE-002 | Grammar load failed | Rebuild with matching tree-sitter versions |
/// | CKG-PARSE-003 | No tree produced | Retry; parser was interrupted |
/// | CKG-PARSE-004 | Nesting too deep | File is skipped or emitted whole depending on strategy |
/// | CKG-RNDR-001 | Invalid UTF-8 in node | Placeholder text is used |
/// | CKG-RNDR-002 | Span out of bounds | Placeholder text is used |
/// | CKG-GRAPH-001 | SQLite failure | Check the database file; clear and re-index |
/// | CKG-GRAPH-002 | I/O failure | Check directory permissions |
/// | CKG-GRAPH-003 | Poisoned handle | Restart the process |
/// | CKG-STRAT-001 | Unknown strategy | Use one of: function, ast, context, graph |
/// | CKG-CFG-001 | Config unreadable | Check the path |
/// | CKG-CFG-002 | Config malformed | Fix the TOML |
pub const ERROR_CODE_DOCUMENTATION: &str = "Error code documentation available in source";
