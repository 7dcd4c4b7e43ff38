//! Indexing configuration loaded from TOML.
//!
//! Every key is optional; missing keys take the defaults below.
//!
//! ```toml
//! strategy = "graph"
//! source_identifier = "my-repo"
//! embedding_model = "sentence-transformers/all-mpnet-base-v2"
//! graph_db_path = "code_graph.db"
//! retrieval_k = 2
//! graph_depth = 2
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error_codes;

pub const DEFAULT_STRATEGY: &str = "function";
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-mpnet-base-v2";
pub const DEFAULT_GRAPH_DB_PATH: &str = "code_graph.db";
pub const DEFAULT_RETRIEVAL_K: usize = 2;
pub const DEFAULT_GRAPH_DEPTH: usize = 2;

/// Configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => error_codes::CKG_CFG_001_READ,
            ConfigError::Parse(_) => error_codes::CKG_CFG_002_PARSE,
        }
    }
}

/// Settings for one indexing/retrieval pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Chunking strategy name; validated when the pipeline is built
    pub strategy: String,
    /// Optional source label folded into the collection name
    pub source_identifier: Option<String>,
    /// Embedding model id; its last path segment names the collection
    pub embedding_model: String,
    /// Graph store file, used by the `graph` strategy only
    pub graph_db_path: PathBuf,
    /// Default number of vector hits per query
    pub retrieval_k: usize,
    /// Default CALLS depth for graph expansion
    pub graph_depth: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            strategy: DEFAULT_STRATEGY.to_string(),
            source_identifier: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            graph_db_path: PathBuf::from(DEFAULT_GRAPH_DB_PATH),
            retrieval_k: DEFAULT_RETRIEVAL_K,
            graph_depth: DEFAULT_GRAPH_DEPTH,
        }
    }
}

impl IndexConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
