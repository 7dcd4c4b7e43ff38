//! Vector-store collection naming.

/// Longest collection name the vector store accepts.
pub const MAX_COLLECTION_NAME_LEN: usize = 48;

/// `{source}_{strategy}_{model}` (or `{strategy}_{model}`), cut to
/// [`MAX_COLLECTION_NAME_LEN`] characters.
///
/// The source is sanitized to alphanumerics and `_`; the model keeps only
/// its last `/` segment with `-` and `.` turned into `_`.
///
/// # Example
/// ```rust
/// use chunkgraph::chunking::collection_name;
/// assert_eq!(
///     collection_name(Some("my-repo"), "ast", "sentence-transformers/all-mpnet-base-v2"),
///     "my_repo_ast_all_mpnet_base_v2"
/// );
/// ```
pub fn collection_name(source: Option<&str>, strategy: &str, model: &str) -> String {
    let model_slug = model
        .rsplit('/')
        .next()
        .unwrap_or(model)
        .replace(['-', '.'], "_");

    let name = match source.filter(|s| !s.is_empty()) {
        Some(source) => {
            let safe_source: String = source
                .chars()
                .map(|c| if c.is_alphanumeric() { c } else { '_' })
                .collect();
            format!("{}_{}_{}", safe_source, strategy, model_slug)
        }
        None => format!("{}_{}", strategy, model_slug),
    };

    name.chars().take(MAX_COLLECTION_NAME_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_source() {
        assert_eq!(collection_name(None, "graph", "qwen/qwen3-32b"), "graph_qwen3_32b");
        assert_eq!(collection_name(Some(""), "graph", "qwen3.5"), "graph_qwen3_5");
    }

    #[test]
    fn test_truncated_to_limit() {
        let name = collection_name(
            Some("/home/user/projects/some-very-long-repository-name"),
            "context",
            "sentence-transformers/all-mpnet-base-v2",
        );
        assert_eq!(name.chars().count(), MAX_COLLECTION_NAME_LEN);
        assert!(name.starts_with("_home_user_projects_some_very_long"));
    }
}
