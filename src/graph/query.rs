//! Traversal queries over the code knowledge graph
//!
//! All queries return content-bearing nodes only; stubs are walked through
//! but never returned.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;

use super::{CodeKnowledgeGraph, GraphNode, GraphStoreError};

const HAS_CONTENT: &str = "e.content IS NOT NULL AND e.content != ''";

fn callees(conn: &Connection, name: &str) -> Result<Vec<String>, rusqlite::Error> {
    let mut stmt =
        conn.prepare_cached("SELECT to_name FROM CALLS WHERE from_name = ?1 ORDER BY to_name")?;
    let rows = stmt.query_map(params![name], |row| row.get(0))?;
    rows.collect()
}

fn node_with_content(conn: &Connection, name: &str) -> Result<Option<GraphNode>, rusqlite::Error> {
    conn.query_row(
        &format!(
            "SELECT {} FROM Entity e WHERE e.name = ?1 AND {}",
            GraphNode::COLUMNS,
            HAS_CONTENT
        ),
        params![name],
        GraphNode::from_row,
    )
    .optional()
}

/// Nodes joined through `table` on one end, filtered by the other end.
fn related(
    conn: &Connection,
    table: &str,
    join_on: &str,
    filter_on: &str,
    name: &str,
) -> Result<Vec<GraphNode>, rusqlite::Error> {
    let sql = format!(
        "SELECT e.name, e.entity_type, e.source, e.start_line, e.end_line, e.content
            FROM {table} r JOIN Entity e ON e.name = r.{join_on}
            WHERE r.{filter_on} = ?1 AND {HAS_CONTENT}
            ORDER BY e.name"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params![name], GraphNode::from_row)?;
    rows.collect()
}

impl CodeKnowledgeGraph {
    /// Nodes reachable from `start_name` over at most `max_depth` CALLS hops.
    ///
    /// Breadth-first, callees visited in name order; each node appears
    /// once, at its shallowest depth. Depth 0 yields just the start node.
    pub fn get_call_chain(
        &self,
        start_name: &str,
        max_depth: usize,
    ) -> Result<Vec<GraphNode>, GraphStoreError> {
        self.with_conn(|conn| {
            let mut visited: HashSet<String> = HashSet::new();
            visited.insert(start_name.to_string());
            let mut order = vec![start_name.to_string()];
            let mut frontier = vec![start_name.to_string()];

            for _ in 0..max_depth {
                let mut next = Vec::new();
                for name in &frontier {
                    for callee in callees(conn, name)? {
                        if visited.insert(callee.clone()) {
                            order.push(callee.clone());
                            next.push(callee);
                        }
                    }
                }
                if next.is_empty() {
                    break;
                }
                frontier = next;
            }

            let mut nodes = Vec::new();
            for name in &order {
                if let Some(node) = node_with_content(conn, name)? {
                    nodes.push(node);
                }
            }
            Ok(nodes)
        })
    }

    /// Nodes with a direct CALLS edge into `entity_name`, sorted by name.
    pub fn get_callers(&self, entity_name: &str) -> Result<Vec<GraphNode>, GraphStoreError> {
        self.with_conn(|conn| Ok(related(conn, "CALLS", "from_name", "to_name", entity_name)?))
    }

    /// The class node followed by its CONTAINS targets, sorted by name.
    ///
    /// Empty when the class itself has no content.
    pub fn get_class_with_methods(
        &self,
        class_name: &str,
    ) -> Result<Vec<GraphNode>, GraphStoreError> {
        self.with_conn(|conn| {
            let Some(class) = node_with_content(conn, class_name)? else {
                return Ok(Vec::new());
            };
            let mut nodes = vec![class];
            for method in related(conn, "CONTAINS", "to_name", "from_name", class_name)? {
                if method.name != class_name {
                    nodes.push(method);
                }
            }
            Ok(nodes)
        })
    }

    /// Union of call chains from every seed, first occurrence wins.
    pub fn hybrid_search<S: AsRef<str>>(
        &self,
        entity_names: &[S],
        max_depth: usize,
    ) -> Result<Vec<GraphNode>, GraphStoreError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        for name in entity_names {
            for node in self.get_call_chain(name.as_ref(), max_depth)? {
                if seen.insert(node.name.clone()) {
                    out.push(node);
                }
            }
        }
        Ok(out)
    }
}
