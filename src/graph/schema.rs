//! Graph store schema
//!
//! One node table keyed by entity name and one edge table per relation
//! kind. Creation is idempotent: a table that already exists counts as
//! created.

use rusqlite::Connection;

use crate::relations::RelationKind;

/// Node table. Stub rows carry only `name`.
pub const ENTITY_DDL: &str = "CREATE TABLE Entity (
    name TEXT PRIMARY KEY,
    entity_type TEXT,
    source TEXT,
    start_line INTEGER,
    end_line INTEGER,
    content TEXT
)";

/// Edge table for one relation kind.
pub fn relation_ddl(kind: RelationKind) -> String {
    format!(
        "CREATE TABLE {} (
            from_name TEXT NOT NULL,
            to_name TEXT NOT NULL,
            PRIMARY KEY (from_name, to_name)
        )",
        kind.table()
    )
}

/// Reverse lookup index (callers, containers).
fn reverse_index_ddl(kind: RelationKind) -> String {
    format!(
        "CREATE INDEX idx_{}_to ON {}(to_name)",
        kind.table().to_ascii_lowercase(),
        kind.table()
    )
}

/// True for the failure SQLite reports when a table or index is created twice.
pub fn is_already_exists(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("already exists"))
}

fn create(conn: &Connection, ddl: &str) -> Result<(), rusqlite::Error> {
    match conn.execute(ddl, []) {
        Ok(_) => Ok(()),
        Err(e) if is_already_exists(&e) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Create every table and index that is missing.
pub fn ensure_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    create(conn, ENTITY_DDL)?;
    for kind in RelationKind::ALL {
        create(conn, &relation_ddl(kind))?;
        create(conn, &reverse_index_ddl(kind))?;
    }
    Ok(())
}
