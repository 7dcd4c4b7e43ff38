//! Process-wide registry of open graph store connections.
//!
//! Opening the same database path twice yields the same shared connection,
//! so every handle in the process serializes through one lock instead of
//! contending for the file. Entries hold weak references and disappear
//! once the last handle is dropped.

use rusqlite::Connection;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use super::schema::ensure_schema;
use super::GraphStoreError;

pub type SharedConnection = Arc<Mutex<Connection>>;

fn registry() -> &'static Mutex<HashMap<PathBuf, Weak<Mutex<Connection>>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<PathBuf, Weak<Mutex<Connection>>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Parent directory and file name of a store path.
fn split_path(path: &Path) -> Result<(PathBuf, &OsStr), GraphStoreError> {
    let file_name = path.file_name().ok_or_else(|| {
        GraphStoreError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("graph store path has no file name: {}", path.display()),
        ))
    })?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((parent, file_name))
}

/// Registry key: canonical parent directory joined with the file name.
///
/// The parent directory is created if missing so the path can be
/// canonicalized before the database file itself exists.
pub fn canonical_key(path: &Path) -> Result<PathBuf, GraphStoreError> {
    let (parent, file_name) = split_path(path)?;
    std::fs::create_dir_all(&parent)?;
    Ok(parent.canonicalize()?.join(file_name))
}

/// Registry key for `path` without touching the filesystem beyond
/// resolving its parent. `None` when the parent does not exist.
fn existing_key(path: &Path) -> Option<PathBuf> {
    let (parent, file_name) = split_path(path).ok()?;
    Some(parent.canonicalize().ok()?.join(file_name))
}

/// Shared connection for `path`, opening it and creating the schema on
/// first use.
pub fn acquire(path: &Path) -> Result<(PathBuf, SharedConnection), GraphStoreError> {
    let key = canonical_key(path)?;
    let mut map = registry().lock().map_err(|_| GraphStoreError::Poisoned)?;
    map.retain(|_, weak| weak.strong_count() > 0);

    if let Some(existing) = map.get(&key).and_then(Weak::upgrade) {
        tracing::debug!(path = %key.display(), "reusing graph store connection");
        return Ok((key, existing));
    }

    let conn = Connection::open(&key)?;
    ensure_schema(&conn)?;
    let shared = Arc::new(Mutex::new(conn));
    map.insert(key.clone(), Arc::downgrade(&shared));
    tracing::debug!(path = %key.display(), "opened graph store");
    Ok((key, shared))
}

/// Whether a live connection is registered for `path`.
///
/// Never creates directories; a path under a missing directory is not open.
pub fn is_open(path: &Path) -> bool {
    let Some(key) = existing_key(path) else {
        return false;
    };
    registry()
        .lock()
        .map(|map| map.get(&key).is_some_and(|w| w.strong_count() > 0))
        .unwrap_or(false)
}
