//! SQLite connection management for Messages.db.
//!
//! CHANGELOG:
//! - 10/19/2026 - Open an explicit path (--db) instead of the default only
//! - 01/10/2026 - Initial stub

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Default Messages.db path.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Library")
        .join("Messages")
        .join("chat.db")
}

/// Resolve a user-supplied `--db` value (tilde and env vars expanded), or
/// fall back to the default path.
pub fn resolve_db_path(arg: Option<&str>) -> PathBuf {
    match arg {
        Some(raw) => shellexpand::full(raw)
            .map(|p| PathBuf::from(p.as_ref()))
            .unwrap_or_else(|_| PathBuf::from(raw)),
        None => default_db_path(),
    }
}

/// Open a read-only connection to a Messages database.
pub fn open_db_at(db_path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        db_path,
        rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("Failed to open Messages database at {:?}", db_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_db_path() {
        let path = default_db_path();
        assert!(path.ends_with("Library/Messages/chat.db"));
    }

    #[test]
    fn test_resolve_db_path_expands_tilde() {
        let path = resolve_db_path(Some("~/copy/chat.db"));
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("copy/chat.db"));
        assert_eq!(resolve_db_path(None), default_db_path());
    }

    #[test]
    fn test_open_missing_db_fails() {
        let err = open_db_at(Path::new("/nonexistent/chat.db")).unwrap_err();
        assert!(err.to_string().contains("Failed to open Messages database"));
    }
}
