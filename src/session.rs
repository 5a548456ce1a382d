use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

const TOKEN_KEY: &str = "issuehub_token";

/// Durable home of the bearer credential. Every writer goes through
/// [`SessionStore::set`]; absence of the key means unauthenticated.
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path).context("Failed to open session database")?;
        let store = SessionStore { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS session (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    pub fn get(&self) -> Result<Option<String>> {
        let token = self
            .conn
            .query_row(
                "SELECT value FROM session WHERE key = ?1",
                [TOKEN_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(token)
    }

    pub fn set(&self, token: Option<&str>) -> Result<()> {
        match token {
            Some(value) => {
                self.conn.execute(
                    "INSERT OR REPLACE INTO session (key, value) VALUES (?1, ?2)",
                    params![TOKEN_KEY, value],
                )?;
            }
            None => {
                self.conn
                    .execute("DELETE FROM session WHERE key = ?1", [TOKEN_KEY])?;
            }
        }
        Ok(())
    }
}

/// `~/.config/issuehub`, resolved from HOME (USERPROFILE on Windows).
pub fn default_state_dir() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|value| !value.is_empty())
        .context("Unable to resolve home directory from HOME or USERPROFILE")?;
    Ok(PathBuf::from(home).join(".config").join("issuehub"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup_test_store() -> (SessionStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = SessionStore::open(&dir.path().join("session.db")).unwrap();
        (store, dir)
    }

    #[test]
    fn test_get_is_none_before_any_login() {
        let (store, _dir) = setup_test_store();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_set_then_get_roundtrips() {
        let (store, _dir) = setup_test_store();
        store.set(Some("tok-123")).unwrap();
        assert_eq!(store.get().unwrap(), Some("tok-123".to_string()));
    }

    #[test]
    fn test_set_overwrites_previous_token() {
        let (store, _dir) = setup_test_store();
        store.set(Some("first")).unwrap();
        store.set(Some("second")).unwrap();
        assert_eq!(store.get().unwrap(), Some("second".to_string()));
    }

    #[test]
    fn test_set_none_clears_token() {
        let (store, _dir) = setup_test_store();
        store.set(Some("tok-123")).unwrap();
        store.set(None).unwrap();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_token_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.db");

        let store = SessionStore::open(&path).unwrap();
        store.set(Some("durable")).unwrap();
        drop(store);

        let reopened = SessionStore::open(&path).unwrap();
        assert_eq!(reopened.get().unwrap(), Some("durable".to_string()));
    }

    #[test]
    fn test_clear_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.db");

        let store = SessionStore::open(&path).unwrap();
        store.set(Some("stale")).unwrap();
        store.set(None).unwrap();
        drop(store);

        let reopened = SessionStore::open(&path).unwrap();
        assert_eq!(reopened.get().unwrap(), None);
    }

    #[test]
    fn test_open_creates_missing_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state").join("session.db");
        let store = SessionStore::open(&path).unwrap();
        store.set(Some("tok")).unwrap();
        assert!(path.exists());
    }
}
