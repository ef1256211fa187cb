use crate::api::models::Contact;
use directories::ProjectDirs;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

const CONTACTS_KEY: &str = "contacts";

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("could not encode contacts: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no data directory available")]
    NoDataDir,
}

pub fn default_db_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("com", "example", "ContactBook")?;
    let dir = proj.data_dir().to_path_buf();
    Some(dir.join("cache.sqlite"))
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Key/value cache on disk holding the last saved working set as one JSON blob.
#[derive(Debug, Clone)]
pub struct LocalCache {
    path: PathBuf,
}

impl LocalCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache in the platform data dir, or `cache.sqlite` inside `data_dir` when given.
    pub fn open_default(data_dir: Option<&Path>) -> Result<Self> {
        let path = match data_dir {
            Some(dir) => dir.join("cache.sqlite"),
            None => default_db_path().ok_or(Error::NoDataDir)?,
        };
        let cache = Self::new(path);
        cache.init()?;
        Ok(cache)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_conn(&self) -> Result<Connection> {
        ensure_dir(&self.path)?;
        Ok(Connection::open(&self.path)?)
    }

    pub fn init(&self) -> Result<()> {
        let conn = self.open_conn()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Overwrites the cached working set wholesale.
    pub fn save_contacts(&self, contacts: &[Contact]) -> Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        let json = serde_json::to_string(contacts)?;
        let conn = self.open_conn()?;
        conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value=excluded.value,
                updated_at=excluded.updated_at
            "#,
            params![CONTACTS_KEY, json, now],
        )?;
        Ok(())
    }

    /// Reads the cached working set; `None` when nothing was ever saved.
    pub fn load_contacts(&self) -> Result<Option<Vec<Contact>>> {
        let conn = self.open_conn()?;
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let raw: Option<String> = stmt
            .query_row(params![CONTACTS_KEY], |row| row.get(0))
            .optional()?;
        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }
}
