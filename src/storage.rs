use crate::api::error::{ApiError, Result};
use directories::ProjectDirs;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const KEY_TOKEN: &str = "token";
pub const KEY_ROLE: &str = "role";
pub const KEY_USER_ID: &str = "userId";
pub const KEY_SELLER_ID: &str = "sellerId";

fn db_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("com", "example", "Souk")?;
    let dir = proj.data_dir().to_path_buf();
    Some(dir.join("local.sqlite"))
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

// Small string key/value store standing in for browser local storage.
pub struct Storage {
    conn: Mutex<Connection>,
}

impl Storage {
    pub fn open(path: &Path) -> Result<Self> {
        ensure_dir(path).map_err(|e| ApiError::Storage(e.to_string()))?;
        Self::init(Connection::open(path)?)
    }

    pub fn open_default() -> Result<Self> {
        let path = db_path().ok_or_else(|| ApiError::Storage("no data dir".into()))?;
        Self::open(&path)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let value: Option<String> = stmt.query_row(params![key], |row| row.get(0)).optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.lock().execute(
            r#"
            INSERT INTO kv (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value=excluded.value,
                updated_at=excluded.updated_at
            "#,
            params![key, value, now_secs()],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        self.conn.lock().execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.conn.lock().execute("DELETE FROM kv", [])?;
        Ok(())
    }

    pub fn last_updated(&self, key: &str) -> Result<Option<i64>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT updated_at FROM kv WHERE key = ?1")?;
        let ts: Option<i64> = stmt.query_row(params![key], |row| row.get(0)).optional()?;
        Ok(ts)
    }
}
