//! SQLite adapter for the `ContentStore` port.
//!
//! One connection, owned by the store handle and guarded by a mutex. Blocking
//! SQLite calls run on Tokio's blocking pool.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use smm_core::{domain::Post, errors::Error, store::ContentStore, Result};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        created_at TEXT NOT NULL,
        language TEXT NOT NULL,
        content TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_posts_language_created
        ON posts(language, created_at, id);
"#;

#[derive(Clone)]
pub struct SqliteContentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteContentStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(map_err)?;
        info!("opened post store at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory().map_err(map_err)?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(map_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::Storage("connection mutex poisoned".to_string()))?;
            op(&mut guard).map_err(map_err)
        })
        .await
        .map_err(|e| Error::Storage(format!("storage task failed: {e}")))?
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn submit(&self, language: &str, content: &str) -> Result<Post> {
        let language = language.to_string();
        let content = content.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            // Never go back in time relative to the newest row, so ordering by
            // time and ordering by id agree.
            let newest: Option<String> =
                tx.query_row("SELECT MAX(created_at) FROM posts", [], |row| row.get(0))?;
            let mut created_at = Utc::now().trunc_subsecs(6);
            if let Some(prev) = newest.as_deref().and_then(parse_timestamp) {
                created_at = created_at.max(prev);
            }

            tx.execute(
                "INSERT INTO posts (created_at, language, content) VALUES (?1, ?2, ?3)",
                params![format_timestamp(created_at), language, content],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;

            Ok(Post {
                id,
                created_at,
                language,
                content,
            })
        })
        .await
    }

    async fn latest(&self, language: &str) -> Result<Option<Post>> {
        let language = language.to_string();
        let row = self
            .with_conn(move |conn| {
                conn.query_row(
                    "SELECT id, created_at, language, content FROM posts \
                     WHERE language = ?1 \
                     ORDER BY created_at DESC, id DESC LIMIT 1",
                    params![language],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    },
                )
                .optional()
            })
            .await?;

        let Some((id, created_at, language, content)) = row else {
            return Ok(None);
        };
        let created_at = parse_timestamp(&created_at).ok_or_else(|| {
            Error::Storage(format!("post {id} has invalid created_at {created_at:?}"))
        })?;

        Ok(Some(Post {
            id,
            created_at,
            language,
            content,
        }))
    }

    async fn count(&self) -> Result<u64> {
        let n: i64 = self
            .with_conn(|conn| conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0)))
            .await?;
        Ok(n.max(0) as u64)
    }
}

fn map_err(e: rusqlite::Error) -> Error {
    Error::Storage(format!("sqlite error: {e}"))
}

/// Fixed-width RFC 3339 UTC (microseconds), so text order equals time order.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
