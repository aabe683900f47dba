//! SQLite-backed chunk store with vector search via `sqlite-vec`.
//!
//! Chunk rows live in a plain `chunks` table; their embeddings live in a
//! `chunks_embeddings` vec0 virtual table joined by rowid. The vec0 table is
//! created on first insert, once the embedding dimension is known, and
//! dropped on reset so a new ingestion may change dimension.

use std::mem::transmute;
use std::os::raw::c_char;
use std::path::Path;
use std::sync::{Mutex, Once};

use async_trait::async_trait;
use chrono::Utc;
use tokio_rusqlite::{Connection, ffi, params};
use tracing::debug;

use super::{ChunkRecord, ScoredChunk, VectorStore};
use crate::types::AskError;

#[derive(Clone)]
pub struct SqliteChunkStore {
    conn: Connection,
}

impl SqliteChunkStore {
    /// Opens (creating if needed) the collection at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AskError> {
        Self::register_sqlite_vec()?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let conn = Connection::open(path)
            .await
            .map_err(|err| AskError::Storage(err.to_string()))?;

        conn.call(|conn| {
            // Fails loudly if the extension did not register.
            conn.query_row("select vec_version()", [], |row| row.get::<_, String>(0))
                .map_err(tokio_rusqlite::Error::Rusqlite)?;

            conn.execute(
                "CREATE TABLE IF NOT EXISTS chunks (
                    id TEXT PRIMARY KEY,
                    url TEXT,
                    chunk_index TEXT,
                    content TEXT,
                    created_at TEXT
                )",
                [],
            )?;
            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_chunks_url ON chunks(url)",
                [],
            )?;
            Ok(())
        })
        .await
        .map_err(|err| AskError::Storage(err.to_string()))?;

        Ok(Self { conn })
    }

    fn register_sqlite_vec() -> Result<(), AskError> {
        static INIT: Once = Once::new();
        static INIT_RESULT: Mutex<Option<Result<(), String>>> = Mutex::new(None);

        INIT.call_once(|| {
            let result = unsafe {
                type SqliteExtensionInit = unsafe extern "C" fn(
                    *mut ffi::sqlite3,
                    *mut *const c_char,
                    *const ffi::sqlite3_api_routines,
                ) -> i32;

                let init: unsafe extern "C" fn() = sqlite_vec::sqlite3_vec_init;
                let init_fn: SqliteExtensionInit =
                    transmute::<unsafe extern "C" fn(), SqliteExtensionInit>(init);
                let rc = ffi::sqlite3_auto_extension(Some(init_fn));
                if rc != 0 {
                    Err(format!(
                        "failed to register sqlite-vec extension (code {rc})"
                    ))
                } else {
                    Ok(())
                }
            };
            *INIT_RESULT.lock().expect("init result mutex poisoned") = Some(result);
        });

        INIT_RESULT
            .lock()
            .expect("init result mutex poisoned")
            .clone()
            .expect("init was called but result not set")
            .map_err(AskError::Storage)
    }

    async fn embeddings_table_exists(&self) -> Result<bool, AskError> {
        self.conn
            .call(|conn| {
                let exists = conn
                    .query_row(
                        "SELECT name FROM sqlite_master
                         WHERE type = 'table' AND name = 'chunks_embeddings'",
                        [],
                        |_| Ok(()),
                    )
                    .is_ok();
                Ok(exists)
            })
            .await
            .map_err(|err| AskError::Storage(err.to_string()))
    }
}

#[async_trait]
impl VectorStore for SqliteChunkStore {
    async fn reset(&self) -> Result<(), AskError> {
        self.conn
            .call(|conn| {
                conn.execute("DELETE FROM chunks", [])?;
                conn.execute("DROP TABLE IF EXISTS chunks_embeddings", [])?;
                Ok(())
            })
            .await
            .map_err(|err| AskError::Storage(err.to_string()))?;
        debug!("collection reset");
        Ok(())
    }

    async fn insert_chunks(&self, chunks: Vec<ChunkRecord>) -> Result<(), AskError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let dims = chunks[0].embedding.len();
        if dims == 0 || chunks.iter().any(|chunk| chunk.embedding.len() != dims) {
            return Err(AskError::Storage(
                "all embeddings in a batch must share one non-zero dimension".into(),
            ));
        }

        let inserted = chunks.len();
        self.conn
            .call(move |conn| {
                conn.execute(
                    &format!(
                        "CREATE VIRTUAL TABLE IF NOT EXISTS chunks_embeddings
                         USING vec0(embedding float[{dims}])"
                    ),
                    [],
                )?;

                let tx = conn.transaction()?;
                for chunk in &chunks {
                    tx.execute(
                        "INSERT INTO chunks (id, url, chunk_index, content, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            chunk.id,
                            chunk.url,
                            chunk.chunk_index.to_string(),
                            chunk.content,
                            Utc::now().to_rfc3339(),
                        ],
                    )?;
                    let rowid = tx.last_insert_rowid();
                    let embedding_json = serde_json::to_string(&chunk.embedding)
                        .map_err(|err| tokio_rusqlite::Error::Other(err.into()))?;
                    tx.execute(
                        "INSERT INTO chunks_embeddings (rowid, embedding)
                         VALUES (?1, vec_f32(?2))",
                        params![rowid, embedding_json],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|err| AskError::Storage(err.to_string()))?;

        debug!(chunks = inserted, dims, "inserted chunk batch");
        Ok(())
    }

    async fn count(&self) -> Result<usize, AskError> {
        self.conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| AskError::Storage(err.to_string()))
    }

    async fn nearest(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredChunk>, AskError> {
        if limit == 0 || !self.embeddings_table_exists().await? {
            return Ok(Vec::new());
        }

        let query_json =
            serde_json::to_string(query).map_err(|err| AskError::Storage(err.to_string()))?;

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT c.id, c.url, c.chunk_index, c.content,
                            vec_to_json(e.embedding),
                            vec_distance_cosine(e.embedding, vec_f32(?1)) AS distance
                     FROM chunks c
                     JOIN chunks_embeddings e ON e.rowid = c.rowid
                     ORDER BY distance ASC
                     LIMIT {limit}"
                ))?;

                let rows = stmt.query_map([query_json.as_str()], |row| {
                    let embedding_json: String = row.get(4)?;
                    let distance: f32 = row.get(5)?;
                    let chunk = ChunkRecord {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        chunk_index: row.get::<_, String>(2)?.parse().unwrap_or(0),
                        content: row.get(3)?,
                        embedding: serde_json::from_str(&embedding_json).unwrap_or_default(),
                    };
                    Ok(ScoredChunk {
                        chunk,
                        similarity: 1.0 - distance,
                    })
                })?;

                let mut results = Vec::new();
                for row in rows {
                    results.push(row?);
                }
                Ok(results)
            })
            .await
            .map_err(|err| AskError::Storage(err.to_string()))
    }
}
