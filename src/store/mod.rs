//! Vector storage for indexed chunks.
//!
//! [`VectorStore`] abstracts the collection so the pipeline and the answer
//! engine do not depend on a specific database. One implementation is
//! provided: SQLite with vector search via `sqlite-vec`.

pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::AskError;

pub use sqlite::SqliteChunkStore;

/// A chunk with its embedding, as stored in the collection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique identifier, assigned at ingestion.
    pub id: String,
    /// Originating page URL.
    pub url: String,
    /// Zero-based position within the source document.
    pub chunk_index: usize,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// A chunk returned from a nearest-neighbor query.
#[derive(Clone, Debug)]
pub struct ScoredChunk {
    pub chunk: ChunkRecord,
    /// Cosine similarity to the query vector, higher is closer.
    pub similarity: f32,
}

/// The single logical collection of indexed chunks.
///
/// The collection is either empty or holds the output of the most recent
/// successful ingestion; there is no incremental delete.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Clears the collection entirely. Resetting an empty collection is a
    /// successful no-op.
    async fn reset(&self) -> Result<(), AskError>;

    /// Bulk-inserts chunks in one transaction. All embeddings in a batch
    /// must share one dimension; the batch fixes the collection's dimension
    /// until the next reset.
    async fn insert_chunks(&self, chunks: Vec<ChunkRecord>) -> Result<(), AskError>;

    /// Number of chunks currently indexed.
    async fn count(&self) -> Result<usize, AskError>;

    /// The `limit` chunks nearest to `query` by cosine distance, most
    /// similar first. Empty when nothing has been indexed.
    async fn nearest(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredChunk>, AskError>;
}
