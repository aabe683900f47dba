//! Turning a list of URLs into an indexed vector collection.
//!
//! ```text
//! URLs ──► fetch::fetch_page ──► PageDocument
//!                                     │
//!                    splitter::TextSplitter ──► chunks
//!                                     │
//!              EmbeddingProvider::embed_batch ──► vectors
//!                                     │
//!                  VectorStore::insert_chunks (one batch)
//! ```
//!
//! Progress is reported through [`Progress`] as an ordered sequence of
//! [`IngestStage`] events, delivered synchronously before each step runs.

pub mod fetch;
pub mod splitter;

use std::fmt;

use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::context::AppContext;
use crate::store::ChunkRecord;
use crate::types::AskError;

pub use fetch::{PageDocument, fetch_page};
pub use splitter::TextSplitter;

/// Stages of one ingestion call, emitted in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestStage {
    Resetting,
    Fetching,
    Splitting,
    Indexing,
    Done,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IngestStage::Resetting => "Resetting vector store..",
            IngestStage::Fetching => "Loading pages..",
            IngestStage::Splitting => "Splitting text into chunks..",
            IngestStage::Indexing => "Adding chunks to vector store..",
            IngestStage::Done => "Done",
        };
        f.write_str(label)
    }
}

/// Receives stage events during ingestion.
pub trait Progress: Send + Sync {
    fn stage(&self, stage: IngestStage);
}

/// Discards all progress events.
pub struct NoopProgress;

impl Progress for NoopProgress {
    fn stage(&self, _stage: IngestStage) {}
}

/// Summary of a successful ingestion.
#[derive(Clone, Copy, Debug)]
pub struct IngestReport {
    pub pages: usize,
    pub chunks: usize,
}

/// Resets the collection and repopulates it from `urls`.
///
/// Any fetch, embedding, or storage failure aborts the call. The reset is
/// not rolled back; a failure after it leaves the collection empty (or, if
/// insertion itself fails partway, partially populated) until the next
/// successful ingestion.
pub async fn ingest_urls(
    ctx: &AppContext,
    urls: &[Url],
    progress: &dyn Progress,
) -> Result<IngestReport, AskError> {
    if urls.is_empty() {
        return Err(AskError::NoUrls);
    }

    progress.stage(IngestStage::Resetting);
    ctx.store().reset().await?;

    progress.stage(IngestStage::Fetching);
    let mut documents = Vec::with_capacity(urls.len());
    for url in urls {
        documents.push(fetch_page(ctx.http(), url).await?);
    }

    progress.stage(IngestStage::Splitting);
    let config = ctx.config();
    let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap);
    let mut pending: Vec<(String, usize, String)> = Vec::new();
    for document in &documents {
        for (index, content) in splitter.split(&document.text).into_iter().enumerate() {
            pending.push((document.url.to_string(), index, content));
        }
    }

    progress.stage(IngestStage::Indexing);
    let texts: Vec<String> = pending.iter().map(|(_, _, content)| content.clone()).collect();
    let embeddings = ctx.embedder().embed_batch(&texts).await?;
    if embeddings.len() != pending.len() {
        return Err(AskError::Embedding(format!(
            "expected {} vectors, got {}",
            pending.len(),
            embeddings.len()
        )));
    }

    let records: Vec<ChunkRecord> = pending
        .into_iter()
        .zip(embeddings)
        .map(|((url, chunk_index, content), embedding)| ChunkRecord {
            id: Uuid::new_v4().to_string(),
            url,
            chunk_index,
            content,
            embedding,
        })
        .collect();
    let chunks = records.len();
    ctx.store().insert_chunks(records).await?;

    progress.stage(IngestStage::Done);
    info!(pages = documents.len(), chunks, "ingestion complete");
    Ok(IngestReport {
        pages: documents.len(),
        chunks,
    })
}
