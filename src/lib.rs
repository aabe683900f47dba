//! Retrieval-augmented question answering over a handful of web pages.
//!
//! ```text
//! URLs ──► ingestion::fetch ──► ingestion::splitter ──► embeddings
//!                                                          │
//!                                 store::SqliteChunkStore ◄┘
//!                                          │
//! Question ──► engine::AnswerEngine ──► MMR retrieval ──► llm::GroqChat
//!                                          │
//!                            Answer text + cited source URLs
//! ```
//!
//! The collection is rebuilt from scratch on every ingestion; questions are
//! answered only from indexed content, never from the model's own knowledge.

pub mod config;
pub mod context;
pub mod embeddings;
pub mod engine;
pub mod ingestion;
pub mod llm;
pub mod store;
pub mod types;

pub use config::AppConfig;
pub use context::AppContext;
pub use engine::{Answer, AnswerEngine};
pub use ingestion::{IngestReport, IngestStage, NoopProgress, Progress, ingest_urls};
pub use types::AskError;
