//! Shared component lifecycle.
//!
//! [`AppContext`] replaces process-wide singletons: the chat client,
//! embedding provider, and vector store are constructed exactly once by
//! [`AppContext::initialize`] and passed by reference to whichever component
//! needs them for the remainder of the process.

use std::sync::Arc;

use reqwest::Client;

use crate::config::AppConfig;
use crate::embeddings::{EmbeddingProvider, OllamaEmbeddings};
use crate::engine::AnswerEngine;
use crate::llm::{ChatModel, GroqChat};
use crate::store::{SqliteChunkStore, VectorStore};
use crate::types::AskError;

pub struct AppContext {
    config: AppConfig,
    http: Client,
    chat: Arc<dyn ChatModel>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl AppContext {
    /// Builds the production wiring: Groq chat, Ollama embeddings, and the
    /// SQLite collection at the configured path.
    pub async fn initialize(config: AppConfig) -> Result<Self, AskError> {
        let http = Client::builder()
            .user_agent(concat!("askpages/", env!("CARGO_PKG_VERSION")))
            .use_rustls_tls()
            .build()?;

        let chat = Arc::new(GroqChat::new(http.clone(), &config));
        let embedder = Arc::new(OllamaEmbeddings::new(
            http.clone(),
            config.embed_base_url.clone(),
            config.embed_model.clone(),
        ));
        let store = Arc::new(SqliteChunkStore::open(&config.db_path).await?);

        Ok(Self::with_components(config, http, chat, embedder, store))
    }

    /// Assembles a context from pre-built components. Tests use this to
    /// substitute mock providers and scratch stores.
    pub fn with_components(
        config: AppConfig,
        http: Client,
        chat: Arc<dyn ChatModel>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            config,
            http,
            chat,
            embedder,
            store,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    /// Answer engine wired to this context's components.
    pub fn engine(&self) -> AnswerEngine {
        AnswerEngine::new(
            Arc::clone(&self.store),
            Arc::clone(&self.embedder),
            Arc::clone(&self.chat),
            self.config.top_k,
            self.config.fetch_k,
        )
    }
}
