//! End-to-end pipeline tests: mocked pages and chat endpoint, deterministic
//! embeddings, scratch SQLite collections.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use httpmock::MockServer;
use reqwest::Client;
use tempfile::TempDir;
use url::Url;

use askpages::embeddings::{EmbeddingProvider, MockEmbeddings};
use askpages::ingestion::{IngestStage, NoopProgress, Progress, ingest_urls};
use askpages::llm::{ChatModel, GroqChat};
use askpages::store::{SqliteChunkStore, VectorStore};
use askpages::{AppConfig, AppContext, AskError};

/// Chat model that returns a canned reply; for tests that never reach the
/// model it doubles as proof the model was not called.
struct StaticChat(&'static str);

#[async_trait]
impl ChatModel for StaticChat {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, AskError> {
        Ok(self.0.to_string())
    }
}

fn test_config(chat_url: &str) -> AppConfig {
    let chat_url = chat_url.to_string();
    AppConfig::from_lookup(move |key| match key {
        "GROQ_API_KEY" => Some("gsk_test".to_string()),
        "ASKPAGES_CHAT_URL" => Some(chat_url.clone()),
        // Small chunks so short fixture pages still produce several.
        "ASKPAGES_CHUNK_SIZE" => Some("200".to_string()),
        "ASKPAGES_CHUNK_OVERLAP" => Some("40".to_string()),
        _ => None,
    })
    .unwrap()
}

async fn scratch_store(dir: &TempDir) -> Arc<SqliteChunkStore> {
    Arc::new(
        SqliteChunkStore::open(dir.path().join("collection.sqlite"))
            .await
            .unwrap(),
    )
}

fn test_context(
    config: AppConfig,
    chat: Arc<dyn ChatModel>,
    store: Arc<SqliteChunkStore>,
) -> AppContext {
    AppContext::with_components(
        config,
        Client::new(),
        chat,
        Arc::new(MockEmbeddings::default()),
        store,
    )
}

/// Records stage events so their order can be asserted.
#[derive(Default)]
struct RecordingProgress(Mutex<Vec<IngestStage>>);

impl Progress for RecordingProgress {
    fn stage(&self, stage: IngestStage) {
        self.0.lock().unwrap().push(stage);
    }
}

#[tokio::test]
async fn ingestion_indexes_every_fetched_page() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.path("/one");
        then.status(200)
            .body("<html><body><p>Rust is a systems programming language.</p></body></html>");
    });
    server.mock(|when, then| {
        when.path("/two");
        then.status(200)
            .body("<html><body><p>Tokio is an asynchronous runtime for Rust.</p></body></html>");
    });

    let dir = TempDir::new().unwrap();
    let store = scratch_store(&dir).await;
    let ctx = test_context(
        test_config(&server.base_url()),
        Arc::new(StaticChat("unused")),
        Arc::clone(&store),
    );

    let urls = vec![
        Url::parse(&server.url("/one")).unwrap(),
        Url::parse(&server.url("/two")).unwrap(),
    ];
    let report = ingest_urls(&ctx, &urls, &NoopProgress).await.unwrap();

    assert_eq!(report.pages, 2);
    assert!(report.chunks >= 2, "at least one chunk per fetched page");
    assert_eq!(store.count().await.unwrap(), report.chunks);

    // Every source URL is represented in the collection.
    let probe = MockEmbeddings::default()
        .embed_batch(&["Rust".to_string()])
        .await
        .unwrap()
        .remove(0);
    let all = store.nearest(&probe, report.chunks).await.unwrap();
    for url in &urls {
        assert!(
            all.iter().any(|scored| scored.chunk.url == url.as_str()),
            "no chunks stored for {url}"
        );
    }
}

#[tokio::test]
async fn stage_events_arrive_in_pipeline_order() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.path("/page");
        then.status(200).body("<p>Some indexable content here.</p>");
    });

    let dir = TempDir::new().unwrap();
    let ctx = test_context(
        test_config(&server.base_url()),
        Arc::new(StaticChat("unused")),
        scratch_store(&dir).await,
    );

    let progress = RecordingProgress::default();
    let urls = vec![Url::parse(&server.url("/page")).unwrap()];
    ingest_urls(&ctx, &urls, &progress).await.unwrap();

    assert_eq!(
        *progress.0.lock().unwrap(),
        vec![
            IngestStage::Resetting,
            IngestStage::Fetching,
            IngestStage::Splitting,
            IngestStage::Indexing,
            IngestStage::Done,
        ]
    );
}

#[tokio::test]
async fn asking_before_ingestion_is_an_initialization_error() {
    let dir = TempDir::new().unwrap();
    let ctx = test_context(
        test_config("http://127.0.0.1:1/unused"),
        Arc::new(StaticChat("should never be asked")),
        scratch_store(&dir).await,
    );

    let result = ctx.engine().answer("What is anything?").await;
    assert!(matches!(result, Err(AskError::NotIngested)));
}

#[tokio::test]
async fn answer_cites_the_ingested_page() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.path("/france");
        then.status(200).body("The capital of France is Paris.");
    });
    let page_url = server.url("/france");
    let chat_mock = server.mock(|when, then| {
        when.method(httpmock::Method::POST).path("/chat/completions");
        then.status(200).json_body(serde_json::json!({
            "choices": [{ "message": {
                "role": "assistant",
                "content": format!("The capital of France is Paris.\nSOURCES: {page_url}")
            }}]
        }));
    });

    let dir = TempDir::new().unwrap();
    let config = test_config(&server.base_url());
    let chat = Arc::new(GroqChat::new(Client::new(), &config));
    let ctx = test_context(config, chat, scratch_store(&dir).await);

    let urls = vec![Url::parse(&page_url).unwrap()];
    ingest_urls(&ctx, &urls, &NoopProgress).await.unwrap();

    let answer = ctx
        .engine()
        .answer("What is the capital of France?")
        .await
        .unwrap();

    chat_mock.assert_async().await;
    assert!(answer.text.contains("Paris"));
    assert_eq!(answer.sources, vec![page_url]);
}

#[tokio::test]
async fn zero_urls_are_rejected_before_any_work() {
    let server = MockServer::start_async().await;
    let any_request = server.mock(|_when, then| {
        then.status(500);
    });

    let dir = TempDir::new().unwrap();
    let store = scratch_store(&dir).await;
    let ctx = test_context(
        test_config(&server.base_url()),
        Arc::new(StaticChat("unused")),
        Arc::clone(&store),
    );

    let result = ingest_urls(&ctx, &[], &NoopProgress).await;
    assert!(matches!(result, Err(AskError::NoUrls)));
    assert_eq!(any_request.hits_async().await, 0, "no network calls");
    assert_eq!(store.count().await.unwrap(), 0, "no store writes");
}

#[tokio::test]
async fn failed_ingestion_after_reset_leaves_the_collection_empty() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.path("/good");
        then.status(200).body("<p>Perfectly good content.</p>");
    });
    server.mock(|when, then| {
        when.path("/missing");
        then.status(404);
    });

    let dir = TempDir::new().unwrap();
    let store = scratch_store(&dir).await;
    let ctx = test_context(
        test_config(&server.base_url()),
        Arc::new(StaticChat("unused")),
        Arc::clone(&store),
    );

    let good = vec![Url::parse(&server.url("/good")).unwrap()];
    ingest_urls(&ctx, &good, &NoopProgress).await.unwrap();
    assert!(store.count().await.unwrap() > 0);

    // The fetch fails after the reset, before any insertion.
    let bad = vec![Url::parse(&server.url("/missing")).unwrap()];
    let result = ingest_urls(&ctx, &bad, &NoopProgress).await;
    assert!(matches!(result, Err(AskError::Http(_))));
    assert_eq!(store.count().await.unwrap(), 0);

    // A later successful ingestion restores the invariant.
    ingest_urls(&ctx, &good, &NoopProgress).await.unwrap();
    assert!(store.count().await.unwrap() > 0);
}
