//! Shared error type for the ingestion and answering pipeline.

use thiserror::Error;
use url::Url;

/// Errors surfaced by ingestion, retrieval, and answer generation.
///
/// Fetch, embedding, and storage failures are fatal to the operation that
/// produced them; [`AskError::NotIngested`] is the one recoverable case and
/// is handled inline by the presentation layer.
#[derive(Debug, Error)]
pub enum AskError {
    /// The LLM service credential could not be resolved at startup.
    #[error("GROQ_API_KEY is not set; add it to your environment or .env file")]
    MissingCredential,

    /// The caller supplied an empty URL set.
    #[error("at least one valid URL is required")]
    NoUrls,

    /// A URL string could not be parsed.
    #[error("invalid URL '{0}'")]
    InvalidUrl(String),

    /// A network request failed or returned an error status.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A fetched page yielded no readable text.
    #[error("no readable text extracted from {0}")]
    EmptyDocument(Url),

    /// The embedding service rejected a request or returned bad data.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The vector store rejected an operation.
    #[error("vector store error: {0}")]
    Storage(String),

    /// The chat completion service rejected a request or returned bad data.
    #[error("chat completion failed: {0}")]
    Llm(String),

    /// A question was asked before any successful ingestion.
    #[error("no pages have been indexed yet; process URLs before asking a question")]
    NotIngested,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_user_presentable() {
        assert!(AskError::NotIngested.to_string().contains("process URLs"));
        assert!(AskError::MissingCredential.to_string().contains("GROQ_API_KEY"));
        assert_eq!(
            AskError::InvalidUrl("not a url".into()).to_string(),
            "invalid URL 'not a url'"
        );
    }
}
