//! Environment-driven configuration.
//!
//! Every tunable is an environment variable with a default; the only
//! required value is the Groq API credential. A local `.env` file is loaded
//! (via `dotenvy`) before the environment is consulted, so the credential
//! can live in either place.

use std::env;
use std::path::PathBuf;

use url::Url;

use crate::types::AskError;

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1500;
/// Default overlap between consecutive chunks of the same document.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
/// Chunks handed to the model per question.
pub const DEFAULT_TOP_K: usize = 4;
/// Candidate pool size for diversity-aware selection.
pub const DEFAULT_FETCH_K: usize = 20;

const DEFAULT_CHAT_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_CHAT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_EMBED_URL: &str = "http://localhost:11434";
const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";
const DEFAULT_DB_PATH: &str = "resources/vectorstore/askpages.sqlite";

/// Resolved application configuration, constructed once at startup.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Credential for the hosted chat-completion service.
    pub groq_api_key: String,
    /// Base URL of the (OpenAI-compatible) chat API.
    pub chat_base_url: Url,
    pub chat_model: String,
    /// Base URL of the embedding service.
    pub embed_base_url: Url,
    pub embed_model: String,
    /// Location of the persistent vector collection.
    pub db_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub fetch_k: usize,
}

impl AppConfig {
    /// Loads configuration from the process environment, preloading `.env`.
    ///
    /// Fails with [`AskError::MissingCredential`] when `GROQ_API_KEY` is
    /// absent or empty.
    pub fn from_env() -> Result<Self, AskError> {
        // A missing .env file is not an error; the variables may already be
        // set in the environment.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// `from_env` is a thin wrapper over this; tests supply their own
    /// lookup to avoid mutating process-wide state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AskError> {
        let groq_api_key = lookup("GROQ_API_KEY")
            .filter(|value| !value.trim().is_empty())
            .ok_or(AskError::MissingCredential)?;

        let chat_base_url = parse_url(
            lookup("ASKPAGES_CHAT_URL").unwrap_or_else(|| DEFAULT_CHAT_URL.to_string()),
        )?;
        let embed_base_url = parse_url(
            lookup("ASKPAGES_EMBED_URL").unwrap_or_else(|| DEFAULT_EMBED_URL.to_string()),
        )?;

        Ok(Self {
            groq_api_key,
            chat_base_url,
            chat_model: lookup("ASKPAGES_CHAT_MODEL")
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embed_base_url,
            embed_model: lookup("ASKPAGES_EMBED_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string()),
            db_path: lookup("ASKPAGES_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            chunk_size: parse_or(lookup("ASKPAGES_CHUNK_SIZE"), DEFAULT_CHUNK_SIZE),
            chunk_overlap: parse_or(lookup("ASKPAGES_CHUNK_OVERLAP"), DEFAULT_CHUNK_OVERLAP),
            top_k: parse_or(lookup("ASKPAGES_TOP_K"), DEFAULT_TOP_K),
            fetch_k: parse_or(lookup("ASKPAGES_FETCH_K"), DEFAULT_FETCH_K),
        })
    }
}

fn parse_url(raw: String) -> Result<Url, AskError> {
    Url::parse(&raw).map_err(|_| AskError::InvalidUrl(raw))
}

fn parse_or(raw: Option<String>, default: usize) -> usize {
    raw.and_then(|value| value.parse().ok()).unwrap_or(default)
}
