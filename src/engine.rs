//! Answering questions from the indexed collection.
//!
//! Retrieval pulls a candidate pool by cosine similarity, then narrows it
//! with maximal-marginal-relevance so the context handed to the model is
//! both relevant and non-redundant. The model is instructed to answer only
//! from that context and to report which sources it used on a trailing
//! `SOURCES:` line.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::embeddings::EmbeddingProvider;
use crate::llm::ChatModel;
use crate::store::{ScoredChunk, VectorStore};
use crate::types::AskError;

const SOURCES_PREFIX: &str = "SOURCES:";

const SYSTEM_PROMPT: &str = "\
You are a careful assistant answering questions about a small set of web pages. \
Use only the context extracts supplied in the user message; if they do not \
contain the answer, say you do not know. After your answer, output one final \
line of the form `SOURCES: <url>, <url>` naming only the extract sources you \
actually used. If you used none, output `SOURCES:` with nothing after it.";

/// An answer with the source URLs the model reported using.
#[derive(Clone, Debug)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<String>,
}

/// Retrieval plus answer synthesis over one collection.
pub struct AnswerEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatModel>,
    top_k: usize,
    fetch_k: usize,
    mmr_lambda: f32,
}

impl AnswerEngine {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatModel>,
        top_k: usize,
        fetch_k: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            chat,
            top_k,
            fetch_k,
            mmr_lambda: 0.5,
        }
    }

    /// Answers `question` from the indexed collection.
    ///
    /// Returns [`AskError::NotIngested`] when the collection is empty; a
    /// fabricated answer is never produced.
    pub async fn answer(&self, question: &str) -> Result<Answer, AskError> {
        if self.store.count().await? == 0 {
            return Err(AskError::NotIngested);
        }

        let question_text = [question.to_string()];
        let query = self
            .embedder
            .embed_batch(&question_text)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AskError::Embedding("no vector returned for question".into()))?;

        let candidates = self.store.nearest(&query, self.fetch_k).await?;
        let selected = mmr_select(&query, candidates, self.top_k, self.mmr_lambda);
        debug!(selected = selected.len(), "retrieved context chunks");

        let context = selected
            .iter()
            .map(|scored| format!("[Source: {}]\n{}", scored.chunk.url, scored.chunk.content))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");
        let user = format!("Context extracts:\n\n{context}\n\nQuestion: {question}");

        let raw = self.chat.complete(SYSTEM_PROMPT, &user).await?;
        let (text, sources) = split_sources(&raw);
        Ok(Answer { text, sources })
    }
}

/// Maximal-marginal-relevance selection.
///
/// Greedily picks up to `k` candidates maximizing
/// `lambda * sim(query, c) - (1 - lambda) * max sim(c, selected)`,
/// so near-duplicates of an already-selected chunk score poorly.
pub fn mmr_select(
    query: &[f32],
    mut candidates: Vec<ScoredChunk>,
    k: usize,
    lambda: f32,
) -> Vec<ScoredChunk> {
    let mut selected: Vec<ScoredChunk> = Vec::with_capacity(k.min(candidates.len()));

    while selected.len() < k && !candidates.is_empty() {
        let best = candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| {
                let relevance = cosine_similarity(query, &candidate.chunk.embedding);
                let redundancy = selected
                    .iter()
                    .map(|picked| {
                        cosine_similarity(&picked.chunk.embedding, &candidate.chunk.embedding)
                    })
                    .fold(0.0_f32, f32::max);
                (index, lambda * relevance - (1.0 - lambda) * redundancy)
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
            .map(|(index, _)| index);

        match best {
            Some(index) => selected.push(candidates.swap_remove(index)),
            None => break,
        }
    }

    selected
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Splits a model reply into answer text and the URLs on its `SOURCES:` line.
///
/// The trailer may be missing or empty; both yield an empty source list.
fn split_sources(raw: &str) -> (String, Vec<String>) {
    let mut answer_lines: Vec<&str> = Vec::new();
    let mut sources: Vec<String> = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed
            .get(..SOURCES_PREFIX.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(SOURCES_PREFIX))
        {
            for source in trimmed[SOURCES_PREFIX.len()..].split([',', '\n']) {
                let source = source.trim();
                if !source.is_empty() && !sources.iter().any(|seen| seen == source) {
                    sources.push(source.to_string());
                }
            }
        } else {
            answer_lines.push(line);
        }
    }

    (answer_lines.join("\n").trim().to_string(), sources)
}
