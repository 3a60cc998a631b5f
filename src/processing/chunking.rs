//! Token-budgeted semantic chunking.
//!
//! - Automatic sizing: derive a budget from the embedding model's context window and clamp it;
//!   `TEXT_SPLITTER_CHUNK_SIZE` overrides the derived value.
//! - Overlap: `TEXT_SPLITTER_CHUNK_OVERLAP` prepends the tail of the previous chunk so spans
//!   around boundaries stay retrievable.
//! - Token counting: `tiktoken-rs` for OpenAI models, tiktoken with a whitespace fallback for
//!   Ollama models, whitespace only for the hashing encoder.

use crate::config::{Config, EmbeddingProvider};
use anyhow::Error as TokenizerError;
use semchunk_rs::Chunker;
use std::sync::Arc;
use tiktoken_rs::{
    CoreBPE, cl100k_base, get_bpe_from_model, model::get_context_size, o200k_base, p50k_base,
    r50k_base,
};

use super::types::ChunkingError;

type TokenCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

const MIN_AUTOMATIC_CHUNK_SIZE: usize = 256;
const MAX_AUTOMATIC_CHUNK_SIZE: usize = 1024;
const HASH_CONTEXT_WINDOW: usize = 2048;

/// Splits document text into chunks that fit the embedding model's token budget.
///
/// The tokenizer is resolved once at construction and shared by every call.
#[derive(Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
    counter: TokenCounter,
}

impl std::fmt::Debug for TextSplitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextSplitter")
            .field("chunk_size", &self.chunk_size)
            .field("overlap", &self.overlap)
            .finish_non_exhaustive()
    }
}

impl TextSplitter {
    /// Build a splitter for the configured embedding provider and model.
    pub fn from_config(config: &Config) -> Result<Self, ChunkingError> {
        let chunk_size = determine_chunk_size(
            config.text_splitter_chunk_size,
            config.embedding_provider,
            &config.embedding_model,
        );
        let overlap = config.text_splitter_chunk_overlap.unwrap_or(0);
        let counter = build_token_counter(config.embedding_provider, &config.embedding_model)?;
        tracing::debug!(
            chunk_size,
            overlap,
            provider = ?config.embedding_provider,
            model = %config.embedding_model,
            "Configured text splitter"
        );
        Self::with_counter(chunk_size, overlap, counter)
    }

    fn with_counter(
        chunk_size: usize,
        overlap: usize,
        counter: TokenCounter,
    ) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        Ok(Self {
            chunk_size,
            overlap,
            counter,
        })
    }

    /// Token budget per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split `text` into chunks; whitespace-only input yields no chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let counter = self.counter.clone();
        let chunker = Chunker::new(
            self.chunk_size,
            Box::new(move |segment: &str| counter.as_ref()(segment)),
        );
        let chunks = chunker
            .chunk(text)
            .into_iter()
            .filter(|chunk| !chunk.trim().is_empty())
            .collect();
        apply_overlap(chunks, self.chunk_size, self.overlap, &self.counter)
    }
}

/// Determine the chunk size, preferring an explicit override.
///
/// Without an override the budget is a quarter of the model's context window, clamped into
/// `[256, 1024]`.
pub(crate) fn determine_chunk_size(
    override_size: Option<usize>,
    provider: EmbeddingProvider,
    model: &str,
) -> usize {
    if let Some(explicit) = override_size {
        return explicit.max(1);
    }

    let window = embedding_context_window(provider, model);
    (window / 4).clamp(MIN_AUTOMATIC_CHUNK_SIZE, MAX_AUTOMATIC_CHUNK_SIZE)
}

pub(crate) fn embedding_context_window(provider: EmbeddingProvider, model: &str) -> usize {
    match provider {
        EmbeddingProvider::OpenAI => openai_embedding_context_window(model),
        EmbeddingProvider::Ollama => ollama_embedding_context_window(model),
        EmbeddingProvider::Hash => HASH_CONTEXT_WINDOW,
    }
}

fn openai_embedding_context_window(model: &str) -> usize {
    if model.starts_with("text-embedding-3") || model.starts_with("text-embedding-ada-002") {
        return 8192;
    }
    get_context_size(model)
}

fn ollama_embedding_context_window(model: &str) -> usize {
    let normalized = model.to_lowercase();
    match normalized.as_str() {
        "nomic-embed-text" | "mxbai-embed-large" | "mxbai-embed-large-v1" => 8192,
        value if value.contains("all-minilm") => 512,
        value if value.contains("e5-large") => 4096,
        _ => {
            tracing::trace!(model, "Using default Ollama context window estimate");
            4096
        }
    }
}

fn build_token_counter(
    provider: EmbeddingProvider,
    model: &str,
) -> Result<TokenCounter, ChunkingError> {
    match provider {
        EmbeddingProvider::OpenAI => build_tiktoken_counter(model),
        EmbeddingProvider::Ollama => match build_tiktoken_counter(model) {
            Ok(counter) => Ok(counter),
            Err(error) => {
                tracing::warn!(
                    model,
                    error = %error,
                    "Tokenizer unavailable for Ollama model; falling back to whitespace counter"
                );
                Ok(whitespace_token_counter())
            }
        },
        EmbeddingProvider::Hash => Ok(whitespace_token_counter()),
    }
}

fn build_tiktoken_counter(model: &str) -> Result<TokenCounter, ChunkingError> {
    let target = match model.trim() {
        "" => "cl100k_base",
        trimmed => trimmed,
    };
    let encoding = resolve_encoding(target).map_err(|source| ChunkingError::Tokenizer {
        model: target.to_string(),
        source,
    })?;
    let encoding = Arc::new(encoding);

    Ok(Arc::new(move |segment: &str| {
        encoding.encode_ordinary(segment).len()
    }))
}

fn resolve_encoding(model: &str) -> Result<CoreBPE, TokenizerError> {
    if let Ok(encoding) = get_bpe_from_model(model) {
        return Ok(encoding);
    }
    match model {
        "o200k_base" => o200k_base(),
        "p50k_base" => p50k_base(),
        "r50k_base" | "gpt2" => r50k_base(),
        "cl100k_base" => cl100k_base(),
        _ => {
            tracing::debug!(model, "Falling back to 'cl100k_base' encoding");
            cl100k_base()
        }
    }
}

fn whitespace_token_counter() -> TokenCounter {
    Arc::new(|segment: &str| {
        let tokens = segment.split_whitespace().count();
        if tokens == 0 && !segment.is_empty() {
            1
        } else {
            tokens
        }
    })
}

fn apply_overlap(
    chunks: Vec<String>,
    chunk_size: usize,
    overlap: usize,
    counter: &TokenCounter,
) -> Vec<String> {
    let overlap = overlap.min(chunk_size.saturating_sub(1));
    if overlap == 0 || chunks.len() < 2 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut previous: Option<String> = None;
    for current in chunks {
        let next = match &previous {
            Some(prev) => {
                let tail = tail_within_budget(prev, overlap, counter);
                let combined = if tail.is_empty() {
                    current.clone()
                } else {
                    format!("{tail} {}", current.trim_start())
                };
                trim_to_budget(&combined, chunk_size, counter)
            }
            None => current.clone(),
        };
        overlapped.push(next);
        previous = Some(current);
    }
    overlapped
}

/// Longest suffix of `text` (at a char boundary) whose token count fits `budget`.
fn tail_within_budget<'a>(text: &'a str, budget: usize, counter: &TokenCounter) -> &'a str {
    text.char_indices()
        .map(|(offset, _)| text[offset..].trim_start())
        .find(|candidate| counter.as_ref()(candidate) <= budget)
        .unwrap_or("")
}

fn trim_to_budget(text: &str, budget: usize, counter: &TokenCounter) -> String {
    tail_within_budget(text, budget, counter).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(chunk_size: usize, overlap: usize) -> TextSplitter {
        TextSplitter::with_counter(chunk_size, overlap, whitespace_token_counter())
            .expect("splitter")
    }

    #[test]
    fn split_respects_chunk_size() {
        let chunks = splitter(2, 0).split("one two three four five");
        assert_eq!(chunks, vec!["one two", "three four", "five"]);
    }

    #[test]
    fn split_handles_blank_input() {
        assert!(splitter(4, 0).split("   \n").is_empty());
    }

    #[test]
    fn split_applies_overlap_within_budget() {
        let counter = whitespace_token_counter();
        let chunks = splitter(3, 1).split("one two three four five");
        assert_eq!(chunks, vec!["one two three", "three four five"]);
        for chunk in &chunks {
            assert!(counter.as_ref()(chunk) <= 3);
        }
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let error = TextSplitter::with_counter(0, 0, whitespace_token_counter()).unwrap_err();
        assert!(matches!(error, ChunkingError::InvalidChunkSize));
    }

    #[test]
    fn tiktoken_budget_keeps_every_word() {
        let text = "The quick brown fox jumps over the lazy dog.";
        let counter = build_tiktoken_counter("text-embedding-3-small").expect("tokenizer");
        let chunks = TextSplitter::with_counter(5, 0, counter.clone())
            .expect("splitter")
            .split(text);
        for chunk in &chunks {
            assert!(counter.as_ref()(chunk) <= 5);
        }
        let words: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
        assert_eq!(words, text.split_whitespace().collect::<Vec<_>>());
    }

    #[test]
    fn chunk_size_prefers_override() {
        assert_eq!(
            determine_chunk_size(Some(42), EmbeddingProvider::OpenAI, "text-embedding-3-small"),
            42
        );
    }

    #[test]
    fn chunk_size_follows_model_window() {
        assert_eq!(
            determine_chunk_size(None, EmbeddingProvider::OpenAI, "text-embedding-3-small"),
            1024
        );
        assert_eq!(
            determine_chunk_size(None, EmbeddingProvider::Ollama, "all-minilm-l6-v2"),
            256
        );
        assert_eq!(
            determine_chunk_size(None, EmbeddingProvider::Hash, "anything"),
            512
        );
    }

    #[test]
    fn splitter_from_test_config_uses_whitespace_tokens() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = crate::config::test_config(dir.path());
        let splitter = TextSplitter::from_config(&config).expect("splitter");
        assert_eq!(splitter.chunk_size(), 512);
        assert_eq!(splitter.split("Hello World"), vec!["Hello World"]);
    }
}
