//! Provider doubles shared by pipeline unit tests.

use crate::{
    completion::{CompletionClient, CompletionError},
    embedding::{EmbeddingClient, EmbeddingClientError},
};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Completion client that returns a fixed reply and records every prompt.
pub(crate) struct RecordingCompletion {
    reply: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl RecordingCompletion {
    pub(crate) fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

#[async_trait]
impl CompletionClient for RecordingCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Embeds text as keyword presence plus a small bias, so unrelated texts score near zero.
pub(crate) struct KeywordEmbedding {
    keywords: Vec<String>,
}

impl KeywordEmbedding {
    pub(crate) fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    pub(crate) fn encode(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = self
            .keywords
            .iter()
            .map(|keyword| if lower.contains(keyword.as_str()) { 1.0 } else { 0.0 })
            .collect();
        vector.push(0.05);
        vector
    }
}

#[async_trait]
impl EmbeddingClient for KeywordEmbedding {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }

    fn dimension(&self) -> usize {
        self.keywords.len() + 1
    }
}
