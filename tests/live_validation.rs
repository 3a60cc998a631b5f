use pdfrag::config::{Config, EmbeddingProvider, LlmProvider};
use pdfrag::embedding::build_embedding_client;
use pdfrag::completion::build_completion_client;
use pdfrag::qdrant::QdrantService;
use pdfrag::store::{Node, NodeMetadata, VectorStore};
use std::collections::HashMap;

const LIVE_COLLECTION: &str = "pdfrag-live-validation";

fn live_config() -> Config {
    let defaults: HashMap<&str, &str> = [
        ("QDRANT_URL", "http://127.0.0.1:6333"),
        ("EMBEDDING_PROVIDER", "ollama"),
        ("EMBEDDING_MODEL", "nomic-embed-text"),
        ("EMBEDDING_DIMENSION", "768"),
        ("LLM_PROVIDER", "ollama"),
        ("OLLAMA_URL", "http://127.0.0.1:11434"),
    ]
    .into_iter()
    .collect();
    Config::from_lookup(|key| {
        std::env::var(key)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .or_else(|| defaults.get(key).map(|value| value.to_string()))
    })
    .expect("live config")
}

#[tokio::test]
#[ignore = "Requires live Qdrant"]
async fn live_qdrant_store_roundtrip() {
    let config = live_config();
    let store = QdrantService::new(&config.qdrant_url, config.qdrant_api_key.clone())
        .expect("qdrant client");

    store
        .ensure_collection(LIVE_COLLECTION, 3)
        .await
        .expect("collection");
    store
        .upsert(
            LIVE_COLLECTION,
            vec![Node {
                id: uuid::Uuid::new_v4().to_string(),
                ref_doc_id: "live-doc".into(),
                text: "live validation chunk".into(),
                chunk_hash: "live".into(),
                vector: vec![0.1, 0.2, 0.3],
                metadata: NodeMetadata {
                    file_name: Some("live.pdf".into()),
                    ..Default::default()
                },
            }],
        )
        .await
        .expect("upsert");

    let hits = store
        .search(LIVE_COLLECTION, vec![0.1, 0.2, 0.3], 1)
        .await
        .expect("search");
    assert_eq!(hits.len(), 1);
    assert!(hits[0].score > 0.99, "verbatim vector should match: {hits:?}");
    assert_eq!(hits[0].metadata.file_name.as_deref(), Some("live.pdf"));

    store
        .delete_collection(LIVE_COLLECTION)
        .await
        .expect("cleanup");
    assert_eq!(store.count(LIVE_COLLECTION).await.expect("count"), 0);
}

#[tokio::test]
#[ignore = "Requires live Ollama embeddings"]
async fn live_ollama_embedding_roundtrip() {
    let config = live_config();
    assert_eq!(config.embedding_provider, EmbeddingProvider::Ollama);
    let client = build_embedding_client(&config).expect("embedding client");
    let vectors = client
        .generate_embeddings(vec!["pdfrag live embedding".to_string()])
        .await
        .expect("failed to request embeddings from provider");
    assert_eq!(vectors.len(), 1, "expected embedding per input text");
    assert_eq!(
        vectors[0].len(),
        config.embedding_dimension,
        "embedding dimension mismatch"
    );
}

#[tokio::test]
#[ignore = "Requires live Ollama completions"]
async fn live_ollama_completion() {
    let config = live_config();
    assert_eq!(config.llm_provider, LlmProvider::Ollama);
    let client = build_completion_client(&config).expect("completion client");
    let answer = client
        .complete("Reply with the single word: ready")
        .await
        .expect("completion");
    assert!(!answer.trim().is_empty());
}
