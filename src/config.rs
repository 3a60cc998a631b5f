use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_UPLOAD_DIR: &str = "./uploads";
const DEFAULT_PERSIST_DIR: &str = "./storage";
const DEFAULT_QDRANT_URL: &str = "http://localhost:6333";
const DEFAULT_COLLECTION_NAME: &str = "documents";
const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
const DEFAULT_EMBEDDING_DIMENSION: usize = 768;
const DEFAULT_LLM_MODEL: &str = "llama3";
const DEFAULT_SERVER_PORT: u16 = 8000;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the PDF retrieval service.
///
/// Loaded once at process start and handed to each component explicitly; nothing reads the
/// environment after [`Config::from_env`] returns.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory holding uploaded source files.
    pub upload_dir: PathBuf,
    /// Directory holding the persisted index snapshot.
    pub persist_dir: PathBuf,
    /// Whether the vector index lives in Qdrant (`true`) or in process memory.
    pub use_qdrant: bool,
    /// Base URL of the Qdrant instance that stores embeddings.
    pub qdrant_url: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Name of the vector collection used for document chunks.
    pub collection_name: String,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Language model provider used for answers and summaries.
    pub llm_provider: LlmProvider,
    /// Language model identifier passed to the provider.
    pub llm_model: String,
    /// API key for OpenAI-hosted models.
    pub openai_api_key: Option<String>,
    /// API key for Groq-hosted models.
    pub groq_api_key: Option<String>,
    /// Optional override for the Ollama runtime URL.
    pub ollama_url: Option<String>,
    /// Optional override for the OpenAI-compatible API base URL.
    pub openai_base_url: Option<String>,
    /// Optional override for the automatic chunk size selection.
    pub text_splitter_chunk_size: Option<usize>,
    /// Optional token overlap between adjacent chunks.
    pub text_splitter_chunk_overlap: Option<usize>,
    /// Tuning knobs for retrieval and summarization.
    pub retrieval: RetrievalSettings,
    /// Origins allowed by the CORS layer; empty disables cross-origin access.
    pub allowed_origins: Vec<String>,
    /// HTTP server port.
    pub server_port: u16,
}

/// Retrieval breadths and relevance gates applied across the pipeline.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetrievalSettings {
    /// Minimum similarity a chunk must reach to ground an answer.
    pub similarity_threshold: f32,
    /// Number of nearest chunks fetched for a question.
    pub query_top_k: usize,
    /// Number of chunks fetched per probe when rebuilding documents from the index.
    pub reconstruction_top_k: usize,
    /// Number of chunks of a single document used as summary context.
    pub summary_context_chunks: usize,
    /// Number of chunks of the combined summaries used as relation context.
    pub relation_context_chunks: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.80,
            query_top_k: 10,
            reconstruction_top_k: 100,
            summary_context_chunks: 3,
            relation_context_chunks: 2,
        }
    }
}

/// Supported embedding backends for the indexing pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI embeddings API.
    OpenAI,
    /// Deterministic byte-hashing encoder that needs no external service.
    Hash,
}

/// Supported language model backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI chat completions.
    OpenAI,
    /// Groq's OpenAI-compatible chat completions.
    Groq,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        let defaults = RetrievalSettings::default();

        let llm_provider: LlmProvider = vars
            .optional("LLM_PROVIDER")
            .map(|value| {
                value
                    .parse()
                    .map_err(|()| ConfigError::InvalidValue("LLM_PROVIDER".into()))
            })
            .transpose()?
            .unwrap_or(LlmProvider::Ollama);
        let openai_api_key = vars.optional("OPENAI_API_KEY");
        let groq_api_key = vars.optional("GROQ_API_KEY");
        match llm_provider {
            LlmProvider::OpenAI if openai_api_key.is_none() => {
                return Err(ConfigError::MissingVariable("OPENAI_API_KEY".into()));
            }
            LlmProvider::Groq if groq_api_key.is_none() => {
                return Err(ConfigError::MissingVariable("GROQ_API_KEY".into()));
            }
            _ => {}
        }

        let embedding_provider: EmbeddingProvider = vars
            .optional("EMBEDDING_PROVIDER")
            .map(|value| {
                value
                    .parse()
                    .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".into()))
            })
            .transpose()?
            .unwrap_or(EmbeddingProvider::Ollama);
        if embedding_provider == EmbeddingProvider::OpenAI && openai_api_key.is_none() {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".into()));
        }

        let embedding_dimension = vars
            .parsed("EMBEDDING_DIMENSION")?
            .unwrap_or(DEFAULT_EMBEDDING_DIMENSION);
        if embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }

        let similarity_threshold: f32 = vars
            .parsed("SIMILARITY_THRESHOLD")?
            .unwrap_or(defaults.similarity_threshold);
        if !(0.0..=1.0).contains(&similarity_threshold) {
            return Err(ConfigError::InvalidValue("SIMILARITY_THRESHOLD".into()));
        }

        Ok(Self {
            upload_dir: vars
                .optional("UPLOAD_DIR")
                .unwrap_or_else(|| DEFAULT_UPLOAD_DIR.into())
                .into(),
            persist_dir: vars
                .optional("PERSIST_DIR")
                .unwrap_or_else(|| DEFAULT_PERSIST_DIR.into())
                .into(),
            use_qdrant: vars.flag("USE_QDRANT")?.unwrap_or(true),
            qdrant_url: vars
                .optional("QDRANT_URL")
                .unwrap_or_else(|| DEFAULT_QDRANT_URL.into()),
            qdrant_api_key: vars.optional("QDRANT_API_KEY"),
            collection_name: vars
                .optional("COLLECTION_NAME")
                .unwrap_or_else(|| DEFAULT_COLLECTION_NAME.into()),
            embedding_provider,
            embedding_model: vars
                .optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.into()),
            embedding_dimension,
            llm_provider,
            llm_model: vars
                .optional("LLM_MODEL")
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.into()),
            openai_api_key,
            groq_api_key,
            ollama_url: vars.optional("OLLAMA_URL"),
            openai_base_url: vars.optional("OPENAI_BASE_URL"),
            text_splitter_chunk_size: vars.parsed("TEXT_SPLITTER_CHUNK_SIZE")?,
            text_splitter_chunk_overlap: vars.parsed("TEXT_SPLITTER_CHUNK_OVERLAP")?,
            retrieval: RetrievalSettings {
                similarity_threshold,
                query_top_k: positive(vars.parsed("QUERY_TOP_K")?, "QUERY_TOP_K")?
                    .unwrap_or(defaults.query_top_k),
                reconstruction_top_k: positive(
                    vars.parsed("RECONSTRUCTION_TOP_K")?,
                    "RECONSTRUCTION_TOP_K",
                )?
                .unwrap_or(defaults.reconstruction_top_k),
                summary_context_chunks: positive(
                    vars.parsed("SUMMARY_CONTEXT_CHUNKS")?,
                    "SUMMARY_CONTEXT_CHUNKS",
                )?
                .unwrap_or(defaults.summary_context_chunks),
                relation_context_chunks: positive(
                    vars.parsed("RELATION_CONTEXT_CHUNKS")?,
                    "RELATION_CONTEXT_CHUNKS",
                )?
                .unwrap_or(defaults.relation_context_chunks),
            },
            allowed_origins: vars
                .optional("ALLOWED_ORIGINS")
                .map(|value| {
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            server_port: vars.parsed("PORT")?.unwrap_or(DEFAULT_SERVER_PORT),
        })
    }
}

struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.optional(key)
            .map(|value| {
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key.to_string()))
            })
            .transpose()
    }

    fn flag(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        self.optional(key)
            .map(|value| match value.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => Ok(true),
                "0" | "false" | "no" => Ok(false),
                _ => Err(ConfigError::InvalidValue(key.to_string())),
            })
            .transpose()
    }
}

fn positive(value: Option<usize>, key: &str) -> Result<Option<usize>, ConfigError> {
    match value {
        Some(0) => Err(ConfigError::InvalidValue(key.to_string())),
        other => Ok(other),
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "hash" => Ok(Self::Hash),
            _ => Err(()),
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "groq" => Ok(Self::Groq),
            _ => Err(()),
        }
    }
}

/// Load an env file (when present) and build the configuration from the process environment.
///
/// `env_file` defaults to `.env` in the working directory. Variables already set in the process
/// environment win over values from the file.
pub fn load_config(env_file: Option<&Path>) -> Result<Config, ConfigError> {
    match env_file {
        Some(path) => {
            if let Err(error) = dotenvy::from_path(path) {
                tracing::warn!(path = %path.display(), error = %error, "Failed to read env file");
            }
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    let config = Config::from_env()?;
    tracing::debug!(
        upload_dir = %config.upload_dir.display(),
        persist_dir = %config.persist_dir.display(),
        use_qdrant = config.use_qdrant,
        qdrant_url = %config.qdrant_url,
        collection = %config.collection_name,
        embedding_provider = ?config.embedding_provider,
        llm_provider = ?config.llm_provider,
        server_port = config.server_port,
        "Loaded configuration"
    );
    Ok(config)
}

#[cfg(test)]
pub(crate) fn test_config(root: &Path) -> Config {
    Config {
        upload_dir: root.join("uploads"),
        persist_dir: root.join("storage"),
        use_qdrant: false,
        qdrant_url: DEFAULT_QDRANT_URL.into(),
        qdrant_api_key: None,
        collection_name: "test-documents".into(),
        embedding_provider: EmbeddingProvider::Hash,
        embedding_model: "hash".into(),
        embedding_dimension: 64,
        llm_provider: LlmProvider::Ollama,
        llm_model: "test-model".into(),
        openai_api_key: None,
        groq_api_key: None,
        ollama_url: None,
        openai_base_url: None,
        text_splitter_chunk_size: None,
        text_splitter_chunk_overlap: None,
        retrieval: RetrievalSettings::default(),
        allowed_origins: Vec::new(),
        server_port: DEFAULT_SERVER_PORT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_deployment() {
        let config = Config::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(config.persist_dir, PathBuf::from("./storage"));
        assert!(config.use_qdrant);
        assert_eq!(config.collection_name, "documents");
        assert_eq!(config.embedding_dimension, 768);
        assert_eq!(config.server_port, 8000);
        assert!((config.retrieval.similarity_threshold - 0.80).abs() < f32::EPSILON);
        assert_eq!(config.retrieval.query_top_k, 10);
        assert_eq!(config.retrieval.reconstruction_top_k, 100);
    }

    #[test]
    fn hosted_llm_requires_api_key() {
        let error = Config::from_lookup(lookup(&[("LLM_PROVIDER", "groq")])).unwrap_err();
        assert!(matches!(error, ConfigError::MissingVariable(key) if key == "GROQ_API_KEY"));

        let config = Config::from_lookup(lookup(&[
            ("LLM_PROVIDER", "groq"),
            ("GROQ_API_KEY", "secret"),
        ]))
        .expect("config");
        assert_eq!(config.llm_provider, LlmProvider::Groq);
    }

    #[test]
    fn retrieval_settings_are_overridable() {
        let config = Config::from_lookup(lookup(&[
            ("SIMILARITY_THRESHOLD", "0.5"),
            ("QUERY_TOP_K", "4"),
            ("USE_QDRANT", "False"),
            ("ALLOWED_ORIGINS", "http://a.test, ,http://b.test"),
        ]))
        .expect("config");
        assert!((config.retrieval.similarity_threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.retrieval.query_top_k, 4);
        assert!(!config.use_qdrant);
        assert_eq!(
            config.allowed_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn rejects_out_of_range_values() {
        let error = Config::from_lookup(lookup(&[("SIMILARITY_THRESHOLD", "1.5")])).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue(_)));

        let error = Config::from_lookup(lookup(&[("QUERY_TOP_K", "0")])).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "QUERY_TOP_K"));

        let error = Config::from_lookup(lookup(&[("EMBEDDING_PROVIDER", "bert")])).unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue(_)));
    }
}
