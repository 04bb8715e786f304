//! Configuration types for PaperSearch
//!
//! Values are layered: built-in defaults, then an optional YAML or JSON file,
//! then environment variables such as `PAPERSEARCH_CACHE__BATCH_SIZE=10`
//! (prefix `PAPERSEARCH_`, nested keys separated by `__`).

use crate::ai::GenerationParams;
use crate::error::{PaperSearchError, Result};
use crate::search::SearchSettings;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "PAPERSEARCH";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Ollama connection and model selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama server URL
    pub url: String,
    /// Model used for corpus and query embeddings
    pub embedding_model: String,
    /// Model used for section drafting
    pub generation_model: String,
    /// HTTP request timeout in seconds
    #[serde(default = "default_ollama_timeout")]
    pub timeout_seconds: u64,
    /// Expected embedding dimension; learned from the first response when unset
    #[serde(default)]
    pub embedding_dimension: Option<usize>,
    /// Use the per-text `/api/embeddings` endpoint instead of `/api/embed`
    #[serde(default)]
    pub single_embed_requests: bool,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            generation_model: "llama3".to_string(),
            timeout_seconds: default_ollama_timeout(),
            embedding_dimension: None,
            single_embed_requests: false,
        }
    }
}

/// Corpus database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// SQLite URL of the papers database
    pub database_url: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://papers.db".to_string(),
        }
    }
}

/// Persisted corpus embedding cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub path: PathBuf,
    /// Texts per provider call while building
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/corpus_embeddings.json"),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,
    /// Number of query embeddings kept in memory
    #[serde(default = "default_query_cache_capacity")]
    pub query_cache_capacity: u64,
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_seconds: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            max_top_k: default_max_top_k(),
            query_cache_capacity: default_query_cache_capacity(),
            provider_timeout_seconds: default_provider_timeout(),
        }
    }
}

/// Section drafting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i32,
    /// Related papers retrieved for a section when the caller does not say
    #[serde(default = "default_related_count")]
    pub related_count: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            related_count: default_related_count(),
        }
    }
}

/// HTTP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    /// Maximum request body in bytes
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            cors_enabled: true,
            max_request_size: default_max_request_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format (json, pretty, text, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// Build the layered configuration
    ///
    /// Starts from defaults, merges `path` when given, then applies
    /// `PAPERSEARCH_*` environment overrides. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            if !path.exists() {
                return Err(PaperSearchError::validation(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path));
        }

        let config: AppConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a single YAML or JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        // Try YAML first, then JSON
        match serde_yaml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(_) => {
                let config = serde_json::from_str(&content)?;
                Ok(config)
            }
        }
    }

    /// Save configuration as YAML
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Parsed Ollama URL
    pub fn ollama_url(&self) -> Result<Url> {
        Url::parse(&self.ollama.url).map_err(|e| {
            PaperSearchError::validation(format!("Invalid Ollama URL '{}': {}", self.ollama.url, e))
        })
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            default_top_k: self.search.default_top_k,
            max_top_k: self.search.max_top_k,
            provider_timeout: Duration::from_secs(self.search.provider_timeout_seconds),
        }
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            temperature: self.generation.temperature,
            max_tokens: self.generation.max_tokens,
        }
    }

    /// `host:port` for the HTTP server
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = self.ollama_url()?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(PaperSearchError::validation(
                "Ollama URL must use http or https scheme",
            ));
        }

        if self.ollama.embedding_model.trim().is_empty() {
            return Err(PaperSearchError::validation(
                "Embedding model cannot be empty",
            ));
        }

        if self.generation.enabled && self.ollama.generation_model.trim().is_empty() {
            return Err(PaperSearchError::validation(
                "Generation model cannot be empty when generation is enabled",
            ));
        }

        if self.corpus.database_url.trim().is_empty() {
            return Err(PaperSearchError::validation(
                "Corpus database URL cannot be empty",
            ));
        }

        if self.cache.batch_size == 0 {
            return Err(PaperSearchError::validation(
                "cache.batch_size must be greater than 0",
            ));
        }

        if self.search.max_top_k == 0 || self.search.default_top_k > self.search.max_top_k {
            return Err(PaperSearchError::validation(format!(
                "search.default_top_k ({}) must be between 0 and search.max_top_k ({})",
                self.search.default_top_k, self.search.max_top_k
            )));
        }

        if self.search.provider_timeout_seconds == 0 {
            return Err(PaperSearchError::validation(
                "search.provider_timeout_seconds must be greater than 0",
            ));
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(PaperSearchError::validation(
                "generation.temperature must be between 0.0 and 2.0",
            ));
        }

        if self.server.max_request_size == 0 {
            return Err(PaperSearchError::validation(
                "server.max_request_size must be greater than 0",
            ));
        }

        match self.logging.format.as_str() {
            "json" | "pretty" | "text" | "compact" => Ok(()),
            other => Err(PaperSearchError::validation(format!(
                "Unknown log format '{}'",
                other
            ))),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_ollama_timeout() -> u64 {
    120
}
fn default_batch_size() -> usize {
    5
}
fn default_top_k() -> usize {
    5
}
fn default_max_top_k() -> usize {
    100
}
fn default_query_cache_capacity() -> u64 {
    1000
}
fn default_provider_timeout() -> u64 {
    30
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> i32 {
    1024
}
fn default_related_count() -> usize {
    5
}
fn default_max_request_size() -> usize {
    1024 * 1024
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.ollama.embedding_model, "nomic-embed-text");
        assert_eq!(config.cache.batch_size, 5);
        assert_eq!(config.search.default_top_k, 5);
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.max_request_size, 1_048_576);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.cache.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.search.default_top_k = 500;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.ollama.url = "ftp://localhost".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.ollama.url = "not a url".to_string();
        assert!(matches!(
            config.validate(),
            Err(PaperSearchError::Validation { .. })
        ));

        let mut config = AppConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.generation.enabled = false;
        config.ollama.generation_model.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_io() {
        let mut config = AppConfig::default();
        config.search.max_top_k = 42;
        let temp_file = NamedTempFile::new().unwrap();

        config.to_file(temp_file.path()).unwrap();

        let loaded = AppConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_from_file_json_partial() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, r#"{{"cache": {{"path": "/tmp/c.json"}}}}"#).unwrap();

        let loaded = AppConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(loaded.cache.path, PathBuf::from("/tmp/c.json"));
        assert_eq!(loaded.cache.batch_size, 5);
        assert_eq!(loaded.ollama, OllamaConfig::default());
    }

    #[test]
    fn test_layered_load() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "cache:\n  path: /var/cache/emb.json\n  batch_size: 8").unwrap();
        writeln!(file, "server:\n  host: 0.0.0.0\n  port: 8080").unwrap();

        std::env::set_var("PAPERSEARCH_SEARCH__MAX_TOP_K", "250");
        let loaded = AppConfig::load(Some(file.path()));
        std::env::remove_var("PAPERSEARCH_SEARCH__MAX_TOP_K");
        let config = loaded.unwrap();

        assert_eq!(config.cache.path, PathBuf::from("/var/cache/emb.json"));
        assert_eq!(config.cache.batch_size, 8);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.search.max_top_k, 250);
        assert_eq!(config.search.default_top_k, 5);
        assert_eq!(config.ollama.embedding_model, "nomic-embed-text");
    }

    #[test]
    fn test_load_missing_file() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/papersearch.yaml")));
        assert!(matches!(result, Err(PaperSearchError::Validation { .. })));
    }

    #[test]
    fn test_derived_settings() {
        let config = AppConfig::default();
        let settings = config.search_settings();
        assert_eq!(settings.provider_timeout, Duration::from_secs(30));
        assert_eq!(config.generation_params().max_tokens, 1024);
        assert_eq!(config.ollama_url().unwrap().as_str(), "http://localhost:11434/");
    }
}
