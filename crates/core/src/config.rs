//! Configuration management for vecgate.
//!
//! Configuration is merged from three sources, later ones winning:
//! - Built-in defaults
//! - A YAML config file (`VECGATE_CONFIG`, or `./vecgate.yaml` when present)
//! - Environment variables
//!
//! Command-line flags are applied on top with [`AppConfig::with_overrides`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AppError, AppResult};

const DEFAULT_CONFIG_FILE: &str = "vecgate.yaml";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Config file that was merged, if any
    pub config_file: Option<PathBuf>,

    /// Address the HTTP server binds to
    pub host: String,

    /// Port the HTTP server listens on
    pub port: u16,

    /// Embedding provider settings
    pub embedding: EmbeddingSettings,

    /// Vector store settings
    pub vector: VectorStoreSettings,

    /// Chat (retrieval-augmented completion) settings
    pub chat: ChatSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,
}

/// Settings for the external embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider name: "openai" or "mock"
    pub provider: String,

    /// Model identifier sent to the provider
    pub model: String,

    /// API key for the provider
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL of the provider API
    pub base_url: String,

    /// Vector dimension produced by the model
    pub dimensions: usize,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-ada-002".to_string(),
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            dimensions: 1536,
            timeout_secs: 30,
        }
    }
}

/// Settings for the chat pipeline and its LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatSettings {
    /// Provider name: "openai" or "mock"
    pub provider: String,

    /// Chat-completion model
    pub model: String,

    /// API key for the provider
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Base URL of the provider API
    pub base_url: String,

    /// System prompt sent before every user turn
    pub system_prompt: String,

    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,

    /// Maximum tokens generated per reply
    pub max_tokens: u32,

    /// Number of similar stored texts retrieved as context
    pub context_limit: usize,

    /// SQLite file holding the chat history
    pub history_path: PathBuf,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant with access to previous conversation context. Use this context to provide more relevant and consistent responses.";

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.7,
            max_tokens: 500,
            context_limit: 5,
            history_path: PathBuf::from("vecgate-chat.db"),
            timeout_secs: 60,
        }
    }
}

/// Settings for the vector store backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct VectorStoreSettings {
    /// Backend selector: "milvus" or "pinecone"
    pub backend: String,

    /// Collection (Milvus) or index (Pinecone) name
    pub collection: String,

    /// Embedding dimension of every record in the collection
    pub dimension: usize,

    /// Flush after each insert so rows are immediately searchable
    pub flush_on_insert: bool,

    /// Request timeout in seconds for engine calls
    pub timeout_secs: u64,

    pub milvus: MilvusSettings,

    pub pinecone: PineconeSettings,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            backend: "milvus".to_string(),
            collection: "chat_embeddings".to_string(),
            dimension: 1536,
            flush_on_insert: true,
            timeout_secs: 30,
            milvus: MilvusSettings::default(),
            pinecone: PineconeSettings::default(),
        }
    }
}

/// Self-hosted Milvus connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MilvusSettings {
    pub host: String,
    pub port: u16,

    /// Optional bearer token (`user:password` or API key)
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// IVF_FLAT partition count used when the collection is created
    pub nlist: u32,

    /// IVF partitions searched per query
    pub nprobe: u32,
}

impl Default for MilvusSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 19530,
            token: None,
            nlist: 1024,
            nprobe: 10,
        }
    }
}

impl MilvusSettings {
    /// Base URL of the Milvus REST endpoint.
    pub fn endpoint(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            format!("{}:{}", self.host.trim_end_matches('/'), self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

/// Managed Pinecone settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PineconeSettings {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Environment/region the index lives in
    pub environment: Option<String>,

    /// Control-plane URL
    pub controller_url: String,
}

impl Default for PineconeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            environment: None,
            controller_url: "https://api.pinecone.io".to_string(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    server: Option<ServerSection>,
    embedding: Option<EmbeddingSettings>,
    vector: Option<VectorStoreSettings>,
    chat: Option<ChatSettings>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Deserialize)]
struct ServerSection {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            host: "0.0.0.0".to_string(),
            port: 8000,
            embedding: EmbeddingSettings::default(),
            vector: VectorStoreSettings::default(),
            chat: ChatSettings::default(),
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the config file and process environment.
    ///
    /// Environment variables:
    /// - `VECGATE_CONFIG`: Path to a YAML config file
    /// - `VECGATE_HOST`, `VECGATE_PORT`: HTTP bind address
    /// - `EMBEDDING_PROVIDER`, `EMBEDDING_MODEL`, `OPENAI_API_KEY`, `OPENAI_BASE_URL`
    /// - `VECTOR_DB_TYPE`, `VECTOR_COLLECTION`, `EMBEDDING_DIMENSION`, `VECTOR_FLUSH_ON_INSERT`
    /// - `MILVUS_HOST`, `MILVUS_PORT`, `MILVUS_TOKEN`, `MILVUS_NLIST`, `MILVUS_NPROBE`
    /// - `PINECONE_API_KEY`, `PINECONE_ENVIRONMENT`, `PINECONE_CONTROLLER_URL`
    /// - `CHAT_PROVIDER`, `CHAT_MODEL`, `CHAT_TEMPERATURE`, `CHAT_MAX_TOKENS`,
    ///   `CHAT_CONTEXT_LIMIT`, `CHAT_HISTORY_PATH`
    /// - `HTTP_TIMEOUT_SECS`, `RUST_LOG`, `NO_COLOR`
    ///
    /// # Example
    /// ```no_run
    /// use vecgate_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Backend: {}", config.vector.backend);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Load configuration using `lookup` in place of the process environment.
    pub fn load_from<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let config_path = match lookup("VECGATE_CONFIG") {
            Some(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    return Err(AppError::Config(format!(
                        "Config file does not exist: {:?}",
                        path
                    )));
                }
                Some(path)
            }
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                path.exists().then_some(path)
            }
        };

        if let Some(path) = config_path {
            config = config.merge_yaml(&path)?;
        }

        // Environment variables override YAML config
        config.apply_env(&lookup)?;

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();
        result.config_file = Some(path.to_path_buf());

        if let Some(server) = config_file.server {
            if let Some(host) = server.host {
                result.host = host;
            }
            if let Some(port) = server.port {
                result.port = port;
            }
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(vector) = config_file.vector {
            result.vector = vector;
        }

        if let Some(chat) = config_file.chat {
            result.chat = chat;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_json = parse_log_format("logging.format", &format)?;
            }
        }

        Ok(result)
    }

    fn apply_env<F>(&mut self, lookup: &F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("VECGATE_HOST") {
            self.host = host;
        }
        if let Some(port) = parse_var(lookup, "VECGATE_PORT")? {
            self.port = port;
        }

        // One OpenAI account serves both embeddings and chat
        let chat = &mut self.chat;
        if let Some(provider) = lookup("CHAT_PROVIDER") {
            chat.provider = provider.to_lowercase();
        }
        if let Some(model) = lookup("CHAT_MODEL") {
            chat.model = model;
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            chat.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            chat.base_url = url;
        }
        if let Some(temperature) = parse_var(lookup, "CHAT_TEMPERATURE")? {
            chat.temperature = temperature;
        }
        if let Some(max_tokens) = parse_var(lookup, "CHAT_MAX_TOKENS")? {
            chat.max_tokens = max_tokens;
        }
        if let Some(limit) = parse_var(lookup, "CHAT_CONTEXT_LIMIT")? {
            chat.context_limit = limit;
        }
        if let Some(path) = lookup("CHAT_HISTORY_PATH") {
            chat.history_path = PathBuf::from(path);
        }

        let embedding = &mut self.embedding;
        if let Some(provider) = lookup("EMBEDDING_PROVIDER") {
            embedding.provider = provider.to_lowercase();
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            embedding.model = model;
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            embedding.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            embedding.base_url = url;
        }

        let vector = &mut self.vector;
        if let Some(backend) = lookup("VECTOR_DB_TYPE") {
            vector.backend = backend.to_lowercase();
        }
        if let Some(collection) = lookup("VECTOR_COLLECTION") {
            vector.collection = collection;
        }
        if let Some(dimension) = parse_var(lookup, "EMBEDDING_DIMENSION")? {
            vector.dimension = dimension;
            embedding.dimensions = dimension;
        }
        if let Some(flush) = lookup("VECTOR_FLUSH_ON_INSERT") {
            vector.flush_on_insert = parse_bool("VECTOR_FLUSH_ON_INSERT", &flush)?;
        }
        if let Some(timeout) = parse_var(lookup, "HTTP_TIMEOUT_SECS")? {
            vector.timeout_secs = timeout;
            embedding.timeout_secs = timeout;
        }

        let milvus = &mut vector.milvus;
        if let Some(host) = lookup("MILVUS_HOST") {
            milvus.host = host;
        }
        if let Some(port) = parse_var(lookup, "MILVUS_PORT")? {
            milvus.port = port;
        }
        if let Some(token) = lookup("MILVUS_TOKEN") {
            milvus.token = Some(token);
        }
        if let Some(nlist) = parse_var(lookup, "MILVUS_NLIST")? {
            milvus.nlist = nlist;
        }
        if let Some(nprobe) = parse_var(lookup, "MILVUS_NPROBE")? {
            milvus.nprobe = nprobe;
        }

        let pinecone = &mut vector.pinecone;
        if let Some(key) = lookup("PINECONE_API_KEY") {
            pinecone.api_key = Some(key);
        }
        if let Some(environment) = lookup("PINECONE_ENVIRONMENT") {
            pinecone.environment = Some(environment);
        }
        if let Some(url) = lookup("PINECONE_CONTROLLER_URL") {
            pinecone.controller_url = url;
        }

        self.log_level = lookup("RUST_LOG").or(self.log_level.take());
        if lookup("NO_COLOR").is_some() {
            self.no_color = true;
        }
        if let Some(format) = lookup("VECGATE_LOG_FORMAT") {
            self.log_json = parse_log_format("VECGATE_LOG_FORMAT", &format)?;
        }

        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the file.
    pub fn with_overrides(
        mut self,
        backend: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(backend) = backend {
            self.vector.backend = backend.to_lowercase();
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Validate cross-field consistency.
    ///
    /// Backend-specific credentials are checked when the backend is built.
    pub fn validate(&self) -> AppResult<()> {
        if self.vector.dimension == 0 {
            return Err(AppError::Config(
                "Embedding dimension must be greater than zero".to_string(),
            ));
        }

        if self.embedding.dimensions != self.vector.dimension {
            return Err(AppError::Config(format!(
                "Embedding dimensions ({}) do not match vector store dimension ({})",
                self.embedding.dimensions, self.vector.dimension
            )));
        }

        if self.vector.collection.trim().is_empty() {
            return Err(AppError::Config("Collection name must not be empty".to_string()));
        }

        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(AppError::Config(format!(
                "Chat temperature must be between 0.0 and 2.0, got {}",
                self.chat.temperature
            )));
        }

        Ok(())
    }
}

/// `true` for JSON output, `false` for human-readable text.
fn parse_log_format(key: &str, value: &str) -> AppResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "json" => Ok(true),
        "text" | "pretty" => Ok(false),
        other => Err(AppError::Config(format!(
            "Invalid value for {}: '{}' (expected json or text)",
            key, other
        ))),
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> AppResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::Config(format!("Invalid value for {}: '{}' ({})", key, raw, e))),
        None => Ok(None),
    }
}

fn parse_bool(key: &str, raw: &str) -> AppResult<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!(
            "Invalid value for {}: '{}' (expected true or false)",
            key, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.vector.backend, "milvus");
        assert_eq!(config.vector.collection, "chat_embeddings");
        assert_eq!(config.vector.dimension, 1536);
        assert!(config.vector.flush_on_insert);
        assert_eq!(config.vector.milvus.endpoint(), "http://localhost:19530");
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::load_from(lookup_from(&[
            ("VECTOR_DB_TYPE", "Pinecone"),
            ("PINECONE_API_KEY", "pk"),
            ("PINECONE_ENVIRONMENT", "us-east-1-aws"),
            ("MILVUS_PORT", "29530"),
            ("EMBEDDING_DIMENSION", "8"),
            ("VECTOR_FLUSH_ON_INSERT", "false"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .unwrap();

        assert_eq!(config.vector.backend, "pinecone");
        assert_eq!(config.vector.pinecone.api_key.as_deref(), Some("pk"));
        assert_eq!(
            config.vector.pinecone.environment.as_deref(),
            Some("us-east-1-aws")
        );
        assert_eq!(config.vector.milvus.port, 29530);
        assert_eq!(config.vector.dimension, 8);
        assert_eq!(config.embedding.dimensions, 8);
        assert!(!config.vector.flush_on_insert);
        assert_eq!(config.embedding.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let result = AppConfig::load_from(lookup_from(&[("MILVUS_PORT", "not-a-port")]));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("MILVUS_PORT"));
    }

    #[test]
    fn test_invalid_bool_rejected() {
        let result = AppConfig::load_from(lookup_from(&[("VECTOR_FLUSH_ON_INSERT", "maybe")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_yaml_then_env_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  port: 9000\nvector:\n  backend: pinecone\n  collection: notes\n  milvus:\n    nlist: 64\nlogging:\n  level: warn\n  color: false"
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = AppConfig::load_from(lookup_from(&[
            ("VECGATE_CONFIG", path.as_str()),
            ("VECTOR_DB_TYPE", "milvus"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.vector.collection, "notes");
        assert_eq!(config.vector.milvus.nlist, 64);
        assert_eq!(config.vector.milvus.nprobe, 10);
        assert_eq!(config.vector.backend, "milvus");
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert!(config.no_color);
    }

    #[test]
    fn test_chat_settings_from_env() {
        let config = AppConfig::load_from(lookup_from(&[
            ("OPENAI_API_KEY", "sk-shared"),
            ("CHAT_MODEL", "gpt-4o-mini"),
            ("CHAT_CONTEXT_LIMIT", "3"),
            ("CHAT_HISTORY_PATH", "/tmp/history.db"),
        ]))
        .unwrap();

        assert_eq!(config.chat.provider, "openai");
        assert_eq!(config.chat.model, "gpt-4o-mini");
        assert_eq!(config.chat.api_key.as_deref(), Some("sk-shared"));
        assert_eq!(config.embedding.api_key.as_deref(), Some("sk-shared"));
        assert_eq!(config.chat.context_limit, 3);
        assert_eq!(config.chat.history_path, PathBuf::from("/tmp/history.db"));
        assert_eq!(config.chat.max_tokens, 500);
    }

    #[test]
    fn test_chat_temperature_validated() {
        let mut config = AppConfig::default();
        config.chat.temperature = 3.5;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("temperature"));
    }

    #[test]
    fn test_log_format() {
        let config = AppConfig::load_from(lookup_from(&[("VECGATE_LOG_FORMAT", "JSON")])).unwrap();
        assert!(config.log_json);

        let result = AppConfig::load_from(lookup_from(&[("VECGATE_LOG_FORMAT", "xml")]));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("VECGATE_LOG_FORMAT"));
    }

    #[test]
    fn test_missing_config_file_rejected() {
        let result = AppConfig::load_from(lookup_from(&[(
            "VECGATE_CONFIG",
            "/nonexistent/vecgate.yaml",
        )]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            Some("PINECONE".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(config.vector.backend, "pinecone");
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_dimension_mismatch() {
        let mut config = AppConfig::default();
        config.embedding.dimensions = 768;
        assert!(config.validate().is_err());

        config.embedding.dimensions = 1536;
        assert!(config.validate().is_ok());
    }
}
