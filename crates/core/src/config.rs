//! Configuration management for DocQA.
//!
//! Configuration is assembled once at process entry from, in increasing
//! precedence:
//! - Built-in defaults
//! - An optional YAML file (`docqa.yaml` or `DOCQA_CONFIG`)
//! - Environment variables (after `.env` has been loaded into the process)
//!
//! The resulting [`AppConfig`] is passed explicitly to every component that
//! needs it; nothing reads the environment after startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Default YAML config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "docqa.yaml";

const CHAT_PROVIDERS: [&str; 2] = ["openai", "ollama"];
const EMBEDDING_PROVIDERS: [&str; 3] = ["openai", "ollama", "trigram"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory scanned for PDF/DOCX/TXT documents
    pub docs_dir: PathBuf,

    /// Directory holding the persisted vector index
    pub data_dir: PathBuf,

    /// Optional directory with prompt overrides (`<id>.yml`)
    pub prompts_dir: Option<PathBuf>,

    /// YAML config file that was merged, if any
    pub config_file: Option<PathBuf>,

    /// `.env` file that was loaded, if any
    #[serde(skip)]
    pub env_file: Option<PathBuf>,

    /// Chat completion settings
    pub llm: LlmSettings,

    /// Embedding service settings
    pub embedding: EmbeddingSettings,

    /// Chunking and retrieval settings
    pub retrieval: RetrievalSettings,

    /// Web front end settings
    pub web: WebSettings,

    /// Log filter override
    pub log_level: Option<String>,

    /// Disable colored output
    pub no_color: bool,
}

/// Chat completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Provider name ("openai" or "ollama")
    pub provider: String,

    /// Custom endpoint (OpenAI-compatible base URL or Ollama URL)
    pub endpoint: Option<String>,

    /// API key; only ever read from the environment
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Configured chat models
    pub models: ModelRoster,
}

/// The chat models declared by the application.
///
/// Only `chat` is used to answer questions and expand queries. `advanced`
/// and `advanced_streaming` are reserved: they are parsed and validated but
/// nothing calls them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelRoster {
    pub chat: ModelProfile,
    pub advanced: ModelProfile,
    pub advanced_streaming: ModelProfile,
}

/// A single chat model declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelProfile {
    pub model: String,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default)]
    pub streaming: bool,
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Provider name ("openai", "ollama" or "trigram")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Expected vector dimensions
    pub dimensions: usize,

    /// Maximum texts per embedding request
    pub batch_size: usize,

    /// Custom endpoint
    pub endpoint: Option<String>,
}

/// Chunking and retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Maximum chunk length in tokens
    pub chunk_size: usize,

    /// Tokens shared by consecutive chunks of one document
    pub chunk_overlap: usize,

    /// Chunks fetched per retrieval query
    pub top_k: usize,

    /// Number of query variants requested from the chat model
    pub query_variants: usize,

    /// Also search with the unmodified question
    pub include_original_query: bool,
}

/// Web front end settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSettings {
    /// Socket address to bind
    pub bind: String,

    /// Page title of the chat widget
    pub title: String,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    paths: Option<PathsSection>,
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    retrieval: Option<RetrievalSettings>,
    web: Option<WebSettings>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PathsSection {
    docs: Option<PathBuf>,
    data: Option<PathBuf>,
    prompts: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for ModelProfile {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo-16k".to_string(),
            temperature: 0.0,
            streaming: false,
        }
    }
}

impl Default for ModelRoster {
    fn default() -> Self {
        Self {
            chat: ModelProfile::default(),
            advanced: ModelProfile {
                model: "gpt-4".to_string(),
                temperature: 0.0,
                streaming: false,
            },
            advanced_streaming: ModelProfile {
                model: "gpt-4".to_string(),
                temperature: 0.0,
                streaming: true,
            },
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            endpoint: None,
            api_key: None,
            models: ModelRoster::default(),
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-ada-002".to_string(),
            dimensions: 1536,
            batch_size: 100,
            endpoint: None,
        }
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            chunk_size: 300,
            chunk_overlap: 50,
            top_k: 4,
            query_variants: 3,
            include_original_query: false,
        }
    }
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7860".to_string(),
            title: "Document Question Answer Demo".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from("./docs"),
            data_dir: PathBuf::from("./data"),
            prompts_dir: None,
            config_file: None,
            env_file: None,
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            retrieval: RetrievalSettings::default(),
            web: WebSettings::default(),
            log_level: None,
            no_color: false,
        }
    }
}

/// Load the `.env` file from the working directory (or its parents) into
/// the process environment.
///
/// Returns the path that was loaded. A missing file is not an error.
pub fn load_env_file() -> Option<PathBuf> {
    match dotenv::dotenv() {
        Ok(path) => Some(path),
        Err(e) if e.not_found() => None,
        Err(e) => {
            // Logging is not initialized yet
            eprintln!("warning: ignoring malformed .env file: {}", e);
            None
        }
    }
}

impl AppConfig {
    /// Load configuration from the `.env` file, the YAML file and the
    /// process environment.
    ///
    /// Environment variables:
    /// - `DOCQA_CONFIG`: Path to YAML config file
    /// - `DOCQA_DOCS_DIR`, `DOCQA_DATA_DIR`, `DOCQA_PROMPTS_DIR`: Paths
    /// - `DOCQA_PROVIDER`, `DOCQA_CHAT_MODEL`: Chat provider and model
    /// - `DOCQA_EMBEDDING_PROVIDER`, `DOCQA_EMBEDDING_MODEL`: Embedding settings
    /// - `DOCQA_API_KEY` or `OPENAI_API_KEY`: API key
    /// - `OPENAI_BASE_URL`, `OLLAMA_URL`: Endpoints
    /// - `DOCQA_WEB_ADDR`: Web bind address
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use docqa_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Docs: {:?}", config.docs_dir);
    /// ```
    pub fn load() -> AppResult<Self> {
        let env_file = load_env_file();
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.env_file = env_file;
        Ok(config)
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// `load` passes the process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let explicit_file = lookup("DOCQA_CONFIG").map(PathBuf::from);
        let config_path = explicit_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if explicit_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Some(dir) = lookup("DOCQA_DOCS_DIR") {
            config.docs_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("DOCQA_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("DOCQA_PROMPTS_DIR") {
            config.prompts_dir = Some(PathBuf::from(dir));
        }
        if let Some(provider) = lookup("DOCQA_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Some(model) = lookup("DOCQA_CHAT_MODEL") {
            config.llm.models.chat.model = model;
        }
        if let Some(provider) = lookup("DOCQA_EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }
        if let Some(model) = lookup("DOCQA_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Some(addr) = lookup("DOCQA_WEB_ADDR") {
            config.web.bind = addr;
        }

        config.llm.api_key = lookup("DOCQA_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));

        let endpoint_var = match config.llm.provider.as_str() {
            "ollama" => "OLLAMA_URL",
            _ => "OPENAI_BASE_URL",
        };
        if let Some(endpoint) = lookup(endpoint_var) {
            config.llm.endpoint = Some(endpoint);
        }

        let embedding_endpoint_var = match config.embedding.provider.as_str() {
            "ollama" => Some("OLLAMA_URL"),
            "openai" => Some("OPENAI_BASE_URL"),
            _ => None,
        };
        if let Some(endpoint) = embedding_endpoint_var.and_then(|var| lookup(var)) {
            config.embedding.endpoint = Some(endpoint);
        }

        if let Some(level) = lookup("RUST_LOG") {
            config.log_level = Some(level);
        }

        if lookup("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();
        result.config_file = Some(path.to_path_buf());

        if let Some(paths) = file.paths {
            if let Some(docs) = paths.docs {
                result.docs_dir = docs;
            }
            if let Some(data) = paths.data {
                result.data_dir = data;
            }
            if paths.prompts.is_some() {
                result.prompts_dir = paths.prompts;
            }
        }

        if let Some(llm) = file.llm {
            result.llm = llm;
        }
        if let Some(embedding) = file.embedding {
            result.embedding = embedding;
        }
        if let Some(retrieval) = file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(web) = file.web {
            result.web = web;
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Path of the SQLite file backing the vector index.
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("index.sqlite")
    }

    /// Ensure the data directory exists.
    pub fn ensure_data_dir(&self) -> AppResult<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir).map_err(|e| {
                AppError::Config(format!(
                    "Failed to create data directory {:?}: {}",
                    self.data_dir, e
                ))
            })?;
        }
        Ok(())
    }

    /// Validate provider names, chunking parameters and credentials.
    pub fn validate(&self) -> AppResult<()> {
        if !CHAT_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                CHAT_PROVIDERS.join(", ")
            )));
        }

        if !EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        let needs_key =
            self.llm.provider == "openai" || self.embedding.provider == "openai";
        if needs_key && self.llm.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(AppError::Config(
                "API key not found: set OPENAI_API_KEY in the environment or .env file"
                    .to_string(),
            ));
        }

        for (name, profile) in self.llm.models.iter() {
            if profile.model.trim().is_empty() {
                return Err(AppError::Config(format!("Model '{}' has no name", name)));
            }
            if !(0.0..=2.0).contains(&profile.temperature) {
                return Err(AppError::Config(format!(
                    "Model '{}' temperature {} is outside 0.0-2.0",
                    name, profile.temperature
                )));
            }
        }

        if self.llm.models.chat.streaming {
            return Err(AppError::Config(
                "The chat model answers in non-streaming mode; set streaming: false".to_string(),
            ));
        }

        let retrieval = &self.retrieval;
        if retrieval.chunk_size == 0 || retrieval.chunk_overlap >= retrieval.chunk_size {
            return Err(AppError::Config(format!(
                "Invalid chunking: size {} must exceed overlap {}",
                retrieval.chunk_size, retrieval.chunk_overlap
            )));
        }

        if retrieval.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }

        if retrieval.query_variants == 0 && !retrieval.include_original_query {
            return Err(AppError::Config(
                "No retrieval queries: set query_variants > 0 or include_original_query"
                    .to_string(),
            ));
        }

        if self.embedding.batch_size == 0 || self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding batch_size and dimensions must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

impl ModelRoster {
    /// Iterate over all declared models with their roster names.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ModelProfile)> {
        [
            ("chat", &self.chat),
            ("advanced", &self.advanced),
            ("advanced_streaming", &self.advanced_streaming),
        ]
        .into_iter()
    }
}
