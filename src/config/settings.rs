//! Configuration settings for Tubesage.

use crate::error::{Result, TubesageError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub youtube: YoutubeSettings,
    pub chunking: ChunkingSettings,
    pub summary: SummarySettings,
    pub embedding: EmbeddingSettings,
    pub storage: StorageSettings,
    pub rag: RagSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.tubesage".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// YouTube Data API and transcript settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeSettings {
    /// YouTube Data API key (overridden by `YOUTUBE_API_KEY`).
    pub api_key: Option<String>,
    /// Page size for channel listing requests (the API allows at most 50).
    pub page_size: u32,
    /// Optional `eventType` filter for channel listings (e.g. "completed").
    pub event_type: Option<String>,
    /// Preferred transcript languages, in order.
    pub transcript_languages: Vec<String>,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            page_size: 50,
            event_type: None,
            transcript_languages: vec!["en".to_string()],
        }
    }
}

/// How a chunk's duration is derived from the segment map.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DurationRule {
    /// Sum of every segment overlapping the chunk's character range.
    #[default]
    Overlap,
    /// Sum of segments whose range encloses the chunk's end offset (inclusive).
    ClosingBoundary,
}

impl std::str::FromStr for DurationRule {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "overlap" => Ok(DurationRule::Overlap),
            "closing_boundary" | "boundary" => Ok(DurationRule::ClosingBoundary),
            _ => Err(format!("Unknown duration rule: {}", s)),
        }
    }
}

/// Transcript chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub overlap: usize,
    /// Duration accumulation rule.
    pub duration_rule: DurationRule,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
            duration_rule: DurationRule::Overlap,
        }
    }
}

/// Summarization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarySettings {
    /// LLM model for video and chunk summaries.
    pub model: String,
    /// Maximum characters per piece in the map step of the full-video summary.
    pub map_chunk_size: usize,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            map_chunk_size: 12_000,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Document collection with embeddings and JSON metadata.
    Vector,
    /// `videos` / `video_chunks` tables with an embedding column.
    Relational,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vector" | "chroma" => Ok(StorageBackend::Vector),
            "relational" | "sqlite" | "sql" => Ok(StorageBackend::Relational),
            _ => Err(format!("Unknown storage backend: {}", s)),
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Vector => write!(f, "vector"),
            StorageBackend::Relational => write!(f, "relational"),
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Backend name (vector, relational). Overridden by `DB_TYPE`.
    pub backend: String,
    /// Location of the vector collection database.
    pub vector_path: String,
    /// Connection string for the relational backend. Overridden by `DATABASE_URL`.
    pub database_url: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: "vector".to_string(),
            vector_path: "~/.tubesage/vectors.db".to_string(),
            database_url: "sqlite://~/.tubesage/videos.db".to_string(),
        }
    }
}

/// Question-answering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// LLM model for answers.
    pub model: String,
    /// Number of nearest chunks used as context (at most 3).
    pub max_results: usize,
    /// Cosine distance cut-off; candidates at or above it are dropped.
    pub distance_threshold: Option<f32>,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            max_results: 3,
            distance_threshold: Some(0.5),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory containing a `prompts.toml` override.
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Apply environment overrides (`DB_TYPE`, `DATABASE_URL`, `YOUTUBE_API_KEY`).
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DB_TYPE").filter(|v| !v.is_empty()) {
            debug!("DB_TYPE overrides storage.backend");
            self.storage.backend = v;
        }
        if let Some(v) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            debug!("DATABASE_URL overrides storage.database_url");
            self.storage.database_url = v;
        }
        if let Some(v) = lookup("YOUTUBE_API_KEY").filter(|v| !v.is_empty()) {
            self.youtube.api_key = Some(v);
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| TubesageError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Set a value by dotted key (e.g. `rag.model`), keeping the field's type.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let mut root = toml::Value::try_from(&*self)
            .map_err(|e| TubesageError::Config(e.to_string()))?;

        let mut parts = key.split('.').peekable();
        let mut cursor = &mut root;
        while let Some(part) = parts.next() {
            let table = cursor
                .as_table_mut()
                .ok_or_else(|| TubesageError::Config(format!("'{}' is not a section", key)))?;
            if parts.peek().is_none() {
                let parsed = match table.get(part) {
                    Some(existing) => coerce_value(existing, value)?,
                    // Optional fields are omitted when unset.
                    None => infer_value(value),
                };
                table.insert(part.to_string(), parsed);
                break;
            }
            cursor = table
                .get_mut(part)
                .ok_or_else(|| TubesageError::Config(format!("Unknown configuration key: {}", key)))?;
        }

        *self = root
            .try_into()
            .map_err(|e: toml::de::Error| TubesageError::Config(format!("Invalid value for {}: {}", key, e)))?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tubesage")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded vector collection path.
    pub fn vector_path(&self) -> PathBuf {
        Self::expand_path(&self.storage.vector_path)
    }

    /// Resolve the relational database path from the connection string.
    pub fn relational_path(&self) -> Result<PathBuf> {
        let url = self.storage.database_url.trim();
        if url.is_empty() {
            return Err(TubesageError::Config(
                "DATABASE_URL is empty; the relational backend needs a connection string".to_string(),
            ));
        }
        let path = url
            .strip_prefix("sqlite:///")
            .map(|p| format!("/{}", p))
            .or_else(|| url.strip_prefix("sqlite://").map(str::to_string))
            .unwrap_or_else(|| url.to_string());
        Ok(Self::expand_path(&path))
    }
}

/// Parse `raw` into the same TOML type as `existing`.
fn coerce_value(existing: &toml::Value, raw: &str) -> Result<toml::Value> {
    let bad = |kind: &str| TubesageError::Config(format!("Expected {} but got '{}'", kind, raw));
    Ok(match existing {
        toml::Value::Boolean(_) => toml::Value::Boolean(raw.parse().map_err(|_| bad("a boolean"))?),
        toml::Value::Integer(_) => toml::Value::Integer(raw.parse().map_err(|_| bad("an integer"))?),
        toml::Value::Float(_) => toml::Value::Float(raw.parse().map_err(|_| bad("a number"))?),
        toml::Value::Array(_) => toml::Value::Array(
            raw.split(',')
                .map(|s| toml::Value::String(s.trim().to_string()))
                .collect(),
        ),
        _ => toml::Value::String(raw.to_string()),
    })
}

fn infer_value(raw: &str) -> toml::Value {
    if let Ok(i) = raw.parse::<i64>() {
        toml::Value::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        toml::Value::Float(f)
    } else if let Ok(b) = raw.parse::<bool>() {
        toml::Value::Boolean(b)
    } else {
        toml::Value::String(raw.to_string())
    }
}
