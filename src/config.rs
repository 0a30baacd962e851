//! Configuration for the RAG engine
//!
//! Loads configuration from a config.yml file with env-var fallbacks

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Default constants (fallback if config.yml not found)
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "guild_memory";
pub const DEFAULT_CHUNK_MAX_CHARS: usize = 1200;
pub const DEFAULT_CHUNK_OVERLAP: usize = 120;
pub const DEFAULT_TOP_K: u64 = 5;
pub const DEFAULT_MIN_SCORE: f32 = 0.3;
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 4000;
pub const DEFAULT_LOCAL_EMBEDDING_DIM: usize = 256;

/// Hard cap on text extracted from a fetched URL
pub const URL_TEXT_CAP: usize = 20_000;
/// Page size used when draining scroll pagination during export
pub const EXPORT_PAGE_SIZE: u32 = 256;
/// Texts per embedding request
pub const EMBED_BATCH_SIZE: usize = 100;

/// Which payload constraints a retrieval query applies, beyond the
/// always-mandatory guild filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetrievalScope {
    #[default]
    Guild,
    Channel,
    Author,
    Mixed,
}

impl RetrievalScope {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "guild" => Some(RetrievalScope::Guild),
            "channel" => Some(RetrievalScope::Channel),
            "author" => Some(RetrievalScope::Author),
            "mixed" => Some(RetrievalScope::Mixed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalScope::Guild => "guild",
            RetrievalScope::Channel => "channel",
            RetrievalScope::Author => "author",
            RetrievalScope::Mixed => "mixed",
        }
    }
}

/// Per-guild retrieval overrides; `None` falls back to the global default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuildOverrides {
    pub top_k: Option<u64>,
    pub min_score: Option<f32>,
}

/// Engine settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RagSettings {
    pub enabled: bool,
    pub qdrant_url: String,
    pub collection: String,
    pub auto_ingest: bool,
    pub scope: RetrievalScope,
    pub chunk_max_chars: usize,
    pub chunk_overlap: usize,
    pub top_k: u64,
    pub min_score: f32,
    pub max_context_chars: usize,
    /// Records older than this many days are removed by the retention sweep.
    /// Zero disables the sweep.
    pub retention_days: u32,
    pub local_embedding_dim: usize,
    pub guilds: HashMap<u64, GuildOverrides>,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            auto_ingest: false,
            scope: RetrievalScope::Guild,
            chunk_max_chars: DEFAULT_CHUNK_MAX_CHARS,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            retention_days: 0,
            local_embedding_dim: DEFAULT_LOCAL_EMBEDDING_DIM,
            guilds: HashMap::new(),
        }
    }
}

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    rag: Option<RagSection>,
}

#[derive(Debug, Default, Deserialize)]
struct RagSection {
    enabled: Option<bool>,
    qdrant_url: Option<String>,
    collection: Option<String>,
    auto_ingest: Option<bool>,
    scope: Option<String>,
    chunk_max_chars: Option<usize>,
    chunk_overlap: Option<usize>,
    top_k: Option<u64>,
    min_score: Option<f32>,
    max_context_chars: Option<usize>,
    retention_days: Option<u32>,
    local_embedding_dim: Option<usize>,
    guilds: Option<HashMap<u64, GuildOverrides>>,
}

impl RagSettings {
    /// Load from `config.yml` in the working directory, then apply
    /// env-var overrides. Missing file means defaults.
    pub fn load() -> Self {
        let mut settings = Self::from_file(Path::new("config.yml")).unwrap_or_default();
        settings.apply_env();
        settings
    }

    /// Load from an explicit YAML file. Returns `None` when the file is
    /// missing or unparseable.
    pub fn from_file(path: &Path) -> Option<Self> {
        let raw = fs::read_to_string(path).ok()?;
        let yaml: YamlConfig = match serde_yaml::from_str(&raw) {
            Ok(yaml) => yaml,
            Err(err) => {
                tracing::warn!("Failed to parse {}: {}", path.display(), err);
                return None;
            }
        };
        let section = yaml.rag.unwrap_or_default();
        let defaults = Self::default();

        let scope = section
            .scope
            .as_deref()
            .and_then(RetrievalScope::parse)
            .unwrap_or_default();

        Some(Self {
            enabled: section.enabled.unwrap_or(defaults.enabled),
            qdrant_url: section.qdrant_url.unwrap_or(defaults.qdrant_url),
            collection: section.collection.unwrap_or(defaults.collection),
            auto_ingest: section.auto_ingest.unwrap_or(defaults.auto_ingest),
            scope,
            chunk_max_chars: section.chunk_max_chars.unwrap_or(defaults.chunk_max_chars),
            chunk_overlap: section.chunk_overlap.unwrap_or(defaults.chunk_overlap),
            top_k: section.top_k.unwrap_or(defaults.top_k),
            min_score: section.min_score.unwrap_or(defaults.min_score),
            max_context_chars: section
                .max_context_chars
                .unwrap_or(defaults.max_context_chars),
            retention_days: section.retention_days.unwrap_or(defaults.retention_days),
            local_embedding_dim: section
                .local_embedding_dim
                .unwrap_or(defaults.local_embedding_dim),
            guilds: section.guilds.unwrap_or_default(),
        })
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("QDRANT_URL") {
            if !url.is_empty() {
                self.qdrant_url = url;
            }
        }
        if let Ok(collection) = std::env::var("RAG_COLLECTION") {
            if !collection.is_empty() {
                self.collection = collection;
            }
        }
        if let Ok(enabled) = std::env::var("RAG_ENABLED") {
            self.enabled = matches!(
                enabled.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on" | "enable" | "enabled"
            );
        }
    }

    /// Effective top-k for a guild: guild override first, global fallback.
    pub fn top_k_for(&self, guild_id: u64) -> u64 {
        self.guilds
            .get(&guild_id)
            .and_then(|g| g.top_k)
            .unwrap_or(self.top_k)
    }

    /// Effective score floor for a guild: guild override first, global fallback.
    pub fn min_score_for(&self, guild_id: u64) -> f32 {
        self.guilds
            .get(&guild_id)
            .and_then(|g| g.min_score)
            .unwrap_or(self.min_score)
    }
}
