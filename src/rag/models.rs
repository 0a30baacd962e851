//! Data model for stored chunks and retrieval results

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use qdrant_client::qdrant::{value::Kind, ListValue, Value as QdrantValue};
use serde::{Deserialize, Serialize};

use crate::text;

/// A chat-origin item offered to the ingest pipeline.
///
/// Serde-deserializable so exported message history (JSON lines) can be
/// replayed through the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMessage {
    pub guild_id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    pub author_name: String,
    #[serde(default)]
    pub is_bot: bool,
    pub message_id: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub content: String,
}

/// Where URL/file ingestion attributes its synthesized messages.
#[derive(Debug, Clone)]
pub struct IngestOrigin {
    pub guild_id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    pub author_name: String,
}

impl IngestOrigin {
    /// Wrap extracted text as a message from this origin. Synthesized
    /// messages carry message id 0 and the current time, like the
    /// source they never had.
    pub fn synthesize(&self, content: String) -> SourceMessage {
        SourceMessage {
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            author_id: self.author_id,
            author_name: self.author_name.clone(),
            is_bot: false,
            message_id: 0,
            created_at: Utc::now(),
            content,
        }
    }
}

/// The payload stored with every point in the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub guild_id: u64,
    pub channel_id: u64,
    pub author: String,
    pub author_id: u64,
    pub message_id: u64,
    pub created_at: String,
    pub created_at_ts: i64,
    pub source: String,
    /// Every origin tag that has produced this exact normalized text,
    /// kept sorted and duplicate-free.
    pub sources: Vec<String>,
    pub text: String,
    pub content_hash: String,
    pub first_seen: String,
    pub last_seen: String,
}

impl ChunkRecord {
    /// Build the record for one chunk of a message's content.
    pub fn from_message(
        msg: &SourceMessage,
        chunk_text: String,
        source: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let now_iso = now.to_rfc3339();
        Self {
            guild_id: msg.guild_id,
            channel_id: msg.channel_id,
            author: msg.author_name.clone(),
            author_id: msg.author_id,
            message_id: msg.message_id,
            created_at: msg.created_at.to_rfc3339(),
            created_at_ts: msg.created_at.timestamp(),
            source: source.to_string(),
            sources: vec![source.to_string()],
            content_hash: text::fingerprint(&chunk_text),
            text: chunk_text,
            first_seen: now_iso.clone(),
            last_seen: now_iso,
        }
    }

    /// Merge another sighting of the same fingerprint: union the origin tag
    /// into `sources` and refresh `last_seen`.
    pub fn merge_source(&mut self, source: &str, now: DateTime<Utc>) {
        if let Err(pos) = self.sources.binary_search_by(|s| s.as_str().cmp(source)) {
            self.sources.insert(pos, source.to_string());
        }
        self.last_seen = now.to_rfc3339();
    }

    /// Reconcile with the record already stored under the same fingerprint.
    /// The first occurrence established the record, so the stored metadata
    /// wins; this sighting only contributes its origin tags and a fresh
    /// `last_seen`.
    pub fn absorb_existing(&mut self, stored: &ChunkRecord, now: DateTime<Utc>) {
        let new_sources = std::mem::take(&mut self.sources);
        *self = stored.clone();
        for source in &new_sources {
            self.merge_source(source, now);
        }
    }

    pub fn to_payload(&self) -> HashMap<String, QdrantValue> {
        let mut payload: HashMap<String, QdrantValue> = HashMap::new();
        payload.insert("guild_id".into(), (self.guild_id as i64).into());
        payload.insert("channel_id".into(), (self.channel_id as i64).into());
        payload.insert("author".into(), self.author.clone().into());
        payload.insert("author_id".into(), (self.author_id as i64).into());
        payload.insert("message_id".into(), (self.message_id as i64).into());
        payload.insert("created_at".into(), self.created_at.clone().into());
        payload.insert("created_at_ts".into(), self.created_at_ts.into());
        payload.insert("source".into(), self.source.clone().into());
        payload.insert("sources".into(), string_list(&self.sources));
        payload.insert("text".into(), self.text.clone().into());
        payload.insert("content_hash".into(), self.content_hash.clone().into());
        payload.insert("first_seen".into(), self.first_seen.clone().into());
        payload.insert("last_seen".into(), self.last_seen.clone().into());
        payload
    }

    /// Parse a record back out of a stored payload. `None` when a required
    /// field is missing or mistyped.
    pub fn from_payload(payload: &HashMap<String, QdrantValue>) -> Option<Self> {
        Some(Self {
            guild_id: payload.get("guild_id")?.as_integer()? as u64,
            channel_id: payload.get("channel_id")?.as_integer()? as u64,
            author: payload.get("author")?.as_str()?.to_string(),
            author_id: payload.get("author_id")?.as_integer()? as u64,
            message_id: payload.get("message_id")?.as_integer()? as u64,
            created_at: payload.get("created_at")?.as_str()?.to_string(),
            created_at_ts: payload.get("created_at_ts")?.as_integer()?,
            source: payload.get("source")?.as_str()?.to_string(),
            sources: payload
                .get("sources")
                .and_then(|v| v.as_list())
                .map(|list| {
                    list.values
                        .iter()
                        .filter_map(|v| v.as_str().map(|s| s.to_string()))
                        .collect()
                })
                .unwrap_or_default(),
            text: payload.get("text")?.as_str()?.to_string(),
            content_hash: payload.get("content_hash")?.as_str()?.to_string(),
            first_seen: payload
                .get("first_seen")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            last_seen: payload
                .get("last_seen")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        })
    }
}

/// One ranked hit from the vector store.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub record: ChunkRecord,
    pub score: f32,
}

/// Assembled retrieval output; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalResult {
    /// `"[i] <chunk text>"` blocks joined by blank lines, truncated to the
    /// configured char budget.
    pub context_block: String,
    /// One `"<source> — <author> <timestamp>"` per block, same order.
    pub citations: Vec<String>,
}

/// Which records a retrieval query may see. Guild is mandatory; channel and
/// author become filters only when the configured retrieval scope asks for
/// them.
#[derive(Debug, Clone, Copy)]
pub struct QueryScope {
    pub guild_id: u64,
    pub channel_id: Option<u64>,
    pub author_id: Option<u64>,
}

impl QueryScope {
    pub fn guild(guild_id: u64) -> Self {
        Self {
            guild_id,
            channel_id: None,
            author_id: None,
        }
    }

    pub fn channel(mut self, channel_id: u64) -> Self {
        self.channel_id = Some(channel_id);
        self
    }

    pub fn author(mut self, author_id: u64) -> Self {
        self.author_id = Some(author_id);
        self
    }
}

fn string_list(items: &[String]) -> QdrantValue {
    QdrantValue {
        kind: Some(Kind::ListValue(ListValue {
            values: items.iter().map(|s| s.clone().into()).collect(),
        })),
    }
}

pub(crate) trait QdrantValueExt {
    fn as_integer(&self) -> Option<i64>;
    fn as_str(&self) -> Option<&str>;
    fn as_list(&self) -> Option<&ListValue>;
}

impl QdrantValueExt for QdrantValue {
    fn as_integer(&self) -> Option<i64> {
        match &self.kind {
            Some(Kind::IntegerValue(v)) => Some(*v),
            _ => None,
        }
    }

    fn as_str(&self) -> Option<&str> {
        match &self.kind {
            Some(Kind::StringValue(v)) => Some(v),
            _ => None,
        }
    }

    fn as_list(&self) -> Option<&ListValue> {
        match &self.kind {
            Some(Kind::ListValue(v)) => Some(v),
            _ => None,
        }
    }
}
