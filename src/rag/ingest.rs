//! Dedup/ingest pipeline
//!
//! A batch of messages becomes at most one stored point per unique
//! normalized chunk: plan (filter -> chunk -> fingerprint -> in-batch dedup),
//! reconcile with already-stored fingerprints, embed each unique text once,
//! upsert keyed by the content-derived point id.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use qdrant_client::qdrant::{PointId, PointStruct};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::models::{ChunkRecord, IngestOrigin, SourceMessage};
use super::Rag;
use crate::config::EMBED_BATCH_SIZE;
use crate::error::Result;
use crate::extract;
use crate::text;

/// One unique-fingerprint chunk pending upsert.
#[derive(Debug, Clone)]
pub struct PendingPoint {
    pub id: Uuid,
    pub record: ChunkRecord,
}

/// The pure planning stage: drop bot/empty/trivial messages, chunk the rest,
/// fingerprint every chunk, and collapse duplicates within the batch. A
/// repeated fingerprint merges its origin into the established record and
/// refreshes `last_seen` instead of appearing twice.
pub fn plan_points(
    messages: &[SourceMessage],
    source: &str,
    max_chars: usize,
    overlap: usize,
    now: DateTime<Utc>,
) -> Vec<PendingPoint> {
    let mut order: Vec<String> = Vec::new();
    let mut by_hash: HashMap<String, PendingPoint> = HashMap::new();

    for msg in messages {
        if msg.is_bot {
            continue;
        }
        if msg.content.trim().is_empty() || text::is_trivial(&msg.content) {
            continue;
        }

        for chunk_text in text::chunk(&msg.content, max_chars, overlap) {
            let hash = text::fingerprint(&chunk_text);
            match by_hash.get_mut(&hash) {
                Some(existing) => existing.record.merge_source(source, now),
                None => {
                    let id = text::point_id(&chunk_text);
                    let record = ChunkRecord::from_message(msg, chunk_text, source, now);
                    order.push(hash.clone());
                    by_hash.insert(hash, PendingPoint { id, record });
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|hash| by_hash.remove(&hash))
        .collect()
}

impl Rag {
    /// Ingest a batch of messages under one origin tag. Returns the number
    /// of unique points written; zero input, zero survivors after filtering,
    /// or a failed collaborator call all come back as 0.
    pub async fn ingest_messages(
        &self,
        messages: &[SourceMessage],
        source: &str,
    ) -> Result<usize> {
        let now = Utc::now();
        let mut points = plan_points(
            messages,
            source,
            self.settings.chunk_max_chars,
            self.settings.chunk_overlap,
            now,
        );
        if points.is_empty() {
            debug!("Nothing ingestible in batch of {} messages", messages.len());
            return Ok(0);
        }

        self.merge_stored_sources(&mut points, now).await;

        let texts: Vec<String> = points.iter().map(|p| p.record.text.clone()).collect();
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            match self.embedder.embed(batch).await {
                Ok(batch_vectors) => vectors.extend(batch_vectors),
                Err(err) => {
                    warn!("Embedding failed, dropping batch: {}", err);
                    return Ok(0);
                }
            }
        }

        let structs: Vec<PointStruct> = points
            .into_iter()
            .zip(vectors)
            .filter(|(_, vector)| !vector.is_empty())
            .map(|(point, vector)| {
                PointStruct::new(point.id.to_string(), vector, point.record.to_payload())
            })
            .collect();

        let written = match self.store.upsert(structs).await {
            Ok(count) => count,
            Err(err) => {
                warn!("Upsert failed, nothing written: {}", err);
                0
            }
        };
        if written > 0 {
            info!(
                "Ingested {} unique chunks from {} messages (source: {})",
                written,
                messages.len(),
                source
            );
        }
        Ok(written)
    }

    /// A fingerprint already in the store keeps its established record;
    /// this batch only adds origin tags and a fresh `last_seen`. Best
    /// effort: if the lookup fails the new records stand alone.
    async fn merge_stored_sources(&self, points: &mut [PendingPoint], now: DateTime<Utc>) {
        let ids: Vec<PointId> = points
            .iter()
            .map(|p| PointId::from(p.id.to_string()))
            .collect();

        match self.store.get_points(ids).await {
            Ok(existing) => {
                let stored: HashMap<String, ChunkRecord> = existing
                    .iter()
                    .filter_map(|p| ChunkRecord::from_payload(&p.payload))
                    .map(|r| (r.content_hash.clone(), r))
                    .collect();
                for point in points.iter_mut() {
                    if let Some(prev) = stored.get(&point.record.content_hash) {
                        point.record.absorb_existing(prev, now);
                    }
                }
            }
            Err(err) => {
                warn!("Could not read existing records for merge: {}", err);
            }
        }
    }

    /// Fetch a URL, extract its main content, and ingest it attributed to
    /// `origin` with the URL itself as the source tag. No extractable text
    /// means zero chunks, not an error.
    pub async fn ingest_url(&self, origin: &IngestOrigin, url: &str) -> Result<usize> {
        let Some(content) = extract::fetch_url_text(url).await else {
            return Ok(0);
        };
        let msg = origin.synthesize(content);
        self.ingest_messages(&[msg], url).await
    }

    /// Ingest an uploaded file (txt/md/pdf/docx), source-tagged with its
    /// filename.
    pub async fn ingest_bytes(
        &self,
        origin: &IngestOrigin,
        data: &[u8],
        filename: &str,
    ) -> Result<usize> {
        let Some(content) = extract::extract_bytes(data, filename) else {
            return Ok(0);
        };
        let msg = origin.synthesize(content);
        self.ingest_messages(&[msg], filename).await
    }
}
