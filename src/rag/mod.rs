//! The RAG pipeline
//!
//! Ingestion (chunk -> fingerprint -> dedup -> embed -> upsert), scoped
//! retrieval, and retention/privacy operations over one Qdrant collection.
//! A single [`Rag`] handle is constructed at startup and passed by reference
//! into every call; nothing here caches records between calls, all state
//! lives in the store.

pub mod embeddings;
pub mod ingest;
pub mod models;
pub mod retention;
pub mod retrieve;
pub mod store;

use tracing::info;

use crate::config::RagSettings;
use crate::error::{Error, Result};
use embeddings::EmbedBackend;
use store::VectorStore;

pub use models::{ChunkRecord, IngestOrigin, QueryScope, RetrievalResult, SourceMessage};
pub use store::RecordFilter;

/// Collection statistics for the stats command.
#[derive(Debug)]
pub struct CollectionStats {
    pub points_count: u64,
    pub dimension: usize,
}

/// The engine handle: settings, store connection, and embedding backend,
/// wired together once.
pub struct Rag {
    settings: RagSettings,
    store: VectorStore,
    embedder: EmbedBackend,
}

impl Rag {
    /// Connect to the vector store and make the collection ready.
    ///
    /// This is the only place hard failures surface: a disabled config, an
    /// unreachable store, or a collection whose dimension disagrees with the
    /// embedding model all fail here, once. Every later call degrades to
    /// empty results instead of erroring.
    pub async fn connect(settings: RagSettings) -> Result<Self> {
        if !settings.enabled {
            return Err(Error::Disabled);
        }
        if settings.qdrant_url.trim().is_empty() {
            return Err(Error::Connection("no Qdrant URL configured".to_string()));
        }

        let embedder = EmbedBackend::from_env(settings.local_embedding_dim);
        let store = VectorStore::new(&settings.qdrant_url, &settings.collection)?;
        store.ensure_collection(embedder.dimension()).await?;

        info!(
            "RAG ready: collection '{}' at {}",
            settings.collection, settings.qdrant_url
        );
        Ok(Self {
            settings,
            store,
            embedder,
        })
    }

    pub fn settings(&self) -> &RagSettings {
        &self.settings
    }

    pub async fn stats(&self) -> Result<CollectionStats> {
        let points_count = self.store.point_count().await?;
        Ok(CollectionStats {
            points_count,
            dimension: self.embedder.dimension(),
        })
    }

    /// Store round-trip; returns the server version.
    pub async fn health(&self) -> Result<String> {
        self.store.health().await
    }

    pub async fn create_snapshot(
        &self,
    ) -> Result<Option<qdrant_client::qdrant::SnapshotDescription>> {
        self.store.create_snapshot().await
    }

    pub async fn list_snapshots(
        &self,
    ) -> Result<Vec<qdrant_client::qdrant::SnapshotDescription>> {
        self.store.list_snapshots().await
    }
}
