//! Vector store wrapper around Qdrant
//!
//! One `VectorStore` is constructed at startup and shared for the process
//! lifetime. Filters for search, delete, and export are all built through
//! [`RecordFilter`] so every operation derives its scoping the same way.

use std::collections::HashMap;

use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, DeletePointsBuilder,
    Distance, FieldType, Filter, GetPointsBuilder, PointId, PointStruct, Range, RetrievedPoint,
    ScoredPoint, ScrollPointsBuilder, SearchPointsBuilder, SnapshotDescription,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Conjunctive filter over stored payload fields. Message ids, when present,
/// form a disjunction (`should`) so one call can target many messages.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    guild_id: Option<u64>,
    author_id: Option<u64>,
    channel_id: Option<u64>,
    message_ids: Vec<u64>,
    before_ts: Option<i64>,
    after_ts: Option<i64>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guild(mut self, guild_id: u64) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    pub fn author(mut self, author_id: u64) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn channel(mut self, channel_id: u64) -> Self {
        self.channel_id = Some(channel_id);
        self
    }

    pub fn message_ids(mut self, ids: &[u64]) -> Self {
        self.message_ids = ids.to_vec();
        self
    }

    /// Keep records created at or before `ts`.
    pub fn before(mut self, ts: i64) -> Self {
        self.before_ts = Some(ts);
        self
    }

    /// Keep records created at or after `ts`.
    pub fn after(mut self, ts: i64) -> Self {
        self.after_ts = Some(ts);
        self
    }

    /// True when no constraint has been set; such a filter matches the whole
    /// collection, which callers must guard deliberately.
    pub fn is_empty(&self) -> bool {
        self.guild_id.is_none()
            && self.author_id.is_none()
            && self.channel_id.is_none()
            && self.message_ids.is_empty()
            && self.before_ts.is_none()
            && self.after_ts.is_none()
    }

    pub fn into_filter(self) -> Filter {
        let mut must = Vec::new();
        if let Some(id) = self.guild_id {
            must.push(Condition::matches("guild_id", id as i64));
        }
        if let Some(id) = self.author_id {
            must.push(Condition::matches("author_id", id as i64));
        }
        if let Some(id) = self.channel_id {
            must.push(Condition::matches("channel_id", id as i64));
        }
        if self.before_ts.is_some() || self.after_ts.is_some() {
            must.push(Condition::range(
                "created_at_ts",
                Range {
                    gte: self.after_ts.map(|t| t as f64),
                    lte: self.before_ts.map(|t| t as f64),
                    ..Default::default()
                },
            ));
        }

        let should: Vec<Condition> = self
            .message_ids
            .iter()
            .map(|id| Condition::matches("message_id", *id as i64))
            .collect();

        Filter {
            must,
            should,
            ..Default::default()
        }
    }
}

/// Qdrant-backed vector store for one collection.
pub struct VectorStore {
    client: Qdrant,
    collection: String,
}

impl VectorStore {
    pub fn new(url: &str, collection: &str) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|err| Error::Connection(err.to_string()))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
        })
    }

    /// Create the collection if missing; verify its dimension if present.
    /// Dimension mismatch is a fatal configuration error.
    pub async fn ensure_collection(&self, dim: usize) -> Result<()> {
        let collections = self.client.list_collections().await?;
        let exists = collections
            .collections
            .iter()
            .any(|c| c.name == self.collection);

        if !exists {
            info!("Creating collection '{}' (dim {})", self.collection, dim);
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(self.collection.as_str()).vectors_config(
                        VectorParamsBuilder::new(dim as u64, Distance::Cosine),
                    ),
                )
                .await?;
            self.create_payload_indexes().await;
            return Ok(());
        }

        debug!("Collection '{}' already exists", self.collection);
        if let Some(existing) = self.dimension().await? {
            if existing != dim {
                return Err(Error::DimensionMismatch {
                    collection: existing,
                    model: dim,
                });
            }
        }
        Ok(())
    }

    /// Payload indexes for the fields every filter touches. Best-effort:
    /// an index that cannot be created only slows filtering down.
    async fn create_payload_indexes(&self) {
        let fields = [
            ("guild_id", FieldType::Integer),
            ("channel_id", FieldType::Integer),
            ("author_id", FieldType::Integer),
            ("message_id", FieldType::Integer),
            ("created_at_ts", FieldType::Integer),
            ("content_hash", FieldType::Keyword),
        ];
        for (field, field_type) in fields {
            if let Err(err) = self
                .client
                .create_field_index(CreateFieldIndexCollectionBuilder::new(
                    self.collection.as_str(),
                    field,
                    field_type,
                ))
                .await
            {
                debug!("Failed to create payload index on {}: {}", field, err);
            }
        }
    }

    async fn dimension(&self) -> Result<Option<usize>> {
        use qdrant_client::qdrant::vectors_config::Config;

        let info = self.client.collection_info(self.collection.as_str()).await?;
        let dim = info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|config| match config {
                Config::Params(params) => Some(params.size as usize),
                Config::ParamsMap(_) => None,
            });
        Ok(dim)
    }

    /// Fetch stored points by id, payloads only. Used to merge `sources`
    /// when a fingerprint is re-ingested from a new origin.
    pub async fn get_points(&self, ids: Vec<PointId>) -> Result<Vec<RetrievedPoint>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(self.collection.as_str(), ids)
                    .with_payload(true)
                    .with_vectors(false),
            )
            .await?;
        Ok(response.result)
    }

    pub async fn upsert(&self, points: Vec<PointStruct>) -> Result<usize> {
        if points.is_empty() {
            return Ok(0);
        }

        let count = points.len();
        debug!("Upserting {} points into '{}'", count, self.collection);
        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection.as_str(), points))
            .await?;
        Ok(count)
    }

    /// Nearest-neighbor search with a store-side score floor.
    pub async fn search(
        &self,
        vector: Vec<f32>,
        top_k: u64,
        min_score: f32,
        filter: Filter,
    ) -> Result<Vec<ScoredPoint>> {
        let request = SearchPointsBuilder::new(self.collection.as_str(), vector, top_k)
            .filter(filter)
            .score_threshold(min_score)
            .with_payload(true);

        let response = self.client.search_points(request).await?;
        Ok(response.result)
    }

    pub async fn delete(&self, filter: Filter) -> Result<()> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(self.collection.as_str()).points(filter),
            )
            .await?;
        Ok(())
    }

    /// Page through every record matching `filter`, payloads only, until the
    /// store reports no further page. The cursor is the store's own opaque
    /// offset token.
    pub async fn scroll_all(
        &self,
        filter: Option<Filter>,
        page_size: u32,
    ) -> Result<Vec<HashMap<String, QdrantValue>>> {
        let mut payloads = Vec::new();
        let mut offset: Option<PointId> = None;

        loop {
            let mut request = ScrollPointsBuilder::new(self.collection.as_str())
                .limit(page_size)
                .with_payload(true)
                .with_vectors(false);
            if let Some(f) = filter.clone() {
                request = request.filter(f);
            }
            if let Some(next) = offset.take() {
                request = request.offset(next);
            }

            let response = self.client.scroll(request).await?;
            payloads.extend(response.result.into_iter().map(|p| p.payload));

            match response.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(payloads)
    }

    pub async fn point_count(&self) -> Result<u64> {
        let info = self.client.collection_info(self.collection.as_str()).await?;
        Ok(info
            .result
            .map(|r| r.points_count.unwrap_or(0))
            .unwrap_or(0))
    }

    /// Round-trip to the store; returns the server version string.
    pub async fn health(&self) -> Result<String> {
        let reply = self.client.health_check().await?;
        Ok(reply.version)
    }

    pub async fn create_snapshot(&self) -> Result<Option<SnapshotDescription>> {
        let response = self.client.create_snapshot(self.collection.as_str()).await?;
        Ok(response.snapshot_description)
    }

    pub async fn list_snapshots(&self) -> Result<Vec<SnapshotDescription>> {
        let response = self.client.list_snapshots(self.collection.as_str()).await?;
        Ok(response.snapshot_descriptions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_conditions() {
        let filter = RecordFilter::new();
        assert!(filter.is_empty());

        let qdrant_filter = filter.into_filter();
        assert!(qdrant_filter.must.is_empty());
        assert!(qdrant_filter.should.is_empty());
    }

    #[test]
    fn guild_scope_is_a_single_must() {
        let filter = RecordFilter::new().guild(42).into_filter();
        assert_eq!(filter.must.len(), 1);
        assert!(filter.should.is_empty());
    }

    #[test]
    fn full_conjunction_counts() {
        let filter = RecordFilter::new()
            .guild(1)
            .author(2)
            .channel(3)
            .before(1_700_000_000)
            .after(1_600_000_000)
            .into_filter();
        // guild + author + channel + one combined time range
        assert_eq!(filter.must.len(), 4);
    }

    #[test]
    fn message_ids_go_to_should() {
        let filter = RecordFilter::new()
            .author(9)
            .message_ids(&[11, 12, 13])
            .into_filter();
        assert_eq!(filter.must.len(), 1);
        assert_eq!(filter.should.len(), 3);
    }

    #[test]
    fn time_range_bounds_map_to_gte_lte() {
        let filter = RecordFilter::new()
            .after(100)
            .before(200)
            .into_filter();
        assert_eq!(filter.must.len(), 1);

        let condition = &filter.must[0];
        let field = match condition.condition_one_of.as_ref().unwrap() {
            qdrant_client::qdrant::condition::ConditionOneOf::Field(f) => f,
            other => panic!("expected field condition, got {other:?}"),
        };
        assert_eq!(field.key, "created_at_ts");
        let range = field.range.as_ref().unwrap();
        assert_eq!(range.gte, Some(100.0));
        assert_eq!(range.lte, Some(200.0));
    }

    #[test]
    fn is_empty_false_with_any_constraint() {
        assert!(!RecordFilter::new().guild(1).is_empty());
        assert!(!RecordFilter::new().message_ids(&[1]).is_empty());
        assert!(!RecordFilter::new().before(5).is_empty());
    }
}
