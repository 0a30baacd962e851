//! Retrieval: query -> filtered vector search -> ranked context block

use tracing::{debug, warn};

use super::models::{ChunkRecord, QueryScope, RetrievalResult, ScoredChunk};
use super::store::RecordFilter;
use super::Rag;
use crate::config::RetrievalScope;
use crate::extract::cap_chars;

/// Build the store filter for a query. The guild constraint is always
/// applied; channel/author constraints join it only when the configured
/// retrieval scope asks for them and the query carries the id.
pub fn scope_filter(mode: RetrievalScope, scope: &QueryScope) -> RecordFilter {
    let mut filter = RecordFilter::new().guild(scope.guild_id);
    let narrow_channel = matches!(mode, RetrievalScope::Channel | RetrievalScope::Mixed);
    let narrow_author = matches!(mode, RetrievalScope::Author | RetrievalScope::Mixed);

    if narrow_channel {
        if let Some(channel_id) = scope.channel_id {
            filter = filter.channel(channel_id);
        }
    }
    if narrow_author {
        if let Some(author_id) = scope.author_id {
            filter = filter.author(author_id);
        }
    }
    filter
}

/// Assemble ranked hits into the context block and its parallel citations.
/// Truncation happens on the final joined string, so a result near the char
/// budget may be cut mid-sentence rather than dropped whole.
pub fn build_context(hits: &[ScoredChunk], max_chars: usize) -> RetrievalResult {
    let blocks: Vec<String> = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("[{}] {}", i + 1, hit.record.text))
        .collect();

    let citations: Vec<String> = hits
        .iter()
        .map(|hit| {
            let source = if hit.record.source.is_empty() {
                "discord"
            } else {
                hit.record.source.as_str()
            };
            format!("{} — {} {}", source, hit.record.author, hit.record.created_at)
        })
        .collect();

    RetrievalResult {
        context_block: cap_chars(&blocks.join("\n\n"), max_chars),
        citations,
    }
}

impl Rag {
    /// Retrieve context for a query within a guild scope. `Ok(None)` covers
    /// both "no hits above the score floor" and any transient collaborator
    /// failure, which is logged rather than propagated.
    pub async fn retrieve_context(
        &self,
        scope: &QueryScope,
        query: &str,
    ) -> crate::error::Result<Option<RetrievalResult>> {
        let vector = match self.embedder.embed_one(query).await {
            Ok(vector) => vector,
            Err(err) => {
                warn!("Query embedding failed: {}", err);
                return Ok(None);
            }
        };

        let top_k = self.settings.top_k_for(scope.guild_id);
        let min_score = self.settings.min_score_for(scope.guild_id);
        let filter = scope_filter(self.settings.scope, scope).into_filter();

        let hits = match self.store.search(vector, top_k, min_score, filter).await {
            Ok(hits) => hits,
            Err(err) => {
                warn!("Vector search failed: {}", err);
                return Ok(None);
            }
        };
        if hits.is_empty() {
            debug!(
                "No results in guild {} above score floor {}",
                scope.guild_id, min_score
            );
            return Ok(None);
        }

        let scored: Vec<ScoredChunk> = hits
            .into_iter()
            .filter_map(|point| {
                ChunkRecord::from_payload(&point.payload).map(|record| ScoredChunk {
                    record,
                    score: point.score,
                })
            })
            .collect();
        if scored.is_empty() {
            return Ok(None);
        }

        Ok(Some(build_context(
            &scored,
            self.settings.max_context_chars,
        )))
    }
}
