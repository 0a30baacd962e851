//! Retention and privacy operations
//!
//! Every operation is a conjunctive filter over {guild, author, channel,
//! time-range} fed to either a bulk delete or a paging export. Deletes
//! degrade to a logged diagnostic on store failure; exports return whatever
//! was drained before a failure.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::models::ChunkRecord;
use super::store::RecordFilter;
use super::Rag;
use crate::config::EXPORT_PAGE_SIZE;
use crate::error::Result;

/// Epoch cutoff for a retention sweep: records created at or before it are
/// swept. `None` when `days` is zero, so a zero/unset retention period can
/// never delete everything.
pub fn retention_cutoff(days: u32, now_ts: i64) -> Option<i64> {
    if days == 0 {
        None
    } else {
        Some(now_ts - i64::from(days) * 86_400)
    }
}

impl Rag {
    /// Remove every record for an author, across all guilds.
    pub async fn delete_user(&self, author_id: u64) -> Result<()> {
        self.delete_filtered(RecordFilter::new().author(author_id))
            .await
    }

    /// Remove records by origin message id, optionally restricted to one
    /// author so users can only delete their own messages.
    pub async fn delete_messages_by_ids(
        &self,
        message_ids: &[u64],
        author_id: Option<u64>,
    ) -> Result<()> {
        if message_ids.is_empty() {
            return Ok(());
        }
        let mut filter = RecordFilter::new().message_ids(message_ids);
        if let Some(author_id) = author_id {
            filter = filter.author(author_id);
        }
        self.delete_filtered(filter).await
    }

    /// Retention sweep: drop records older than `days`, optionally scoped
    /// to one guild. Zero days is a no-op.
    pub async fn delete_older_than(&self, days: u32, guild_id: Option<u64>) -> Result<()> {
        let Some(cutoff) = retention_cutoff(days, Utc::now().timestamp()) else {
            debug!("Retention sweep skipped: period is zero");
            return Ok(());
        };
        let mut filter = RecordFilter::new().before(cutoff);
        if let Some(guild_id) = guild_id {
            filter = filter.guild(guild_id);
        }
        info!("Retention sweep: deleting records created before {}", cutoff);
        self.delete_filtered(filter).await
    }

    /// General filtered delete. An empty filter matches the whole
    /// collection; guarding that is the caller's job (the CLI requires an
    /// explicit `--all`).
    pub async fn delete_filtered(&self, filter: RecordFilter) -> Result<()> {
        match self.store.delete(filter.into_filter()).await {
            Ok(()) => {
                info!("Filtered delete completed");
                Ok(())
            }
            Err(err) => {
                error!("Filtered delete failed: {}", err);
                Ok(())
            }
        }
    }

    /// Export one user's records in one guild, metadata only.
    pub async fn export_user(&self, guild_id: u64, author_id: u64) -> Vec<ChunkRecord> {
        self.export_filtered(RecordFilter::new().guild(guild_id).author(author_id))
            .await
    }

    /// Filtered export; no filters means the whole collection.
    pub async fn export_all(
        &self,
        guild_id: Option<u64>,
        user_id: Option<u64>,
        channel_id: Option<u64>,
    ) -> Vec<ChunkRecord> {
        let mut filter = RecordFilter::new();
        if let Some(guild_id) = guild_id {
            filter = filter.guild(guild_id);
        }
        if let Some(user_id) = user_id {
            filter = filter.author(user_id);
        }
        if let Some(channel_id) = channel_id {
            filter = filter.channel(channel_id);
        }
        self.export_filtered(filter).await
    }

    async fn export_filtered(&self, filter: RecordFilter) -> Vec<ChunkRecord> {
        let qdrant_filter = if filter.is_empty() {
            None
        } else {
            Some(filter.into_filter())
        };

        match self.store.scroll_all(qdrant_filter, EXPORT_PAGE_SIZE).await {
            Ok(payloads) => payloads
                .iter()
                .filter_map(ChunkRecord::from_payload)
                .collect(),
            Err(err) => {
                warn!("Export scroll failed: {}", err);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_days_never_produces_a_cutoff() {
        assert_eq!(retention_cutoff(0, 1_700_000_000), None);
    }

    #[test]
    fn cutoff_is_days_in_seconds_before_now() {
        let now = 1_700_000_000;
        assert_eq!(retention_cutoff(1, now), Some(now - 86_400));
        assert_eq!(retention_cutoff(30, now), Some(now - 30 * 86_400));
    }

    #[test]
    fn large_periods_do_not_overflow() {
        let cutoff = retention_cutoff(u32::MAX, 0).unwrap();
        assert!(cutoff < 0);
    }
}
