//! Owner maintenance: filtered clear/export, retention sweep, stats,
//! health, snapshots

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, NaiveDate};

use crate::rag::RecordFilter;

/// Clear stored records matching the given filters. With no filter at all
/// this would wipe the entire collection, so that case is refused unless
/// `all` confirms it explicitly.
pub async fn clear(
    guild_id: Option<u64>,
    user_id: Option<u64>,
    channel_id: Option<u64>,
    before: Option<&str>,
    after: Option<&str>,
    all: bool,
) -> Result<()> {
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
    if let Some(before) = before {
        filter = filter.before(parse_ts(before)?);
    }
    if let Some(after) = after {
        filter = filter.after(parse_ts(after)?);
    }

    if filter.is_empty() && !all {
        anyhow::bail!("Refusing to clear the entire collection; pass --all to confirm");
    }

    let rag = super::connect().await?;
    rag.delete_filtered(filter).await?;
    println!("Cleared.");
    Ok(())
}

/// Export stored metadata matching the filters as pretty JSON.
pub async fn export(
    guild_id: Option<u64>,
    user_id: Option<u64>,
    channel_id: Option<u64>,
    output: Option<&Path>,
) -> Result<()> {
    let rag = super::connect().await?;
    let records = rag.export_all(guild_id, user_id, channel_id).await;
    if records.is_empty() {
        println!("No data found for export");
        return Ok(());
    }

    let mut name = format!("rag_export_g{}", guild_id.unwrap_or(0));
    if let Some(user_id) = user_id {
        name.push_str(&format!("_u{}", user_id));
    }
    if let Some(channel_id) = channel_id {
        name.push_str(&format!("_c{}", channel_id));
    }
    name.push_str(".json");

    super::privacy::write_export(&records, output, name)
}

/// Retention sweep: delete records older than `days`.
pub async fn retention(days: u32, guild_id: Option<u64>) -> Result<()> {
    if days == 0 {
        anyhow::bail!("Retention period must be a positive number of days");
    }
    let rag = super::connect().await?;
    rag.delete_older_than(days, guild_id).await?;
    println!("Retention sweep done (older than {} days).", days);
    Ok(())
}

pub async fn stats() -> Result<()> {
    let rag = super::connect().await?;
    let stats = rag.stats().await?;
    let settings = rag.settings();
    println!(
        "Collection '{}': {} points, dimension {}",
        settings.collection, stats.points_count, stats.dimension
    );
    println!(
        "Scope: {}, auto-ingest: {}, retention: {}",
        settings.scope.as_str(),
        settings.auto_ingest,
        if settings.retention_days == 0 {
            "off".to_string()
        } else {
            format!("{} days", settings.retention_days)
        }
    );
    Ok(())
}

pub async fn health() -> Result<()> {
    let rag = super::connect().await?;
    match rag.health().await {
        Ok(version) => println!("Qdrant: OK (v{})", version),
        Err(err) => {
            tracing::warn!("Health check failed: {}", err);
            println!("Qdrant: DOWN");
        }
    }
    Ok(())
}

/// Trigger or list collection snapshots.
pub async fn snapshot(action: &str) -> Result<()> {
    let rag = super::connect().await?;
    match action {
        "create" => match rag.create_snapshot().await? {
            Some(desc) => println!("Snapshot created: {}", desc.name),
            None => println!("Snapshot requested, no description returned"),
        },
        "list" => {
            let snapshots = rag.list_snapshots().await?;
            if snapshots.is_empty() {
                println!("No snapshots");
            }
            for desc in snapshots {
                println!("{} ({} bytes)", desc.name, desc.size);
            }
        }
        other => anyhow::bail!("Unknown snapshot action '{}'; use create|list", other),
    }
    Ok(())
}

/// Parse a user-supplied date: RFC 3339 first, then bare YYYY-MM-DD
/// (interpreted as UTC midnight).
fn parse_ts(value: &str) -> Result<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).expect("midnight is valid");
        return Ok(midnight.and_utc().timestamp());
    }
    anyhow::bail!("Unparseable date '{}': use RFC 3339 or YYYY-MM-DD", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ts_accepts_rfc3339() {
        let ts = parse_ts("2023-11-14T22:13:20+00:00").unwrap();
        assert_eq!(ts, 1_700_000_000);
    }

    #[test]
    fn parse_ts_accepts_bare_date() {
        let ts = parse_ts("2024-01-15").unwrap();
        assert_eq!(ts, 1_705_276_800);
    }

    #[test]
    fn parse_ts_rejects_garbage() {
        assert!(parse_ts("yesterday").is_err());
        assert!(parse_ts("15/01/2024").is_err());
    }

    #[tokio::test]
    async fn clear_without_filters_requires_all() {
        let err = clear(None, None, None, None, None, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--all"));
    }

    #[tokio::test]
    async fn clear_rejects_bad_date_before_touching_store() {
        let err = clear(Some(1), None, None, Some("not-a-date"), None, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unparseable date"));
    }

    #[tokio::test]
    async fn retention_rejects_zero_days() {
        let err = retention(0, None).await.unwrap_err();
        assert!(err.to_string().contains("positive"));
    }
}
