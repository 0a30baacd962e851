//! User privacy commands: delete and export your own indexed data

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::rag::ChunkRecord;

/// Delete a user's indexed messages: by message id, or everything with
/// `all`. The author restriction means users only ever delete their own
/// records.
pub async fn delete_mine(author_id: u64, ids: &[u64], all: bool) -> Result<()> {
    if !all && ids.is_empty() {
        anyhow::bail!("Provide --ids or --all");
    }

    let rag = super::connect().await?;
    if all {
        rag.delete_user(author_id).await?;
        println!("Deleted all your indexed data.");
    } else {
        rag.delete_messages_by_ids(ids, Some(author_id)).await?;
        println!("Deleted {} message(s).", ids.len());
    }
    Ok(())
}

/// Export one user's stored metadata in a guild as pretty JSON.
pub async fn export_mine(guild_id: u64, author_id: u64, output: Option<&Path>) -> Result<()> {
    let rag = super::connect().await?;
    let records = rag.export_user(guild_id, author_id).await;
    if records.is_empty() {
        println!("No data found for export");
        return Ok(());
    }

    let default_name = format!("rag_export_{}_{}.json", guild_id, author_id);
    write_export(&records, output, default_name)
}

pub(crate) fn write_export(
    records: &[ChunkRecord],
    output: Option<&Path>,
    default_name: String,
) -> Result<()> {
    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(default_name));
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(&path, json)?;
    println!("Exported {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::rag::SourceMessage;

    #[tokio::test]
    async fn delete_mine_requires_ids_or_all() {
        let err = delete_mine(42, &[], false).await.unwrap_err();
        assert!(err.to_string().contains("--ids or --all"));
    }

    #[test]
    fn write_export_produces_readable_json() {
        let msg = SourceMessage {
            guild_id: 1,
            channel_id: 2,
            author_id: 3,
            author_name: "alice".to_string(),
            is_bot: false,
            message_id: 4,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            content: "exported text".to_string(),
        };
        let record =
            ChunkRecord::from_message(&msg, msg.content.clone(), "discord", Utc::now());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        write_export(&[record], Some(&path), "unused.json".to_string()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<ChunkRecord> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].text, "exported text");
    }
}
