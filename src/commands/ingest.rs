//! Ingest messages, URLs, and files into the vector store

use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::info;

use crate::rag::{IngestOrigin, SourceMessage};

/// Ingest a JSON-lines file of exported chat messages.
pub async fn run_messages(path: &Path, source: &str) -> Result<()> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    let mut messages = Vec::new();
    for (lineno, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let msg: SourceMessage = serde_json::from_str(line)
            .with_context(|| format!("bad message at {}:{}", path.display(), lineno + 1))?;
        messages.push(msg);
    }
    info!("Loaded {} messages from {}", messages.len(), path.display());

    let rag = super::connect().await?;
    let count = rag.ingest_messages(&messages, source).await?;
    println!("Indexed {} chunks from {} messages", count, messages.len());
    Ok(())
}

/// Fetch a URL and ingest its main content.
pub async fn run_url(url: &str, origin: IngestOrigin) -> Result<()> {
    let rag = super::connect().await?;
    let count = rag.ingest_url(&origin, url).await?;
    if count == 0 {
        println!("No text extracted from {}", url);
    } else {
        println!("Indexed {} chunks from URL", count);
    }
    Ok(())
}

/// Ingest a local document (.txt/.md/.pdf/.docx).
pub async fn run_file(path: &Path, origin: IngestOrigin) -> Result<()> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    let data = fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    let rag = super::connect().await?;
    let count = rag.ingest_bytes(&origin, &data, &filename).await?;
    if count == 0 {
        println!("No text extracted from file '{}'", filename);
    } else {
        println!("Indexed {} chunks from file '{}'", count, filename);
    }
    Ok(())
}
