//! Semantic search against the stored collection

use anyhow::Result;

use crate::extract::cap_chars;
use crate::rag::QueryScope;

const PREVIEW_CHARS: usize = 1500;

pub async fn run(
    query: &str,
    guild_id: u64,
    channel_id: Option<u64>,
    author_id: Option<u64>,
) -> Result<()> {
    let rag = super::connect().await?;

    let mut scope = QueryScope::guild(guild_id);
    if let Some(channel_id) = channel_id {
        scope = scope.channel(channel_id);
    }
    if let Some(author_id) = author_id {
        scope = scope.author(author_id);
    }

    match rag.retrieve_context(&scope, query).await? {
        None => println!("No hits"),
        Some(result) => {
            let mut preview = cap_chars(&result.context_block, PREVIEW_CHARS);
            if result.context_block.chars().count() > PREVIEW_CHARS {
                preview.push_str("...");
            }
            println!("{}", preview);
            println!();
            for (i, citation) in result.citations.iter().enumerate() {
                println!("[{}] {}", i + 1, citation);
            }
        }
    }
    Ok(())
}
