//! Integration tests for the guildrag library
//!
//! These tests verify the public API and module interactions. Tests that
//! need a live Qdrant instance live in `live_store.rs` and are ignored by
//! default.

use chrono::{TimeZone, Utc};
use guildrag::{
    config::{
        RagSettings, RetrievalScope, DEFAULT_CHUNK_MAX_CHARS, DEFAULT_CHUNK_OVERLAP,
        DEFAULT_TOP_K, URL_TEXT_CAP,
    },
    rag::ingest::plan_points,
    rag::retrieve::build_context,
    rag::models::ScoredChunk,
    text, ChunkRecord, QueryScope, RecordFilter, SourceMessage,
};

// ============================================================================
// Config
// ============================================================================

#[test]
fn default_settings_match_documented_constants() {
    let settings = RagSettings::default();
    assert_eq!(settings.chunk_max_chars, DEFAULT_CHUNK_MAX_CHARS);
    assert_eq!(settings.chunk_overlap, DEFAULT_CHUNK_OVERLAP);
    assert_eq!(settings.top_k, DEFAULT_TOP_K);
    assert_eq!(settings.scope, RetrievalScope::Guild);
    assert!(settings.retention_days == 0);
}

#[test]
fn url_cap_is_twenty_thousand_chars() {
    assert_eq!(URL_TEXT_CAP, 20_000);
}

// ============================================================================
// Text pipeline
// ============================================================================

fn message(guild: u64, channel: u64, author: u64, id: u64, content: &str) -> SourceMessage {
    SourceMessage {
        guild_id: guild,
        channel_id: channel,
        author_id: author,
        author_name: format!("user-{author}"),
        is_bot: false,
        message_id: id,
        created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        content: content.to_string(),
    }
}

#[test]
fn fingerprint_is_independent_of_origin() {
    let now = Utc::now();
    let a = plan_points(
        &[message(1, 2, 3, 10, "identical words")],
        "discord",
        1200,
        120,
        now,
    );
    let b = plan_points(
        &[message(9, 8, 7, 11, "identical   words")],
        "https://example.com",
        1200,
        120,
        now,
    );
    assert_eq!(a[0].record.content_hash, b[0].record.content_hash);
    assert_eq!(a[0].id, b[0].id);
}

#[test]
fn chunk_round_trip_at_default_sizes() {
    let long = "retrieval augmented generation ".repeat(200);
    let normalized = text::normalize(&long);
    let chunks = text::chunk(&long, DEFAULT_CHUNK_MAX_CHARS, DEFAULT_CHUNK_OVERLAP);
    assert!(chunks.len() > 1);

    let mut rebuilt = chunks[0].clone();
    for piece in &chunks[1..] {
        rebuilt.extend(piece.chars().skip(DEFAULT_CHUNK_OVERLAP));
    }
    assert_eq!(rebuilt, normalized);
}

#[test]
fn emoji_only_message_plans_to_nothing() {
    let points = plan_points(
        &[message(1, 2, 3, 10, "<:kekw:112233>  <a:party:445566> ... ")],
        "discord",
        1200,
        120,
        Utc::now(),
    );
    assert!(points.is_empty());
}

// ============================================================================
// Filters and context assembly
// ============================================================================

#[test]
fn record_filter_shapes_are_stable() {
    let filter = RecordFilter::new()
        .guild(1)
        .author(2)
        .message_ids(&[5, 6])
        .into_filter();
    assert_eq!(filter.must.len(), 2);
    assert_eq!(filter.should.len(), 2);
}

#[test]
fn context_block_matches_documented_format() {
    let msg = message(1, 2, 3, 10, "The quick brown fox jumps over the lazy dog");
    let record = ChunkRecord::from_message(
        &msg,
        msg.content.clone(),
        "discord",
        Utc.timestamp_opt(1_700_000_100, 0).unwrap(),
    );
    let result = build_context(
        &[ScoredChunk {
            record,
            score: 0.97,
        }],
        4000,
    );

    assert_eq!(
        result.context_block,
        "[1] The quick brown fox jumps over the lazy dog"
    );
    assert_eq!(result.citations.len(), 1);
    assert!(result.citations[0].contains("user-3"));
    assert!(result.citations[0].starts_with("discord — "));
}

#[test]
fn query_scope_carries_optional_narrowing() {
    let scope = QueryScope::guild(1);
    assert!(scope.channel_id.is_none());
    assert!(scope.author_id.is_none());

    let narrowed = scope.channel(4).author(5);
    assert_eq!(narrowed.channel_id, Some(4));
    assert_eq!(narrowed.author_id, Some(5));
}

// ============================================================================
// Records
// ============================================================================

#[test]
fn record_survives_json_export_round_trip() {
    let msg = message(1, 2, 3, 10, "exportable");
    let record = ChunkRecord::from_message(&msg, msg.content.clone(), "discord", Utc::now());

    let json = serde_json::to_string(&record).unwrap();
    let parsed: ChunkRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, record);
}
