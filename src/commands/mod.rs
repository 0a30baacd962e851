//! Command implementations
//!
//! All CLI commands are implemented here. Each module corresponds to a
//! subcommand and stays thin: parse and validate input, connect the engine,
//! call one pipeline operation, print the outcome.

pub mod ingest;
pub mod maintenance;
pub mod privacy;
pub mod search;

use crate::config::RagSettings;
use crate::rag::Rag;

/// Connect the engine for one command invocation. Initialization is the
/// only place hard failures surface; commands report them with a single
/// user-facing message.
pub(crate) async fn connect() -> anyhow::Result<Rag> {
    let settings = RagSettings::load();
    match Rag::connect(settings).await {
        Ok(rag) => Ok(rag),
        Err(err) => {
            tracing::error!("RAG initialization failed: {}", err);
            anyhow::bail!("RAG disabled or misconfigured: {err}")
        }
    }
}
