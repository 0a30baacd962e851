//! guildrag CLI - main entry point
//!
//! Unified CLI for ingesting, searching, and maintaining the guild RAG
//! collection.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use guildrag::{commands, metrics, IngestOrigin};

#[derive(Parser)]
#[command(name = "guildrag")]
#[command(about = "Guild chat RAG memory", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest exported chat messages (JSON lines) into the vector store
    Ingest {
        /// Path to a JSON-lines file of messages
        file: PathBuf,

        /// Origin tag stored with the chunks
        #[arg(short, long, default_value = "discord")]
        source: String,
    },

    /// Fetch a URL and ingest its main content
    IngestUrl {
        url: String,

        /// Guild the content is attributed to
        #[arg(long)]
        guild: u64,

        /// Channel the content is attributed to
        #[arg(long)]
        channel: u64,

        /// Author id the content is attributed to
        #[arg(long)]
        author: u64,

        /// Author display name
        #[arg(long, default_value = "owner")]
        author_name: String,
    },

    /// Ingest a local .txt/.md/.pdf/.docx file
    IngestFile {
        path: PathBuf,

        /// Guild the content is attributed to
        #[arg(long)]
        guild: u64,

        /// Channel the content is attributed to
        #[arg(long)]
        channel: u64,

        /// Author id the content is attributed to
        #[arg(long)]
        author: u64,

        /// Author display name
        #[arg(long, default_value = "owner")]
        author_name: String,
    },

    /// Semantic search scoped to a guild
    Search {
        query: String,

        /// Guild scope (mandatory)
        #[arg(long)]
        guild: u64,

        /// Channel id, used when the configured scope narrows by channel
        #[arg(long)]
        channel: Option<u64>,

        /// Author id, used when the configured scope narrows by author
        #[arg(long)]
        author: Option<u64>,
    },

    /// Collection statistics
    Stats,

    /// Vector store health check
    Health,

    /// Create or list collection snapshots
    Snapshot {
        /// Action: create, list
        #[arg(default_value = "list")]
        action: String,
    },

    /// Clear stored records matching filters
    Clear {
        #[arg(long)]
        guild: Option<u64>,

        #[arg(long)]
        user: Option<u64>,

        #[arg(long)]
        channel: Option<u64>,

        /// Delete records created at or before this date (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        before: Option<String>,

        /// Delete records created at or after this date (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        after: Option<String>,

        /// Confirm clearing the entire collection when no filter is given
        #[arg(long, default_value_t = false)]
        all: bool,
    },

    /// Export stored metadata matching filters as JSON
    Export {
        #[arg(long)]
        guild: Option<u64>,

        #[arg(long)]
        user: Option<u64>,

        #[arg(long)]
        channel: Option<u64>,

        /// Output file (defaults to a name derived from the filters)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export one user's records in a guild
    ExportMine {
        #[arg(long)]
        guild: u64,

        #[arg(long)]
        user: u64,

        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a user's indexed messages
    DeleteMine {
        #[arg(long)]
        user: u64,

        /// Message ids to delete (comma separated)
        #[arg(long, num_args = 0.., value_delimiter = ',')]
        ids: Vec<u64>,

        /// Delete everything this user has indexed
        #[arg(long, default_value_t = false)]
        all: bool,
    },

    /// Retention sweep: delete records older than N days
    Retention {
        /// Age threshold in days (must be positive)
        days: u32,

        /// Restrict the sweep to one guild
        #[arg(long)]
        guild: Option<u64>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ingest { .. } => "ingest",
            Commands::IngestUrl { .. } => "ingest_url",
            Commands::IngestFile { .. } => "ingest_file",
            Commands::Search { .. } => "search",
            Commands::Stats => "stats",
            Commands::Health => "health",
            Commands::Snapshot { .. } => "snapshot",
            Commands::Clear { .. } => "clear",
            Commands::Export { .. } => "export",
            Commands::ExportMine { .. } => "export_mine",
            Commands::DeleteMine { .. } => "delete_mine",
            Commands::Retention { .. } => "retention",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("guildrag=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let command_name = cli.command.name();
    metrics::record_command_start(command_name);
    let start = Instant::now();

    let result = execute_command(cli.command).await;

    metrics::record_command_result(command_name, start.elapsed(), result.is_ok());

    result
}

async fn execute_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Ingest { file, source } => {
            commands::ingest::run_messages(&file, &source).await?;
        }
        Commands::IngestUrl {
            url,
            guild,
            channel,
            author,
            author_name,
        } => {
            let origin = IngestOrigin {
                guild_id: guild,
                channel_id: channel,
                author_id: author,
                author_name,
            };
            commands::ingest::run_url(&url, origin).await?;
        }
        Commands::IngestFile {
            path,
            guild,
            channel,
            author,
            author_name,
        } => {
            let origin = IngestOrigin {
                guild_id: guild,
                channel_id: channel,
                author_id: author,
                author_name,
            };
            commands::ingest::run_file(&path, origin).await?;
        }
        Commands::Search {
            query,
            guild,
            channel,
            author,
        } => {
            commands::search::run(&query, guild, channel, author).await?;
        }
        Commands::Stats => {
            commands::maintenance::stats().await?;
        }
        Commands::Health => {
            commands::maintenance::health().await?;
        }
        Commands::Snapshot { action } => {
            commands::maintenance::snapshot(&action).await?;
        }
        Commands::Clear {
            guild,
            user,
            channel,
            before,
            after,
            all,
        } => {
            commands::maintenance::clear(
                guild,
                user,
                channel,
                before.as_deref(),
                after.as_deref(),
                all,
            )
            .await?;
        }
        Commands::Export {
            guild,
            user,
            channel,
            output,
        } => {
            commands::maintenance::export(guild, user, channel, output.as_deref()).await?;
        }
        Commands::ExportMine {
            guild,
            user,
            output,
        } => {
            commands::privacy::export_mine(guild, user, output.as_deref()).await?;
        }
        Commands::DeleteMine { user, ids, all } => {
            commands::privacy::delete_mine(user, &ids, all).await?;
        }
        Commands::Retention { days, guild } => {
            commands::maintenance::retention(days, guild).await?;
        }
    }
    Ok(())
}
