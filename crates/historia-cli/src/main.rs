//! Historia CLI
//!
//! Command-line interface for Historia - a versioned document store with
//! per-language records and workspace branching.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use historia_core::{Collection, Config, Database};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "historia")]
#[command(about = "Historia - versioned documents with workspace branching")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to an alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Collection to operate on
    #[arg(short, long, global = true, default_value = "documents")]
    collection: String,

    /// Language to read and write (defaults to the configured language)
    #[arg(short, long, global = true)]
    language: Option<String>,

    /// Workspace to read and write through
    #[arg(short, long, global = true, default_value = historia_core::DEFAULT_WORKSPACE)]
    workspace: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show one or more records
    Get {
        /// Record UUIDs
        #[arg(required = true)]
        uuids: Vec<String>,
    },
    /// Create or replace a record
    Put {
        /// Record UUID
        uuid: String,
        /// Document content (read from stdin if not provided)
        document: Option<String>,
        #[command(flatten)]
        meta: CommitMeta,
    },
    /// Create a record with a freshly minted UUID
    New {
        /// Document content (read from stdin if not provided)
        document: Option<String>,
        #[command(flatten)]
        meta: CommitMeta,
    },
    /// Delete a record in the current workspace
    #[command(alias = "rm")]
    Delete {
        /// Record UUID
        uuid: String,
        #[command(flatten)]
        meta: CommitMeta,
    },
    /// List every record visible in the current workspace
    #[command(alias = "ls")]
    List,
    /// Merge a workspace into the default workspace
    Merge {
        /// Workspace to merge
        branch: String,
    },
    /// Show the transaction log
    Log {
        /// Maximum number of entries
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

/// Audit metadata attached to a commit
#[derive(clap::Args, Clone, Default)]
struct CommitMeta {
    /// Commit author
    #[arg(long)]
    author: Option<String>,
    /// Commit message
    #[arg(short, long)]
    message: Option<String>,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, default_language, audit, log_level)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config, cli.verbose);

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => {
                commands::config::show(cli.config.as_ref(), &output)
            }
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, cli.config.as_ref(), &output)
            }
        };
    }

    let db = Database::open(&config).context("Failed to open database")?;
    let mut collection = Collection::with_config(&db, &cli.collection, &config)
        .with_context(|| format!("Failed to open collection '{}'", cli.collection))?
        .for_workspace(&cli.workspace);
    if let Some(ref language) = cli.language {
        collection = collection.for_language(language);
    }
    debug!("Using {:?}", collection);

    match cli.command {
        Commands::Get { uuids } => commands::record::get(&collection, &uuids, &output),
        Commands::Put {
            uuid,
            document,
            meta,
        } => commands::record::put(&collection, uuid, document, meta.into(), &output),
        Commands::New { document, meta } => {
            commands::record::create(&collection, document, meta.into(), &output)
        }
        Commands::Delete { uuid, meta } => {
            commands::record::delete(&collection, uuid, meta.into(), &output)
        }
        Commands::List => commands::record::list(&collection, &output),
        Commands::Merge { branch } => commands::workspace::merge(&collection, &branch, &output),
        Commands::Log { limit } => commands::workspace::log(&collection, limit, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

impl From<CommitMeta> for commands::record::CommitMeta {
    fn from(meta: CommitMeta) -> Self {
        Self {
            author: meta.author,
            message: meta.message,
        }
    }
}

/// Initialize logging to stderr
///
/// Level comes from `-v` flags, then the configured log level, then
/// `RUST_LOG`, defaulting to warnings only.
fn init_logging(config: &Config, verbose: u8) {
    let level = match verbose {
        0 => config.log_level.clone(),
        1 => Some("info".to_string()),
        2 => Some("debug".to_string()),
        _ => Some("trace".to_string()),
    };

    let env_filter = match level {
        Some(level) => EnvFilter::new(format!(
            "historia_core={},historia_cli={}",
            level, level
        )),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init();
}
