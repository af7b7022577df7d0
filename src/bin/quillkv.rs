//! QuillKV CLI
//!
//! Command-line access to a journal-backed QuillKV store.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use quillkv::{Config, JournalStore, JournalSync, StorageContext};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

/// QuillKV CLI
#[derive(Parser, Debug)]
#[command(name = "quillkv")]
#[command(about = "Inspect and optimize a QuillKV writing-workspace store")]
#[command(version)]
struct Args {
    /// Journal file backing the store
    #[arg(short, long, default_value = "./quillkv_data/store.journal")]
    data: PathBuf,

    /// Key prefix of the reserved namespace
    #[arg(long, default_value = "novel_writer")]
    prefix: String,

    /// Retention window in days
    #[arg(long, default_value = "30")]
    retention_days: u64,

    /// Chunk segment size in chars
    #[arg(long, default_value = "51200")]
    chunk_size: usize,

    /// Store capacity in chars (reporting only)
    #[arg(long)]
    capacity: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a raw value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a raw value (stamps the last-save time)
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete a key
    Del {
        /// The key to delete
        key: String,
    },

    /// Save a value, chunking it if large
    Save {
        key: String,
        value: String,
    },

    /// Load a logical value, reassembling chunks
    Load {
        key: String,
    },

    /// Print the usage analysis
    Analyze,

    /// Delete expired key families
    Reclaim,

    /// Compact every eligible entry
    Compact,

    /// Reclaim, then compact
    Optimize,

    /// Print usage against capacity
    Stats,

    /// Export the project snapshot
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Import a project snapshot from a file
    Import {
        file: PathBuf,
    },

    /// Store a backup snapshot
    Backup,

    /// Restore the backup snapshot
    Restore,

    /// Delete all data
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Rewrite the journal to live entries only
    Checkpoint,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,quillkv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> quillkv::Result<()> {
    let mut builder = Config::builder()
        .key_prefix(&args.prefix)
        .retention_days(args.retention_days)
        .chunk_size(args.chunk_size)
        .journal_sync(JournalSync::EveryWrite);
    if let Some(capacity) = args.capacity {
        builder = builder.capacity(capacity);
    }
    let config = builder.build()?;

    tracing::debug!("QuillKV CLI v{}", quillkv::VERSION);
    tracing::debug!("Journal: {}", args.data.display());

    let store = JournalStore::open(&args.data, config.journal_sync)?;
    let ctx = StorageContext::new(store, config);

    match args.command {
        Commands::Get { key } => print_value(ctx.get(&key)?),
        Commands::Set { key, value } => ctx.set(&key, &value)?,
        Commands::Del { key } => ctx.remove(&key)?,
        Commands::Save { key, value } => ctx.optimizer().smart_save(&key, &value)?,
        Commands::Load { key } => print_value(ctx.optimizer().smart_load(&key)?),
        Commands::Analyze => print_json(&ctx.analyzer().analyze()?)?,
        Commands::Reclaim => print_json(&ctx.expiration().reclaim()?)?,
        Commands::Compact => print_json(&ctx.compaction().compact_store_wide()?)?,
        Commands::Optimize => print_json(&ctx.optimizer().optimize()?)?,
        Commands::Stats => print_json(&ctx.optimizer().optimized_stats()?)?,
        Commands::Export { out } => {
            let document = ctx.snapshots().export()?;
            match out {
                Some(path) => fs::write(path, document)?,
                None => println!("{}", document),
            }
        }
        Commands::Import { file } => {
            let document = fs::read_to_string(file)?;
            print_json(&ctx.snapshots().import(&document)?)?;
        }
        Commands::Backup => ctx.snapshots().backup()?,
        Commands::Restore => print_json(&ctx.snapshots().restore()?)?,
        Commands::Clear { yes } => {
            if !yes {
                eprintln!("refusing to clear all data without --yes");
                process::exit(2);
            }
            ctx.clear_all()?;
        }
        Commands::Checkpoint => ctx.store().checkpoint()?,
    }

    Ok(())
}

fn print_value(value: Option<String>) {
    match value {
        Some(v) => println!("{}", v),
        None => println!("(nil)"),
    }
}

fn print_json<T: Serialize>(value: &T) -> quillkv::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
