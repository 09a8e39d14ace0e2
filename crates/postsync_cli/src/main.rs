//! postsync CLI
//!
//! Command-line tools for reconciling and syncing posts.
//!
//! # Commands
//!
//! - `reconcile` - Print the plan for a local snapshot and a remote batch
//! - `sync` - Sync a file store against a JSON server dump
//! - `inspect` - Display record counts of a file store
//! - `new-draft` - Create a local draft in a file store

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// postsync command-line tools.
#[derive(Parser)]
#[command(name = "postsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a remote batch against local records and print the plan
    Reconcile {
        /// JSON file with the local records
        #[arg(short, long)]
        local: PathBuf,

        /// JSON file with the remote batch
        #[arg(short, long)]
        remote: PathBuf,

        /// Let remote content replace pending local edits
        #[arg(long)]
        overwrite: bool,

        /// Purge synced records missing from the batch
        #[arg(long)]
        purge: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Sync a file store against a JSON server dump
    Sync {
        /// Store directory
        #[arg(short, long)]
        store: PathBuf,

        /// JSON file with the server listing
        #[arg(short, long)]
        remote: PathBuf,

        /// Blog ID
        #[arg(short, long)]
        blog: u64,

        /// Post type (post, page)
        #[arg(long, default_value = "post")]
        post_type: String,

        /// Only list these statuses (repeatable)
        #[arg(long = "status")]
        statuses: Vec<String>,

        /// Only list posts by this author
        #[arg(long)]
        author: Option<u64>,

        /// Posts per page
        #[arg(long, default_value_t = postsync_engine::DEFAULT_PAGE_SIZE)]
        page_size: u32,

        /// Fetch at most this many pages (disables purge)
        #[arg(long)]
        pages: Option<u32>,

        /// Let remote content replace pending local edits
        #[arg(long)]
        overwrite: bool,

        /// Purge synced records missing from the complete listing
        #[arg(long)]
        purge: bool,
    },

    /// Display record counts of a file store
    Inspect {
        /// Store directory
        #[arg(short, long)]
        store: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Create a local draft in a file store
    NewDraft {
        /// Store directory
        #[arg(short, long)]
        store: PathBuf,

        /// Blog ID
        #[arg(short, long)]
        blog: u64,

        /// Title
        #[arg(short, long)]
        title: String,

        /// Body
        #[arg(short, long, default_value = "")]
        content: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Reconcile {
            local,
            remote,
            overwrite,
            purge,
            format,
        } => {
            commands::reconcile::run(&local, &remote, overwrite, purge, &format)?;
        }
        Commands::Sync {
            store,
            remote,
            blog,
            post_type,
            statuses,
            author,
            page_size,
            pages,
            overwrite,
            purge,
        } => {
            let options = commands::sync::SyncOptions {
                blog,
                post_type: post_type.parse()?,
                statuses,
                author,
                page_size,
                pages,
                overwrite,
                purge,
            };
            commands::sync::run(&store, &remote, &options)?;
        }
        Commands::Inspect { store, format } => {
            commands::inspect::run(&store, &format)?;
        }
        Commands::NewDraft {
            store,
            blog,
            title,
            content,
        } => {
            commands::new_draft::run(&store, blog, &title, &content)?;
        }
    }

    Ok(())
}
