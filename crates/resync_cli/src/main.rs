//! resync CLI
//!
//! Command-line front end for the resync client and source simulator.
//!
//! # Commands
//!
//! - `audit` - Compare the replica with the remote inventory
//! - `sync` - Bring the replica in line with the remote inventory
//! - `incremental` - Apply the remote change list
//! - `parse` - Print the contents of a document
//! - `write` - Write a resource list for the mapped local directories
//! - `changelist` - Write the difference of two inventories as a change list
//! - `simulate` - Run the source simulator and write its documents

mod commands;

use clap::{Args, Parser, Subcommand};
use resync_client::{ClientConfig, SyncError};
use resync_codec::DEFAULT_MAX_ENTRIES;
use resync_protocol::Mapper;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Resource synchronization client and tools.
#[derive(Parser)]
#[command(name = "resync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    client: ClientArgs,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by every command that talks to a source.
#[derive(Args, Debug, Clone)]
struct ClientArgs {
    /// Map a source URI prefix to a local directory (repeatable)
    #[arg(global = true, long, num_args = 2, value_names = ["URI", "PATH"])]
    mapping: Vec<String>,

    /// Name of the inventory under the first mapping
    #[arg(global = true, long, default_value = resync_client::DEFAULT_SITEMAP_NAME)]
    sitemap: String,

    /// Compare MD5 checksums as well as size and time
    #[arg(global = true, long)]
    checksum: bool,

    /// Show what would be done without changing anything
    #[arg(global = true, long = "dryrun")]
    dry_run: bool,

    /// Do not enforce the authority of documents over resources
    #[arg(global = true, long = "noauth")]
    no_auth: bool,

    /// Record failed transfers and carry on
    #[arg(global = true, long)]
    ignore_failures: bool,

    /// Allow paginated documents (default)
    #[arg(global = true, long, overrides_with = "no_multifile")]
    multifile: bool,

    /// Refuse paginated documents
    #[arg(global = true, long, overrides_with = "multifile")]
    no_multifile: bool,

    /// Entries per written document
    #[arg(global = true, long, default_value_t = DEFAULT_MAX_ENTRIES)]
    max_sitemap_entries: usize,

    /// Concurrent transfers
    #[arg(global = true, long, default_value_t = 4)]
    concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(global = true, long, default_value_t = 30)]
    timeout: u64,
}

impl ClientArgs {
    fn mapper(&self) -> Result<Mapper, SyncError> {
        Ok(Mapper::from_pairs(&self.mapping)?)
    }

    fn allow_multifile(&self) -> bool {
        self.multifile || !self.no_multifile
    }

    fn config(&self) -> Result<ClientConfig, SyncError> {
        Ok(ClientConfig::new(self.mapper()?)
            .with_sitemap_name(self.sitemap.clone())
            .with_checksum(self.checksum)
            .with_dry_run(self.dry_run)
            .with_no_auth(self.no_auth)
            .with_ignore_failures(self.ignore_failures)
            .with_multifile(self.allow_multifile())
            .with_max_entries(self.max_sitemap_entries)
            .with_max_concurrency(self.concurrency)
            .with_timeout(Duration::from_secs(self.timeout)))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the replica with the remote inventory
    Audit,

    /// Bring the replica in line with the remote inventory
    Sync {
        /// Delete local files the source no longer lists
        #[arg(long)]
        delete: bool,
    },

    /// Apply the changes from the remote change list
    Incremental {
        /// Change list to apply instead of the inventory's current one
        #[arg(long)]
        changelist: Option<String>,

        /// Apply deletions
        #[arg(long)]
        delete: bool,
    },

    /// Print the resources or changes in a document
    Parse {
        /// Document URI or path
        uri: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Write a resource list for the mapped local directories
    Write {
        /// Output file (stdout if omitted)
        #[arg(long)]
        outfile: Option<PathBuf>,
    },

    /// Write the difference between two inventories as a change list
    Changelist {
        /// Older inventory
        #[arg(long)]
        reference: String,

        /// Newer inventory
        #[arg(long)]
        newreference: String,

        /// Output file (stdout if omitted)
        #[arg(long)]
        outfile: Option<PathBuf>,
    },

    /// Run the source simulator and write its documents
    Simulate {
        /// Source configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of changes to simulate (defaults to max_events)
        #[arg(long)]
        events: Option<usize>,

        /// Directory for the written documents
        #[arg(long)]
        output: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let args = cli.client;
    match cli.command {
        Commands::Audit => commands::sync::audit(args.config()?)?,
        Commands::Sync { delete } => commands::sync::sync(args.config()?, delete)?,
        Commands::Incremental { changelist, delete } => {
            commands::sync::incremental(args.config()?, changelist.as_deref(), delete)?
        }
        Commands::Parse { uri, format } => {
            commands::parse::run(&uri, &format, args.allow_multifile())?
        }
        Commands::Write { outfile } => commands::write::run(&args.config()?, outfile.as_deref())?,
        Commands::Changelist {
            reference,
            newreference,
            outfile,
        } => commands::changelist::run(
            &args.config()?,
            &reference,
            &newreference,
            outfile.as_deref(),
        )?,
        Commands::Simulate {
            config,
            events,
            output,
        } => commands::simulate::run(config.as_deref(), events, &output, args.max_sitemap_entries)?,
        Commands::Version => {
            println!("resync v{}", env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}
