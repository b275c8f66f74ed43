//! boardsync CLI
//!
//! Runs the sync service and inspects its store.
//!
//! # Commands
//!
//! - `serve` - Run the HTTP API and background jobs until interrupted
//! - `run` - Run one job in the foreground and print the result
//! - `job` - Print a job
//! - `add-key` - Register an API key
//! - `errors` - Print recent error records
//!
//! The store is opened exclusively, so `job`, `add-key` and `errors` fail
//! while a `serve` process holds the same store.

mod commands;
mod settings;

use boardsync_core::JobKind;
use clap::{Parser, Subcommand};
use settings::SyncSettings;
use std::net::IpAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Board to store sync service.
#[derive(Parser, Debug)]
#[command(name = "boardsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long, env = "BOARDSYNC_STORE", default_value = "boardsync-store")]
    store: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
        host: IpAddr,

        /// Port to listen on
        #[arg(long, env = "API_PORT", default_value_t = 8080)]
        port: u16,

        /// Runtime environment reported by /ping
        #[arg(long, env = "RUNTIME_ENV", default_value = "dev")]
        environment: String,

        /// Default page size of record listings
        #[arg(long, env = "PAGE_SIZE", default_value_t = 50)]
        page_size: u32,

        #[command(flatten)]
        sync: SyncSettings,
    },

    /// Run one job in the foreground
    Run {
        /// Job kind (properties, inheritance_confinements, supportive_docs, attachments)
        kind: JobKind,

        #[command(flatten)]
        sync: SyncSettings,
    },

    /// Print a job
    Job {
        /// Job id
        id: u64,
    },

    /// Register an API key
    AddKey {
        /// The raw key clients will send
        key: String,

        /// Days until the key expires
        #[arg(short, long, default_value_t = 365)]
        days: u32,
    },

    /// Print recent error records
    Errors {
        /// Maximum number of records
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve {
            host,
            port,
            environment,
            page_size,
            sync,
        } => {
            let options = commands::serve::ServeOptions {
                host,
                port,
                environment,
                page_size,
            };
            commands::serve::run(&cli.store, &sync, options).await?;
        }
        Commands::Run { kind, sync } => {
            commands::run::run(&cli.store, &sync, kind).await?;
        }
        Commands::Job { id } => commands::job::run(&cli.store, id)?,
        Commands::AddKey { key, days } => commands::keys::run(&cli.store, &key, days)?,
        Commands::Errors { limit, format } => {
            commands::errors::run(&cli.store, limit, &format)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardsync_core::RecordKind;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_board_settings() {
        let cli = Cli::try_parse_from([
            "boardsync",
            "--store",
            "/tmp/s",
            "run",
            "inhconfs",
            "--confinements-board",
            "b-conf",
            "--confinements-webhook",
            "https://hooks.example.com/c",
            "--stale-job-minutes",
            "0",
        ])
        .unwrap();

        let Commands::Run { kind, sync } = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(kind, JobKind::InheritanceConfinements);
        let config = sync.engine_config();
        let board = config.board(RecordKind::InheritanceConfinement).unwrap();
        assert_eq!(board.board_id, "b-conf");
        assert_eq!(
            config.webhook(JobKind::InheritanceConfinements),
            Some("https://hooks.example.com/c")
        );
        assert!(config.stale_job_after.is_none());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(Cli::try_parse_from(["boardsync", "run", "widgets"]).is_err());
    }

    #[test]
    fn add_key_defaults() {
        let cli = Cli::try_parse_from(["boardsync", "add-key", "secret"]).unwrap();
        match cli.command {
            Commands::AddKey { key, days } => {
                assert_eq!(key, "secret");
                assert_eq!(days, 365);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
