//! tagfs - tag files and browse them as a directory tree.
//!
//! Usage:
//!   tagfs tag ~/docs/report.txt project=alpha draft
//!   tagfs show ~/docs/report.txt
//!   tagfs rm ~/docs/report.txt draft
//!   tagfs clear ~/docs/report.txt
//!   tagfs mount ~/tags --auto-unmount
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use tagfs::Config;
use tagfs::commands;
use tagfs_fuse::MountOptions;
use tagfs_store::TagDb;

#[derive(Parser, Debug)]
#[command(name = "tagfs", version)]
#[command(about = "Tag files and browse them through a read-only filesystem")]
struct Args {
    /// Config file (default: <config dir>/tagfs/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add or update tags on a file
    Tag {
        path: PathBuf,
        /// Tags as name or name=value
        #[arg(required = true, num_args = 1..=10, value_name = "NAME[=VALUE]")]
        tags: Vec<String>,
    },

    /// Print the tags of a file
    Show { path: PathBuf },

    /// Remove tags from a file
    #[command(visible_aliases = ["remove", "rm"])]
    Delete {
        path: PathBuf,
        #[arg(required = true, num_args = 1..=10, value_name = "NAME")]
        tags: Vec<String>,
    },

    /// Remove every tag from a file
    Clear { path: PathBuf },

    /// Mount the tag view and serve it until unmounted
    Mount {
        mountpoint: PathBuf,
        /// Unmount when this process exits
        #[arg(long)]
        auto_unmount: bool,
        /// Allow root to access the mount
        #[arg(long)]
        allow_root: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config_path = args.config.unwrap_or_else(Config::default_path);
    let config = Config::load_or_init(&config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let db_path = config.ensure_db_dir()?;
    let db = TagDb::open(&db_path)
        .with_context(|| format!("opening tag index {}", db_path.display()))?;

    match args.command {
        Command::Tag { path, tags } => {
            commands::tag(&db, &path, &tags)?;
        }
        Command::Show { path } => {
            commands::show(&db, &path, &mut std::io::stdout().lock())?;
        }
        Command::Delete { path, tags } => {
            let removed = commands::delete(&db, &path, &tags)?;
            tracing::debug!(removed, "tags removed");
        }
        Command::Clear { path } => {
            let removed = commands::clear(&db, &path)?;
            tracing::debug!(removed, "file cleared");
        }
        Command::Mount {
            mountpoint,
            auto_unmount,
            allow_root,
        } => {
            let options = MountOptions {
                auto_unmount,
                allow_root,
                ..MountOptions::default()
            };
            commands::mount(Arc::new(db), &mountpoint, options).await?;
        }
    }
    Ok(())
}
