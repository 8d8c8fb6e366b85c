mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use igsync_core::Archive;
use tracing_subscriber::EnvFilter;

/// igsync: keep a local archive of saved Instagram posts
#[derive(Parser)]
#[command(name = "igsync", version, about)]
struct Cli {
    /// Path to the catalog database
    #[arg(long, env = "IGSYNC_CATALOG", default_value_t = default_catalog_path())]
    catalog: String,

    /// Directory downloaded media is stored under
    #[arg(long, env = "IGSYNC_MEDIA_DIR", default_value_t = default_media_dir())]
    media_dir: String,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import saved-post JSON files (one post object or an array per file)
    Import {
        /// JSON files to read
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List collections, or name them
    Collections {
        #[command(subcommand)]
        action: Option<CollectionsAction>,
    },
    /// Show media that still needs downloading
    Pending,
    /// Download all pending media
    Download,
    /// Show catalog status summary
    Status,
}

#[derive(Subcommand)]
enum CollectionsAction {
    /// Set the name of one collection
    Name {
        /// Collection id
        pk: String,
        /// Display name
        name: String,
    },
    /// Name every unnamed collection from a `{"<id>": "<name>"}` JSON file
    Resolve {
        /// Path to the names file
        names: PathBuf,
    },
}

fn default_catalog_path() -> String {
    collections_dir()
        .join("insta.sqlite")
        .to_string_lossy()
        .to_string()
}

fn default_media_dir() -> String {
    collections_dir().to_string_lossy().to_string()
}

fn collections_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join("Pictures")
        .join("InstagramCollections")
}

/// Map `-v` occurrences to a default filter; `RUST_LOG` takes precedence.
fn log_filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .init();

    let catalog_path = PathBuf::from(&cli.catalog);
    let media_dir = PathBuf::from(&cli.media_dir);
    let mut archive = Archive::open(&catalog_path)?;

    match cli.command {
        Commands::Import { files } => commands::import::run(&mut archive, &files)?,
        Commands::Collections { action } => match action {
            None => commands::collections::list(&archive)?,
            Some(CollectionsAction::Name { pk, name }) => {
                commands::collections::name(&archive, &pk, &name)?
            }
            Some(CollectionsAction::Resolve { names }) => {
                commands::collections::resolve(&archive, &names)?
            }
        },
        Commands::Pending => commands::pending::run(&archive)?,
        Commands::Download => commands::download::run(&archive, &media_dir)?,
        Commands::Status => commands::status::run(&archive, &catalog_path, &media_dir)?,
    }

    Ok(())
}
