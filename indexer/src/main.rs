use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use trawl_core::persist::{load_meta, IndexPaths};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and inspect the positional inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a corpus directory (TREC SGML collections or JSONL files)
    Build {
        /// Corpus root directory
        #[arg(long)]
        docs: PathBuf,
        /// Output index directory
        #[arg(long, default_value = "./index")]
        index: PathBuf,
    },
    /// Print the metadata of an existing index
    Stats {
        #[arg(long, default_value = "./index")]
        index: PathBuf,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { docs, index } => {
            let created_at = time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_else(|_| "".into());
            indexer::build_from_dir(&docs, &index, &created_at)?;
        }
        Commands::Stats { index } => {
            let meta = load_meta(&IndexPaths::new(&index))?;
            println!("{}", serde_json::to_string_pretty(&meta)?);
        }
    }
    Ok(())
}
