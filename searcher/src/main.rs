use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};
use trawl_core::config::{CoverageWeights, RerankConfig};
use trawl_core::SearchConfig;

#[derive(Parser)]
#[command(name = "searcher")]
#[command(about = "Rank topics against an index and evaluate runs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank every topic and write a run file
    Search {
        /// Index directory path
        #[arg(long, default_value = "./index")]
        index: PathBuf,
        /// Topics file (<top> blocks)
        #[arg(long)]
        topics: PathBuf,
        /// Run file to write
        #[arg(long)]
        output: PathBuf,
        /// Results per topic
        #[arg(long = "num-docs", alias = "numDocs", default_value_t = 1000)]
        num_docs: usize,
        /// JSON configuration file; omitted fields keep their defaults
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        run_tag: Option<String>,
        /// Worker threads for topic processing
        #[arg(long)]
        threads: Option<usize>,
        /// Disable pseudo-relevance feedback
        #[arg(long, default_value_t = false)]
        no_feedback: bool,
        /// Enable the coverage reranking stage
        #[arg(long, default_value_t = false)]
        rerank: bool,
    },
    /// Evaluate run files against relevance judgments
    Eval {
        #[arg(long)]
        qrels: PathBuf,
        #[arg(required = true)]
        runs: Vec<PathBuf>,
        /// Also write the standings as CSV
        #[arg(long = "out-csv", alias = "out_csv")]
        out_csv: Option<PathBuf>,
        /// Also write the standings as a Markdown table
        #[arg(long = "out-md", alias = "out_md")]
        out_md: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Search { index, topics, output, num_docs, config, run_tag, threads, no_feedback, rerank } => {
            let mut cfg = match config {
                Some(path) => SearchConfig::load(&path)?,
                None => SearchConfig::default(),
            };
            if let Some(tag) = run_tag { cfg.run_tag = tag; }
            if threads.is_some() { cfg.threads = threads; }
            if no_feedback { cfg.feedback.enabled = false; }
            if rerank && cfg.rerank == RerankConfig::None {
                cfg.rerank = RerankConfig::Coverage(CoverageWeights::default());
            }
            let summary = searcher::search_to_file(&index, &topics, &output, cfg, num_docs)?;
            tracing::info!(topics = summary.topics, lines = summary.lines, "search complete");
        }
        Commands::Eval { qrels, runs, out_csv, out_md } => {
            let rows = searcher::standings(&qrels, &runs)?;
            let markdown = searcher::standings_markdown(&rows);
            if let Some(path) = out_csv {
                searcher::write_report(&path, &searcher::standings_csv(&rows))?;
            }
            if let Some(path) = out_md {
                searcher::write_report(&path, &markdown)?;
            }
            print!("{markdown}");
        }
    }
    Ok(())
}
