//! Query-time driver behind the `searcher` binary: load an index, rank a
//! topics file into a run file, and score run files against judgments.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use trawl_core::eval::{evaluate, parse_qrels, parse_run, Metrics};
use trawl_core::persist::{load_index, IndexPaths};
use trawl_core::search::RunSummary;
use trawl_core::topics::load_topics;
use trawl_core::{RunWriter, SearchConfig, Searcher};

/// Rank every topic in `topics` against the index at `index_dir` and write
/// the run to `output`.
pub fn search_to_file(index_dir: &Path, topics: &Path, output: &Path, config: SearchConfig, num_docs: usize) -> Result<RunSummary> {
    let index = load_index(&IndexPaths::new(index_dir))?;
    let topics = load_topics(topics)?;
    let searcher = Searcher::new(&index, config)?;
    let run = searcher.run(&topics, num_docs);

    let mut writer = RunWriter::create(output).with_context(|| format!("creating run file {}", output.display()))?;
    run.write_to(&mut writer)?;
    writer.finish()?;
    tracing::info!(output = %output.display(), lines = run.summary.lines, skipped = run.summary.skipped, empty = run.summary.empty, "wrote run");
    Ok(run.summary)
}

#[derive(Debug, Clone)]
pub struct Standing {
    pub run: String,
    pub metrics: Metrics,
}

/// Evaluate each run file, best first (MAP, then nDCG@20, then P@20).
pub fn standings(qrels: &Path, runs: &[PathBuf]) -> Result<Vec<Standing>> {
    let qrels_text = std::fs::read_to_string(qrels).with_context(|| format!("reading qrels {}", qrels.display()))?;
    let qrels = parse_qrels(&qrels_text);
    let mut rows = Vec::with_capacity(runs.len());
    for path in runs {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading run {}", path.display()))?;
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string());
        rows.push(Standing { run: name, metrics: evaluate(&qrels, &parse_run(&text)) });
    }
    rows.sort_by(|a, b| {
        let key = |s: &Standing| (s.metrics.map, s.metrics.ndcg20, s.metrics.p20);
        let (ka, kb) = (key(a), key(b));
        kb.0.total_cmp(&ka.0).then(kb.1.total_cmp(&ka.1)).then(kb.2.total_cmp(&ka.2))
    });
    Ok(rows)
}

pub fn standings_markdown(rows: &[Standing]) -> String {
    let mut out = String::from("| Rank | Run | MAP | P@5 | P@20 | nDCG@20 |\n|---:|:---|---:|---:|---:|---:|\n");
    for (i, r) in rows.iter().enumerate() {
        let m = r.metrics;
        out.push_str(&format!("| {} | {} | {:.4} | {:.4} | {:.4} | {:.4} |\n", i + 1, r.run, m.map, m.p5, m.p20, m.ndcg20));
    }
    out
}

/// CSV standings with a `rank,run,MAP,P@5,P@20,nDCG@20` header; metrics keep
/// full precision.
pub fn standings_csv(rows: &[Standing]) -> String {
    let mut out = String::from("rank,run,MAP,P@5,P@20,nDCG@20\n");
    for (i, r) in rows.iter().enumerate() {
        let m = r.metrics;
        out.push_str(&format!("{},{},{:?},{:?},{:?},{:?}\n", i + 1, csv_field(&r.run), m.map, m.p5, m.p20, m.ndcg20));
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Write `contents` to `path`, creating missing parent directories.
pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote standings");
    Ok(())
}
