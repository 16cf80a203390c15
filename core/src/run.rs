use crate::error::{Error, Result};
use crate::index::DocStore;
use crate::scorer::ScoredCandidate;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct RunEntry {
    pub topic_number: String,
    pub docno: String,
    /// 1-based, contiguous within a topic.
    pub rank: usize,
    pub score: f32,
    pub run_tag: String,
}

/// `<topic> Q0 <docno> <rank> <score> <tag>` with four decimal places.
pub fn format_entry(e: &RunEntry) -> String {
    format!("{} Q0 {} {} {:.4} {}", e.topic_number, e.docno, e.rank, e.score, e.run_tag)
}

/// Resolve ranked candidates to run entries. Candidates without a docno are
/// skipped and ranks are assigned over the survivors; at most `limit` entries.
pub fn to_entries(topic_number: &str, ranked: &[ScoredCandidate], docs: &DocStore, run_tag: &str, limit: usize) -> Vec<RunEntry> {
    let mut entries = Vec::with_capacity(ranked.len().min(limit));
    for cand in ranked {
        if entries.len() == limit { break; }
        let Some(docno) = docs.docno(cand.doc_id) else {
            tracing::warn!(topic = topic_number, doc_id = cand.doc_id, "skipping candidate without docno");
            continue;
        };
        entries.push(RunEntry {
            topic_number: topic_number.to_string(),
            docno: docno.to_string(),
            rank: entries.len() + 1,
            score: cand.score,
            run_tag: run_tag.to_string(),
        });
    }
    entries
}

/// Sole owner of a run sink; topics are written whole, one after another.
pub struct RunWriter<W: Write> {
    sink: W,
    lines: usize,
}

impl RunWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            create_dir_all(dir)?;
        }
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> RunWriter<W> {
    pub fn new(sink: W) -> Self { Self { sink, lines: 0 } }

    /// Format and emit one topic's ranked list.
    pub fn write(&mut self, topic_number: &str, ranked: &[ScoredCandidate], docs: &DocStore, run_tag: &str) -> Result<usize> {
        let entries = to_entries(topic_number, ranked, docs, run_tag, usize::MAX);
        self.write_entries(&entries)
    }

    pub fn write_entries(&mut self, entries: &[RunEntry]) -> Result<usize> {
        let mut batch = String::new();
        for e in entries {
            batch.push_str(&format_entry(e));
            batch.push('\n');
        }
        self.sink.write_all(batch.as_bytes()).map_err(Error::WriteFailure)?;
        self.lines += entries.len();
        Ok(entries.len())
    }

    pub fn lines(&self) -> usize { self.lines }

    pub fn finish(mut self) -> Result<W> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}
