use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::feedback::FeedbackExpander;
use crate::index::Index;
use crate::query::QueryBuilder;
use crate::rerank::Reranker;
use crate::run::{to_entries, RunEntry, RunWriter};
use crate::scorer::Scorer;
use crate::tokenizer::Analyzer;
use crate::topics::Topic;
use rayon::prelude::*;
use std::io::Write;

#[derive(Debug, Clone, PartialEq)]
pub struct TopicRun {
    pub number: String,
    pub entries: Vec<RunEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub topics: usize,
    /// Topics that failed and produced no output.
    pub skipped: usize,
    /// Topics whose query had no usable terms.
    pub empty: usize,
    pub lines: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub topics: Vec<TopicRun>,
    pub summary: RunSummary,
}

impl RunOutput {
    /// Write every topic in order through a single sink owner.
    pub fn write_to<W: Write>(&self, writer: &mut RunWriter<W>) -> Result<usize> {
        let mut lines = 0;
        for topic in &self.topics {
            lines += writer.write_entries(&topic.entries)?;
        }
        Ok(lines)
    }
}

/// The query-time pipeline over a shared, read-only index:
/// build query, expand, score, rerank, resolve run entries.
pub struct Searcher<'a> {
    index: &'a Index,
    config: SearchConfig,
    builder: QueryBuilder,
    scorer: Scorer,
    expander: Option<FeedbackExpander>,
    reranker: Reranker,
}

impl<'a> Searcher<'a> {
    pub fn new(index: &'a Index, config: SearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(index, config))
    }

    fn assemble(index: &'a Index, config: SearchConfig) -> Self {
        let analyzer = Analyzer::new();
        let scorer = Scorer::new(config.model);
        let expander = config
            .feedback
            .enabled
            .then(|| FeedbackExpander::new(analyzer, scorer, config.feedback.clone()));
        Self {
            index,
            builder: QueryBuilder::new(analyzer, config.query.clone()),
            reranker: Reranker::from_config(&config.rerank, config.query.phrase_slop),
            scorer,
            expander,
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig { &self.config }

    /// Rank one topic. An unusable topic is an error for this topic only.
    pub fn search_topic(&self, topic: &Topic, result_count: usize) -> Result<Vec<RunEntry>> {
        let number = topic.number.trim();
        if number.is_empty() || number.contains(char::is_whitespace) {
            return Err(Error::MalformedInput(format!("invalid topic number {:?}", topic.number)));
        }
        let query = self.builder.build(topic);
        if query.is_empty() {
            return Err(Error::EmptyQuery(number.to_string()));
        }
        let expanded = match &self.expander {
            Some(expander) => expander.expand(&query, self.index),
            None => query.clone(),
        };
        let depth = self.reranker.depth(result_count);
        let candidates = self.scorer.score(&expanded, &self.index.inverted, depth);
        let first_stage = candidates.len();
        let ranked = self.reranker.rerank(candidates, &query.original_terms(), &query.bigrams(), &self.index.inverted);
        let entries = to_entries(number, &ranked, &self.index.docs, &self.config.run_tag, result_count);
        tracing::debug!(topic = number, sub_queries = expanded.sub_queries.len(), first_stage, emitted = entries.len(), "ranked topic");
        Ok(entries)
    }

    /// Process all topics, in parallel, collecting results in topic order.
    pub fn run(&self, topics: &[Topic], result_count: usize) -> RunOutput {
        let process = || -> Vec<(String, Result<Vec<RunEntry>>)> {
            topics
                .par_iter()
                .map(|t| (t.number.clone(), self.search_topic(t, result_count)))
                .collect()
        };
        let results = match self.config.threads {
            Some(n) => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
                Ok(pool) => pool.install(process),
                Err(e) => {
                    tracing::warn!(error = %e, threads = n, "falling back to the global thread pool");
                    process()
                }
            },
            None => process(),
        };

        let mut summary = RunSummary { topics: topics.len(), ..RunSummary::default() };
        let mut runs = Vec::with_capacity(results.len());
        for (number, result) in results {
            let entries = match result {
                Ok(entries) => entries,
                Err(Error::EmptyQuery(_)) => {
                    tracing::warn!(topic = %number, "topic has no usable query terms");
                    summary.empty += 1;
                    Vec::new()
                }
                Err(e) => {
                    tracing::warn!(topic = %number, error = %e, "skipping topic");
                    summary.skipped += 1;
                    Vec::new()
                }
            };
            summary.lines += entries.len();
            runs.push(TopicRun { number, entries });
        }
        tracing::info!(topics = summary.topics, skipped = summary.skipped, empty = summary.empty, lines = summary.lines, "run complete");
        RunOutput { topics: runs, summary }
    }
}

/// Rank every topic with the default configuration.
pub fn run_search(index: &Index, topics: &[Topic], result_count: usize) -> Vec<(String, Vec<RunEntry>)> {
    let searcher = Searcher::assemble(index, SearchConfig::default());
    searcher.run(topics, result_count).topics.into_iter().map(|t| (t.number, t.entries)).collect()
}
