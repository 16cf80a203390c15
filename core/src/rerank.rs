use crate::config::{CoverageWeights, RerankConfig};
use crate::index::InvertedIndex;
use crate::scorer::{rank, sloppy_frequency, ScoredCandidate};

/// Optional second stage. `NoOp` passes candidates through untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reranker {
    NoOp,
    Coverage { weights: CoverageWeights, slop: u32 },
}

impl Reranker {
    pub fn from_config(config: &RerankConfig, slop: u32) -> Self {
        match config {
            RerankConfig::None => Reranker::NoOp,
            RerankConfig::Coverage(weights) => Reranker::Coverage { weights: *weights, slop },
        }
    }

    /// First-stage depth needed to produce `result_count` final results.
    pub fn depth(&self, result_count: usize) -> usize {
        match self {
            Reranker::NoOp => result_count,
            Reranker::Coverage { weights, .. } => result_count.max(weights.min_depth),
        }
    }

    /// Rescore and reorder the given candidates; never adds or removes any.
    pub fn rerank(
        &self,
        candidates: Vec<ScoredCandidate>,
        query_terms: &[String],
        query_bigrams: &[(String, String)],
        index: &InvertedIndex,
    ) -> Vec<ScoredCandidate> {
        let (weights, slop) = match self {
            Reranker::NoOp => return candidates,
            Reranker::Coverage { weights, slop } => (weights, *slop),
        };
        let len = candidates.len();
        let rescored = candidates
            .into_iter()
            .map(|c| {
                let terms = term_coverage(index, c.doc_id, query_terms);
                let bigrams = bigram_coverage(index, c.doc_id, query_bigrams, slop);
                let penalty = (1.0 + index.length(c.doc_id) as f32).ln();
                let score = c.score + weights.term_weight * terms + weights.bigram_weight * bigrams - weights.length_weight * penalty;
                ScoredCandidate { doc_id: c.doc_id, score }
            })
            .collect();
        rank(rescored, len)
    }
}

fn term_coverage(index: &InvertedIndex, doc_id: u32, terms: &[String]) -> f32 {
    if terms.is_empty() { return 0.0; }
    let present = terms.iter().filter(|t| index.contains(t, doc_id)).count();
    present as f32 / terms.len() as f32
}

fn bigram_coverage(index: &InvertedIndex, doc_id: u32, bigrams: &[(String, String)], slop: u32) -> f32 {
    if bigrams.is_empty() { return 0.0; }
    let present = bigrams
        .iter()
        .filter(|(a, b)| match (index.posting(a, doc_id), index.posting(b, doc_id)) {
            (Some(pa), Some(pb)) => sloppy_frequency(&pa.positions, &pb.positions, slop) > 0.0,
            _ => false,
        })
        .count();
    present as f32 / bigrams.len() as f32
}
