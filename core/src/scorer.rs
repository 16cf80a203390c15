//! First-stage ranking: BM25 (or Dirichlet-smoothed query likelihood) over
//! unigram bags, plus sloppy ordered-pair matching for phrase clauses.

use crate::config::ScoringModel;
use crate::index::{DocId, InvertedIndex, Posting};
use crate::query::{Clause, StructuredQuery};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub doc_id: DocId,
    pub score: f32,
}

/// Score descending, then doc id ascending.
pub fn by_score(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score.total_cmp(&a.score).then(a.doc_id.cmp(&b.doc_id))
}

/// Sort by [`by_score`] and keep the best `k`.
pub fn rank(mut candidates: Vec<ScoredCandidate>, k: usize) -> Vec<ScoredCandidate> {
    if k == 0 { return Vec::new(); }
    if candidates.len() > k {
        candidates.select_nth_unstable_by(k - 1, by_score);
        candidates.truncate(k);
    }
    candidates.sort_unstable_by(by_score);
    candidates
}

/// Collection-level inputs to a single term (or phrase) weight.
#[derive(Debug, Clone, Copy)]
struct TermStats {
    idf: f32,
    /// Smoothed probability of the term in the whole collection.
    collection_prob: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct Scorer {
    model: ScoringModel,
}

impl Scorer {
    pub fn new(model: ScoringModel) -> Self { Self { model } }

    pub fn model(&self) -> ScoringModel { self.model }

    /// Disjunctive evaluation: any document matching at least one clause is
    /// scored. Returns at most `k` candidates ordered by [`by_score`].
    pub fn score(&self, query: &StructuredQuery, index: &InvertedIndex, k: usize) -> Vec<ScoredCandidate> {
        if query.is_empty() || k == 0 || index.doc_count() == 0 {
            return Vec::new();
        }
        let mut acc: HashMap<DocId, f32> = HashMap::new();
        for sub in &query.sub_queries {
            match &sub.clause {
                Clause::Terms(terms) => {
                    for t in terms {
                        self.add_term(index, &t.term, sub.boost * t.weight, &mut acc);
                    }
                }
                Clause::Phrase { first, second, slop } => {
                    self.add_phrase(index, first, second, *slop, sub.boost, &mut acc);
                }
            }
        }
        let candidates = acc.into_iter().map(|(doc_id, score)| ScoredCandidate { doc_id, score }).collect();
        rank(candidates, k)
    }

    /// BM25 inverse document frequency, `ln((N - df + 0.5) / (df + 0.5) + 1)`.
    pub fn idf(index: &InvertedIndex, df: u32) -> f32 {
        let n = index.doc_count() as f32;
        let df = df as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Per-document weight of a term occurring `tf` times in a document of
    /// length `doc_len`.
    pub fn term_weight(&self, index: &InvertedIndex, term: &str, tf: f32, doc_len: u32) -> f32 {
        let stats = self.term_stats(index, term);
        self.weight(index, stats, tf, doc_len)
    }

    fn term_stats(&self, index: &InvertedIndex, term: &str) -> TermStats {
        let cf = index.collection_frequency(term) as f32;
        TermStats {
            idf: Self::idf(index, index.df(term)),
            collection_prob: (cf + 1.0) / (index.total_terms() as f32 + 1.0),
        }
    }

    fn weight(&self, index: &InvertedIndex, stats: TermStats, tf: f32, doc_len: u32) -> f32 {
        if tf <= 0.0 { return 0.0; }
        let dl = doc_len as f32;
        match self.model {
            ScoringModel::Bm25 { k1, b } => {
                let avgdl = index.avg_doc_length().max(f32::EPSILON);
                stats.idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * dl / avgdl))
            }
            ScoringModel::LmDirichlet { mu } => {
                let w = (1.0 + tf / (mu * stats.collection_prob)).ln() + (mu / (dl + mu)).ln();
                w.max(0.0)
            }
        }
    }

    fn add_term(&self, index: &InvertedIndex, term: &str, boost: f32, acc: &mut HashMap<DocId, f32>) {
        let postings = index.postings(term);
        if postings.is_empty() || boost == 0.0 { return; }
        let stats = self.term_stats(index, term);
        for p in postings {
            let w = self.weight(index, stats, p.term_frequency as f32, index.length(p.doc_id));
            *acc.entry(p.doc_id).or_insert(0.0) += boost * w;
        }
    }

    fn add_phrase(&self, index: &InvertedIndex, first: &str, second: &str, slop: u32, boost: f32, acc: &mut HashMap<DocId, f32>) {
        if boost == 0.0 { return; }
        let (a, b) = (self.term_stats(index, first), self.term_stats(index, second));
        // Pair idf is the sum of its parts; the pair is never more frequent than its rarer term.
        let stats = TermStats { idf: a.idf + b.idf, collection_prob: a.collection_prob.min(b.collection_prob) };
        for_each_shared_doc(index.postings(first), index.postings(second), |pa, pb| {
            let freq = sloppy_frequency(&pa.positions, &pb.positions, slop);
            if freq > 0.0 {
                let w = self.weight(index, stats, freq, index.length(pa.doc_id));
                *acc.entry(pa.doc_id).or_insert(0.0) += boost * w;
            }
        });
    }
}

/// Merge-join two doc-ordered postings lists.
pub(crate) fn for_each_shared_doc<'a>(a: &'a [Posting], b: &'a [Posting], mut f: impl FnMut(&'a Posting, &'a Posting)) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].doc_id.cmp(&b[j].doc_id) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                f(&a[i], &b[j]);
                i += 1;
                j += 1;
            }
        }
    }
}

/// Proximity-weighted count of ordered matches: each occurrence of `first`
/// followed by `second` with `gap <= slop` intervening positions adds
/// `1 / (1 + gap)`.
pub fn sloppy_frequency(first: &[u32], second: &[u32], slop: u32) -> f32 {
    let mut freq = 0.0;
    let mut j = 0;
    for &p in first {
        while j < second.len() && second[j] <= p {
            j += 1;
        }
        let Some(&q) = second.get(j) else { break };
        let gap = q - p - 1;
        if gap <= slop {
            freq += 1.0 / (1.0 + gap as f32);
        }
    }
    freq
}
