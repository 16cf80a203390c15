//! Pseudo-relevance feedback: harvest informative terms from the top of an
//! initial retrieval and add them to the query as a low-boost bag.

use crate::config::FeedbackConfig;
use crate::index::Index;
use crate::query::{Clause, Origin, QueryTerm, StructuredQuery, SubQuery};
use crate::scorer::{ScoredCandidate, Scorer};
use crate::tokenizer::Analyzer;
use std::collections::{BTreeSet, HashMap};

pub struct FeedbackExpander {
    analyzer: Analyzer,
    scorer: Scorer,
    config: FeedbackConfig,
}

impl FeedbackExpander {
    pub fn new(analyzer: Analyzer, scorer: Scorer, config: FeedbackConfig) -> Self {
        Self { analyzer, scorer, config }
    }

    /// Expand using the configured feedback depth and term budget.
    pub fn expand(&self, query: &StructuredQuery, index: &Index) -> StructuredQuery {
        self.expand_with(query, index, self.config.docs, self.config.max_terms)
    }

    pub fn expand_with(&self, query: &StructuredQuery, index: &Index, initial_k: usize, max_terms: usize) -> StructuredQuery {
        let mut expanded = query.clone();
        if query.is_empty() || initial_k == 0 || max_terms == 0 {
            return expanded;
        }
        let feedback = self.scorer.score(query, &index.inverted, initial_k);
        if feedback.is_empty() {
            return expanded;
        }
        let selected = select_terms(self.candidate_weights(query, index, &feedback), max_terms);
        if selected.is_empty() {
            tracing::debug!(feedback_docs = feedback.len(), "no admissible expansion terms");
            return expanded;
        }
        tracing::debug!(
            feedback_docs = feedback.len(),
            terms = ?selected.iter().map(|(t, _)| t.as_str()).collect::<Vec<_>>(),
            "expanded query"
        );
        let terms = selected.into_iter().map(|(term, _)| QueryTerm { term, weight: 1.0 }).collect();
        expanded.push(SubQuery { boost: self.config.boost, origin: Origin::Feedback, clause: Clause::Terms(terms) });
        expanded
    }

    /// Accumulated weight of every admissible term found in the feedback
    /// documents' text that is not already part of the query.
    pub fn candidate_weights(&self, query: &StructuredQuery, index: &Index, feedback: &[ScoredCandidate]) -> HashMap<String, f32> {
        let existing = query.term_set();
        let n = index.doc_count() as f32;
        let mut weights: HashMap<String, f32> = HashMap::new();
        for cand in feedback {
            let Some(doc) = index.docs.get(cand.doc_id) else { continue };
            let capitalized = self.analyzer.capitalized_terms(&doc.text, self.config.entity_window);
            let distinct: BTreeSet<String> = self.analyzer.analyze(&doc.text).into_iter().collect();
            for term in distinct {
                if existing.contains(term.as_str()) { continue; }
                let df = index.inverted.df(&term);
                if !self.admissible(df, n) { continue; }
                let mut w = ((n / (df as f32 + 1.0)).ln() + 1.0) * cand.score;
                if capitalized.contains(&term) {
                    w *= self.config.entity_boost;
                }
                *weights.entry(term).or_insert(0.0) += w;
            }
        }
        weights
    }

    /// Reject terms too rare to be more than noise or too common to discriminate.
    fn admissible(&self, df: u32, n: f32) -> bool {
        df >= self.config.min_df && df as f32 <= self.config.max_df_ratio * n
    }
}

/// Highest-weighted terms first, ties broken lexicographically.
pub fn select_terms(weights: HashMap<String, f32>, max_terms: usize) -> Vec<(String, f32)> {
    let mut ranked: Vec<(String, f32)> = weights.into_iter().collect();
    ranked.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(max_terms);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{QueryConfig, ScoringModel};
    use crate::index::build_index;
    use crate::query::QueryBuilder;
    use crate::source::SourceDocument;
    use crate::tokenizer::analyze;
    use crate::topics::Topic;

    /// Twenty documents: four about volcanoes mentioning Iceland, the rest filler.
    fn corpus() -> Index {
        let mut docs = vec![
            SourceDocument::new("V1", "volcano", "Iceland volcano eruption ash cloud grounded flights"),
            SourceDocument::new("V2", "volcano", "the volcano eruption in Iceland sent ash over Europe"),
            SourceDocument::new("V3", "ash", "ash cloud from the eruption closed airports"),
            SourceDocument::new("V4", "travel", "flights resumed after ash dispersed"),
        ];
        for i in 0..16 {
            docs.push(SourceDocument::new(format!("F{i}"), "filler", format!("market report number {i} on grain prices")));
        }
        build_index(docs)
    }

    fn config() -> FeedbackConfig {
        FeedbackConfig { max_df_ratio: 0.25, ..FeedbackConfig::default() }
    }

    fn expander(config: FeedbackConfig) -> FeedbackExpander {
        FeedbackExpander::new(Analyzer::new(), Scorer::new(ScoringModel::default()), config)
    }

    fn query(title: &str) -> StructuredQuery {
        QueryBuilder::new(Analyzer::new(), QueryConfig::default()).build(&Topic::new("1", title, "", ""))
    }

    #[test]
    fn adds_feedback_bag_with_new_terms() {
        let index = corpus();
        let q = query("volcano");
        let expanded = expander(config()).expand(&q, &index);
        assert_eq!(expanded.sub_queries.len(), q.sub_queries.len() + 1);
        let last = expanded.sub_queries.last().unwrap();
        assert_eq!(last.origin, Origin::Feedback);
        assert_eq!(last.boost, config().boost);
        let Clause::Terms(terms) = &last.clause else { panic!("expected bag") };
        let volcano = analyze("volcano").remove(0);
        assert!(terms.iter().all(|t| t.term != volcano));
        assert!(terms.iter().any(|t| t.term == analyze("eruption")[0]));
    }

    #[test]
    fn df_filter_excludes_rare_and_common_terms() {
        let index = corpus();
        let q = query("volcano");
        let exp = expander(config());
        let feedback = Scorer::new(ScoringModel::default()).score(&q, &index.inverted, 15);
        let weights = exp.candidate_weights(&q, &index, &feedback);
        // "europe" occurs once: below min_df
        assert!(!weights.contains_key(&analyze("Europe")[0]));
        assert!(weights.contains_key(&analyze("ash")[0]));

        let strict = expander(FeedbackConfig { max_df_ratio: 0.1, ..config() });
        let weights = strict.candidate_weights(&q, &index, &feedback);
        // ash has df 4 > 0.1 * 20
        assert!(!weights.contains_key(&analyze("ash")[0]));
    }

    #[test]
    fn capitalized_terms_get_entity_boost() {
        let index = corpus();
        let q = query("volcano");
        let feedback = Scorer::new(ScoringModel::default()).score(&q, &index.inverted, 15);
        let plain = expander(FeedbackConfig { entity_boost: 1.0, ..config() }).candidate_weights(&q, &index, &feedback);
        let boosted = expander(config()).candidate_weights(&q, &index, &feedback);
        let iceland = analyze("Iceland").remove(0);
        let eruption = analyze("eruption").remove(0);
        assert!((boosted[&iceland] - plain[&iceland] * 1.25).abs() < 1e-4);
        assert_eq!(boosted[&eruption], plain[&eruption]);
    }

    #[test]
    fn selection_breaks_ties_lexicographically() {
        let weights: HashMap<String, f32> = [("zeta", 1.0), ("alpha", 1.0), ("mid", 2.0), ("low", 0.5)]
            .into_iter()
            .map(|(t, w)| (t.to_string(), w))
            .collect();
        let picked = select_terms(weights, 3);
        let names: Vec<&str> = picked.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(names, vec!["mid", "alpha", "zeta"]);
    }

    #[test]
    fn no_feedback_documents_leaves_query_unchanged() {
        let index = corpus();
        let q = query("submarine");
        assert_eq!(expander(config()).expand(&q, &index), q);
        let empty = StructuredQuery::default();
        assert!(expander(config()).expand(&empty, &index).is_empty());
    }
}
