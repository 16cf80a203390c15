use crate::config::QueryConfig;
use crate::tokenizer::Analyzer;
use crate::topics::Topic;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Where a sub-query came from; used for logging and to separate the
/// original query from feedback additions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Title,
    Description,
    Narrative,
    Bigram,
    Feedback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryTerm {
    pub term: String,
    /// Occurrences in the source text; multiplies the term's score.
    pub weight: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Bag of unigrams scored as the weighted sum of per-term scores.
    Terms(Vec<QueryTerm>),
    /// Ordered pair matching with at most `slop` intervening positions.
    Phrase { first: String, second: String, slop: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubQuery {
    pub boost: f32,
    pub origin: Origin,
    pub clause: Clause,
}

/// Weighted disjunction of sub-queries built for one topic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredQuery {
    pub sub_queries: Vec<SubQuery>,
}

impl StructuredQuery {
    pub fn is_empty(&self) -> bool { self.sub_queries.is_empty() }

    pub fn push(&mut self, sub: SubQuery) { self.sub_queries.push(sub); }

    /// Every unigram term in any bag.
    pub fn term_set(&self) -> BTreeSet<&str> {
        self.bags().flat_map(|terms| terms.iter().map(|t| t.term.as_str())).collect()
    }

    /// Distinct unigram terms of non-feedback bags, in first-seen order.
    pub fn original_terms(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for sub in self.sub_queries.iter().filter(|s| s.origin != Origin::Feedback) {
            if let Clause::Terms(terms) = &sub.clause {
                for t in terms {
                    if seen.insert(t.term.as_str()) {
                        out.push(t.term.clone());
                    }
                }
            }
        }
        out
    }

    pub fn bigrams(&self) -> Vec<(String, String)> {
        self.sub_queries
            .iter()
            .filter_map(|s| match &s.clause {
                Clause::Phrase { first, second, .. } => Some((first.clone(), second.clone())),
                Clause::Terms(_) => None,
            })
            .collect()
    }

    fn bags(&self) -> impl Iterator<Item = &Vec<QueryTerm>> {
        self.sub_queries.iter().filter_map(|s| match &s.clause {
            Clause::Terms(terms) => Some(terms),
            Clause::Phrase { .. } => None,
        })
    }
}

pub struct QueryBuilder {
    analyzer: Analyzer,
    config: QueryConfig,
}

impl QueryBuilder {
    pub fn new(analyzer: Analyzer, config: QueryConfig) -> Self { Self { analyzer, config } }

    pub fn build(&self, topic: &Topic) -> StructuredQuery {
        let cfg = &self.config;
        let narrative = filter_narrative(&topic.narrative, &cfg.negative_markers, cfg.narrative_max_segments);
        let mut query = StructuredQuery::default();

        for (text, boost, origin) in [
            (topic.title.as_str(), cfg.title_boost, Origin::Title),
            (topic.description.as_str(), cfg.description_boost, Origin::Description),
            (narrative.as_str(), cfg.narrative_boost, Origin::Narrative),
        ] {
            let terms = self.bag(text);
            if !terms.is_empty() && boost > 0.0 {
                query.push(SubQuery { boost: boost * cfg.unigram_weight, origin, clause: Clause::Terms(terms) });
            }
        }

        if cfg.bigram_weight > 0.0 {
            let combined = format!("{} {} {}", topic.title, topic.description, narrative);
            let ordered = self.analyzer.analyze(&combined);
            let mut seen: HashSet<(&str, &str)> = HashSet::new();
            for pair in ordered.windows(2) {
                let (first, second) = (pair[0].as_str(), pair[1].as_str());
                if first == second || !seen.insert((first, second)) { continue; }
                query.push(SubQuery {
                    boost: cfg.bigram_weight,
                    origin: Origin::Bigram,
                    clause: Clause::Phrase { first: first.to_string(), second: second.to_string(), slop: cfg.phrase_slop },
                });
            }
        }
        query
    }

    /// Analyzed terms with their occurrence counts, in first-seen order.
    fn bag(&self, text: &str) -> Vec<QueryTerm> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut terms: Vec<QueryTerm> = Vec::new();
        for term in self.analyzer.analyze(text) {
            if let Some(&i) = counts.get(&term) {
                terms[i].weight += 1.0;
                continue;
            }
            counts.insert(term.clone(), terms.len());
            terms.push(QueryTerm { term, weight: 1.0 });
        }
        terms
    }
}

/// Keep only the narrative segments that carry positive evidence.
///
/// Segments are split on `.`, `;` and newlines; any segment whose lowercase
/// form contains one of `markers` is dropped. Survivors are re-joined with
/// `". "`, so applying the filter to its own output is a no-op.
pub fn filter_narrative(narrative: &str, markers: &[String], max_segments: Option<usize>) -> String {
    let kept = narrative
        .split(['.', ';', '\n'])
        .map(str::trim)
        .filter(|seg| !seg.is_empty())
        .filter(|seg| {
            let lower = seg.to_lowercase();
            !markers.iter().any(|m| lower.contains(m.as_str()))
        })
        .take(max_segments.unwrap_or(usize::MAX));
    kept.collect::<Vec<_>>().join(". ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::analyze;

    fn markers() -> Vec<String> { QueryConfig::default().negative_markers }

    fn builder() -> QueryBuilder { QueryBuilder::new(Analyzer::new(), QueryConfig::default()) }

    #[test]
    fn drops_negative_segments() {
        let out = filter_narrative("Not relevant documents are about dogs. Relevant documents discuss cats.", &markers(), Some(2));
        assert_eq!(out, "Relevant documents discuss cats");
    }

    #[test]
    fn filter_is_idempotent() {
        let inputs = [
            "A relevant document names a minister; one that merely mentions tax is irrelevant.\nReports on budgets qualify. Ignore opinion pieces. Forecasts count too.",
            "",
            "...;;\n",
            "Only one sentence here",
        ];
        for input in inputs {
            for cap in [None, Some(1), Some(2)] {
                let once = filter_narrative(input, &markers(), cap);
                assert_eq!(filter_narrative(&once, &markers(), cap), once, "input {input:?}");
            }
        }
    }

    #[test]
    fn caps_segment_count() {
        let out = filter_narrative("one. two. three.", &markers(), Some(2));
        assert_eq!(out, "one. two");
        assert_eq!(filter_narrative("one. two. three.", &markers(), None), "one. two. three");
    }

    #[test]
    fn builds_field_bags_and_bigrams() {
        let cfg = QueryConfig::default();
        let q = builder().build(&Topic::new("1", "solar power", "solar energy", ""));
        let title = &q.sub_queries[0];
        assert_eq!(title.origin, Origin::Title);
        assert!((title.boost - cfg.title_boost * cfg.unigram_weight).abs() < 1e-6);
        assert_eq!(q.sub_queries[1].origin, Origin::Description);
        assert!(!q.sub_queries.iter().any(|s| s.origin == Origin::Narrative));

        // solar-power, power-solar, solar-energy
        let bigrams = q.bigrams();
        assert_eq!(bigrams.len(), 3);
        let solar = analyze("solar").remove(0);
        assert_eq!(bigrams[0].0, solar);
        assert!(q.sub_queries.iter().filter(|s| s.origin == Origin::Bigram).all(|s| s.boost == cfg.bigram_weight));
    }

    #[test]
    fn skips_identical_adjacent_pairs() {
        let q = builder().build(&Topic::new("2", "tax tax reform", "", ""));
        let bigrams = q.bigrams();
        assert_eq!(bigrams.len(), 1);
        assert_ne!(bigrams[0].0, bigrams[0].1);
    }

    #[test]
    fn repeated_terms_raise_weight() {
        let q = builder().build(&Topic::new("3", "oil spill oil", "", ""));
        let Clause::Terms(terms) = &q.sub_queries[0].clause else { panic!("expected bag") };
        assert_eq!(terms[0].weight, 2.0);
        assert_eq!(terms.len(), 2);
    }

    #[test]
    fn empty_topic_yields_empty_query() {
        assert!(builder().build(&Topic::new("4", "", "", "")).is_empty());
        assert!(builder().build(&Topic::new("5", "the of and", "", "Not relevant at all.")).is_empty());
    }

    #[test]
    fn original_terms_exclude_feedback() {
        let mut q = builder().build(&Topic::new("6", "cats", "", ""));
        q.push(SubQuery { boost: 0.4, origin: Origin::Feedback, clause: Clause::Terms(vec![QueryTerm { term: "feline".into(), weight: 1.0 }]) });
        assert_eq!(q.original_terms(), analyze("cats"));
        assert!(q.term_set().contains("feline"));
    }
}
