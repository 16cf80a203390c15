//! Tunable parameters for query construction, scoring, feedback and reranking.
//!
//! Every section deserializes with defaults, so a JSON config file only needs
//! the fields it changes:
//!
//! ```json
//! { "model": { "bm25": { "k1": 0.9, "b": 0.4 } }, "feedback": { "max_df_ratio": 0.15 } }
//! ```

use crate::error::{Error, Result};
use crate::index::FIELD_GAP;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub query: QueryConfig,
    pub model: ScoringModel,
    pub feedback: FeedbackConfig,
    pub rerank: RerankConfig,
    pub run_tag: String,
    /// Worker threads for topic dispatch; `None` uses the global rayon pool.
    pub threads: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            query: QueryConfig::default(),
            model: ScoringModel::default(),
            feedback: FeedbackConfig::default(),
            rerank: RerankConfig::default(),
            run_tag: "trawl".to_string(),
            threads: None,
        }
    }
}

impl SearchConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SearchConfig = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        let q = &self.query;
        for (name, v) in [
            ("query.title_boost", q.title_boost),
            ("query.description_boost", q.description_boost),
            ("query.narrative_boost", q.narrative_boost),
            ("query.unigram_weight", q.unigram_weight),
            ("query.bigram_weight", q.bigram_weight),
            ("feedback.boost", self.feedback.boost),
            ("feedback.entity_boost", self.feedback.entity_boost),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(Error::Config(format!("{name} must be a non-negative number, got {v}")));
            }
        }
        if q.phrase_slop >= FIELD_GAP {
            return Err(Error::Config(format!("query.phrase_slop must be < {FIELD_GAP}, got {}", q.phrase_slop)));
        }
        match self.model {
            ScoringModel::Bm25 { k1, b } => {
                if !(k1 >= 0.0) { return Err(Error::Config(format!("bm25 k1 must be >= 0, got {k1}"))); }
                if !(0.0..=1.0).contains(&b) { return Err(Error::Config(format!("bm25 b must be in [0, 1], got {b}"))); }
            }
            ScoringModel::LmDirichlet { mu } => {
                if !(mu > 0.0) { return Err(Error::Config(format!("lm_dirichlet mu must be > 0, got {mu}"))); }
            }
        }
        let ratio = self.feedback.max_df_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(Error::Config(format!("feedback.max_df_ratio must be in (0, 1], got {ratio}")));
        }
        if self.run_tag.trim().is_empty() || self.run_tag.contains(char::is_whitespace) {
            return Err(Error::Config("run_tag must be a single non-empty word".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub title_boost: f32,
    pub description_boost: f32,
    pub narrative_boost: f32,
    /// Weight of the field bags in the sequential-dependence mix.
    pub unigram_weight: f32,
    /// Weight of each adjacent-pair phrase clause.
    pub bigram_weight: f32,
    /// Intervening tokens tolerated inside a phrase match.
    pub phrase_slop: u32,
    pub narrative_max_segments: Option<usize>,
    pub negative_markers: Vec<String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            title_boost: 3.5,
            description_boost: 1.5,
            narrative_boost: 0.4,
            unigram_weight: 0.8,
            bigram_weight: 0.2,
            phrase_slop: 1,
            narrative_max_segments: Some(2),
            negative_markers: ["not", "irrelevant", "ignore", "unrelated"].map(String::from).to_vec(),
        }
    }
}

/// Term-weighting function used by the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringModel {
    Bm25 { k1: f32, b: f32 },
    LmDirichlet { mu: f32 },
}

impl Default for ScoringModel {
    fn default() -> Self { ScoringModel::Bm25 { k1: 1.2, b: 0.75 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub enabled: bool,
    /// Feedback documents taken from the initial retrieval.
    pub docs: usize,
    pub max_terms: usize,
    pub boost: f32,
    pub min_df: u32,
    pub max_df_ratio: f32,
    pub entity_boost: f32,
    /// Raw tokens inspected for capitalized surface forms.
    pub entity_window: usize,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            docs: 15,
            max_terms: 35,
            boost: 0.45,
            min_df: 2,
            max_df_ratio: 0.12,
            entity_boost: 1.25,
            entity_window: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankConfig {
    #[default]
    None,
    Coverage(CoverageWeights),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageWeights {
    pub term_weight: f32,
    pub bigram_weight: f32,
    pub length_weight: f32,
    /// First-stage depth floor; the reranker sees `max(result_count, min_depth)` candidates.
    pub min_depth: usize,
}

impl Default for CoverageWeights {
    fn default() -> Self {
        Self { term_weight: 1.0, bigram_weight: 0.5, length_weight: 0.1, min_depth: 1000 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SearchConfig::default().validate().is_ok());
        assert!(SearchConfig::from_json("{}").is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c = SearchConfig::from_json(r#"{ "model": { "bm25": { "k1": 0.9, "b": 0.4 } }, "feedback": { "max_df_ratio": 0.15 } }"#).unwrap();
        assert_eq!(c.model, ScoringModel::Bm25 { k1: 0.9, b: 0.4 });
        assert_eq!(c.feedback.max_df_ratio, 0.15);
        assert_eq!(c.feedback.min_df, 2);
        assert_eq!(c.query.title_boost, 3.5);
        assert_eq!(c.rerank, RerankConfig::None);
    }

    #[test]
    fn coverage_rerank_from_json() {
        let c = SearchConfig::from_json(r#"{ "rerank": { "coverage": { "length_weight": 0.2 } } }"#).unwrap();
        match c.rerank {
            RerankConfig::Coverage(w) => {
                assert_eq!(w.length_weight, 0.2);
                assert_eq!(w.min_depth, 1000);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(SearchConfig::from_json(r#"{ "model": { "bm25": { "k1": 1.2, "b": 1.5 } } }"#).is_err());
        assert!(SearchConfig::from_json(r#"{ "model": { "lm_dirichlet": { "mu": 0.0 } } }"#).is_err());
        assert!(SearchConfig::from_json(r#"{ "feedback": { "max_df_ratio": 0.0 } }"#).is_err());
        assert!(SearchConfig::from_json(r#"{ "run_tag": "two words" }"#).is_err());
        assert!(SearchConfig::from_json(r#"{ "query": { "title_boost": -1.0 } }"#).is_err());
    }

    #[test]
    fn phrase_slop_stays_inside_field_gap() {
        let ok = format!(r#"{{ "query": {{ "phrase_slop": {} }} }}"#, FIELD_GAP - 1);
        assert!(SearchConfig::from_json(&ok).is_ok());
        let wide = format!(r#"{{ "query": {{ "phrase_slop": {} }} }}"#, FIELD_GAP);
        assert!(matches!(SearchConfig::from_json(&wide), Err(Error::Config(_))));
        assert!(SearchConfig::from_json(r#"{ "query": { "phrase_slop": 20 } }"#).is_err());
    }
}
