//! Effectiveness metrics for a run against binary relevance judgments.

use std::collections::{BTreeMap, HashSet};

/// topic -> docno -> judged relevance.
pub type Qrels = BTreeMap<String, BTreeMap<String, i32>>;

/// topic -> docnos in rank order.
pub type RankedRun = BTreeMap<String, Vec<String>>;

/// Parse `topic iteration docno relevance` lines; malformed lines are skipped.
pub fn parse_qrels(text: &str) -> Qrels {
    let mut qrels = Qrels::new();
    for line in text.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 { continue; }
        let Ok(rel) = parts[3].parse::<i32>() else { continue };
        qrels.entry(parts[0].to_string()).or_default().insert(parts[2].to_string(), rel);
    }
    qrels
}

/// Parse run lines and order each topic's docnos by rank.
pub fn parse_run(text: &str) -> RankedRun {
    let mut ranked: BTreeMap<String, Vec<(usize, String)>> = BTreeMap::new();
    for line in text.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 6 { continue; }
        let Ok(rank) = parts[3].parse::<usize>() else { continue };
        ranked.entry(parts[0].to_string()).or_default().push((rank, parts[2].to_string()));
    }
    ranked
        .into_iter()
        .map(|(topic, mut docs)| {
            docs.sort_by_key(|(rank, _)| *rank);
            (topic, docs.into_iter().map(|(_, d)| d).collect())
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metrics {
    pub map: f64,
    pub p5: f64,
    pub p20: f64,
    pub ndcg20: f64,
    /// Judged topics the averages are taken over.
    pub topics: usize,
}

/// Average each metric over the judged topics; a judged topic missing from
/// the run scores zero.
pub fn evaluate(qrels: &Qrels, run: &RankedRun) -> Metrics {
    let mut m = Metrics::default();
    for (topic, judgments) in qrels {
        let relevant: HashSet<&str> = judgments.iter().filter(|(_, r)| **r > 0).map(|(d, _)| d.as_str()).collect();
        let retrieved = run.get(topic).map(Vec::as_slice).unwrap_or(&[]);
        m.map += average_precision(retrieved, &relevant);
        m.p5 += precision_at(retrieved, &relevant, 5);
        m.p20 += precision_at(retrieved, &relevant, 20);
        m.ndcg20 += ndcg_at(retrieved, &relevant, 20);
        m.topics += 1;
    }
    if m.topics > 0 {
        let n = m.topics as f64;
        m.map /= n;
        m.p5 /= n;
        m.p20 /= n;
        m.ndcg20 /= n;
    }
    m
}

pub fn average_precision(retrieved: &[String], relevant: &HashSet<&str>) -> f64 {
    if relevant.is_empty() { return 0.0; }
    let mut hits = 0usize;
    let mut sum = 0.0;
    for (i, d) in retrieved.iter().enumerate() {
        if relevant.contains(d.as_str()) {
            hits += 1;
            sum += hits as f64 / (i + 1) as f64;
        }
    }
    sum / relevant.len() as f64
}

pub fn precision_at(retrieved: &[String], relevant: &HashSet<&str>, k: usize) -> f64 {
    if k == 0 { return 0.0; }
    let hits = retrieved.iter().take(k).filter(|d| relevant.contains(d.as_str())).count();
    hits as f64 / k as f64
}

/// Binary-gain nDCG; rank 1 is undiscounted, rank i > 1 is discounted by log2(i).
pub fn ndcg_at(retrieved: &[String], relevant: &HashSet<&str>, k: usize) -> f64 {
    let gains = retrieved.iter().take(k).map(|d| relevant.contains(d.as_str()));
    let ideal = dcg(std::iter::repeat(true).take(relevant.len().min(k)));
    if ideal == 0.0 { return 0.0; }
    dcg(gains) / ideal
}

fn dcg(gains: impl Iterator<Item = bool>) -> f64 {
    gains
        .enumerate()
        .filter(|(_, rel)| *rel)
        .map(|(i, _)| if i == 0 { 1.0 } else { 1.0 / ((i + 1) as f64).log2() })
        .sum()
}
