use std::collections::HashSet;
use trawl_core::config::{CoverageWeights, RerankConfig};
use trawl_core::run::format_entry;
use trawl_core::tokenizer::analyze;
use trawl_core::{build_index, run_search, Index, RunWriter, SearchConfig, Searcher, SourceDocument, Topic};

fn animals() -> Index {
    build_index(vec![
        SourceDocument::new("D1", "cats", "cats are mammals"),
        SourceDocument::new("D2", "dogs", "dogs bark loudly"),
        SourceDocument::new("D3", "cats and dogs", "cats chase dogs"),
    ])
}

fn news() -> Index {
    let subjects = ["oil", "tax", "election", "drought", "vaccine", "tunnel", "strike", "merger"];
    let mut docs = Vec::new();
    for (i, s) in subjects.iter().enumerate() {
        for j in 0..6 {
            let other = subjects[(i + j + 1) % subjects.len()];
            docs.push(SourceDocument::new(
                format!("N{i}-{j}"),
                format!("{s} report"),
                format!("The {s} situation in Europe worsened as {other} talks stalled. Officials said the {s} crisis and {other} issue remain. Report {j}."),
            ));
        }
    }
    build_index(docs)
}

fn render(runs: &[(String, Vec<trawl_core::RunEntry>)]) -> String {
    runs.iter().flat_map(|(_, entries)| entries.iter().map(format_entry)).collect::<Vec<_>>().join("\n")
}

#[test]
fn cats_topic_scenario() {
    let index = animals();
    let runs = run_search(&index, &[Topic::new("1", "cats", "", "")], 2);
    assert_eq!(runs.len(), 1);
    let (number, entries) = &runs[0];
    assert_eq!(number, "1");
    assert_eq!(entries.len(), 2);
    let docnos: HashSet<&str> = entries.iter().map(|e| e.docno.as_str()).collect();
    assert_eq!(docnos, ["D1", "D3"].into_iter().collect());
    assert_eq!(entries[0].rank, 1);
    assert_eq!(entries[1].rank, 2);
    assert!(entries[0].score > entries[1].score);
    assert!(entries.iter().all(|e| e.run_tag == entries[0].run_tag && e.topic_number == "1"));
}

#[test]
fn negative_narrative_does_not_pull_in_dogs() {
    let index = animals();
    let topic = Topic::new("2", "", "", "Not relevant documents are about dogs. Relevant documents discuss cats.");
    let runs = run_search(&index, &[topic], 10);
    let entries = &runs[0].1;
    assert!(!entries.is_empty());
    assert_ne!(entries[0].docno, "D2");
    assert!(entries.iter().all(|e| e.docno != "D2"));
}

#[test]
fn output_is_deterministic() {
    let index = news();
    let topics = vec![
        Topic::new("10", "oil crisis", "What is the state of the oil situation?", "Reports on talks are relevant."),
        Topic::new("11", "tax", "", ""),
        Topic::new("12", "vaccine strike", "Officials on vaccine strike issues", ""),
    ];
    let first = render(&run_search(&index, &topics, 20));
    for _ in 0..3 {
        assert_eq!(render(&run_search(&index, &topics, 20)), first);
    }
}

#[test]
fn ranks_are_contiguous_bounded_and_monotonic() {
    let index = news();
    let topics = vec![Topic::new("20", "election report", "election talks in Europe", ""), Topic::new("21", "drought", "", "")];
    for result_count in [1, 5, 17, 1000] {
        for (_, entries) in run_search(&index, &topics, result_count) {
            assert!(entries.len() <= result_count);
            assert_eq!(entries.iter().map(|e| e.rank).collect::<Vec<_>>(), (1..=entries.len()).collect::<Vec<_>>());
            assert!(entries.windows(2).all(|w| w[0].score >= w[1].score));
            let distinct: HashSet<_> = entries.iter().map(|e| &e.docno).collect();
            assert_eq!(distinct.len(), entries.len());
        }
    }
}

#[test]
fn index_statistics_round_trip() {
    let index = news();
    let inv = &index.inverted;
    for term in inv.terms() {
        let postings = inv.postings(term);
        let docs: HashSet<u32> = postings.iter().map(|p| p.doc_id).collect();
        assert_eq!(inv.df(term) as usize, docs.len());
        assert!(postings.windows(2).all(|w| w[0].doc_id < w[1].doc_id));
        for p in postings {
            assert_eq!(p.positions.len(), p.term_frequency as usize);
            assert!(p.positions.windows(2).all(|w| w[0] < w[1]));
        }
    }
    let mut expected_total = 0u64;
    for (doc_id, doc) in index.docs.iter() {
        let tokens = analyze(&doc.title).len() + analyze(&doc.text).len();
        assert_eq!(inv.length(doc_id) as usize, tokens);
        expected_total += tokens as u64;
    }
    assert_eq!(inv.total_terms(), expected_total);
    let avg = expected_total as f32 / index.doc_count() as f32;
    assert!((inv.avg_doc_length() - avg).abs() < 1e-4);
}

#[test]
fn failing_topics_are_skipped_not_fatal() {
    let index = animals();
    let searcher = Searcher::new(&index, SearchConfig::default()).unwrap();
    let topics = vec![
        Topic::new("", "cats", "", ""),
        Topic::new("3", "the and of", "", ""),
        Topic::new("4", "dogs", "", ""),
    ];
    let out = searcher.run(&topics, 10);
    assert_eq!(out.summary.topics, 3);
    assert_eq!(out.summary.skipped, 1);
    assert_eq!(out.summary.empty, 1);
    assert!(out.topics[0].entries.is_empty());
    assert!(out.topics[1].entries.is_empty());
    assert!(!out.topics[2].entries.is_empty());
    assert_eq!(out.summary.lines, out.topics[2].entries.len());
}

#[test]
fn reranked_run_keeps_invariants() {
    let index = news();
    let config = SearchConfig { rerank: RerankConfig::Coverage(CoverageWeights::default()), threads: Some(2), ..SearchConfig::default() };
    let searcher = Searcher::new(&index, config).unwrap();
    let out = searcher.run(&[Topic::new("30", "merger talks", "merger talks stalled", "")], 5);
    let entries = &out.topics[0].entries;
    assert_eq!(entries.len(), 5);
    assert!(entries.windows(2).all(|w| w[0].score >= w[1].score));

    let mut writer = RunWriter::new(Vec::new());
    assert_eq!(out.write_to(&mut writer).unwrap(), 5);
    let text = String::from_utf8(writer.finish().unwrap()).unwrap();
    for (i, line) in text.lines().enumerate() {
        let parts: Vec<&str> = line.split(' ').collect();
        assert_eq!(parts.len(), 6);
        assert_eq!(parts[0], "30");
        assert_eq!(parts[1], "Q0");
        assert_eq!(parts[3], (i + 1).to_string());
        assert_eq!(parts[4].split('.').nth(1).map(str::len), Some(4));
        assert_eq!(parts[5], "trawl");
    }
}

#[test]
fn feedback_can_be_disabled() {
    let index = news();
    let mut config = SearchConfig::default();
    config.feedback.enabled = false;
    let plain = Searcher::new(&index, config).unwrap();
    let out = plain.run(&[Topic::new("40", "tunnel", "", "")], 1000);
    // without expansion only documents containing the query term can match
    let term = analyze("tunnel").remove(0);
    for e in &out.topics[0].entries {
        let (doc_id, _) = index.docs.iter().find(|(_, d)| d.docno == e.docno).unwrap();
        assert!(index.inverted.contains(&term, doc_id));
    }
}
