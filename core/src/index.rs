use crate::source::SourceDocument;
use crate::tokenizer::Analyzer;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub type DocId = u32;

/// Position gap inserted between the title and text fields. Larger than any
/// phrase slop so adjacent-pair matches never straddle two fields.
pub const FIELD_GAP: u32 = 16;
/// Documents analyzed per worker before merging.
const PARTITION_SIZE: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_frequency: u32,
    /// Strictly increasing; `positions.len() == term_frequency`.
    pub positions: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDoc {
    pub docno: String,
    pub title: String,
    pub text: String,
}

/// Stored fields addressed by dense doc id.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DocStore {
    docs: Vec<StoredDoc>,
}

impl DocStore {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, doc_id: DocId) -> Option<&StoredDoc> { self.docs.get(doc_id as usize) }

    /// External identifier, or `None` when the id is unknown or the docno is blank.
    pub fn docno(&self, doc_id: DocId) -> Option<&str> {
        self.get(doc_id).map(|d| d.docno.as_str()).filter(|s| !s.is_empty())
    }

    pub fn len(&self) -> usize { self.docs.len() }

    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, &StoredDoc)> {
        self.docs.iter().enumerate().map(|(i, d)| (i as DocId, d))
    }
}

/// Term -> doc-ordered postings, plus the length statistics BM25 needs.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: HashMap<String, Vec<Posting>>, // postings sorted by doc_id
    doc_lengths: Vec<u32>,
    total_length: u64,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    pub fn postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn posting(&self, term: &str, doc_id: DocId) -> Option<&Posting> {
        let list = self.postings(term);
        list.binary_search_by_key(&doc_id, |p| p.doc_id).ok().map(|i| &list[i])
    }

    pub fn contains(&self, term: &str, doc_id: DocId) -> bool { self.posting(term, doc_id).is_some() }

    /// Number of documents containing `term`; derived from the postings list.
    pub fn df(&self, term: &str) -> u32 { self.postings(term).len() as u32 }

    /// Total occurrences of `term` across the collection.
    pub fn collection_frequency(&self, term: &str) -> u64 {
        self.postings(term).iter().map(|p| p.term_frequency as u64).sum()
    }

    pub fn doc_count(&self) -> u32 { self.doc_lengths.len() as u32 }

    pub fn length(&self, doc_id: DocId) -> u32 { self.doc_lengths.get(doc_id as usize).copied().unwrap_or(0) }

    pub fn total_terms(&self) -> u64 { self.total_length }

    pub fn avg_doc_length(&self) -> f32 {
        if self.doc_lengths.is_empty() { return 0.0; }
        self.total_length as f32 / self.doc_lengths.len() as f32
    }

    pub fn num_terms(&self) -> usize { self.postings.len() }

    pub fn terms(&self) -> impl Iterator<Item = &str> { self.postings.keys().map(String::as_str) }

    /// Append a partial index whose doc ids start right after ours.
    fn merge(&mut self, part: PartialIndex) {
        debug_assert_eq!(part.first_doc as usize, self.doc_lengths.len());
        self.total_length += part.doc_lengths.iter().map(|&l| l as u64).sum::<u64>();
        self.doc_lengths.extend(part.doc_lengths);
        for (term, plist) in part.postings {
            self.postings.entry(term).or_default().extend(plist);
        }
    }
}

/// The read-only product of the build phase: postings plus stored fields.
#[derive(Debug, Default)]
pub struct Index {
    pub inverted: InvertedIndex,
    pub docs: DocStore,
}

impl Index {
    pub fn from_parts(inverted: InvertedIndex, docs: DocStore) -> Self { Self { inverted, docs } }

    pub fn doc_count(&self) -> u32 { self.inverted.doc_count() }
}

/// Postings for one contiguous range of doc ids, built by a single worker.
struct PartialIndex {
    first_doc: DocId,
    postings: HashMap<String, Vec<Posting>>,
    doc_lengths: Vec<u32>,
}

impl PartialIndex {
    fn build(analyzer: &Analyzer, first_doc: DocId, docs: &[StoredDoc]) -> Self {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(docs.len());
        for (offset, doc) in docs.iter().enumerate() {
            let doc_id = first_doc + offset as DocId;
            let (positions, len) = analyze_fields(analyzer, doc);
            doc_lengths.push(len);
            for (term, positions) in positions {
                let term_frequency = positions.len() as u32;
                postings.entry(term).or_default().push(Posting { doc_id, term_frequency, positions });
            }
        }
        Self { first_doc, postings, doc_lengths }
    }
}

/// Per-term positions over title then text, and the analyzed token count.
fn analyze_fields(analyzer: &Analyzer, doc: &StoredDoc) -> (HashMap<String, Vec<u32>>, u32) {
    let mut positions: HashMap<String, Vec<u32>> = HashMap::new();
    let mut len = 0u32;
    let mut base = 0u32;
    for field in [&doc.title, &doc.text] {
        let mut last = None;
        for (term, pos) in analyzer.tokenize(field) {
            let pos = base + pos as u32;
            positions.entry(term).or_default().push(pos);
            last = Some(pos);
            len += 1;
        }
        if let Some(last) = last {
            base = last + 1 + FIELD_GAP;
        }
    }
    (positions, len)
}

/// Build the index and document store from a stream of source records.
pub fn build_index<I>(documents: I) -> Index
where
    I: IntoIterator<Item = SourceDocument>,
{
    build_index_with(&Analyzer::new(), documents)
}

pub fn build_index_with<I>(analyzer: &Analyzer, documents: I) -> Index
where
    I: IntoIterator<Item = SourceDocument>,
{
    let docs = admit(documents);
    let partials: Vec<PartialIndex> = docs
        .par_chunks(PARTITION_SIZE)
        .enumerate()
        .map(|(i, chunk)| PartialIndex::build(analyzer, (i * PARTITION_SIZE) as DocId, chunk))
        .collect();

    let mut inverted = InvertedIndex::new();
    for part in partials {
        inverted.merge(part);
    }
    tracing::info!(num_docs = inverted.doc_count(), num_terms = inverted.num_terms(), avg_len = inverted.avg_doc_length(), "built index");
    Index { inverted, docs: DocStore { docs } }
}

/// Assign dense ids in source order, dropping records without a usable docno.
fn admit<I>(documents: I) -> Vec<StoredDoc>
where
    I: IntoIterator<Item = SourceDocument>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut admitted = Vec::new();
    let mut dropped = 0usize;
    for doc in documents {
        let docno = doc.docno.trim();
        if docno.is_empty() {
            tracing::warn!(title = %doc.title, "dropping document without docno");
            dropped += 1;
            continue;
        }
        if !seen.insert(docno.to_string()) {
            tracing::warn!(docno, "dropping duplicate docno");
            dropped += 1;
            continue;
        }
        admitted.push(StoredDoc { docno: docno.to_string(), title: doc.title, text: doc.text });
    }
    if dropped > 0 {
        tracing::info!(dropped, admitted = admitted.len(), "filtered source documents");
    }
    admitted
}
