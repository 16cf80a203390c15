use serde::{Deserialize, Serialize};

/// A normalized record handed over by a corpus adapter.
///
/// A missing field is represented by an empty string. Records whose `docno`
/// is empty are dropped at index time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub docno: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
}

impl SourceDocument {
    pub fn new(docno: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self { docno: docno.into(), title: title.into(), text: text.into() }
    }
}

/// A corpus adapter: yields records until exhausted.
pub trait DocumentSource: Iterator<Item = SourceDocument> {
    /// Short label for logs, e.g. the dialect and file being read.
    fn label(&self) -> String;
}

/// In-memory source, mostly for tests and small corpora.
pub struct VecSource {
    label: String,
    docs: std::vec::IntoIter<SourceDocument>,
}

impl VecSource {
    pub fn new(label: impl Into<String>, docs: Vec<SourceDocument>) -> Self {
        Self { label: label.into(), docs: docs.into_iter() }
    }
}

impl Iterator for VecSource {
    type Item = SourceDocument;
    fn next(&mut self) -> Option<SourceDocument> { self.docs.next() }
}

impl DocumentSource for VecSource {
    fn label(&self) -> String { self.label.clone() }
}
