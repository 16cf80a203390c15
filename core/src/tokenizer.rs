use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could",
            "did","do","does","doing","down","during",
            "each","few","for","from","further",
            "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","it","its","itself",
            "me","more","most","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","should","so","some","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","very",
            "was","we","were","what","when","where","which","while","who","whom","why","will","with","would",
            "you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Stateless text analysis pipeline: Unicode word tokenization, lowercasing,
/// diacritic folding, stopword removal and English Snowball stemming.
///
/// All tables are immutable and shared, so one value can be cloned into (or
/// borrowed by) any number of threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self { Self }

    /// Tokenize text into (term, position). Positions count raw tokens, so the
    /// gaps left by removed stopwords are preserved for proximity matching.
    pub fn tokenize(&self, text: &str) -> Vec<(String, usize)> {
        let folded = fold(text);
        let mut tokens = Vec::new();
        for (pos, mat) in RE.find_iter(&folded).enumerate() {
            if let Some(term) = normalize_token(mat.as_str()) {
                tokens.push((term, pos));
            }
        }
        tokens
    }

    /// Analyzed terms in document order.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        self.tokenize(text).into_iter().map(|(t, _)| t).collect()
    }

    /// Run a single surface token through the pipeline.
    pub fn analyze_token(&self, raw: &str) -> Option<String> {
        let folded = fold(raw);
        let mat = RE.find(&folded)?;
        normalize_token(mat.as_str())
    }

    /// Terms whose surface form started with an uppercase letter somewhere in
    /// the first `window` raw tokens of `text`.
    pub fn capitalized_terms(&self, text: &str, window: usize) -> HashSet<String> {
        let mut out = HashSet::new();
        let unmarked = strip_marks(text);
        for mat in RE.find_iter(&unmarked).take(window) {
            let raw = mat.as_str();
            if !raw.chars().next().is_some_and(char::is_uppercase) { continue; }
            if let Some(term) = self.analyze_token(raw) {
                out.insert(term);
            }
        }
        out
    }
}

/// Lowercase, then NFKD-decompose and drop combining marks (café -> cafe).
fn fold(text: &str) -> String {
    strip_marks(&text.to_lowercase())
}

/// NFKD without combining marks; case is kept.
fn strip_marks(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

fn normalize_token(token: &str) -> Option<String> {
    let token = token.strip_suffix("'s").unwrap_or(token).trim_end_matches('\'');
    if token.is_empty() || is_stopword(token) { return None; }
    Some(STEMMER.stem(token).into_owned())
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Convenience wrapper over [`Analyzer::tokenize`].
pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    Analyzer.tokenize(text)
}

/// Convenience wrapper over [`Analyzer::analyze`].
pub fn analyze(text: &str) -> Vec<String> {
    Analyzer.analyze(text)
}
