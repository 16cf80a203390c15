use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use trawl_core::{DocumentSource, SourceDocument};

lazy_static! {
    static ref DOC: Regex = Regex::new(r"(?s)<DOC>(.*?)</DOC>").expect("valid regex");
    static ref COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").expect("valid regex");
    static ref TAG: Regex = Regex::new(r"</?[A-Za-z][^>]*>").expect("valid regex");
    static ref ENTITY: Regex = Regex::new(r"&([A-Za-z]+|#[0-9]+);").expect("valid regex");
}

/// Legacy markup dialects of the TREC disks, told apart by their title tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    FinancialTimes,
    Fbis,
    FederalRegister,
    LaTimes,
    /// Unknown collection: take the first title-like tag present.
    Generic,
}

impl Dialect {
    fn title_tags(self) -> &'static [&'static str] {
        match self {
            Dialect::FinancialTimes | Dialect::LaTimes => &["HEADLINE"],
            Dialect::Fbis => &["TI"],
            Dialect::FederalRegister => &["PARENT"],
            Dialect::Generic => &["HEADLINE", "TI", "TITLE", "HEAD"],
        }
    }

    /// Pick the dialect from the collection directory name anywhere in `path`.
    pub fn for_path(path: &Path) -> Dialect {
        for component in path.components().rev() {
            let name = component.as_os_str().to_string_lossy().to_lowercase();
            match name.as_str() {
                "ft" => return Dialect::FinancialTimes,
                "fbis" => return Dialect::Fbis,
                "fr94" => return Dialect::FederalRegister,
                "latimes" => return Dialect::LaTimes,
                _ => {}
            }
        }
        Dialect::Generic
    }
}

/// `<DOC>`-delimited SGML records from one file.
pub struct TrecSgmlSource {
    label: String,
    docs: std::vec::IntoIter<SourceDocument>,
}

impl TrecSgmlSource {
    pub fn open(path: &Path, dialect: Dialect) -> io::Result<Self> {
        let bytes = std::fs::read(path)?;
        // Older collections are Latin-1; lossy decoding keeps the ASCII markup intact.
        let text = String::from_utf8_lossy(&bytes);
        Ok(Self::from_text(format!("{dialect:?}:{}", path.display()), &text, dialect))
    }

    pub fn from_text(label: String, text: &str, dialect: Dialect) -> Self {
        let docs: Vec<SourceDocument> = DOC.captures_iter(text).map(|c| parse_doc(&c[1], dialect)).collect();
        tracing::debug!(source = %label, docs = docs.len(), "parsed sgml file");
        Self { label, docs: docs.into_iter() }
    }
}

impl Iterator for TrecSgmlSource {
    type Item = SourceDocument;
    fn next(&mut self) -> Option<SourceDocument> { self.docs.next() }
}

impl DocumentSource for TrecSgmlSource {
    fn label(&self) -> String { self.label.clone() }
}

fn parse_doc(block: &str, dialect: Dialect) -> SourceDocument {
    let docno = tag_content(block, "DOCNO").map(clean).unwrap_or_default();
    let title = dialect
        .title_tags()
        .iter()
        .find_map(|tag| tag_content(block, tag))
        .map(clean)
        .unwrap_or_default();
    let text = tag_content(block, "TEXT").map(clean).unwrap_or_default();
    SourceDocument { docno, title, text }
}

/// Raw content between the first `<TAG>` and its matching close tag.
fn tag_content<'a>(block: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = block.find(&open)? + open.len();
    let end = block[start..].find(&close).map(|e| start + e).unwrap_or(block.len());
    Some(&block[start..end])
}

/// Strip nested markup and comments, decode entities, collapse whitespace.
fn clean(raw: &str) -> String {
    let no_comments = COMMENT.replace_all(raw, " ");
    let no_tags = TAG.replace_all(&no_comments, " ");
    let decoded = ENTITY.replace_all(&no_tags, |c: &Captures| decode_entity(&c[1]));
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entity(name: &str) -> String {
    match name {
        "amp" => "&".into(),
        "lt" => "<".into(),
        "gt" => ">".into(),
        "quot" => "\"".into(),
        "apos" => "'".into(),
        "hyph" => "-".into(),
        _ => match name.strip_prefix('#').and_then(|n| n.parse::<u32>().ok()).and_then(char::from_u32) {
            Some(c) => c.to_string(),
            None => " ".into(),
        },
    }
}

#[derive(Debug, Deserialize)]
struct InputDoc {
    #[serde(alias = "id")]
    docno: String,
    #[serde(default)]
    title: String,
    #[serde(default, alias = "body")]
    text: String,
}

/// One JSON object per line: `{"id"|"docno", "title", "body"|"text"}`.
pub struct JsonlSource {
    label: String,
    lines: std::io::Lines<BufReader<File>>,
    line_no: usize,
}

impl JsonlSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        let f = File::open(path)?;
        Ok(Self { label: format!("jsonl:{}", path.display()), lines: BufReader::new(f).lines(), line_no: 0 })
    }
}

impl Iterator for JsonlSource {
    type Item = SourceDocument;

    fn next(&mut self) -> Option<SourceDocument> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(source = %self.label, error = %e, "stopping unreadable jsonl file");
                    return None;
                }
            };
            self.line_no += 1;
            if line.trim().is_empty() { continue; }
            match serde_json::from_str::<InputDoc>(&line) {
                Ok(doc) => return Some(SourceDocument { docno: doc.docno, title: doc.title, text: doc.text }),
                Err(e) => tracing::warn!(source = %self.label, line = self.line_no, error = %e, "skipping malformed record"),
            }
        }
    }
}

impl DocumentSource for JsonlSource {
    fn label(&self) -> String { self.label.clone() }
}

/// README and changelog files shipped alongside the collections.
fn is_auxiliary(path: &Path) -> bool {
    let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("").to_lowercase();
    name.starts_with('.') || name.starts_with("read")
}

/// Open the adapter matching a corpus file, or `None` for files to skip.
pub fn open_source(path: &Path) -> Option<Box<dyn DocumentSource>> {
    if is_auxiliary(path) {
        tracing::debug!(path = %path.display(), "skipping auxiliary file");
        return None;
    }
    let opened: io::Result<Box<dyn DocumentSource>> = match path.extension().and_then(|s| s.to_str()) {
        Some("jsonl") => JsonlSource::open(path).map(|s| Box::new(s) as Box<dyn DocumentSource>),
        _ => TrecSgmlSource::open(path, Dialect::for_path(path)).map(|s| Box::new(s) as Box<dyn DocumentSource>),
    };
    match opened {
        Ok(source) => Some(source),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping unreadable corpus file");
            None
        }
    }
}

/// Corpus files under `root` in a stable order.
pub fn corpus_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}
