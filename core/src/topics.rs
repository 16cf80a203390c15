use crate::error::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

lazy_static! {
    static ref TOP_BLOCK: Regex = Regex::new(r"(?s)<top>(.*?)(?:</top>|\z)").expect("valid regex");
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub number: String,
    pub title: String,
    pub description: String,
    pub narrative: String,
}

impl Topic {
    pub fn new(number: impl Into<String>, title: impl Into<String>, description: impl Into<String>, narrative: impl Into<String>) -> Self {
        Self { number: number.into(), title: title.into(), description: description.into(), narrative: narrative.into() }
    }
}

/// Parse `<top>`-delimited topic blocks. Blocks without a number or a title
/// are logged and skipped.
pub fn parse_topics(text: &str) -> Vec<Topic> {
    let mut topics = Vec::new();
    for caps in TOP_BLOCK.captures_iter(text) {
        match parse_block(&caps[1]) {
            Ok(topic) => topics.push(topic),
            Err(e) => tracing::warn!(error = %e, "skipping topic block"),
        }
    }
    tracing::info!(topics = topics.len(), "parsed topics");
    topics
}

pub fn load_topics(path: &Path) -> Result<Vec<Topic>> {
    let text = std::fs::read_to_string(path).map_err(|e| Error::MalformedInput(format!("{}: {e}", path.display())))?;
    Ok(parse_topics(&text))
}

fn parse_block(block: &str) -> Result<Topic> {
    let number: String = section(block, "num", "Number:").chars().filter(char::is_ascii_digit).collect();
    let title = section(block, "title", "Topic:");
    if number.is_empty() {
        return Err(Error::MalformedInput(format!("topic without a number (title {title:?})")));
    }
    if title.is_empty() {
        return Err(Error::MalformedInput(format!("topic {number} has no title")));
    }
    Ok(Topic {
        number,
        title,
        description: section(block, "desc", "Description:"),
        narrative: section(block, "narr", "Narrative:"),
    })
}

/// Content of `<tag>` up to the next line opening a tag, with an optional
/// leading label removed and whitespace collapsed.
fn section(block: &str, tag: &str, label: &str) -> String {
    let open = format!("<{tag}>");
    let Some(start) = block.find(&open) else { return String::new() };
    let rest = &block[start + open.len()..];
    let end = next_tag_line(rest).unwrap_or(rest.len());
    let body = rest[..end].trim();
    let body = body.strip_prefix(label).unwrap_or(body);
    let body = body.strip_suffix(&format!("</{tag}>")).unwrap_or(body);
    collapse_whitespace(body)
}

fn next_tag_line(s: &str) -> Option<usize> {
    let mut offset = 0;
    for line in s.split_inclusive('\n') {
        if offset > 0 && line.trim_start().starts_with('<') {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
