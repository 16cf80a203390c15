use crate::error::{Error, Result};
use crate::index::{DocStore, Index, InvertedIndex};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const INDEX_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: usize,
    pub avg_doc_length: f32,
    pub created_at: String,
    pub version: u32,
}

impl MetaFile {
    pub fn describe(index: &Index, created_at: impl Into<String>) -> Self {
        Self {
            num_docs: index.doc_count(),
            num_terms: index.inverted.num_terms(),
            avg_doc_length: index.inverted.avg_doc_length(),
            created_at: created_at.into(),
            version: INDEX_VERSION,
        }
    }
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn postings(&self) -> PathBuf { self.root.join("postings.bin") }
    fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

fn save_bin<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut w, value).map_err(|e| Error::WriteFailure(std::io::Error::other(e)))?;
    w.flush()?;
    Ok(())
}

fn load_bin<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = File::open(path).map_err(|e| Error::unavailable(path, e))?;
    bincode::deserialize_from(BufReader::new(f)).map_err(|e| Error::unavailable(path, e))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta).map_err(std::io::Error::other)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let path = paths.meta();
    let f = File::open(&path).map_err(|e| Error::unavailable(&path, e))?;
    serde_json::from_reader(BufReader::new(f)).map_err(|e| Error::unavailable(&path, e))
}

/// Persist postings, stored fields and metadata under `paths.root`.
pub fn save_index(paths: &IndexPaths, index: &Index, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_bin(&paths.postings(), &index.inverted)?;
    save_bin(&paths.docs(), &index.docs)?;
    save_meta(paths, meta)?;
    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, "saved index");
    Ok(())
}

/// Open a previously saved index. Any missing, unreadable or mismatched part
/// makes the whole index unavailable.
pub fn load_index(paths: &IndexPaths) -> Result<Index> {
    let meta = load_meta(paths)?;
    if meta.version != INDEX_VERSION {
        return Err(Error::unavailable(
            paths.meta(),
            format!("index version {} is not supported (expected {INDEX_VERSION})", meta.version),
        ));
    }
    let inverted: InvertedIndex = load_bin(&paths.postings())?;
    let docs: DocStore = load_bin(&paths.docs())?;
    if inverted.doc_count() != meta.num_docs || docs.len() != meta.num_docs as usize {
        return Err(Error::unavailable(&paths.root, "document counts disagree with meta.json"));
    }
    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, num_terms = meta.num_terms, "loaded index");
    Ok(Index::from_parts(inverted, docs))
}
