//! Corpus adapters and the index build driver behind the `indexer` binary.

pub mod sources;

use anyhow::{bail, Context, Result};
use std::path::Path;
use trawl_core::persist::{save_index, IndexPaths, MetaFile};
use trawl_core::{build_index, DocumentSource};

/// Walk `docs`, index every admissible record and persist the index to `output`.
pub fn build_from_dir(docs: &Path, output: &Path, created_at: &str) -> Result<MetaFile> {
    if !docs.exists() {
        bail!("document path {} does not exist", docs.display());
    }
    let files = sources::corpus_files(docs);
    if files.is_empty() {
        bail!("no corpus files found under {}", docs.display());
    }
    tracing::info!(files = files.len(), docs = %docs.display(), "indexing corpus");

    let records = files.iter().filter_map(|f| sources::open_source(f)).flat_map(|source: Box<dyn DocumentSource>| {
        tracing::debug!(source = %source.label(), "reading");
        source
    });
    let index = build_index(records);

    let meta = MetaFile::describe(&index, created_at);
    save_index(&IndexPaths::new(output), &index, &meta).with_context(|| format!("writing index to {}", output.display()))?;
    tracing::info!(output = %output.display(), num_docs = meta.num_docs, num_terms = meta.num_terms, "index build complete");
    Ok(meta)
}
