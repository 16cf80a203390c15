//! Ad-hoc retrieval over a static collection: analysis, a positional inverted
//! index, topic-derived structured queries, BM25 scoring with sequential
//! dependence, pseudo-relevance feedback, optional reranking, and run output.

pub mod config;
pub mod error;
pub mod eval;
pub mod feedback;
pub mod index;
pub mod persist;
pub mod query;
pub mod rerank;
pub mod run;
pub mod scorer;
pub mod search;
pub mod source;
pub mod tokenizer;
pub mod topics;

pub use config::SearchConfig;
pub use error::{Error, Result};
pub use index::{build_index, DocId, DocStore, Index, InvertedIndex, Posting};
pub use run::{RunEntry, RunWriter};
pub use search::{run_search, RunOutput, Searcher};
pub use source::{DocumentSource, SourceDocument};
pub use topics::Topic;
