use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A document or topic record is missing a required field.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// A topic produced no usable query terms.
    #[error("topic {0} produced an empty query")]
    EmptyQuery(String),
    #[error("index unavailable at {path}: {reason}")]
    IndexUnavailable { path: PathBuf, reason: String },
    #[error("failed to write run output: {0}")]
    WriteFailure(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::IndexUnavailable { path: path.into(), reason: reason.to_string() }
    }
}
