use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, UsageStatsError>;
pub type XmlResult<T> = std::result::Result<T, XmlStructureError>;
pub type RecordResult<T> = std::result::Result<T, RecordError>;

/// Errors that fail a whole call.
///
/// Anything that only affects a single entry is a [`RecordError`] and is absorbed by the
/// adapters; anything that only means "this is not a usagestats artifact" is reported through
/// [`crate::DecodeOutcome`].
#[derive(Debug, Error)]
pub enum UsageStatsError {
    #[error("file name `{file_name}` is not an epoch-millisecond timestamp")]
    MalformedFileName { file_name: String },

    #[error("failed to read artifact `{}`: {source}", path.display())]
    FailedToRead { path: PathBuf, source: io::Error },

    #[error("failed to write records: {source}")]
    Output { source: io::Error },

    #[error("`serde_json` failed with error: {source}")]
    Json { source: serde_json::Error },

    #[cfg(feature = "multithreading")]
    #[error("failed to build thread pool: {source}")]
    ThreadPool { source: rayon::ThreadPoolBuildError },
}

impl From<serde_json::Error> for UsageStatsError {
    fn from(source: serde_json::Error) -> Self {
        UsageStatsError::Json { source }
    }
}

/// Reasons a byte buffer is not a single well-formed XML element tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XmlStructureError {
    #[error("XML syntax error at position {position}: {message}")]
    Syntax { position: u64, message: String },

    #[error("document has no root element")]
    NoRootElement,

    #[error("second root element `{name}` at position {position}")]
    MultipleRootElements { name: String, position: u64 },

    #[error("text outside of the root element at position {position}")]
    TextOutsideRoot { position: u64 },

    #[error("end tag `{found}` does not match open element `{expected}`")]
    MismatchedEndTag { expected: String, found: String },

    #[error("element `{name}` is never closed")]
    UnclosedElement { name: String },

    #[error("name or attribute at position {position} is not valid UTF-8")]
    InvalidUtf8 { position: u64 },
}

impl XmlStructureError {
    pub(crate) fn syntax(err: impl std::fmt::Display, position: u64) -> Self {
        XmlStructureError::Syntax {
            position,
            message: err.to_string(),
        }
    }
}

/// Faults scoped to a single entry. The offending record is dropped and decoding continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("{field} {index} is out of bounds for a string pool of {pool_len} strings")]
    StringPoolIndexOutOfBounds {
        field: &'static str,
        index: i32,
        pool_len: usize,
    },
}
