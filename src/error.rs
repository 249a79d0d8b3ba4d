use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the library.
///
/// Inversion failures inside a single rule are not errors at this level: they
/// are reported through [`crate::Inversion::Error`] and the scan moves on.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad path, contradictory policy, unsupported style.
    #[error("configuration error: {0}")]
    Config(String),

    /// A rule line that does not match the rule grammar.
    #[error("cannot parse rule `{rule}`: {message}")]
    Parse { rule: String, message: String },

    /// Internal invariant violation while inverting a primitive.
    #[error("inversion error: {0}")]
    Inversion(String),

    /// The sorted-file lookup helper returned something unparseable.
    #[error("lookup error: {0}")]
    Lookup(String),

    /// A persisted cache file is present but malformed.
    #[error("cache error: {0}")]
    Cache(String),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    pub(crate) fn parse(rule: &str, message: impl Into<String>) -> Self {
        Error::Parse { rule: rule.to_string(), message: message.into() }
    }

    /// Whether the error should stop the whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Parse { .. } | Error::Inversion(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
