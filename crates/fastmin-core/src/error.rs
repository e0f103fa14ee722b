use fastmin_syntax::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for the minify pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read source {path}: {source}")]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input source map: {source}")]
    InputMap {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read input source map at {path}: {source}")]
    InputMapRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid source map mappings: {0}")]
    Mappings(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid options: {0}")]
    Options(String),

    #[error("Invalid regular expression `{pattern}`: {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("No collision-free name left for a binding in {scope}")]
    NameSpaceExhausted { scope: String },

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    #[must_use]
    pub fn options(msg: impl Into<String>) -> Self {
        Self::Options(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
