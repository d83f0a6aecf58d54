//! Error types for the portfolio toolkit

use thiserror::Error;

/// Result type alias for toolkit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading pages, running the image pipeline or
/// serving a preview
#[derive(Error, Debug)]
pub enum Error {
    /// A required element of the DOM contract is absent
    #[error("Missing required element: {0}")]
    MissingElement(String),

    /// A selector could not be parsed
    #[error("Invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    /// Failed to load a page
    #[error("Failed to load page: {0}")]
    LoadError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Image decoding, resizing or encoding failed
    #[error("Image processing failed for {path}: {reason}")]
    ImageError { path: String, reason: String },

    /// The site audit found contract violations
    #[error("Site audit failed: {0} check(s) did not pass")]
    AuditFailed(usize),

    /// Preview server error
    #[error("Preview server error: {0}")]
    ServerError(String),

    /// Filesystem error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigError(err.to_string())
    }
}
