//! Unified error type.

use crate::pattern::PatternError;

/// The error type returned by wicket's fallible operations.
///
/// Per-request failures (400, 405, 501, …) are expressed as HTTP responses,
/// not as `Error`s. This type covers startup: registering routes, binding a
/// port, installing the log subscriber.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("invalid http method `{0}`")]
    InvalidMethod(String),

    #[error("invalid socket address `{0}`")]
    InvalidAddr(String),

    #[error("logging: {0}")]
    Logging(String),
}
