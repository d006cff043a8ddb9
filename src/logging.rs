//! Log level names and subscriber setup.
//!
//! Levels are named `DEBUG`, `INFO`, `WARN`, `ERROR`, `FATAL` and `OFF`.
//! Names are case-sensitive; anything unrecognised means `OFF`. `FATAL` maps
//! onto tracing's `ERROR`, the most severe level it has.
//!
//! ```rust,no_run
//! use wicket::logging::{self, LogLevel};
//!
//! logging::init(LogLevel::parse("DEBUG")).unwrap();
//! ```
//!
//! `RUST_LOG`, when set, takes precedence per target over the level passed
//! to [`init`].
//!
//! [`init_with_writer`] picks the output. Destinations can differ per level
//! by combining writers with [`MakeWriterExt`]:
//!
//! ```rust,no_run
//! use tracing::Level;
//! use tracing_subscriber::fmt::writer::MakeWriterExt;
//! use wicket::logging::{self, LogLevel};
//!
//! // WARN and ERROR to stderr, INFO and DEBUG to stdout.
//! let writer = std::io::stderr
//!     .with_max_level(Level::WARN)
//!     .or_else(std::io::stdout);
//! logging::init_with_writer(LogLevel::Debug, writer).unwrap();
//! ```

use std::fmt;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
    Off,
}

impl LogLevel {
    pub fn parse(name: &str) -> Self {
        match name {
            "DEBUG" => Self::Debug,
            "INFO" => Self::Info,
            "WARN" => Self::Warn,
            "ERROR" => Self::Error,
            "FATAL" => Self::Fatal,
            _ => Self::Off,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::Off => "OFF",
        }
    }

    pub fn level_filter(self) -> LevelFilter {
        match self {
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warn => LevelFilter::WARN,
            Self::Error | Self::Fatal => LevelFilter::ERROR,
            Self::Off => LevelFilter::OFF,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installs a global `fmt` subscriber filtering at `level`, writing to
/// stdout.
///
/// Fails with [`Error::Logging`] if a global subscriber is already set.
pub fn init(level: LogLevel) -> Result<(), Error> {
    init_with_writer(level, std::io::stdout)
}

/// Like [`init`], writing through `writer`.
pub fn init_with_writer<W>(level: LogLevel, writer: W) -> Result<(), Error>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::builder()
        .with_default_directive(level.level_filter().into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(writer)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}
