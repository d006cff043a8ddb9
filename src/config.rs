//! Environment configuration.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `WICKET_ADDR` | `host:port` to listen on | `0.0.0.0:3000` |
//! | `WICKET_PORT` | port only, overrides the port of `WICKET_ADDR` | |
//! | `WICKET_LOG` | log level name, see [`LogLevel`] | `INFO` |

use std::net::SocketAddr;

use crate::error::Error;
use crate::logging::LogLevel;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub addr: SocketAddr,
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Reads the `WICKET_*` variables, falling back to the defaults.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let raw = lookup("WICKET_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_owned());
        let mut addr: SocketAddr = raw.parse().map_err(|_| Error::InvalidAddr(raw.clone()))?;

        if let Some(port) = lookup("WICKET_PORT") {
            addr.set_port(port.parse().map_err(|_| Error::InvalidAddr(port.clone()))?);
        }

        let log_level = lookup("WICKET_LOG").map_or(LogLevel::Info, |name| LogLevel::parse(&name));

        Ok(Self { addr, log_level })
    }
}
