//! Server targets and sender identities.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Well-known Xymon daemon port.
pub const DEFAULT_PORT: u16 = 1984;

static LOCAL_SENDER: Lazy<String> =
    Lazy::new(|| gethostname::gethostname().to_string_lossy().into_owned());

/// One Xymon server endpoint.
///
/// Targets order by host then port so dispatch results iterate
/// deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Target {
    host: String,
    port: u16,
}

impl Target {
    /// Builds a target; a port of zero selects [`DEFAULT_PORT`].
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port: if port == 0 { DEFAULT_PORT } else { port },
        }
    }

    /// Host name or address of the server.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port of the server.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Target {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(formatter, "[{}]:{}", self.host, self.port)
        } else {
            write!(formatter, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for Target {
    type Err = TargetParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let (host, port) = if let Some(rest) = trimmed.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| TargetParseError::UnterminatedAddress(input.to_owned()))?;
            let port = match tail {
                "" => "",
                _ => tail
                    .strip_prefix(':')
                    .ok_or_else(|| TargetParseError::InvalidPort(input.to_owned()))?,
            };
            (host, port)
        } else {
            match trimmed.rsplit_once(':') {
                Some((host, port)) if !host.contains(':') => (host, port),
                _ => (trimmed, ""),
            }
        };

        if host.is_empty() {
            return Err(TargetParseError::MissingHost(input.to_owned()));
        }
        let port = if port.is_empty() {
            0
        } else {
            port.parse::<u16>()
                .map_err(|_| TargetParseError::InvalidPort(input.to_owned()))?
        };
        Ok(Self::new(host, port))
    }
}

impl TryFrom<String> for Target {
    type Error = TargetParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        target.to_string()
    }
}

/// Errors encountered while parsing a [`Target`] from text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetParseError {
    /// The host part was empty.
    #[error("missing host in server '{0}'")]
    MissingHost(String),
    /// The port was not a number between 0 and 65535.
    #[error("invalid port in server '{0}'")]
    InvalidPort(String),
    /// A bracketed IPv6 address was not closed.
    #[error("unterminated IPv6 address in server '{0}'")]
    UnterminatedAddress(String),
}

/// Name of the reporting entity shown in status headlines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sender(String);

impl Sender {
    /// Builds a sender from an explicit name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The local machine's network name, resolved once per process.
    #[must_use]
    pub fn local() -> Self {
        Self(LOCAL_SENDER.clone())
    }

    /// Uses `name` when it is present and non-empty, the local name otherwise.
    #[must_use]
    pub fn or_local(name: Option<&str>) -> Self {
        match name {
            Some(name) if !name.trim().is_empty() => Self::new(name.trim()),
            _ => Self::local(),
        }
    }

    /// The sender name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Sender {
    fn default() -> Self {
        Self::local()
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}
