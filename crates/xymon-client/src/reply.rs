//! Reply decoding.
//!
//! Xymon answers in plain text. Depending on the command the text is kept
//! verbatim, split into lines, split into `|`-delimited rows, or parsed into
//! [`GhostRecord`]s.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tracing::error;

const REPLY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::reply");

/// Field delimiter used in tabular replies.
pub const FIELD_DELIMITER: char = '|';

/// A decoded server reply.
///
/// Serialises as its bare content: a string, a list of lines, a list of rows
/// or a list of ghost records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// Opaque text, kept verbatim.
    Text(String),
    /// One entry per reply line.
    Lines(Vec<String>),
    /// One row per reply line, split on `|`.
    Rows(Vec<Vec<String>>),
    /// Ghost clients.
    Ghosts(Vec<GhostRecord>),
}

/// A host reporting to the server without being listed in `hosts.cfg`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GhostRecord {
    /// Name the host reported under.
    pub hostname: String,
    /// Address the report came from.
    pub address: String,
    /// Unix time of the last report.
    pub timestamp: i64,
}

impl fmt::Display for GhostRecord {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}{FIELD_DELIMITER}{}{FIELD_DELIMITER}{}",
            self.hostname, self.address, self.timestamp
        )
    }
}

impl FromStr for GhostRecord {
    type Err = GhostRecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.splitn(3, FIELD_DELIMITER);
        let (Some(hostname), Some(address), Some(timestamp)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(GhostRecordError::FieldCount(line.to_owned()));
        };
        let timestamp = timestamp
            .trim()
            .parse::<i64>()
            .map_err(|_| GhostRecordError::Timestamp(line.to_owned()))?;
        Ok(Self {
            hostname: hostname.to_owned(),
            address: address.to_owned(),
            timestamp,
        })
    }
}

/// Why a ghostlist line could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GhostRecordError {
    /// The line did not have three `|`-separated fields.
    #[error("invalid ghostlist line {0:?}: expected hostname|address|timestamp")]
    FieldCount(String),
    /// The third field was not an integer.
    #[error("invalid ghostlist line {0:?}: timestamp is not an integer")]
    Timestamp(String),
}

/// Splits a reply into lines.
#[must_use]
pub fn lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_owned).collect()
}

/// Splits every reply line into `|`-delimited fields.
#[must_use]
pub fn rows(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(|line| line.split(FIELD_DELIMITER).map(str::to_owned).collect())
        .collect()
}

/// Parses a ghostlist reply, logging and skipping malformed lines.
#[must_use]
pub fn ghosts(text: &str) -> Vec<GhostRecord> {
    text.lines()
        .filter_map(|line| match line.parse::<GhostRecord>() {
            Ok(record) => Some(record),
            Err(err) => {
                error!(target: REPLY_TARGET, error = %err, "skipping ghostlist entry");
                None
            }
        })
        .collect()
}
