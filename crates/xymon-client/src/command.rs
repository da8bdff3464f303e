//! Command modelling and wire encoding.
//!
//! A [`Command`] is one Xymon verb with typed parameters. Its [`Display`]
//! implementation renders the exact payload sent to the server: a single
//! command line, optionally followed by a newline and a free-text body.
//!
//! [`Display`]: std::fmt::Display

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::color::Color;
use crate::target::Sender;

/// How long a status or a disable stays in effect.
///
/// Accepted forms are an integer optionally followed by `s`, `m`, `h`, `d`
/// or `w`. A bare integer counts minutes on the server side; `-1` means
/// "until the test reports OK again" (or, for `disable`, until re-enabled).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lifetime(String);

impl Lifetime {
    /// Token meaning "until OK" / "until re-enabled".
    pub const UNTIL_OK: &'static str = "-1";

    /// The "until OK" lifetime.
    #[must_use]
    pub fn until_ok() -> Self {
        Self(Self::UNTIL_OK.to_owned())
    }

    /// A lifetime of `minutes` minutes.
    #[must_use]
    pub fn minutes(minutes: i64) -> Self {
        Self(minutes.to_string())
    }

    /// The wire token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::until_ok()
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl FromStr for Lifetime {
    type Err = LifetimeParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let token = input.trim();
        let digits = token
            .strip_suffix(['s', 'm', 'h', 'd', 'w'])
            .unwrap_or(token);
        let magnitude = digits.strip_prefix('-').unwrap_or(digits);
        if magnitude.is_empty() || !magnitude.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(LifetimeParseError(input.to_owned()));
        }
        Ok(Self(token.to_owned()))
    }
}

/// Error returned when a [`Lifetime`] token is malformed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{0}' is not a duration (expected an integer optionally followed by s, m, h, d or w)")]
pub struct LifetimeParseError(pub String);

/// Board and host selection criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criteria {
    /// Criteria already formatted by the caller, e.g. `color=red`.
    Raw(String),
    /// `key=value` pairs, joined with spaces.
    Pairs(Vec<(String, String)>),
    /// Free-form terms, joined with spaces.
    Terms(Vec<String>),
}

impl Criteria {
    /// Builds criteria from `key=value` pairs.
    pub fn pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Pairs(
            pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Raw(raw) => raw.trim().is_empty(),
            Self::Pairs(pairs) => pairs.is_empty(),
            Self::Terms(terms) => terms.is_empty(),
        }
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(raw) => formatter.write_str(raw),
            Self::Pairs(pairs) => {
                let joined: Vec<String> = pairs
                    .iter()
                    .map(|(key, value)| format!("{key}={value}"))
                    .collect();
                formatter.write_str(&joined.join(" "))
            }
            Self::Terms(terms) => formatter.write_str(&terms.join(" ")),
        }
    }
}

impl From<&str> for Criteria {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_owned())
    }
}

impl From<String> for Criteria {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

/// Status headline: `Message generated by <sender> at <timestamp>`.
#[must_use]
pub fn headline(sender: &Sender, at: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let timestamp = at
        .format(format)
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    format!("Message generated by {sender} at {timestamp}")
}

/// Current local time, falling back to UTC when the offset is unknown.
#[must_use]
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// A status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Reporting host.
    pub hostname: String,
    /// Test (column) name.
    pub testname: String,
    /// Status colour.
    pub color: Color,
    /// First line after the colour; always present.
    pub headline: String,
    /// Optional body appended after a newline.
    pub text: String,
    /// How long the status stays valid.
    pub lifetime: Option<Lifetime>,
    /// Alert group receiving the status.
    pub group: Option<String>,
}

/// A scheduled job: run `command` at the Unix epoch time `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    /// Unix epoch time of execution.
    pub timestamp: i64,
    /// A complete Xymon command, or `cancel JOBID`.
    pub command: String,
}

/// One Xymon protocol request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report a status.
    Status(StatusReport),
    /// Send a notification without changing the status.
    Notify {
        /// Host name.
        hostname: String,
        /// Test name.
        testname: String,
        /// Notification text.
        text: String,
    },
    /// Send data for trend graphs.
    Data {
        /// Host name.
        hostname: String,
        /// Data set name.
        dataname: String,
        /// Data body.
        text: String,
    },
    /// Disable a test (`*` for all tests of the host).
    Disable {
        /// Host name.
        hostname: String,
        /// Test name or `*`.
        testname: String,
        /// Disable duration; `-1` until re-enabled.
        duration: Lifetime,
        /// Reason shown on the status page.
        text: String,
    },
    /// Re-enable a disabled test.
    Enable {
        /// Host name.
        hostname: String,
        /// Test name or `*`.
        testname: String,
    },
    /// Query the latest status of a test.
    Query {
        /// Host name.
        hostname: String,
        /// Test name.
        testname: String,
    },
    /// Fetch a server configuration file.
    Config {
        /// File name relative to the server configuration directory.
        filename: String,
    },
    /// Drop stored data for a host or for one of its tests.
    Drop {
        /// Host name.
        hostname: String,
        /// Test to drop; the whole host when absent.
        testname: Option<String>,
    },
    /// Rename a host, or a test of `hostname` when given.
    Rename {
        /// Current name.
        old: String,
        /// New name.
        new: String,
        /// Host owning the renamed test.
        hostname: Option<String>,
    },
    /// Fetch the status log of a test.
    XymondLog {
        /// Host name.
        hostname: String,
        /// Test name.
        testname: String,
    },
    /// Fetch the status log of a test as XML.
    XymondXLog {
        /// Host name.
        hostname: String,
        /// Test name.
        testname: String,
    },
    /// Fetch a summary of all matching statuses.
    XymondBoard {
        /// Selection criteria.
        criteria: Option<Criteria>,
        /// Fields to return, in order.
        fields: Vec<String>,
    },
    /// Fetch the board as XML.
    XymondXBoard {
        /// Selection criteria.
        criteria: Option<Criteria>,
        /// Fields to return, in order.
        fields: Vec<String>,
    },
    /// Fetch host configuration entries.
    HostInfo {
        /// Selection criteria.
        criteria: Option<Criteria>,
    },
    /// Download a file from the server.
    Download {
        /// File name.
        filename: String,
    },
    /// Ask the server for its version.
    Ping,
    /// List ghost clients.
    GhostList,
    /// Schedule a command, or list scheduled jobs when `job` is absent.
    Schedule {
        /// Job to schedule.
        job: Option<ScheduledJob>,
    },
    /// Fetch a notes file.
    Notes {
        /// File name.
        filename: String,
    },
    /// Fetch a user message.
    UserMsg {
        /// Message identifier.
        identifier: String,
    },
    /// Change the colour of a status from an external source.
    Modify {
        /// Host name.
        hostname: String,
        /// Test name.
        testname: String,
        /// New colour.
        color: Color,
        /// Source of the modification.
        source: String,
        /// Human-readable cause.
        cause: String,
    },
}

impl Command {
    /// The protocol verb of this command.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Notify { .. } => "notify",
            Self::Data { .. } => "data",
            Self::Disable { .. } => "disable",
            Self::Enable { .. } => "enable",
            Self::Query { .. } => "query",
            Self::Config { .. } => "config",
            Self::Drop { .. } => "drop",
            Self::Rename { .. } => "rename",
            Self::XymondLog { .. } => "xymondlog",
            Self::XymondXLog { .. } => "xymondxlog",
            Self::XymondBoard { .. } => "xymondboard",
            Self::XymondXBoard { .. } => "xymondxboard",
            Self::HostInfo { .. } => "hostinfo",
            Self::Download { .. } => "download",
            Self::Ping => "ping",
            Self::GhostList => "ghostlist",
            Self::Schedule { .. } => "schedule",
            Self::Notes { .. } => "notes",
            Self::UserMsg { .. } => "usermsg",
            Self::Modify { .. } => "modify",
        }
    }

    /// The wire payload as bytes, before 7-bit transcoding.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = self.verb();
        match self {
            Self::Status(report) => write_status(formatter, report),
            Self::Notify {
                hostname,
                testname,
                text,
            } => write!(formatter, "{verb} {hostname}.{testname} {text}"),
            Self::Data {
                hostname,
                dataname,
                text,
            } => write!(formatter, "{verb} {hostname}.{dataname}\n{text}"),
            Self::Disable {
                hostname,
                testname,
                duration,
                text,
            } => write!(formatter, "{verb} {hostname}.{testname} {duration} {text}"),
            Self::Enable { hostname, testname }
            | Self::Query { hostname, testname }
            | Self::XymondLog { hostname, testname }
            | Self::XymondXLog { hostname, testname } => {
                write!(formatter, "{verb} {hostname}.{testname}")
            }
            Self::Config { filename }
            | Self::Download { filename }
            | Self::Notes { filename } => write!(formatter, "{verb} {filename}"),
            Self::Drop { hostname, testname } => match testname {
                Some(testname) => write!(formatter, "{verb} {hostname} {testname}"),
                None => write!(formatter, "{verb} {hostname}"),
            },
            Self::Rename { old, new, hostname } => match hostname {
                Some(hostname) => write!(formatter, "{verb} {hostname} {old} {new}"),
                None => write!(formatter, "{verb} {old} {new}"),
            },
            Self::XymondBoard { criteria, fields } | Self::XymondXBoard { criteria, fields } => {
                formatter.write_str(verb)?;
                write_criteria(formatter, criteria.as_ref())?;
                if !fields.is_empty() {
                    write!(formatter, " fields={}", fields.join(","))?;
                }
                Ok(())
            }
            Self::HostInfo { criteria } => {
                formatter.write_str(verb)?;
                write_criteria(formatter, criteria.as_ref())
            }
            Self::Ping | Self::GhostList => formatter.write_str(verb),
            Self::Schedule { job } => match job {
                Some(job) => write!(formatter, "{verb} {} {}", job.timestamp, job.command),
                None => formatter.write_str(verb),
            },
            Self::UserMsg { identifier } => write!(formatter, "{verb} {identifier}"),
            Self::Modify {
                hostname,
                testname,
                color,
                source,
                cause,
            } => write!(
                formatter,
                "{verb} {hostname}.{testname} {color} {source} {cause}"
            ),
        }
    }
}

fn write_status(formatter: &mut fmt::Formatter<'_>, report: &StatusReport) -> fmt::Result {
    formatter.write_str("status")?;
    if let Some(lifetime) = &report.lifetime {
        write!(formatter, "+{lifetime}")?;
    }
    if let Some(group) = &report.group {
        write!(formatter, "/group:{group}")?;
    }
    write!(
        formatter,
        " {}.{} {} {}",
        report.hostname, report.testname, report.color, report.headline
    )?;
    if !report.text.is_empty() {
        write!(formatter, "\n{}", report.text)?;
    }
    Ok(())
}

fn write_criteria(formatter: &mut fmt::Formatter<'_>, criteria: Option<&Criteria>) -> fmt::Result {
    match criteria {
        Some(criteria) if !criteria.is_empty() => write!(formatter, " {criteria}"),
        _ => Ok(()),
    }
}
