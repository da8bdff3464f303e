//! Client library for the Xymon monitoring protocol.
//!
//! Xymon speaks a line-based, plain-text protocol over TCP: one request per
//! connection, with the reply read until the server closes the socket. This
//! crate models the protocol's commands as [`Command`], sends them to one
//! server with [`Client`] or to many with [`Dispatcher`], and decodes the
//! replies into [`Reply`] values.
//!
//! ```no_run
//! use xymon_client::{Color, DispatchMode, Dispatcher, Target};
//!
//! let dispatcher = Dispatcher::new([
//!     "xymon1.example.org".parse::<Target>()?,
//!     "xymon2.example.org:1985".parse::<Target>()?,
//! ])
//! .with_mode(DispatchMode::Concurrent);
//!
//! let results = dispatcher.invoke(|client| client.status("web01", "http", Color::Green, "ok"));
//! for (target, outcome) in results {
//!     if let Err(err) = outcome {
//!         eprintln!("{target}: {err}");
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod buffer;
mod client;
mod color;
mod command;
mod dispatch;
mod errors;
mod registry;
mod reply;
mod target;
mod transport;

#[cfg(test)]
mod tests;

pub use buffer::{MessageBuffer, inline_color};
pub use client::{Client, Execute};
pub use color::Color;
pub use command::{
    Command, Criteria, Lifetime, LifetimeParseError, ScheduledJob, StatusReport, headline, now,
};
pub use dispatch::{DispatchMode, DispatchResult, Dispatcher};
pub use errors::ClientError;
pub use registry::{Arguments, COMMANDS, CommandSpec, ParamDefault, ParamSpec, ValueKind, lookup};
pub use reply::{FIELD_DELIMITER, GhostRecord, GhostRecordError, Reply};
pub use target::{DEFAULT_PORT, Sender, Target, TargetParseError};
pub use transport::{DEFAULT_TIMEOUT, ReplyMode, TcpTransport, Transport, decode_reply, encode_payload};
