//! Error types surfaced by client calls.

use std::io;

use thiserror::Error;

use crate::target::Target;

/// Errors returned by a single client call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The target host name could not be resolved.
    #[error("failed to resolve Xymon server {target}: {source}")]
    Resolve {
        /// Server that failed to resolve.
        target: Target,
        /// Underlying resolver error.
        #[source]
        source: io::Error,
    },
    /// The connection was refused or timed out.
    #[error("failed to connect to Xymon server {target}: {source}")]
    Connect {
        /// Server that refused the connection.
        target: Target,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// Writing the request failed.
    #[error("failed to send request to Xymon server {target}: {source}")]
    Send {
        /// Server the request was written to.
        target: Target,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// Reading the reply failed.
    #[error("failed to read reply from Xymon server {target}: {source}")]
    Receive {
        /// Server the reply was read from.
        target: Target,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The command exists in the protocol but this client does not implement it.
    #[error("command '{command}' is not supported")]
    NotSupported {
        /// Protocol verb.
        command: &'static str,
    },
    /// No command with this name exists.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    /// The command does not accept a parameter with this name.
    #[error("command '{command}' has no parameter '{parameter}'")]
    UnknownParameter {
        /// Protocol verb.
        command: &'static str,
        /// Offending parameter name.
        parameter: String,
    },
    /// A required parameter was not supplied.
    #[error("command '{command}' requires parameter '{parameter}'")]
    MissingArgument {
        /// Protocol verb.
        command: &'static str,
        /// Missing parameter name.
        parameter: &'static str,
    },
    /// A parameter value could not be interpreted.
    #[error("invalid value '{value}' for parameter '{parameter}': {reason}")]
    InvalidArgument {
        /// Offending parameter name.
        parameter: &'static str,
        /// Value as supplied.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },
    /// A dispatcher worker thread panicked before producing a result.
    #[error("worker for Xymon server {target} panicked")]
    WorkerPanicked {
        /// Server handled by the worker.
        target: Target,
    },
}

impl ClientError {
    /// Returns true when the error comes from the network layer.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Resolve { .. } | Self::Connect { .. } | Self::Send { .. } | Self::Receive { .. }
        )
    }

    /// Returns true when the error was caused by the caller's arguments.
    #[must_use]
    pub const fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownCommand(_)
                | Self::UnknownParameter { .. }
                | Self::MissingArgument { .. }
                | Self::InvalidArgument { .. }
        )
    }
}
