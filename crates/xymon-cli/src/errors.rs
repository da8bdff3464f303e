//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use thiserror::Error;
use xymon_client::ClientError;

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("no Xymon servers configured; pass --servers HOST[:PORT] or set XYMON_SERVERS")]
    NoServers,
    #[error("failed to write output: {0}")]
    WriteOutput(io::Error),
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(serde_json::Error),
}
