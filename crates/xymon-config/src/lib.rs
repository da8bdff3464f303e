//! Shared configuration for the Xymon client binaries.
//!
//! Values are layered by `ortho_config`: built-in defaults, then the
//! configuration file (`--config-path` or `XYMON_CONFIG_PATH`), then
//! `XYMON_*` environment variables, then command-line flags.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use xymon_client::{DispatchMode, Sender, Target};

mod defaults;
mod logging;

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_TIMEOUT_SECS, default_dispatch_mode, default_log_filter_string,
    default_log_format, default_timeout,
};
pub use logging::LogFormat;

/// Resolved configuration for a client invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "XYMON")]
pub struct Config {
    /// Xymon servers as `host[:port]`.
    #[ortho_config(default = Vec::new())]
    servers: Vec<Target>,
    /// Name reported in status headlines; the machine name when unset.
    sender: Option<String>,
    /// Connect, read and write timeout, in seconds.
    #[ortho_config(default = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
    /// How commands fan out to several servers.
    #[ortho_config(default = default_dispatch_mode())]
    dispatch: DispatchMode,
    /// `tracing` filter directives.
    #[ortho_config(default = default_log_filter_string())]
    log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            sender: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            dispatch: default_dispatch_mode(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Configured servers, in the order given.
    pub fn servers(&self) -> &[Target] {
        &self.servers
    }

    /// Replaces the configured servers.
    #[must_use]
    pub fn with_servers(mut self, servers: Vec<Target>) -> Self {
        self.servers = servers;
        self
    }

    /// Sender named in status headlines, defaulting to the machine name.
    pub fn sender(&self) -> Sender {
        Sender::or_local(self.sender.as_deref())
    }

    /// Network timeout for every request.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Dispatch mode for multi-server calls.
    pub fn dispatch(&self) -> DispatchMode {
        self.dispatch
    }

    /// `tracing` filter directives.
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
