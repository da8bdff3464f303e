//! Fan-out of one command to several servers.
//!
//! A [`Dispatcher`] owns a deduplicated, ordered set of targets and one
//! transport. Each call produces a [`DispatchResult`] with exactly one entry
//! per target; a failing server never affects the others.

use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::error;

use crate::client::{Client, Execute};
use crate::command::Command;
use crate::errors::ClientError;
use crate::registry::Arguments;
use crate::reply::Reply;
use crate::target::{Sender, Target};
use crate::transport::{ReplyMode, TcpTransport, Transport};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Per-target outcome of a dispatched call.
pub type DispatchResult<R> = BTreeMap<Target, Result<R, ClientError>>;

/// How a dispatcher visits its targets.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DispatchMode {
    /// One target after the other, in target order.
    #[default]
    Sequential,
    /// One worker thread per target, joined before results are merged.
    Concurrent,
}

/// Sends commands to every configured server.
#[derive(Debug, Clone)]
pub struct Dispatcher<T = TcpTransport> {
    targets: Vec<Target>,
    sender: Sender,
    mode: DispatchMode,
    reply_mode: ReplyMode,
    transport: T,
}

impl Dispatcher<TcpTransport> {
    /// Builds a TCP dispatcher for `targets` with the default timeout.
    #[must_use]
    pub fn new(targets: impl IntoIterator<Item = Target>) -> Self {
        Self::with_transport(targets, TcpTransport::default())
    }
}

impl<T: Transport> Dispatcher<T> {
    /// Builds a dispatcher that reaches `targets` through `transport`.
    ///
    /// Duplicate targets collapse into one.
    #[must_use]
    pub fn with_transport(targets: impl IntoIterator<Item = Target>, transport: T) -> Self {
        let targets: BTreeSet<Target> = targets.into_iter().collect();
        Self {
            targets: targets.into_iter().collect(),
            sender: Sender::default(),
            mode: DispatchMode::default(),
            reply_mode: ReplyMode::Await,
            transport,
        }
    }

    /// Replaces the sender named in status headlines.
    #[must_use]
    pub fn with_sender(mut self, sender: Sender) -> Self {
        self.sender = sender;
        self
    }

    /// Selects sequential or concurrent dispatch.
    #[must_use]
    pub const fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the reply mode of the underlying clients.
    #[must_use]
    pub const fn with_reply_mode(mut self, reply_mode: ReplyMode) -> Self {
        self.reply_mode = reply_mode;
        self
    }

    /// Targets in dispatch order.
    #[must_use]
    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// The dispatch mode.
    #[must_use]
    pub const fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// The sender named in status headlines.
    #[must_use]
    pub const fn sender(&self) -> &Sender {
        &self.sender
    }

    fn client(&self, target: &Target) -> Client<&T> {
        Client::with_transport(target.clone(), &self.transport)
            .with_sender(self.sender.clone())
            .with_reply_mode(self.reply_mode)
    }

    /// Runs `operation` once per target and collects the outcomes.
    ///
    /// An operation that panics is recorded as
    /// [`ClientError::WorkerPanicked`] for its target in either mode; the
    /// remaining targets still run.
    #[must_use]
    pub fn invoke<R, F>(&self, operation: F) -> DispatchResult<R>
    where
        F: Fn(&Client<&T>) -> Result<R, ClientError> + Sync,
        R: Send,
    {
        let results: DispatchResult<R> = match self.mode {
            DispatchMode::Sequential => self
                .targets
                .iter()
                .map(|target| {
                    let client = self.client(target);
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| operation(&client)))
                        .unwrap_or_else(|_| {
                            Err(ClientError::WorkerPanicked {
                                target: target.clone(),
                            })
                        });
                    (target.clone(), outcome)
                })
                .collect(),
            DispatchMode::Concurrent => self.invoke_concurrently(&operation),
        };
        for (target, outcome) in &results {
            if let Err(err) = outcome {
                error!(target: DISPATCH_TARGET, server = %target, error = %err, "dispatch failed");
            }
        }
        results
    }

    fn invoke_concurrently<R, F>(&self, operation: &F) -> DispatchResult<R>
    where
        F: Fn(&Client<&T>) -> Result<R, ClientError> + Sync,
        R: Send,
    {
        thread::scope(|scope| {
            let workers: Vec<_> = self
                .targets
                .iter()
                .map(|target| {
                    let client = self.client(target);
                    (target, scope.spawn(move || operation(&client)))
                })
                .collect();
            workers
                .into_iter()
                .map(|(target, worker)| {
                    let outcome = worker.join().unwrap_or_else(|_| {
                        Err(ClientError::WorkerPanicked {
                            target: target.clone(),
                        })
                    });
                    (target.clone(), outcome)
                })
                .collect()
        })
    }

    /// Runs a command against every target.
    pub fn execute(&self, command: &Command) -> DispatchResult<Reply> {
        let span = tracing::info_span!(target: DISPATCH_TARGET, "dispatch", command = command.verb());
        let _entered = span.enter();
        self.invoke(|client| client.execute(command))
    }

    /// Parses a registry-named command once and runs it against every target.
    ///
    /// # Errors
    ///
    /// Argument errors and unsupported commands are returned before any
    /// server is contacted.
    pub fn call(
        &self,
        name: &str,
        arguments: &Arguments,
    ) -> Result<DispatchResult<Reply>, ClientError> {
        let command = Command::parse(name, arguments, &self.sender)?;
        Ok(self.execute(&command))
    }
}

impl<T: Transport> Execute for Dispatcher<T> {
    type Output = DispatchResult<Reply>;

    fn call(&self, name: &str, arguments: &Arguments) -> Result<Self::Output, ClientError> {
        Self::call(self, name, arguments)
    }
}
