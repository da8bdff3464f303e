//! Command-line interface runtime for the Xymon client.
//!
//! The runtime splits configuration flags from the command line, loads the
//! layered configuration, parses the command against the registry and sends
//! it to every configured server. Configuration loading and IO streams can be
//! substituted so tests drive the same path as the binary.

use std::ffi::OsString;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;

use tracing::info;
use xymon_client::{Command, Dispatcher, TcpTransport, encode_payload};
use xymon_config::Config;

mod cli;
mod config;
mod errors;
pub mod output;
mod telemetry;


use cli::Invocation;
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
use config::{command_arguments, split_config_arguments};
pub(crate) use errors::AppError;
pub use output::{OutputFormat, ResolvedOutputFormat};

const CLI_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::run");

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
    stdout_is_terminal: bool,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self {
            stdout,
            stderr,
            stdout_is_terminal: io::stdout().is_terminal(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_terminal_status(
        stdout: &'a mut W,
        stderr: &'a mut E,
        stdout_is_terminal: bool,
    ) -> Self {
        Self {
            stdout,
            stderr,
            stdout_is_terminal,
        }
    }

    pub(crate) const fn stdout_is_terminal(&self) -> bool {
        self.stdout_is_terminal
    }
}

struct CliRunner<'a, 'io, W: Write, E: Write, L: ConfigLoader> {
    io: &'a mut IoStreams<'io, W, E>,
    loader: &'a L,
}

impl<'a, 'io, W, E, L> CliRunner<'a, 'io, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(io: &'a mut IoStreams<'io, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);

        let invocation = match cli::parse(command_arguments(&args, &split)) {
            Ok(invocation) => invocation,
            Err(error) if !error.use_stderr() => {
                let _ = write!(self.io.stdout, "{}", error.render());
                return ExitCode::SUCCESS;
            }
            Err(error) => {
                let _ = write!(self.io.stderr, "{}", AppError::CliUsage(error));
                return ExitCode::FAILURE;
            }
        };

        let result = self
            .loader
            .load(&split.config_arguments)
            .and_then(|config| self.execute(&config, invocation));

        match result {
            Ok(exit_code) => exit_code,
            Err(error) => {
                let _ = writeln!(self.io.stderr, "{error}");
                ExitCode::FAILURE
            }
        }
    }

    fn execute(&mut self, config: &Config, invocation: Invocation) -> Result<ExitCode, AppError> {
        telemetry::initialise(config)?;
        let sender = config.sender();
        let command = Command::parse(invocation.command, &invocation.arguments, &sender)?;
        if config.servers().is_empty() {
            return Err(AppError::NoServers);
        }

        let dispatcher = Dispatcher::with_transport(
            config.servers().iter().cloned(),
            TcpTransport::new(config.timeout()),
        )
        .with_sender(sender)
        .with_mode(config.dispatch());

        if invocation.cli.dry_run {
            return self.dry_run(&dispatcher, &command);
        }

        let results = dispatcher.execute(&command);
        let format = invocation.cli.output.resolve(self.io.stdout_is_terminal());
        output::render(&results, format, &mut *self.io.stdout, &mut *self.io.stderr)?;

        if results.values().any(Result::is_err) {
            Ok(ExitCode::FAILURE)
        } else {
            Ok(ExitCode::SUCCESS)
        }
    }

    fn dry_run(
        &mut self,
        dispatcher: &Dispatcher,
        command: &Command,
    ) -> Result<ExitCode, AppError> {
        let wire = encode_payload(&command.encode());
        let line = String::from_utf8_lossy(&wire);
        for target in dispatcher.targets() {
            info!(target: CLI_TARGET, server = %target, wire = %line, "dry run; nothing sent");
            writeln!(self.io.stderr, "dry-run {target}: {line:?}").map_err(AppError::WriteOutput)?;
        }
        Ok(ExitCode::SUCCESS)
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdout, stderr);
    run_with_loader(args, &mut io, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
#[must_use]
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    io: &mut IoStreams<'_, W, E>,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(io, loader).run(args)
}
