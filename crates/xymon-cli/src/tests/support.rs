//! Test support utilities for CLI unit and behavioural coverage.
//!
//! Supplies a static configuration loader, fake Xymon servers and a world
//! that captures CLI output so step definitions stay focused on assertions.

mod fake_server;

use std::cell::RefCell;
use std::ffi::OsString;
use std::process::ExitCode;

use anyhow::{Context, Result, ensure};
use rstest::fixture;
use xymon_config::Config;

use crate::{AppError, ConfigLoader, IoStreams, run_with_loader};

pub(crate) use fake_server::{FakeServer, closed_target};

pub(crate) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(crate) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

#[derive(Default)]
pub(crate) struct TestWorld {
    pub config: Config,
    pub servers: Vec<FakeServer>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<ExitCode>,
    pub requests: Vec<String>,
}

impl TestWorld {
    pub fn start_server(&mut self, reply: &str) -> Result<()> {
        let server = FakeServer::spawn(reply)?;
        self.add_target(server.target().clone());
        self.servers.push(server);
        Ok(())
    }

    pub fn add_dead_server(&mut self) -> Result<()> {
        self.add_target(closed_target()?);
        Ok(())
    }

    fn add_target(&mut self, target: xymon_client::Target) {
        let mut servers = self.config.servers().to_vec();
        servers.push(target);
        self.config = self.config.clone().with_servers(servers);
    }

    pub fn run(&mut self, command: &str) -> Result<()> {
        self.stdout.clear();
        self.stderr.clear();
        self.requests.clear();
        let args = build_args(command);
        let loader = StaticConfigLoader::new(self.config.clone());
        let mut io = IoStreams::with_terminal_status(&mut self.stdout, &mut self.stderr, false);
        let exit = run_with_loader(args, &mut io, &loader);
        self.exit_code = Some(exit);
        for mut server in self.servers.drain(..) {
            if let Some(request) = server.take_request()? {
                self.requests.push(request);
            }
        }
        Ok(())
    }

    pub fn stdout_text(&self) -> Result<String> {
        String::from_utf8(self.stdout.clone()).context("stdout is not utf8")
    }

    pub fn stderr_text(&self) -> Result<String> {
        String::from_utf8(self.stderr.clone()).context("stderr is not utf8")
    }

    pub fn assert_success(&self) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(
            exit == ExitCode::SUCCESS,
            "expected success, got {exit:?}; stderr: {}",
            self.stderr_text()?
        );
        Ok(())
    }

    pub fn assert_failure(&self) -> Result<()> {
        let exit = self.exit_code.context("exit code recorded")?;
        ensure!(
            exit == ExitCode::FAILURE,
            "expected failure exit code, got {exit:?}"
        );
        Ok(())
    }

    pub fn assert_every_request_starts_with(&self, prefix: &str) -> Result<()> {
        ensure!(
            self.requests.len() == self.config.servers().len(),
            "expected {} requests, found {:?}",
            self.config.servers().len(),
            self.requests
        );
        for request in &self.requests {
            ensure!(
                request.starts_with(prefix),
                "request {request:?} does not start with {prefix:?}"
            );
        }
        Ok(())
    }

    pub fn assert_no_requests(&self) -> Result<()> {
        ensure!(
            self.requests.is_empty(),
            "expected no requests but found {:?}",
            self.requests
        );
        Ok(())
    }
}

/// Splits a command line on whitespace, stripping quotes from each token.
pub(crate) fn build_args(command: &str) -> Vec<OsString> {
    let mut args = vec![OsString::from("xymon")];
    args.extend(
        command
            .split_whitespace()
            .map(|token| OsString::from(token.trim_matches('"'))),
    );
    args
}

#[fixture]
pub(crate) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}
