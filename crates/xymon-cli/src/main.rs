//! CLI entrypoint for the Xymon client.
//!
//! The binary delegates to [`xymon_cli::run`], which loads configuration,
//! parses the command, sends it to every configured server and renders the
//! replies.

use std::io;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    xymon_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
