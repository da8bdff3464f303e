//! Rendering of per-server results.
//!
//! Human output prints each reply under a `== host:port ==` header when more
//! than one server answered, with failures on stderr. JSON output maps every
//! server to `{"ok": reply}` or `{"error": message}`.

use std::io::Write;

use clap::ValueEnum;
use serde_json::{Map, Value, json};
use xymon_client::{DispatchResult, FIELD_DELIMITER, Reply};

use crate::AppError;

/// Output format selection for command replies.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Selects `human` for terminal output and `json` for redirected output.
    Auto,
    /// Always render human-readable output.
    Human,
    /// Always emit JSON.
    Json,
}

/// Output format after resolving `auto` based on TTY detection.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolvedOutputFormat {
    /// Replies as text, one server after another.
    Human,
    /// One JSON object keyed by server.
    Json,
}

impl OutputFormat {
    /// Resolves the output format based on whether stdout is a terminal.
    #[must_use]
    pub fn resolve(self, stdout_is_terminal: bool) -> ResolvedOutputFormat {
        match self {
            Self::Auto => {
                if stdout_is_terminal {
                    ResolvedOutputFormat::Human
                } else {
                    ResolvedOutputFormat::Json
                }
            }
            Self::Human => ResolvedOutputFormat::Human,
            Self::Json => ResolvedOutputFormat::Json,
        }
    }
}

/// Writes `results` in the requested format.
pub(crate) fn render<W, E>(
    results: &DispatchResult<Reply>,
    format: ResolvedOutputFormat,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<(), AppError>
where
    W: Write,
    E: Write,
{
    match format {
        ResolvedOutputFormat::Human => render_human(results, stdout, stderr),
        ResolvedOutputFormat::Json => render_json(results, stdout),
    }
}

fn render_human<W, E>(
    results: &DispatchResult<Reply>,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<(), AppError>
where
    W: Write,
    E: Write,
{
    let headed = results.len() > 1;
    for (target, outcome) in results {
        match outcome {
            Ok(reply) => {
                if headed {
                    writeln!(stdout, "== {target} ==").map_err(AppError::WriteOutput)?;
                }
                stdout
                    .write_all(human_text(reply).as_bytes())
                    .map_err(AppError::WriteOutput)?;
            }
            Err(error) => writeln!(stderr, "{target}: {error}").map_err(AppError::WriteOutput)?,
        }
    }
    stdout.flush().map_err(AppError::WriteOutput)
}

/// Formats a reply as newline-terminated text.
fn human_text(reply: &Reply) -> String {
    let mut text = match reply {
        Reply::Text(text) => text.clone(),
        Reply::Lines(lines) => lines.join("\n"),
        Reply::Rows(rows) => rows
            .iter()
            .map(|row| row.join(&FIELD_DELIMITER.to_string()))
            .collect::<Vec<_>>()
            .join("\n"),
        Reply::Ghosts(ghosts) => ghosts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n"),
    };
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

fn render_json<W: Write>(results: &DispatchResult<Reply>, stdout: &mut W) -> Result<(), AppError> {
    let document: Map<String, Value> = results
        .iter()
        .map(|(target, outcome)| {
            let entry = match outcome {
                Ok(reply) => json!({ "ok": reply }),
                Err(error) => json!({ "error": error.to_string() }),
            };
            (target.to_string(), entry)
        })
        .collect();
    serde_json::to_writer_pretty(&mut *stdout, &document).map_err(AppError::SerialiseOutput)?;
    stdout.write_all(b"\n").map_err(AppError::WriteOutput)?;
    stdout.flush().map_err(AppError::WriteOutput)
}
