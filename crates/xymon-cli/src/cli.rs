//! Command-line grammar.
//!
//! Global options are derived with clap; one subcommand per entry of the
//! command registry is added at runtime, with one `--NAME` option per
//! parameter.

use std::ffi::OsString;

use clap::error::ErrorKind;
use clap::{Arg, ArgMatches, CommandFactory, FromArgMatches, Parser};
use xymon_client::{Arguments, COMMANDS, CommandSpec, ParamDefault, ParamSpec, lookup};

use crate::output::OutputFormat;

const CONFIG_HELP: &str = "\
Configuration flags must precede every other argument:
  --config-path PATH     read configuration from PATH
  --servers HOST[:PORT]  Xymon server, repeatable (default port 1984)
  --sender NAME          sender shown in status headlines
  --timeout-secs SECS    network timeout (default 3)
  --dispatch MODE        sequential or concurrent
  --log-filter FILTER    tracing filter (default info)
  --log-format FORMAT    compact or json

Each flag can also be set with an XYMON_* environment variable.";

#[derive(Parser, Debug)]
#[command(
    name = "xymon",
    about = "A Xymon client",
    version,
    disable_help_subcommand = true
)]
pub(crate) struct Cli {
    /// Logs the request instead of sending it.
    #[arg(short = 'n', long)]
    pub(crate) dry_run: bool,
    /// Controls how replies are rendered.
    #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
    pub(crate) output: OutputFormat,
}

/// A parsed command line.
#[derive(Debug)]
pub(crate) struct Invocation {
    pub(crate) cli: Cli,
    pub(crate) command: &'static str,
    pub(crate) arguments: Arguments,
}

/// Builds the full clap command, registry subcommands included.
pub(crate) fn command() -> clap::Command {
    Cli::command()
        .subcommand_required(true)
        .arg_required_else_help(true)
        .after_help(CONFIG_HELP)
        .subcommands(COMMANDS.iter().map(subcommand))
}

fn subcommand(spec: &'static CommandSpec) -> clap::Command {
    let about = if spec.supported {
        spec.summary.to_owned()
    } else {
        format!("{} (not supported)", spec.summary)
    };
    clap::Command::new(spec.name)
        .about(about)
        .args(spec.params.iter().map(argument))
}

fn argument(param: &'static ParamSpec) -> Arg {
    let arg = Arg::new(param.name)
        .long(param.name)
        .value_name(param.kind.placeholder());
    match param.default {
        ParamDefault::Required => arg.required(true).help("required"),
        ParamDefault::Optional => arg.help("optional"),
        ParamDefault::Value(value) => arg.help(format!("default: {value:?}")),
    }
}

/// Parses the command tokens that follow the configuration flags.
pub(crate) fn parse(args: Vec<OsString>) -> Result<Invocation, clap::Error> {
    let mut grammar = command();
    let matches = grammar.try_get_matches_from_mut(args)?;
    let cli = Cli::from_arg_matches(&matches)?;
    let Some((name, submatches)) = matches.subcommand() else {
        return Err(grammar.error(ErrorKind::MissingSubcommand, "a command is required"));
    };
    let Some(spec) = lookup(name) else {
        return Err(grammar.error(ErrorKind::InvalidSubcommand, format!("unknown command '{name}'")));
    };
    Ok(Invocation {
        cli,
        command: spec.name,
        arguments: collect_arguments(spec, submatches),
    })
}

fn collect_arguments(spec: &CommandSpec, matches: &ArgMatches) -> Arguments {
    spec.params
        .iter()
        .filter_map(|param| {
            matches
                .get_one::<String>(param.name)
                .map(|value| (param.name, value.clone()))
        })
        .collect()
}
