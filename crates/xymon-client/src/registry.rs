//! Static description of the command surface.
//!
//! Front ends build their argument parsers from [`COMMANDS`] and hand the
//! collected string values back as [`Arguments`]; [`Command::parse`] turns
//! them into a typed [`Command`] after validating names, required values and
//! value kinds.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::color::Color;
use crate::command::{Command, Criteria, Lifetime, ScheduledJob, StatusReport, headline, now};
use crate::errors::ClientError;
use crate::target::Sender;

/// The kind of value a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Free text.
    Text,
    /// Signed integer.
    Integer,
    /// Status colour name.
    Color,
    /// Duration token such as `30m` or `-1`.
    Lifetime,
    /// Selection criteria, passed through verbatim.
    Criteria,
    /// Comma-separated field names.
    Fields,
}

impl ValueKind {
    /// Upper-case placeholder shown in usage text.
    #[must_use]
    pub const fn placeholder(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Color => "COLOR",
            Self::Lifetime => "DURATION",
            Self::Criteria => "CRITERIA",
            Self::Fields => "FIELDS",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.placeholder())
    }
}

/// Default applied when a parameter is not supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamDefault {
    /// The caller must supply a value.
    Required,
    /// The parameter is simply absent.
    Optional,
    /// The parameter takes this value.
    Value(&'static str),
}

/// One parameter of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    /// Parameter name, also used as the long CLI option.
    pub name: &'static str,
    /// Accepted value kind.
    pub kind: ValueKind,
    /// Behaviour when the parameter is omitted.
    pub default: ParamDefault,
}

impl ParamSpec {
    const fn required(name: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            kind,
            default: ParamDefault::Required,
        }
    }

    const fn optional(name: &'static str, kind: ValueKind) -> Self {
        Self {
            name,
            kind,
            default: ParamDefault::Optional,
        }
    }

    const fn defaulted(name: &'static str, kind: ValueKind, value: &'static str) -> Self {
        Self {
            name,
            kind,
            default: ParamDefault::Value(value),
        }
    }

    /// Returns true when the caller must supply the parameter.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        matches!(self.default, ParamDefault::Required)
    }
}

/// One command of the protocol surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// Protocol verb.
    pub name: &'static str,
    /// One-line description.
    pub summary: &'static str,
    /// Parameters in declaration order.
    pub params: &'static [ParamSpec],
    /// False for commands the client refuses with `NotSupported`.
    pub supported: bool,
}

impl CommandSpec {
    /// Looks up a parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        self.params.iter().find(|param| param.name == name)
    }
}

use ValueKind as K;

const HOST: ParamSpec = ParamSpec::required("hostname", K::Text);
const TEST: ParamSpec = ParamSpec::required("testname", K::Text);
const TEXT: ParamSpec = ParamSpec::defaulted("text", K::Text, "");
const FILENAME: ParamSpec = ParamSpec::required("filename", K::Text);
const CRITERIA: ParamSpec = ParamSpec::optional("criteria", K::Criteria);
const FIELDS: ParamSpec = ParamSpec::optional("fields", K::Fields);

/// Every command known to the client, sorted by name.
pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "client",
        summary: "send a client data message",
        params: &[
            HOST,
            ParamSpec::required("ostype", K::Text),
            ParamSpec::optional("collectorid", K::Text),
            ParamSpec::optional("hostclass", K::Text),
        ],
        supported: false,
    },
    CommandSpec {
        name: "clientlog",
        summary: "retrieve the last client data message of a host",
        params: &[HOST, ParamSpec::optional("sections", K::Text)],
        supported: false,
    },
    CommandSpec {
        name: "config",
        summary: "retrieve a server configuration file",
        params: &[FILENAME],
        supported: true,
    },
    CommandSpec {
        name: "data",
        summary: "send data for trend graphs",
        params: &[HOST, ParamSpec::required("dataname", K::Text), TEXT],
        supported: true,
    },
    CommandSpec {
        name: "disable",
        summary: "disable a test, or every test of a host with '*'",
        params: &[
            HOST,
            ParamSpec::defaulted("testname", K::Text, "*"),
            ParamSpec::defaulted("duration", K::Lifetime, Lifetime::UNTIL_OK),
            TEXT,
        ],
        supported: true,
    },
    CommandSpec {
        name: "download",
        summary: "download a file from the server",
        params: &[FILENAME],
        supported: true,
    },
    CommandSpec {
        name: "drop",
        summary: "remove all data stored about a host, or about one of its tests",
        params: &[HOST, ParamSpec::optional("testname", K::Text)],
        supported: true,
    },
    CommandSpec {
        name: "enable",
        summary: "re-enable a test that had been disabled",
        params: &[HOST, TEST],
        supported: true,
    },
    CommandSpec {
        name: "ghostlist",
        summary: "list ghost clients seen by the server",
        params: &[],
        supported: true,
    },
    CommandSpec {
        name: "hostinfo",
        summary: "retrieve host configuration entries",
        params: &[CRITERIA],
        supported: true,
    },
    CommandSpec {
        name: "modify",
        summary: "change the colour of a status from an external source",
        params: &[
            HOST,
            TEST,
            ParamSpec::required("color", K::Color),
            ParamSpec::required("source", K::Text),
            ParamSpec::required("cause", K::Text),
        ],
        supported: true,
    },
    CommandSpec {
        name: "notes",
        summary: "retrieve a notes file",
        params: &[FILENAME],
        supported: true,
    },
    CommandSpec {
        name: "notify",
        summary: "send a notification without changing the status",
        params: &[HOST, TEST, TEXT],
        supported: true,
    },
    CommandSpec {
        name: "ping",
        summary: "ping the server, which replies with its version",
        params: &[],
        supported: true,
    },
    CommandSpec {
        name: "pullclient",
        summary: "fetch client configuration for a pull client",
        params: &[],
        supported: false,
    },
    CommandSpec {
        name: "query",
        summary: "query the latest status reported for a test",
        params: &[HOST, TEST],
        supported: true,
    },
    CommandSpec {
        name: "rename",
        summary: "rename a host, or a test of a host",
        params: &[
            ParamSpec::required("old", K::Text),
            ParamSpec::required("new", K::Text),
            ParamSpec::optional("hostname", K::Text),
        ],
        supported: true,
    },
    CommandSpec {
        name: "schedule",
        summary: "schedule a command, or list scheduled commands",
        params: &[
            ParamSpec::optional("timestamp", K::Integer),
            ParamSpec::optional("command", K::Text),
        ],
        supported: true,
    },
    CommandSpec {
        name: "status",
        summary: "send a status report",
        params: &[
            HOST,
            TEST,
            ParamSpec::required("color", K::Color),
            TEXT,
            ParamSpec::optional("lifetime", K::Lifetime),
            ParamSpec::optional("group", K::Text),
        ],
        supported: true,
    },
    CommandSpec {
        name: "usermsg",
        summary: "retrieve a user message",
        params: &[ParamSpec::required("identifier", K::Text)],
        supported: true,
    },
    CommandSpec {
        name: "xymondboard",
        summary: "retrieve a summary of matching statuses",
        params: &[CRITERIA, FIELDS],
        supported: true,
    },
    CommandSpec {
        name: "xymondlog",
        summary: "retrieve the status log of a test",
        params: &[HOST, TEST],
        supported: true,
    },
    CommandSpec {
        name: "xymondxboard",
        summary: "retrieve the status board as XML",
        params: &[CRITERIA, FIELDS],
        supported: true,
    },
    CommandSpec {
        name: "xymondxlog",
        summary: "retrieve the status log of a test as XML",
        params: &[HOST, TEST],
        supported: true,
    },
];

/// Looks up a command by name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name == name)
}

/// Named string arguments for a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments(BTreeMap<String, String>);

impl Arguments {
    /// Creates an empty argument set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an argument, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds or replaces an argument.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Adds an argument only when it is not already present.
    pub fn insert_default(&mut self, name: &str, value: &str) {
        self.0
            .entry(name.to_owned())
            .or_insert_with(|| value.to_owned());
    }

    /// Returns the value of an argument.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Removes an argument and returns its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    /// Returns true when the argument is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Arguments
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

struct Values<'a> {
    spec: &'static CommandSpec,
    arguments: &'a Arguments,
}

impl<'a> Values<'a> {
    fn raw(&self, name: &'static str) -> Result<Option<&'a str>, ClientError> {
        if let Some(value) = self.arguments.get(name) {
            return Ok(Some(value));
        }
        match self.spec.param(name).map(|param| param.default) {
            Some(ParamDefault::Value(value)) => Ok(Some(value)),
            Some(ParamDefault::Required) => Err(ClientError::MissingArgument {
                command: self.spec.name,
                parameter: name,
            }),
            Some(ParamDefault::Optional) | None => Ok(None),
        }
    }

    fn text(&self, name: &'static str) -> Result<String, ClientError> {
        Ok(self.raw(name)?.unwrap_or_default().to_owned())
    }

    fn optional_text(&self, name: &'static str) -> Result<Option<String>, ClientError> {
        Ok(self
            .raw(name)?
            .filter(|value| !value.trim().is_empty())
            .map(str::to_owned))
    }

    fn parsed<T>(&self, name: &'static str) -> Result<Option<T>, ClientError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.raw(name)?
            .filter(|value| !value.trim().is_empty())
            .map(|value| {
                value
                    .trim()
                    .parse::<T>()
                    .map_err(|error| ClientError::InvalidArgument {
                        parameter: name,
                        value: value.to_owned(),
                        reason: error.to_string(),
                    })
            })
            .transpose()
    }

    fn required<T>(&self, name: &'static str) -> Result<T, ClientError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.parsed(name)?.ok_or(ClientError::MissingArgument {
            command: self.spec.name,
            parameter: name,
        })
    }

    fn color(&self, name: &'static str) -> Result<Color, ClientError> {
        let value = self.raw(name)?.unwrap_or_default();
        value
            .trim()
            .parse::<Color>()
            .map_err(|_| ClientError::InvalidArgument {
                parameter: name,
                value: value.to_owned(),
                reason: String::from("expected one of purple, blue, clear, green, yellow, red"),
            })
    }

    fn criteria(&self) -> Result<Option<Criteria>, ClientError> {
        Ok(self.optional_text("criteria")?.map(Criteria::Raw))
    }

    fn fields(&self) -> Result<Vec<String>, ClientError> {
        Ok(self
            .raw("fields")?
            .map(|fields| {
                fields
                    .split(',')
                    .map(str::trim)
                    .filter(|field| !field.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl Command {
    /// Builds a command from its name and string arguments.
    ///
    /// `sender` is used for the headline of status reports.
    ///
    /// # Errors
    ///
    /// Returns an argument-family [`ClientError`] for unknown commands or
    /// parameters, missing required values and malformed values, and
    /// [`ClientError::NotSupported`] for commands this client refuses.
    ///
    /// ```
    /// use xymon_client::{Arguments, Command, Sender};
    ///
    /// let arguments = Arguments::new().with("hostname", "web01");
    /// let command = Command::parse("disable", &arguments, &Sender::new("monitor"))?;
    /// assert_eq!(command.to_string(), "disable web01.* -1 ");
    /// # Ok::<(), xymon_client::ClientError>(())
    /// ```
    pub fn parse(name: &str, arguments: &Arguments, sender: &Sender) -> Result<Self, ClientError> {
        let spec = lookup(name).ok_or_else(|| ClientError::UnknownCommand(name.to_owned()))?;
        if let Some((unknown, _)) = arguments.iter().find(|(key, _)| spec.param(key).is_none()) {
            return Err(ClientError::UnknownParameter {
                command: spec.name,
                parameter: unknown.to_owned(),
            });
        }
        if !spec.supported {
            return Err(ClientError::NotSupported { command: spec.name });
        }
        build(&Values { spec, arguments }, sender)
    }
}

fn build(values: &Values<'_>, sender: &Sender) -> Result<Command, ClientError> {
    let command = match values.spec.name {
        "status" => Command::Status(StatusReport {
            hostname: values.text("hostname")?,
            testname: values.text("testname")?,
            color: values.color("color")?,
            headline: headline(sender, now()),
            text: values.text("text")?,
            lifetime: values.parsed("lifetime")?,
            group: values.optional_text("group")?,
        }),
        "notify" => Command::Notify {
            hostname: values.text("hostname")?,
            testname: values.text("testname")?,
            text: values.text("text")?,
        },
        "data" => Command::Data {
            hostname: values.text("hostname")?,
            dataname: values.text("dataname")?,
            text: values.text("text")?,
        },
        "disable" => Command::Disable {
            hostname: values.text("hostname")?,
            testname: values.text("testname")?,
            duration: values.required("duration")?,
            text: values.text("text")?,
        },
        "enable" => Command::Enable {
            hostname: values.text("hostname")?,
            testname: values.text("testname")?,
        },
        "query" => Command::Query {
            hostname: values.text("hostname")?,
            testname: values.text("testname")?,
        },
        "config" => Command::Config {
            filename: values.text("filename")?,
        },
        "drop" => Command::Drop {
            hostname: values.text("hostname")?,
            testname: values.optional_text("testname")?,
        },
        "rename" => Command::Rename {
            old: values.text("old")?,
            new: values.text("new")?,
            hostname: values.optional_text("hostname")?,
        },
        "xymondlog" => Command::XymondLog {
            hostname: values.text("hostname")?,
            testname: values.text("testname")?,
        },
        "xymondxlog" => Command::XymondXLog {
            hostname: values.text("hostname")?,
            testname: values.text("testname")?,
        },
        "xymondboard" => Command::XymondBoard {
            criteria: values.criteria()?,
            fields: values.fields()?,
        },
        "xymondxboard" => Command::XymondXBoard {
            criteria: values.criteria()?,
            fields: values.fields()?,
        },
        "hostinfo" => Command::HostInfo {
            criteria: values.criteria()?,
        },
        "download" => Command::Download {
            filename: values.text("filename")?,
        },
        "ping" => Command::Ping,
        "ghostlist" => Command::GhostList,
        "schedule" => {
            let timestamp = values.parsed::<i64>("timestamp")?;
            let command = values.optional_text("command")?;
            Command::Schedule {
                job: timestamp
                    .zip(command)
                    .map(|(timestamp, command)| ScheduledJob { timestamp, command }),
            }
        }
        "notes" => Command::Notes {
            filename: values.text("filename")?,
        },
        "usermsg" => Command::UserMsg {
            identifier: values.text("identifier")?,
        },
        "modify" => Command::Modify {
            hostname: values.text("hostname")?,
            testname: values.text("testname")?,
            color: values.color("color")?,
            source: values.text("source")?,
            cause: values.text("cause")?,
        },
        other => return Err(ClientError::UnknownCommand(other.to_owned())),
    };
    Ok(command)
}
