//! Single-target client.

use tracing::debug;

use crate::color::Color;
use crate::command::{Command, Criteria, Lifetime, ScheduledJob, StatusReport, headline, now};
use crate::errors::ClientError;
use crate::registry::Arguments;
use crate::reply::{self, GhostRecord, Reply};
use crate::target::{Sender, Target};
use crate::transport::{ReplyMode, TcpTransport, Transport};

const CLIENT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::client");

/// Something that runs registry-named commands.
///
/// Implemented by [`Client`] for one server and by
/// [`Dispatcher`](crate::Dispatcher) for many, so helpers such as
/// [`MessageBuffer`](crate::MessageBuffer) work with either.
pub trait Execute {
    /// Result of one successful call.
    type Output;

    /// Parses `arguments` for the command `name` and runs it.
    ///
    /// # Errors
    ///
    /// Returns an argument-family [`ClientError`] when the arguments do not
    /// describe a valid command. Implementors may also surface transport
    /// failures here.
    fn call(&self, name: &str, arguments: &Arguments) -> Result<Self::Output, ClientError>;
}

/// A client bound to one Xymon server.
///
/// Every request opens a new connection; the client holds no other state.
///
/// ```no_run
/// use xymon_client::{Client, Color, Target};
///
/// let client = Client::new("xymon.example.org".parse::<Target>()?);
/// client.status("web01", "http", Color::Green, "all good")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct Client<T = TcpTransport> {
    target: Target,
    sender: Sender,
    reply_mode: ReplyMode,
    transport: T,
}

impl Client<TcpTransport> {
    /// Builds a TCP client for `target` with the default timeout.
    #[must_use]
    pub fn new(target: Target) -> Self {
        Self::with_transport(target, TcpTransport::default())
    }
}

impl<T: Transport> Client<T> {
    /// Builds a client that talks to `target` through `transport`.
    #[must_use]
    pub fn with_transport(target: Target, transport: T) -> Self {
        Self {
            target,
            sender: Sender::default(),
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

    /// Sets whether report commands wait for the server's answer.
    ///
    /// Queries always wait; a blind client only skips reading the (empty)
    /// reply of commands such as `status` or `notify`.
    #[must_use]
    pub const fn with_reply_mode(mut self, reply_mode: ReplyMode) -> Self {
        self.reply_mode = reply_mode;
        self
    }

    /// The server this client talks to.
    #[must_use]
    pub const fn target(&self) -> &Target {
        &self.target
    }

    /// The sender named in status headlines.
    #[must_use]
    pub const fn sender(&self) -> &Sender {
        &self.sender
    }

    /// Sends a raw payload.
    ///
    /// # Errors
    ///
    /// Propagates transport failures unchanged.
    pub fn send(&self, payload: &[u8], reply: ReplyMode) -> Result<String, ClientError> {
        self.transport.exchange(&self.target, payload, reply)
    }

    /// Runs a command and decodes its reply according to the verb.
    ///
    /// # Errors
    ///
    /// Propagates transport failures unchanged.
    pub fn execute(&self, command: &Command) -> Result<Reply, ClientError> {
        let text = self.request(command)?;
        let reply = match command {
            Command::XymondBoard { fields, .. } if !fields.is_empty() => {
                Reply::Rows(reply::rows(&text))
            }
            Command::XymondBoard { .. } => Reply::Lines(reply::lines(&text)),
            Command::HostInfo { .. } => Reply::Rows(reply::rows(&text)),
            Command::GhostList => Reply::Ghosts(reply::ghosts(&text)),
            _ => Reply::Text(text),
        };
        Ok(reply)
    }

    /// Parses a registry-named command and runs it.
    ///
    /// # Errors
    ///
    /// Returns argument errors from [`Command::parse`] and transport failures.
    pub fn call(&self, name: &str, arguments: &Arguments) -> Result<Reply, ClientError> {
        let command = Command::parse(name, arguments, &self.sender)?;
        self.execute(&command)
    }

    fn request(&self, command: &Command) -> Result<String, ClientError> {
        let mode = if is_report(command) {
            self.reply_mode
        } else {
            ReplyMode::Await
        };
        debug!(
            target: CLIENT_TARGET,
            server = %self.target,
            command = command.verb(),
            "executing command"
        );
        self.send(&command.encode(), mode)
    }

    /// Builds a status report stamped with this client's sender and the current time.
    #[must_use]
    pub fn report(&self, hostname: &str, testname: &str, color: Color, text: &str) -> StatusReport {
        StatusReport {
            hostname: hostname.to_owned(),
            testname: testname.to_owned(),
            color,
            headline: headline(&self.sender, now()),
            text: text.to_owned(),
            lifetime: None,
            group: None,
        }
    }

    /// Asks the server for its version.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn ping(&self) -> Result<String, ClientError> {
        self.request(&Command::Ping)
    }

    /// Reports a status with no lifetime or group modifier.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn status(
        &self,
        hostname: &str,
        testname: &str,
        color: Color,
        text: &str,
    ) -> Result<String, ClientError> {
        self.post_status(self.report(hostname, testname, color, text))
    }

    /// Sends a prepared status report.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn post_status(&self, report: StatusReport) -> Result<String, ClientError> {
        self.request(&Command::Status(report))
    }

    /// Sends a notification without changing the status.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn notify(&self, hostname: &str, testname: &str, text: &str) -> Result<String, ClientError> {
        self.request(&Command::Notify {
            hostname: hostname.to_owned(),
            testname: testname.to_owned(),
            text: text.to_owned(),
        })
    }

    /// Sends trend data.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn data(&self, hostname: &str, dataname: &str, text: &str) -> Result<String, ClientError> {
        self.request(&Command::Data {
            hostname: hostname.to_owned(),
            dataname: dataname.to_owned(),
            text: text.to_owned(),
        })
    }

    /// Disables a test, or every test of the host when `testname` is `*`.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn disable(
        &self,
        hostname: &str,
        testname: &str,
        duration: Lifetime,
        text: &str,
    ) -> Result<String, ClientError> {
        self.request(&Command::Disable {
            hostname: hostname.to_owned(),
            testname: testname.to_owned(),
            duration,
            text: text.to_owned(),
        })
    }

    /// Re-enables a disabled test.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn enable(&self, hostname: &str, testname: &str) -> Result<String, ClientError> {
        self.request(&Command::Enable {
            hostname: hostname.to_owned(),
            testname: testname.to_owned(),
        })
    }

    /// Queries the latest status of a test.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn query(&self, hostname: &str, testname: &str) -> Result<String, ClientError> {
        self.request(&Command::Query {
            hostname: hostname.to_owned(),
            testname: testname.to_owned(),
        })
    }

    /// Retrieves a server configuration file.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn config(&self, filename: &str) -> Result<String, ClientError> {
        self.request(&Command::Config {
            filename: filename.to_owned(),
        })
    }

    /// Drops stored data for a host, or for one test of it.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn drop(&self, hostname: &str, testname: Option<&str>) -> Result<String, ClientError> {
        self.request(&Command::Drop {
            hostname: hostname.to_owned(),
            testname: testname.map(str::to_owned),
        })
    }

    /// Renames a host, or a test of `hostname` when given.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn rename(
        &self,
        old: &str,
        new: &str,
        hostname: Option<&str>,
    ) -> Result<String, ClientError> {
        self.request(&Command::Rename {
            old: old.to_owned(),
            new: new.to_owned(),
            hostname: hostname.map(str::to_owned),
        })
    }

    /// Retrieves the status log of a test.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn xymondlog(&self, hostname: &str, testname: &str) -> Result<String, ClientError> {
        self.request(&Command::XymondLog {
            hostname: hostname.to_owned(),
            testname: testname.to_owned(),
        })
    }

    /// Retrieves the status log of a test as XML.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn xymondxlog(&self, hostname: &str, testname: &str) -> Result<String, ClientError> {
        self.request(&Command::XymondXLog {
            hostname: hostname.to_owned(),
            testname: testname.to_owned(),
        })
    }

    /// Retrieves a board summary: rows when `fields` are requested, lines otherwise.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn xymondboard(
        &self,
        criteria: Option<Criteria>,
        fields: &[&str],
    ) -> Result<Reply, ClientError> {
        self.execute(&Command::XymondBoard {
            criteria,
            fields: fields.iter().map(|field| (*field).to_owned()).collect(),
        })
    }

    /// Retrieves the board as XML.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn xymondxboard(
        &self,
        criteria: Option<Criteria>,
        fields: &[&str],
    ) -> Result<String, ClientError> {
        self.request(&Command::XymondXBoard {
            criteria,
            fields: fields.iter().map(|field| (*field).to_owned()).collect(),
        })
    }

    /// Retrieves host configuration rows.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn hostinfo(&self, criteria: Option<Criteria>) -> Result<Vec<Vec<String>>, ClientError> {
        let text = self.request(&Command::HostInfo { criteria })?;
        Ok(reply::rows(&text))
    }

    /// Downloads a file from the server.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn download(&self, filename: &str) -> Result<String, ClientError> {
        self.request(&Command::Download {
            filename: filename.to_owned(),
        })
    }

    /// Lists ghost clients, skipping malformed lines.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn ghostlist(&self) -> Result<Vec<GhostRecord>, ClientError> {
        let text = self.request(&Command::GhostList)?;
        Ok(reply::ghosts(&text))
    }

    /// Schedules a job, or lists scheduled jobs when `job` is `None`.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn schedule(&self, job: Option<ScheduledJob>) -> Result<String, ClientError> {
        self.request(&Command::Schedule { job })
    }

    /// Retrieves a notes file.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn notes(&self, filename: &str) -> Result<String, ClientError> {
        self.request(&Command::Notes {
            filename: filename.to_owned(),
        })
    }

    /// Retrieves a user message.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn usermsg(&self, identifier: &str) -> Result<String, ClientError> {
        self.request(&Command::UserMsg {
            identifier: identifier.to_owned(),
        })
    }

    /// Changes the colour of a status on behalf of an external source.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub fn modify(
        &self,
        hostname: &str,
        testname: &str,
        color: Color,
        source: &str,
        cause: &str,
    ) -> Result<String, ClientError> {
        self.request(&Command::Modify {
            hostname: hostname.to_owned(),
            testname: testname.to_owned(),
            color,
            source: source.to_owned(),
            cause: cause.to_owned(),
        })
    }

    /// Client data messages are not implemented.
    ///
    /// # Errors
    ///
    /// Always returns [`ClientError::NotSupported`].
    pub const fn client(&self, _hostname: &str, _ostype: &str) -> Result<String, ClientError> {
        Err(ClientError::NotSupported { command: "client" })
    }

    /// Client log retrieval is not implemented.
    ///
    /// # Errors
    ///
    /// Always returns [`ClientError::NotSupported`].
    pub const fn clientlog(&self, _hostname: &str) -> Result<String, ClientError> {
        Err(ClientError::NotSupported {
            command: "clientlog",
        })
    }

    /// Pull-client configuration is not implemented.
    ///
    /// # Errors
    ///
    /// Always returns [`ClientError::NotSupported`].
    pub const fn pullclient(&self) -> Result<String, ClientError> {
        Err(ClientError::NotSupported {
            command: "pullclient",
        })
    }
}

impl<T: Transport> Execute for Client<T> {
    type Output = Reply;

    fn call(&self, name: &str, arguments: &Arguments) -> Result<Reply, ClientError> {
        Self::call(self, name, arguments)
    }
}

/// Commands whose reply carries no information.
const fn is_report(command: &Command) -> bool {
    match command {
        Command::Status(_)
        | Command::Notify { .. }
        | Command::Data { .. }
        | Command::Disable { .. }
        | Command::Enable { .. }
        | Command::Drop { .. }
        | Command::Rename { .. }
        | Command::Modify { .. } => true,
        Command::Schedule { job } => job.is_some(),
        _ => false,
    }
}
