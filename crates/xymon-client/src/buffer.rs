//! Accumulating status messages before sending them.
//!
//! [`MessageBuffer`] collects text fragments that may carry inline colour
//! markers such as `&red`, then flushes them as one `status`, `notify` or
//! `data` call. It also fills in a default host and test for the commands
//! that take them.

use std::ops::AddAssign;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::client::Execute;
use crate::color::Color;
use crate::errors::ClientError;
use crate::registry::{self, Arguments};

#[expect(clippy::expect_used, reason = "the pattern is a literal")]
static COLOR_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(green|yellow|red|clear)\b").expect("colour marker pattern compiles")
});

/// How a command picks up the buffer's defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Default hostname only.
    Host,
    /// Default hostname and testname.
    HostTest,
    /// Defaults plus the buffered text.
    HostTestText,
    /// Defaults, buffered text and inferred colour.
    Status,
    /// Passed through untouched.
    PassThrough,
}

fn scope(name: &str) -> Scope {
    match name {
        "rename" | "client" | "clientlog" => Scope::Host,
        "disable" | "enable" | "query" | "drop" | "xymondlog" | "xymondxlog" | "modify" => {
            Scope::HostTest
        }
        "notify" | "data" => Scope::HostTestText,
        "status" => Scope::Status,
        _ => Scope::PassThrough,
    }
}

/// Returns the most severe colour marker in `text`, or `clear` when there is none.
///
/// ```
/// use xymon_client::{Color, inline_color};
///
/// assert_eq!(inline_color("&green disk\n&yellow load\n"), Color::Yellow);
/// assert_eq!(inline_color("&redder is not a marker"), Color::Clear);
/// ```
#[must_use]
pub fn inline_color(text: &str) -> Color {
    let markers = COLOR_MARKER
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .filter_map(|marker| marker.as_str().parse::<Color>().ok());
    Color::most_severe(markers).unwrap_or(Color::Clear)
}

/// A text buffer bound to a client or dispatcher with default host and test names.
///
/// ```no_run
/// use xymon_client::{Arguments, Client, MessageBuffer, Target};
///
/// let client = Client::new(Target::new("xymon.example.org", 1984));
/// let mut buffer = MessageBuffer::new(client)
///     .with_hostname("www.example.org")
///     .with_testname("http");
/// buffer += "&red something went wrong\n";
/// buffer.status("but it is not that bad", Arguments::new().with("color", "yellow"))?;
/// # Ok::<(), xymon_client::ClientError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MessageBuffer<E> {
    executor: E,
    hostname: Option<String>,
    testname: Option<String>,
    text: String,
}

impl<E: Execute> MessageBuffer<E> {
    /// Wraps `executor` with no defaults and an empty buffer.
    pub const fn new(executor: E) -> Self {
        Self {
            executor,
            hostname: None,
            testname: None,
            text: String::new(),
        }
    }

    /// Sets the default hostname.
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into()).filter(|name: &String| !name.is_empty());
        self
    }

    /// Sets the default testname.
    #[must_use]
    pub fn with_testname(mut self, testname: impl Into<String>) -> Self {
        self.testname = Some(testname.into()).filter(|name: &String| !name.is_empty());
        self
    }

    /// The wrapped client or dispatcher.
    pub const fn executor(&self) -> &E {
        &self.executor
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Appends a fragment without sending anything.
    pub fn append(&mut self, fragment: &str) {
        self.text.push_str(fragment);
    }

    /// Most severe colour marker in the buffer, or `clear`.
    pub fn color(&self) -> Color {
        inline_color(&self.text)
    }

    /// Flushes the buffer as a status report.
    ///
    /// The report text is the buffer, then `message`, then any `text`
    /// override. Without a `color` override the colour is inferred from the
    /// markers in that text. The buffer is empty afterwards, whatever the
    /// outcome.
    ///
    /// # Errors
    ///
    /// Returns whatever the wrapped executor returns.
    pub fn status(&mut self, message: &str, overrides: Arguments) -> Result<E::Output, ClientError> {
        let arguments = self.merge("status", Scope::Status, message, overrides);
        self.executor.call("status", &arguments)
    }

    /// Runs a registry-named command, filling in defaults according to its scope.
    ///
    /// `notify` and `data` consume the buffer like [`status`](Self::status)
    /// but keep the colour untouched. Commands with no scope pass through
    /// unchanged. Explicit overrides always win over defaults.
    ///
    /// # Errors
    ///
    /// Returns whatever the wrapped executor returns.
    pub fn call(&mut self, name: &str, overrides: Arguments) -> Result<E::Output, ClientError> {
        let arguments = self.merge(name, scope(name), "", overrides);
        self.executor.call(name, &arguments)
    }

    fn merge(&mut self, name: &str, scope: Scope, message: &str, overrides: Arguments) -> Arguments {
        let mut arguments = overrides;
        match scope {
            Scope::PassThrough => return arguments,
            Scope::Host => self.default_into(name, &mut arguments, "hostname"),
            Scope::HostTest | Scope::HostTestText | Scope::Status => {
                self.default_into(name, &mut arguments, "hostname");
                self.default_into(name, &mut arguments, "testname");
            }
        }
        if matches!(scope, Scope::HostTestText | Scope::Status) {
            let mut text = std::mem::take(&mut self.text);
            text.push_str(message);
            if let Some(extra) = arguments.get("text") {
                text.push_str(extra);
            }
            if scope == Scope::Status && !arguments.contains("color") {
                arguments.insert("color", inline_color(&text).as_str());
            }
            arguments.insert("text", text);
        }
        arguments
    }

    /// Inserts a default only when the command takes that parameter.
    fn default_into(&self, name: &str, arguments: &mut Arguments, parameter: &str) {
        let value = match parameter {
            "hostname" => self.hostname.as_deref(),
            _ => self.testname.as_deref(),
        };
        let accepts = registry::lookup(name).is_some_and(|spec| spec.param(parameter).is_some());
        if let Some(value) = value.filter(|_| accepts) {
            arguments.insert_default(parameter, value);
        }
    }
}

impl<E: Execute> AddAssign<&str> for MessageBuffer<E> {
    fn add_assign(&mut self, fragment: &str) {
        self.append(fragment);
    }
}
