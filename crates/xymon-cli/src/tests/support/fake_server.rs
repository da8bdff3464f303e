//! A one-shot Xymon server on an ephemeral port.

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use xymon_client::Target;

/// Accepts a single connection, records the request and answers with a
/// canned reply. Gives up quietly when nobody connects within two seconds.
pub(crate) struct FakeServer {
    target: Target,
    request: Arc<Mutex<Option<String>>>,
    result: Arc<Mutex<Option<Result<()>>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeServer {
    pub(crate) fn spawn(reply: impl Into<String>) -> Result<Self> {
        let reply = reply.into();
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake server")?;
        listener
            .set_nonblocking(true)
            .context("fake server nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let request = Arc::new(Mutex::new(None));
        let result = Arc::new(Mutex::new(None));
        let request_clone = Arc::clone(&request);
        let result_clone = Arc::clone(&result);
        let handle = thread::spawn(move || {
            let outcome = Self::serve(&listener, &reply, &request_clone);
            if let Ok(mut guard) = result_clone.lock() {
                *guard = Some(outcome);
            }
        });
        Ok(Self {
            target: Target::new("127.0.0.1", port),
            request,
            result,
            handle: Some(handle),
        })
    }

    pub(crate) fn target(&self) -> &Target {
        &self.target
    }

    /// Waits for the server thread and returns the request it saw, if any.
    pub(crate) fn take_request(&mut self) -> Result<Option<String>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("fake server thread panicked"))?;
        }
        if let Some(outcome) = self
            .result
            .lock()
            .map_err(|error| anyhow!("lock fake server result: {error}"))?
            .take()
        {
            outcome.context("fake server failed")?;
        }
        let request = self
            .request
            .lock()
            .map_err(|error| anyhow!("lock request: {error}"))?;
        Ok(request.clone())
    }

    fn serve(
        listener: &TcpListener,
        reply: &str,
        request: &Arc<Mutex<Option<String>>>,
    ) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            match listener.accept() {
                Ok((stream, _)) => return Self::answer(stream, reply, request),
                Err(ref error)
                    if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
                {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(error) => return Err(error).context("accept connection"),
            }
        }
    }

    fn answer(
        mut stream: TcpStream,
        reply: &str,
        request: &Arc<Mutex<Option<String>>>,
    ) -> Result<()> {
        stream
            .set_nonblocking(false)
            .context("blocking client stream")?;
        let mut text = String::new();
        stream
            .read_to_string(&mut text)
            .context("read request until the client half-closes")?;
        *request
            .lock()
            .map_err(|error| anyhow!("lock request: {error}"))? = Some(text);
        stream.write_all(reply.as_bytes()).context("write reply")?;
        stream.flush().context("flush reply")
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A loopback target nothing listens on.
pub(crate) fn closed_target() -> Result<Target> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind listener for a closed port")?;
    let port = listener.local_addr().context("local addr")?.port();
    drop(listener);
    Ok(Target::new("127.0.0.1", port))
}
