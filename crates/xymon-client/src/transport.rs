//! Socket transport for the Xymon protocol.
//!
//! Every exchange opens a fresh TCP connection, writes one request, and
//! optionally reads the whole reply until the server closes its end. Xymon
//! only understands 7-bit text, so outgoing payloads are transcoded with
//! [`encode_payload`] and replies are decoded with [`decode_reply`].

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::errors::ClientError;
use crate::target::Target;

/// Connect, read, and write timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Whether a request waits for the server's reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplyMode {
    /// Half-close the connection after writing and read the reply to EOF.
    #[default]
    Await,
    /// Return an empty reply as soon as the request is written.
    Blind,
}

/// Moves one request to a server and returns its decoded reply.
pub trait Transport: Send + Sync {
    /// Sends `payload` to `target`.
    ///
    /// # Errors
    ///
    /// Returns a connection-family [`ClientError`] when the server cannot be
    /// reached or the exchange fails midway.
    fn exchange(
        &self,
        target: &Target,
        payload: &[u8],
        reply: ReplyMode,
    ) -> Result<String, ClientError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn exchange(
        &self,
        target: &Target,
        payload: &[u8],
        reply: ReplyMode,
    ) -> Result<String, ClientError> {
        (**self).exchange(target, payload, reply)
    }
}

/// Plain TCP transport with a per-operation timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpTransport {
    timeout: Duration,
}

impl TcpTransport {
    /// Builds a transport whose connect, read, and write calls are bounded by `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// The configured timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    fn connect(&self, target: &Target) -> Result<TcpStream, ClientError> {
        let addresses = resolve_addresses(target).map_err(|source| ClientError::Resolve {
            target: target.clone(),
            source,
        })?;
        let stream =
            connect_any(addresses, self.timeout).map_err(|source| ClientError::Connect {
                target: target.clone(),
                source,
            })?;
        stream
            .set_read_timeout(Some(self.timeout))
            .and_then(|()| stream.set_write_timeout(Some(self.timeout)))
            .map_err(|source| ClientError::Connect {
                target: target.clone(),
                source,
            })?;
        Ok(stream)
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Transport for TcpTransport {
    fn exchange(
        &self,
        target: &Target,
        payload: &[u8],
        reply: ReplyMode,
    ) -> Result<String, ClientError> {
        let mut stream = self.connect(target)?;
        let wire = encode_payload(payload);
        debug!(
            target: TRANSPORT_TARGET,
            server = %target,
            bytes = wire.len(),
            "sending request"
        );
        stream
            .write_all(&wire)
            .and_then(|()| stream.flush())
            .map_err(|source| ClientError::Send {
                target: target.clone(),
                source,
            })?;

        if reply == ReplyMode::Blind {
            return Ok(String::new());
        }

        stream
            .shutdown(Shutdown::Write)
            .map_err(|source| ClientError::Send {
                target: target.clone(),
                source,
            })?;
        let mut received = Vec::new();
        stream
            .read_to_end(&mut received)
            .map_err(|source| ClientError::Receive {
                target: target.clone(),
                source,
            })?;
        debug!(
            target: TRANSPORT_TARGET,
            server = %target,
            bytes = received.len(),
            "received reply"
        );
        Ok(decode_reply(&received))
    }
}

fn resolve_addresses(target: &Target) -> io::Result<Vec<SocketAddr>> {
    let addresses: Vec<SocketAddr> = (target.host(), target.port()).to_socket_addrs()?.collect();
    if addresses.is_empty() {
        return Err(no_addresses());
    }
    Ok(addresses)
}

/// Tries every address in order and keeps the first connection.
///
/// When all attempts fail the error of the last one is returned.
fn connect_any<I>(addresses: I, timeout: Duration) -> io::Result<TcpStream>
where
    I: IntoIterator<Item = SocketAddr>,
{
    let mut last_error = None;
    for address in addresses {
        match TcpStream::connect_timeout(&address, timeout) {
            Ok(stream) => return Ok(stream),
            Err(error) => {
                debug!(
                    target: TRANSPORT_TARGET,
                    %address,
                    error = %error,
                    "connect attempt failed"
                );
                last_error = Some(error);
            }
        }
    }
    Err(last_error.unwrap_or_else(no_addresses))
}

fn no_addresses() -> io::Error {
    io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses")
}

/// Transcodes a payload into 7-bit wire form.
///
/// Invalid UTF-8 sequences are dropped, then every non-ASCII character is
/// replaced by its decimal numeric character reference.
///
/// ```
/// use xymon_client::encode_payload;
///
/// assert_eq!(encode_payload("café".as_bytes()), b"caf&#233;".to_vec());
/// ```
#[must_use]
pub fn encode_payload(payload: &[u8]) -> Vec<u8> {
    let mut wire = String::with_capacity(payload.len());
    for chunk in payload.utf8_chunks() {
        for character in chunk.valid().chars() {
            if character.is_ascii() {
                wire.push(character);
            } else {
                wire.push_str("&#");
                wire.push_str(&u32::from(character).to_string());
                wire.push(';');
            }
        }
    }
    wire.into_bytes()
}

/// Decodes a reply as ASCII, replacing every other byte with U+FFFD.
#[must_use]
pub fn decode_reply(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&byte| {
            if byte.is_ascii() {
                char::from(byte)
            } else {
                char::REPLACEMENT_CHARACTER
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Instant;

    use rstest::rstest;

    #[rstest]
    #[case(b"status h.t green".to_vec(), "status h.t green")]
    #[case("Ünïcode".as_bytes().to_vec(), "&#220;n&#239;code")]
    #[case("ping ✓".as_bytes().to_vec(), "ping &#10003;")]
    #[case(vec![b'o', b'k', 0xff, 0xfe, b'!'], "ok!")]
    fn encodes_payload_as_ascii(#[case] payload: Vec<u8>, #[case] expected: &str) {
        assert_eq!(encode_payload(&payload), expected.as_bytes());
    }

    #[test]
    fn decodes_non_ascii_bytes_as_placeholder() {
        assert_eq!(decode_reply(b"ok\xe9!"), "ok\u{fffd}!");
    }

    #[test]
    fn echoed_payload_keeps_visible_text() {
        let wire = encode_payload("notify h.t déjà vu".as_bytes());
        assert_eq!(decode_reply(&wire), "notify h.t d&#233;j&#224; vu");
    }

    fn echo_server() -> (Target, thread::JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind echo server");
        let port = listener.local_addr().expect("local addr").port();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept connection");
            let mut request = Vec::new();
            stream.read_to_end(&mut request).expect("read request");
            // The blind client may already be gone.
            let _ = stream.write_all(b"xymond 4.3.30\n");
            request
        });
        (Target::new("127.0.0.1", port), handle)
    }

    #[test]
    fn exchange_reads_reply_until_close() {
        let (target, server) = echo_server();
        let reply = TcpTransport::default()
            .exchange(&target, b"ping", ReplyMode::Await)
            .expect("exchange succeeds");
        assert_eq!(reply, "xymond 4.3.30\n");
        assert_eq!(server.join().expect("join server"), b"ping");
    }

    #[test]
    fn blind_exchange_returns_empty_reply() {
        let (target, server) = echo_server();
        let reply = TcpTransport::default()
            .exchange(&target, "status h.t green é".as_bytes(), ReplyMode::Blind)
            .expect("exchange succeeds");
        assert!(reply.is_empty());
        assert_eq!(
            server.join().expect("join server"),
            b"status h.t green &#233;"
        );
    }

    #[test]
    fn refused_connection_is_a_connection_error() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let port = listener.local_addr().expect("local addr").port();
        drop(listener);

        let error = TcpTransport::new(Duration::from_millis(500))
            .exchange(&Target::new("127.0.0.1", port), b"ping", ReplyMode::Await)
            .expect_err("connection must fail");
        assert!(error.is_connection_error());
        assert!(matches!(error, ClientError::Connect { .. }));
    }

    fn closed_address() -> SocketAddr {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        listener.local_addr().expect("local addr")
    }

    #[test]
    fn connect_falls_through_to_a_later_address() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let live = listener.local_addr().expect("local addr");

        let stream = connect_any([closed_address(), live], Duration::from_millis(500))
            .expect("second address accepts");
        assert_eq!(stream.peer_addr().expect("peer addr"), live);
    }

    #[test]
    fn connect_reports_the_last_failure() {
        let error = connect_any(
            [closed_address(), closed_address()],
            Duration::from_millis(500),
        )
        .expect_err("no address accepts");
        assert_eq!(error.kind(), io::ErrorKind::ConnectionRefused);
    }

    #[test]
    fn connect_without_addresses_is_unavailable() {
        let error = connect_any(Vec::<SocketAddr>::new(), Duration::from_millis(500))
            .expect_err("nothing to try");
        assert_eq!(error.kind(), io::ErrorKind::AddrNotAvailable);
    }

    #[test]
    fn silent_server_times_out_on_receive() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind listener");
        let port = listener.local_addr().expect("local addr").port();
        let (release, hold) = mpsc::channel::<()>();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept connection");
            let _ = hold.recv();
            drop(stream);
        });

        let started = Instant::now();
        let error = TcpTransport::new(Duration::from_millis(200))
            .exchange(&Target::new("127.0.0.1", port), b"query h.t", ReplyMode::Await)
            .expect_err("reply never arrives");
        let elapsed = started.elapsed();

        release.send(()).expect("release server");
        server.join().expect("join server");
        assert!(matches!(error, ClientError::Receive { .. }), "{error}");
        assert!(error.is_connection_error());
        assert!(elapsed < Duration::from_secs(2), "waited {elapsed:?}");
    }
}
