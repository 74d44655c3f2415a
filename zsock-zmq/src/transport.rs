//! libzmq transport adapter.

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use zsock_core::socket_type::SocketType;
use zsock_core::transport::{Handle, OptionName, OptionValue, SocketOption, TransportAdapter};

use crate::{context, rc};

/// Error numbers only libzmq defines; the OS has no text for them.
const ZMQ_ONLY_ERRORS: [zmq::Error; 4] = [
    zmq::Error::EFSM,
    zmq::Error::ENOCOMPATPROTO,
    zmq::Error::ETERM,
    zmq::Error::EMTHREAD,
];

/// Default linger applied to every new socket
const DEFAULT_LINGER: Duration = Duration::from_secs(1);

/// Longest a blocked send holds the socket lock before letting a receive in
const SEND_SLICE: Duration = Duration::from_millis(50);

/// Process-wide transport used by `ZmqTransport::shared`
static SHARED_TRANSPORT: once_cell::sync::Lazy<Arc<ZmqTransport>> =
    once_cell::sync::Lazy::new(|| Arc::new(ZmqTransport::new()));

/// Text for a transport return code. Accepts both `-errno` and `errno`.
pub fn describe_error(code: i32) -> String {
    let errno = code.checked_abs().unwrap_or(i32::MAX);
    if let Some(err) = ZMQ_ONLY_ERRORS.iter().find(|err| err.to_raw() == errno) {
        return err.message().to_string();
    }
    let text = io::Error::from_raw_os_error(errno).to_string();
    match text.strip_suffix(&format!(" (os error {errno})")) {
        Some(message) => message.to_string(),
        None => text,
    }
}

fn zmq_kind(socket_type: SocketType) -> zmq::SocketType {
    match socket_type {
        SocketType::Pair => zmq::SocketType::PAIR,
        SocketType::Pub => zmq::SocketType::PUB,
        SocketType::Sub => zmq::SocketType::SUB,
        SocketType::Req => zmq::SocketType::REQ,
        SocketType::Rep => zmq::SocketType::REP,
        SocketType::Dealer => zmq::SocketType::DEALER,
        SocketType::Router => zmq::SocketType::ROUTER,
        SocketType::Pull => zmq::SocketType::PULL,
        SocketType::Push => zmq::SocketType::PUSH,
        SocketType::XPub => zmq::SocketType::XPUB,
        SocketType::XSub => zmq::SocketType::XSUB,
        SocketType::Stream => zmq::SocketType::STREAM,
    }
}

/// libzmq linger value in milliseconds; `-1` waits forever.
fn linger_ms(linger: Option<Duration>) -> i32 {
    linger.map_or(-1, |d| i32::try_from(d.as_millis()).unwrap_or(i32::MAX))
}

fn poll_ms(timeout: Duration) -> i64 {
    i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX)
}

/// TCP port of a resolved endpoint, `0` for other transports.
fn port_of(endpoint: &str) -> i32 {
    endpoint
        .strip_prefix("tcp://")
        .and_then(|rest| rest.rsplit(':').next())
        .and_then(|port| port.parse::<u16>().ok())
        .map_or(0, i32::from)
}

/// A native socket and the context it was created from.
///
/// Field order matters: the socket closes before the context reference
/// is released.
struct Entry {
    socket: zmq::Socket,
    kind: SocketType,
    _context: Arc<zmq::Context>,
}

/// `TransportAdapter` over libzmq.
///
/// Native sockets are not thread-safe, so each one sits behind its own
/// mutex. Neither a receive nor a send holds that mutex for longer than one
/// poll timeout, so a send waiting for a peer never starves the receive side
/// and a destroyed handle is noticed within one slice.
///
/// Failures are reported as `-errno`.
pub struct ZmqTransport {
    sockets: DashMap<Handle, Arc<Mutex<Entry>>>,
    next_handle: AtomicU64,
    linger: Option<Duration>,
    send_timeout: Option<Duration>,
}

impl Default for ZmqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ZmqTransport {
    pub fn new() -> Self {
        Self {
            sockets: DashMap::new(),
            next_handle: AtomicU64::new(1),
            linger: Some(DEFAULT_LINGER),
            send_timeout: None,
        }
    }

    /// Process-wide transport instance.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED_TRANSPORT)
    }

    /// Linger applied to sockets created from now on. `None` waits forever
    /// for pending messages when the last socket closes.
    pub fn with_linger(mut self, linger: Option<Duration>) -> Self {
        self.linger = linger;
        self
    }

    /// Give up on a send that cannot be queued within `timeout`, failing
    /// with `-EAGAIN`. `None` (the default) waits until a peer accepts it or
    /// the socket is destroyed.
    pub fn with_send_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Number of live native sockets.
    pub fn socket_count(&self) -> usize {
        self.sockets.len()
    }

    /// Run `f` with exclusive access to the socket entry.
    fn with_entry<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&Entry) -> Result<R, i32>,
    ) -> Result<R, i32> {
        let entry = self
            .sockets
            .get(&handle)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| rc(zmq::Error::ENOTSOCK))?;
        let guard = entry.lock();
        f(&guard)
    }

    /// Run `f` with exclusive access to the native socket.
    fn with_socket<R>(
        &self,
        handle: Handle,
        f: impl FnOnce(&zmq::Socket) -> Result<R, i32>,
    ) -> Result<R, i32> {
        self.with_entry(handle, |entry| f(&entry.socket))
    }

    fn status(result: Result<i32, i32>) -> i32 {
        result.unwrap_or_else(|code| code)
    }
}

impl TransportAdapter for ZmqTransport {
    fn create_socket(&self, socket_type: SocketType) -> Result<Handle, i32> {
        let context = context::acquire();
        let socket = context.socket(zmq_kind(socket_type)).map_err(rc)?;
        socket.set_linger(linger_ms(self.linger)).map_err(rc)?;

        let handle = Handle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.sockets.insert(
            handle,
            Arc::new(Mutex::new(Entry {
                socket,
                kind: socket_type,
                _context: context,
            })),
        );
        debug!(%handle, %socket_type, "[zmq] socket created");
        Ok(handle)
    }

    fn destroy(&self, handle: Handle) {
        if self.sockets.remove(&handle).is_some() {
            debug!(%handle, "[zmq] socket released");
        } else {
            warn!(%handle, "[zmq] destroy on unknown handle");
        }
    }

    fn bind(&self, handle: Handle, address: &str) -> i32 {
        Self::status(self.with_socket(handle, |socket| {
            socket.bind(address).map_err(rc)?;
            let port = match socket.get_last_endpoint() {
                Ok(Ok(endpoint)) => port_of(&endpoint),
                _ => 0,
            };
            Ok(port)
        }))
    }

    fn connect(&self, handle: Handle, address: &str) -> i32 {
        Self::status(self.with_socket(handle, |socket| {
            socket.connect(address).map_err(rc)?;
            Ok(0)
        }))
    }

    fn unbind(&self, handle: Handle, address: &str) -> i32 {
        Self::status(self.with_socket(handle, |socket| {
            socket.unbind(address).map_err(rc)?;
            Ok(0)
        }))
    }

    fn recv(&self, handle: Handle, timeout: Option<Duration>) -> Result<Option<Bytes>, i32> {
        self.with_socket(handle, |socket| {
            let timeout_ms = timeout.map_or(-1, poll_ms);
            if socket.poll(zmq::POLLIN, timeout_ms).map_err(rc)? == 0 {
                return Ok(None);
            }
            match socket.recv_bytes(zmq::DONTWAIT) {
                Ok(bytes) => {
                    trace!(%handle, len = bytes.len(), "[zmq] received");
                    Ok(Some(Bytes::from(bytes)))
                }
                Err(zmq::Error::EAGAIN) => Ok(None),
                Err(e) => Err(rc(e)),
            }
        })
    }

    fn send(&self, handle: Handle, payload: &[u8]) -> i32 {
        let deadline = self.send_timeout.map(|timeout| Instant::now() + timeout);
        loop {
            let slice = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        debug!(%handle, "[zmq] send timed out");
                        return rc(zmq::Error::EAGAIN);
                    }
                    left.min(SEND_SLICE)
                }
                None => SEND_SLICE,
            };

            // Ok(true) queued, Ok(false) not writable within this slice
            let attempt = self.with_socket(handle, |socket| match socket.send(payload, zmq::DONTWAIT) {
                Ok(()) => Ok(true),
                Err(zmq::Error::EAGAIN) => {
                    socket.poll(zmq::POLLOUT, poll_ms(slice)).map_err(rc)?;
                    Ok(false)
                }
                Err(e) => Err(rc(e)),
            });

            match attempt {
                Ok(true) => return i32::try_from(payload.len()).unwrap_or(i32::MAX),
                Ok(false) => trace!(%handle, "[zmq] send waiting for a peer"),
                Err(code) => return code,
            }
        }
    }

    fn set_option(&self, handle: Handle, option: &SocketOption) -> i32 {
        Self::status(self.with_socket(handle, |socket| {
            let result = match option {
                SocketOption::Subscribe(prefix) => socket.set_subscribe(prefix),
                SocketOption::Unsubscribe(prefix) => socket.set_unsubscribe(prefix),
                SocketOption::Linger(linger) => socket.set_linger(linger_ms(*linger)),
                SocketOption::RecvHwm(hwm) => socket.set_rcvhwm(*hwm),
                SocketOption::SendHwm(hwm) => socket.set_sndhwm(*hwm),
            };
            result.map_err(rc)?;
            Ok(0)
        }))
    }

    fn get_option(&self, handle: Handle, name: OptionName) -> Result<OptionValue, i32> {
        self.with_entry(handle, |entry| {
            let socket = &entry.socket;
            let value = match name {
                OptionName::Linger => {
                    let ms = socket.get_linger().map_err(rc)?;
                    OptionValue::Duration(u64::try_from(ms).ok().map(Duration::from_millis))
                }
                OptionName::RecvHwm => OptionValue::Int(socket.get_rcvhwm().map_err(rc)?),
                OptionName::SendHwm => OptionValue::Int(socket.get_sndhwm().map_err(rc)?),
                OptionName::SocketType => OptionValue::SocketType(entry.kind),
                OptionName::LastEndpoint => match socket.get_last_endpoint().map_err(rc)? {
                    Ok(endpoint) => OptionValue::Text(endpoint),
                    Err(raw) => OptionValue::Text(String::from_utf8_lossy(&raw).into_owned()),
                },
                OptionName::RecvMore => OptionValue::Bool(socket.get_rcvmore().map_err(rc)?),
            };
            Ok(value)
        })
    }

    fn strerror(&self, code: i32) -> String {
        describe_error(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_of() {
        assert_eq!(port_of("tcp://127.0.0.1:5555"), 5555);
        assert_eq!(port_of("tcp://[::1]:6000"), 6000);
        assert_eq!(port_of("ipc:///tmp/zsock.sock"), 0);
        assert_eq!(port_of("inproc://events"), 0);
    }

    #[test]
    fn test_linger_ms() {
        assert_eq!(linger_ms(None), -1);
        assert_eq!(linger_ms(Some(Duration::ZERO)), 0);
        assert_eq!(linger_ms(Some(Duration::from_millis(1500))), 1500);
    }

    #[test]
    fn test_describe_error() {
        assert_eq!(describe_error(-zmq::Error::ETERM.to_raw()), "Context was terminated");
        assert!(!describe_error(-98).is_empty());
        assert_eq!(describe_error(-98), describe_error(98));
        assert!(!describe_error(i32::MIN).is_empty());
    }

    #[test]
    fn test_describe_error_matches_zmq_strerror() {
        for err in [zmq::Error::EAGAIN, zmq::Error::EINVAL, zmq::Error::EFSM] {
            let text = describe_error(rc(err));
            assert_eq!(text, err.message());
            assert!(!text.contains("os error"));
        }
    }

    #[test]
    fn test_unknown_handle_fails() {
        let transport = ZmqTransport::new();
        let ghost = Handle::new(999);
        assert!(transport.bind(ghost, "tcp://127.0.0.1:*") < 0);
        assert!(transport.send(ghost, b"x") < 0);
        assert!(transport.recv(ghost, Some(Duration::from_millis(1))).is_err());
        assert_eq!(
            transport.get_option(ghost, OptionName::Linger),
            Err(rc(zmq::Error::ENOTSOCK))
        );
    }
}
