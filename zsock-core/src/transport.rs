//! Transport adapter contract.
//!
//! A transport engine exposes blocking, return-code based primitives. The
//! managed socket layer never calls them on an async executor; they run on
//! [`Worker`](crate::worker::Worker) threads.
//!
//! Return code conventions:
//! - `bind` / `unbind` / `send` / `set_option`: `>= 0` success, `< 0` failure
//! - `connect`: `0` success, anything else failure
//! - `recv`: `Ok(Some(bytes))` message, `Ok(None)` timeout elapsed, `Err(code)` fault
//! - `get_option`: `Ok(value)` or `Err(code)`

use bytes::Bytes;
use std::fmt;
use std::time::Duration;

use crate::socket_type::SocketType;

/// Opaque reference to a native transport socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Options forwarded verbatim to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketOption {
    /// Add a topic prefix filter (SUB / XSUB)
    Subscribe(Bytes),
    /// Remove a topic prefix filter (SUB / XSUB)
    Unsubscribe(Bytes),
    /// How long pending outbound messages survive a close.
    /// `None` waits forever.
    Linger(Option<Duration>),
    /// Receive high water mark, in messages
    RecvHwm(i32),
    /// Send high water mark, in messages
    SendHwm(i32),
}

/// Readable socket options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionName {
    Linger,
    RecvHwm,
    SendHwm,
    /// Pattern the socket was created with
    SocketType,
    /// Endpoint resolved by the last bind or connect
    LastEndpoint,
    /// More parts of a multipart message are pending
    RecvMore,
}

/// Value read back with [`TransportAdapter::get_option`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Int(i32),
    Bool(bool),
    /// `None` waits forever
    Duration(Option<Duration>),
    Text(String),
    SocketType(SocketType),
}

impl OptionValue {
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// Blocking primitives of a message-queue transport engine.
///
/// Implementations own the native resources behind each [`Handle`] and must
/// tolerate calls on an unknown or already destroyed handle by returning a
/// failing code.
pub trait TransportAdapter: Send + Sync + 'static {
    /// Create a native socket of the given pattern.
    fn create_socket(&self, socket_type: SocketType) -> Result<Handle, i32>;

    /// Release the native socket.
    fn destroy(&self, handle: Handle);

    /// Bind to `address`. Returns the bound port (or `0`) on success.
    fn bind(&self, handle: Handle, address: &str) -> i32;

    /// Connect to `address`. Returns `0` on success.
    fn connect(&self, handle: Handle, address: &str) -> i32;

    /// Remove a previous bind.
    fn unbind(&self, handle: Handle, address: &str) -> i32;

    /// Wait for one message.
    ///
    /// With `timeout` set, returns `Ok(None)` once it elapses without a
    /// message. This is what makes the listen loop cancellable.
    fn recv(&self, handle: Handle, timeout: Option<Duration>) -> Result<Option<Bytes>, i32>;

    /// Queue one message. Returns the number of bytes accepted.
    fn send(&self, handle: Handle, payload: &[u8]) -> i32;

    /// Apply a socket option.
    fn set_option(&self, handle: Handle, option: &SocketOption) -> i32;

    /// Read a socket option.
    fn get_option(&self, handle: Handle, name: OptionName) -> Result<OptionValue, i32>;

    /// Human-readable text for a failing return code.
    fn strerror(&self, code: i32) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_roundtrip_and_display() {
        let handle = Handle::new(42);
        assert_eq!(handle.raw(), 42);
        assert_eq!(handle.to_string(), "#42");
    }

    #[test]
    fn test_option_value_as_int() {
        assert_eq!(OptionValue::Int(7).as_int(), Some(7));
        assert_eq!(OptionValue::Bool(true).as_int(), None);
    }
}
