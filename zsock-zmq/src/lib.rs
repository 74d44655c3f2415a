//! # zsock ZMQ
//!
//! [`TransportAdapter`](zsock_core::transport::TransportAdapter) over libzmq.
//!
//! - [`ZmqTransport`]: handle table of native sockets, return-code based
//!   primitives, cancellable receive via `zmq_poll`
//! - [`context`]: process-wide libzmq context, created with the first socket
//!   and terminated with the last one; context options (IO threads)

#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod context;
mod transport;

pub use transport::{describe_error, ZmqTransport};

/// Failing return code for a libzmq error.
pub(crate) fn rc(err: zmq::Error) -> i32 {
    -err.to_raw()
}

/// Version of the linked libzmq as `(major, minor, patch)`.
pub fn version() -> (i32, i32, i32) {
    zmq::version()
}
