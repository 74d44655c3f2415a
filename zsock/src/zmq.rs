//! libzmq-backed managed sockets.
//!
//! # Example
//!
//! ```rust,no_run
//! use zsock::zmq::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ZmqSocket::zmq(SocketType::Push)?;
//! client.connect("tcp://127.0.0.1:5555").await?;
//! client.send("hello").await?;
//! client.destroy();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::socket::ManagedSocket;
use zsock_core::error::Result;
use zsock_core::options::SocketOptions;
use zsock_core::socket_type::SocketType;

pub use zsock_zmq::{context, version, ZmqTransport};

/// Managed socket over the process-wide libzmq transport.
pub type ZmqSocket = ManagedSocket<ZmqTransport>;

impl ManagedSocket<ZmqTransport> {
    /// Create a socket on the shared libzmq transport.
    pub fn zmq(socket_type: SocketType) -> Result<Self> {
        Self::new(ZmqTransport::shared(), socket_type)
    }

    /// Create a socket on the shared libzmq transport with custom options.
    pub fn zmq_with_options(socket_type: SocketType, options: SocketOptions) -> Result<Self> {
        Self::with_options(ZmqTransport::shared(), socket_type, options)
    }

    /// Create a socket on a caller-supplied transport instance.
    pub fn zmq_on(transport: &Arc<ZmqTransport>, socket_type: SocketType) -> Result<Self> {
        Self::new(Arc::clone(transport), socket_type)
    }
}

/// Convenient imports for libzmq sockets.
pub mod prelude {
    pub use super::{ZmqSocket, ZmqTransport};
    pub use crate::prelude::*;
}
