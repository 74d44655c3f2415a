//! # zsock
//!
//! Event-driven managed sockets over ZeroMQ-style message-queue transports.
//!
//! ## Architecture
//!
//! - **`zsock-core`**: socket types, events + listener registry, errors,
//!   options, the `TransportAdapter` contract and blocking-call workers
//! - **Transport crates**: blocking engines behind `TransportAdapter`
//! - **`zsock`**: [`ManagedSocket`], the public API surface (this crate)
//!
//! ## Transports (opt-in via features)
//!
//! - **`zmq`** - libzmq, through the `zmq` crate
//!
//! ```toml
//! [dependencies]
//! zsock = { version = "0.1", features = ["zmq"] }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "zmq")]
//! use zsock::zmq::prelude::*;
//!
//! # #[cfg(feature = "zmq")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = ZmqSocket::zmq(SocketType::Pull)?;
//! server.on(EventKind::Data, |event| println!("{event}"));
//! server.on(EventKind::Error, |event| eprintln!("{event}"));
//!
//! // Runs until stop(), destroy(), or a receive fault.
//! server.listen("tcp://127.0.0.1:5555").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Events
//!
//! | kind           | payload                                   |
//! |----------------|-------------------------------------------|
//! | `Connected`    | bound endpoint (bind) or none (connect)   |
//! | `Disconnected` | the released handle                       |
//! | `Data`         | one received message                      |
//! | `Error`        | transport return code and description     |
//! | `Stopped`      | none; listen loop ended by `stop()`       |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dev_tracing;
pub mod socket;

#[cfg(feature = "zmq")]
pub mod zmq;

pub use bytes::Bytes;
pub use socket::{ListenExit, ManagedSocket, WeakSocket};
pub use zsock_core::error::{Result, SocketError, TransportError};
pub use zsock_core::event::{BoundEndpoint, EventKind, Listener, SocketEvent, SocketMonitor};
pub use zsock_core::options::SocketOptions;
pub use zsock_core::socket_type::SocketType;
pub use zsock_core::transport::{Handle, OptionName, OptionValue, SocketOption, TransportAdapter};

/// Convenient imports.
pub mod prelude {
    pub use crate::socket::{ListenExit, ManagedSocket, WeakSocket};
    pub use bytes::Bytes;
    pub use zsock_core::prelude::{
        BoundEndpoint, EventKind, Handle, Listener, OptionName, OptionValue, SocketError,
        SocketEvent, SocketMonitor, SocketOption, SocketOptions, SocketType, TransportAdapter,
        TransportError,
    };
}
