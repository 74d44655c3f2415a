//! zsock Core
//!
//! This crate contains the transport-agnostic building blocks of a managed
//! socket:
//! - Messaging pattern kinds (`socket_type`)
//! - Transport adapter contract and handles (`transport`)
//! - Lifecycle events + ordered listener registry (`event`)
//! - Managed socket configuration (`options`)
//! - Blocking-call worker threads (`worker`)
//! - Error types (`error`)

#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
pub mod error;
pub mod event;
pub mod options;
pub mod socket_type;
pub mod transport;
pub mod worker;

pub mod prelude {
    pub use crate::error::{Result, SocketError, TransportError};
    pub use crate::event::{
        BoundEndpoint, EventKind, EventRegistry, Listener, SocketEvent, SocketMonitor,
    };
    pub use crate::options::SocketOptions;
    pub use crate::socket_type::SocketType;
    pub use crate::transport::{Handle, OptionName, OptionValue, SocketOption, TransportAdapter};
    pub use crate::worker::Worker;
}
