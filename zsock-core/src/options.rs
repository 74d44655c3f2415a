//! Managed socket configuration
//!
//! These options control how the managed layer drives the transport; options
//! the transport itself understands go through
//! [`SocketOption`](crate::transport::SocketOption).

use std::time::Duration;

/// Managed socket configuration options.
///
/// # Examples
///
/// ```
/// use zsock_core::options::SocketOptions;
/// use std::time::Duration;
///
/// let opts = SocketOptions::default()
///     .with_send_settle(Duration::from_millis(20))
///     .with_recv_poll_interval(Duration::from_millis(10));
/// ```
#[derive(Debug, Clone)]
pub struct SocketOptions {
    /// Settle delay after a successful send
    ///
    /// A send only completes once this has elapsed, giving the transport
    /// time to flush its outbound queue before the caller moves on (or
    /// destroys the socket).
    /// - Default: 100ms
    pub send_settle: Duration,

    /// Receive slice used by the listen loop
    ///
    /// Upper bound on how long a stop or destroy waits for the loop to
    /// notice it. Smaller values react faster at the cost of more wakeups.
    /// - Default: 50ms
    pub recv_poll_interval: Duration,

    /// Prefix for the worker thread names (`<prefix>-<handle>-ctl` / `-rx`)
    pub worker_name_prefix: String,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            send_settle: Duration::from_millis(100),
            recv_poll_interval: Duration::from_millis(50),
            worker_name_prefix: "zsock".to_string(),
        }
    }
}

impl SocketOptions {
    /// Create new socket options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the post-send settle delay.
    ///
    /// `Duration::ZERO` completes sends as soon as the transport accepts them.
    pub fn with_send_settle(mut self, settle: Duration) -> Self {
        self.send_settle = settle;
        self
    }

    /// Set the listen loop receive slice.
    pub fn with_recv_poll_interval(mut self, interval: Duration) -> Self {
        // A zero slice would turn the loop into a busy spin.
        self.recv_poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the worker thread name prefix.
    pub fn with_worker_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.worker_name_prefix = prefix.into();
        self
    }
}
