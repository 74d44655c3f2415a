//! Socket lifecycle events and the listener registry.
//!
//! Listeners are keyed by [`EventKind`] and called synchronously, in
//! registration order, by [`EventRegistry::emit`]. A monitor channel gives
//! the same events as a pull-based stream.

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, trace};

use crate::error::TransportError;
use crate::transport::Handle;

/// Endpoint reported by a successful bind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoundEndpoint {
    /// Address passed to bind
    pub address: String,
    /// Port reported by the transport (`0` for non-TCP transports)
    pub port: u32,
}

impl fmt::Display for BoundEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (port {})", self.address, self.port)
    }
}

/// Event names listeners subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    Data,
    Error,
    Stopped,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        Self::Connected,
        Self::Disconnected,
        Self::Data,
        Self::Error,
        Self::Stopped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Data => "data",
            Self::Error => "error",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Socket lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// Bind (with the endpoint) or connect (without) succeeded.
    Connected(Option<BoundEndpoint>),

    /// Socket was destroyed; carries the released handle.
    Disconnected(Handle),

    /// A message arrived on the listen loop.
    Data(Bytes),

    /// A transport call failed.
    Error(TransportError),

    /// The listen loop exited after an explicit stop.
    Stopped,
}

impl SocketEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Connected(_) => EventKind::Connected,
            Self::Disconnected(_) => EventKind::Disconnected,
            Self::Data(_) => EventKind::Data,
            Self::Error(_) => EventKind::Error,
            Self::Stopped => EventKind::Stopped,
        }
    }
}

impl fmt::Display for SocketEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected(Some(ep)) => write!(f, "Bound to {ep}"),
            Self::Connected(None) => write!(f, "Connected"),
            Self::Disconnected(handle) => write!(f, "Disconnected {handle}"),
            Self::Data(bytes) => write!(f, "Data ({} bytes)", bytes.len()),
            Self::Error(err) => write!(f, "Error: {err}"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Callback invoked for each emitted event of the kind it was registered for.
pub type Listener = Arc<dyn Fn(&SocketEvent) + Send + Sync>;

/// Handle for receiving socket events as a stream.
pub type SocketMonitor = flume::Receiver<SocketEvent>;

/// Channel fed by [`EventRegistry::monitor`]
struct MonitorSink {
    kinds: Vec<EventKind>,
    tx: flume::Sender<SocketEvent>,
}

/// Ordered, append-only listener lists keyed by event kind, plus monitor
/// channels.
///
/// Registration may race with emission from another thread: `emit` copies
/// the listener list out of the lock before calling into user code, so a
/// listener may itself call [`on`](Self::on).
#[derive(Default)]
pub struct EventRegistry {
    listeners: RwLock<HashMap<EventKind, Vec<Listener>>>,
    monitors: Mutex<Vec<MonitorSink>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `listener` for `kind`. Duplicates are kept and fire once each.
    pub fn on(&self, kind: EventKind, listener: Listener) {
        self.listeners.write().entry(kind).or_default().push(listener);
    }

    /// Number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners.read().get(&kind).map_or(0, Vec::len)
    }

    /// Number of monitor channels still attached.
    pub fn monitor_count(&self) -> usize {
        self.monitors.lock().len()
    }

    /// Call every listener registered for `event.kind()`, in order, then
    /// forward the event to matching monitors.
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    pub fn emit(&self, event: &SocketEvent) {
        let kind = event.kind();
        let snapshot = self.listeners.read().get(&kind).cloned().unwrap_or_default();

        for (index, listener) in snapshot.iter().enumerate() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(event)));
            if outcome.is_err() {
                error!("[EventRegistry] listener #{index} for '{kind}' panicked; continuing");
            }
        }

        let mut monitors = self.monitors.lock();
        let before = monitors.len();
        monitors.retain(|sink| {
            if sink.kinds.contains(&kind) {
                sink.tx.send(event.clone()).is_ok()
            } else {
                !sink.tx.is_disconnected()
            }
        });
        if monitors.len() < before {
            trace!("[EventRegistry] pruned {} dropped monitor(s)", before - monitors.len());
        }
    }

    /// Forward every event of the given kinds into a new unbounded channel.
    ///
    /// Monitors receive events after the listeners. A monitor whose receiver
    /// was dropped is detached on the next emit.
    pub fn monitor(&self, kinds: &[EventKind]) -> SocketMonitor {
        let (tx, rx) = flume::unbounded();
        self.monitors.lock().push(MonitorSink {
            kinds: kinds.to_vec(),
            tx,
        });
        rx
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read();
        let mut map = f.debug_map();
        for kind in EventKind::ALL {
            if let Some(list) = listeners.get(&kind) {
                map.entry(&kind, &list.len());
            }
        }
        map.entry(&"monitors", &self.monitor_count());
        map.finish()
    }
}
