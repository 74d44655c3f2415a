//! Event-driven managed socket.
//!
//! [`ManagedSocket`] wraps one transport [`Handle`] and turns the transport's
//! blocking, return-code based primitives into async operations plus a
//! push-based event stream.
//!
//! # Lifecycle
//!
//! ```text
//! Unbound ──bind/connect──▶ Bound ──listen──▶ Listening ──stop──▶ Bound
//!    │                        │                  │
//!    └────────────────────────┴──destroy / receive fault──▶ Destroyed
//! ```
//!
//! Every transport failure is reported twice: as an
//! [`Error`](SocketEvent::Error) event for subscribers and as an `Err` for the
//! direct caller. Nothing is retried.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use zsock::prelude::*;
//!
//! # async fn example<T: TransportAdapter>(transport: Arc<T>) -> Result<(), SocketError> {
//! let socket = ManagedSocket::new(transport, SocketType::Rep)?;
//!
//! socket.on(EventKind::Data, |event| {
//!     if let SocketEvent::Data(payload) = event {
//!         println!("got {} bytes", payload.len());
//!     }
//! });
//!
//! // Runs until stopped, destroyed, or the transport faults.
//! let exit = socket.listen("tcp://127.0.0.1:5555").await?;
//! println!("listen loop ended: {exit:?}");
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

use zsock_core::error::{Result, SocketError, TransportError};
use zsock_core::event::{BoundEndpoint, EventKind, EventRegistry, Listener, SocketEvent, SocketMonitor};
use zsock_core::options::SocketOptions;
use zsock_core::socket_type::SocketType;
use zsock_core::transport::{Handle, OptionName, OptionValue, SocketOption, TransportAdapter};
use zsock_core::worker::Worker;

/// How a listen loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenExit {
    /// [`ManagedSocket::stop`] was called; a `Stopped` event was emitted.
    Stopped,
    /// The receive faulted; the socket has been destroyed.
    Faulted(TransportError),
    /// The socket was destroyed from outside the loop.
    Destroyed,
}

impl ListenExit {
    /// The receive failure that ended the loop, as a typed error.
    pub fn into_error(self) -> Option<SocketError> {
        match self {
            Self::Faulted(err) => Some(SocketError::Receive(err)),
            Self::Stopped | Self::Destroyed => None,
        }
    }
}

struct Inner<T: TransportAdapter> {
    transport: Arc<T>,
    handle: Handle,
    socket_type: SocketType,
    options: SocketOptions,
    events: EventRegistry,
    /// Cleared to stop the listen loop
    listening: AtomicBool,
    /// A `listen` call is in progress (binding or looping)
    loop_active: AtomicBool,
    /// `stop()` was called during the current `listen` call
    stop_requested: AtomicBool,
    destroyed: AtomicBool,
    bound: Mutex<Option<BoundEndpoint>>,
    /// Runs bind / connect / unbind / send / set_option
    control: Worker,
    /// Runs receive slices for the listen loop
    receiver: Worker,
}

impl<T: TransportAdapter> Inner<T> {
    fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            debug!(handle = %self.handle, "[ManagedSocket] destroy on destroyed socket ignored");
            return;
        }

        self.events.emit(&SocketEvent::Disconnected(self.handle));
        self.transport.destroy(self.handle);
        self.listening.store(false, Ordering::SeqCst);
        self.bound.lock().take();

        self.control.shutdown();
        self.receiver.shutdown();
        debug!(handle = %self.handle, socket_type = %self.socket_type, "[ManagedSocket] destroyed");
    }
}

impl<T: TransportAdapter> Drop for Inner<T> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Clears the listen flags when a listen call ends, including when its
/// future is dropped mid-loop.
struct LoopGuard<'a> {
    loop_active: &'a AtomicBool,
    listening: &'a AtomicBool,
    stop_requested: &'a AtomicBool,
}

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        self.stop_requested.store(false, Ordering::SeqCst);
        self.listening.store(false, Ordering::SeqCst);
        self.loop_active.store(false, Ordering::SeqCst);
    }
}

/// A transport socket with an event registry and an async operation surface.
///
/// Clones share the same underlying socket; the socket is destroyed by
/// [`destroy`](Self::destroy) or when the last clone is dropped.
///
/// A listener that captures a clone keeps the socket alive through the
/// registry it is stored in, so dropping the other clones no longer destroys
/// it. Capture a [`WeakSocket`] from [`downgrade`](Self::downgrade) instead,
/// or call `destroy` explicitly.
pub struct ManagedSocket<T: TransportAdapter> {
    inner: Arc<Inner<T>>,
}

impl<T: TransportAdapter> Clone for ManagedSocket<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: TransportAdapter> ManagedSocket<T> {
    /// Create a socket of the given pattern with default options.
    pub fn new(transport: Arc<T>, socket_type: SocketType) -> Result<Self> {
        Self::with_options(transport, socket_type, SocketOptions::default())
    }

    /// Create a socket of the given pattern.
    ///
    /// Allocates the transport handle and the two worker threads that run
    /// blocking transport calls for this socket.
    pub fn with_options(
        transport: Arc<T>,
        socket_type: SocketType,
        options: SocketOptions,
    ) -> Result<Self> {
        let handle = transport.create_socket(socket_type).map_err(|code| {
            let err = TransportError::new(code, transport.strerror(code));
            warn!(%socket_type, %err, "[ManagedSocket] socket creation failed");
            SocketError::Create(err)
        })?;

        let prefix = &options.worker_name_prefix;
        let workers = Worker::spawn(format!("{prefix}-{}-ctl", handle.raw())).and_then(|control| {
            Worker::spawn(format!("{prefix}-{}-rx", handle.raw())).map(|receiver| (control, receiver))
        });
        let (control, receiver) = match workers {
            Ok(workers) => workers,
            Err(e) => {
                transport.destroy(handle);
                return Err(e.into());
            }
        };

        debug!(%handle, %socket_type, "[ManagedSocket] created");

        Ok(Self {
            inner: Arc::new(Inner {
                transport,
                handle,
                socket_type,
                options,
                events: EventRegistry::new(),
                listening: AtomicBool::new(false),
                loop_active: AtomicBool::new(false),
                stop_requested: AtomicBool::new(false),
                destroyed: AtomicBool::new(false),
                bound: Mutex::new(None),
                control,
                receiver,
            }),
        })
    }

    /// Transport handle. Invalid once the socket is destroyed.
    pub fn handle(&self) -> Handle {
        self.inner.handle
    }

    /// Messaging pattern this socket was created with.
    pub fn socket_type(&self) -> SocketType {
        self.inner.socket_type
    }

    /// Timing options this socket was created with.
    pub fn options(&self) -> &SocketOptions {
        &self.inner.options
    }

    /// True while a listen loop is receiving.
    pub fn is_listening(&self) -> bool {
        self.inner.listening.load(Ordering::SeqCst)
    }

    /// Handle to this socket that does not keep it alive.
    pub fn downgrade(&self) -> WeakSocket<T> {
        WeakSocket {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// True once [`destroy`](Self::destroy) has run.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    /// Endpoint of the last successful bind, if still bound.
    pub fn bound_endpoint(&self) -> Option<BoundEndpoint> {
        self.inner.bound.lock().clone()
    }

    /// Port of the last successful bind, if still bound.
    pub fn port(&self) -> Option<u32> {
        self.inner.bound.lock().as_ref().map(|ep| ep.port)
    }

    /// Register `callback` for `kind`.
    ///
    /// Callbacks run synchronously in registration order. A panicking
    /// callback is logged and does not affect the others or the listen loop.
    pub fn on<F>(&self, kind: EventKind, callback: F)
    where
        F: Fn(&SocketEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(kind, Arc::new(callback));
    }

    /// Register an already shared listener. Registering the same listener
    /// twice makes it fire twice.
    pub fn add_listener(&self, kind: EventKind, listener: Listener) {
        self.inner.events.on(kind, listener);
    }

    /// Stream of the given event kinds.
    pub fn monitor(&self, kinds: &[EventKind]) -> SocketMonitor {
        self.inner.events.monitor(kinds)
    }

    /// Deliver `event` to this socket's listeners.
    pub fn emit(&self, event: &SocketEvent) {
        self.inner.events.emit(event);
    }

    /// Bind to `address`.
    ///
    /// Succeeds when the transport returns a code `>= 0`, which becomes the
    /// bound port. Emits `Connected` with the endpoint.
    pub async fn bind(&self, address: &str) -> Result<BoundEndpoint> {
        let addr = address.to_owned();
        let rc = self
            .call(&self.inner.control, move |t, h| t.bind(h, &addr))
            .await?;

        if rc < 0 {
            return Err(self.fail(rc, "bind", SocketError::Bind));
        }

        let endpoint = BoundEndpoint {
            address: address.to_owned(),
            port: rc as u32,
        };
        debug!(handle = %self.inner.handle, %endpoint, "[ManagedSocket] bound");
        {
            // destroy() clears `bound` under this lock after setting `destroyed`
            let mut bound = self.inner.bound.lock();
            if !self.is_destroyed() {
                *bound = Some(endpoint.clone());
            }
        }
        self.emit(&SocketEvent::Connected(Some(endpoint.clone())));
        Ok(endpoint)
    }

    /// Connect to `address`.
    ///
    /// Succeeds only when the transport returns exactly `0`. Emits
    /// `Connected` without an endpoint.
    pub async fn connect(&self, address: &str) -> Result<()> {
        let addr = address.to_owned();
        let rc = self
            .call(&self.inner.control, move |t, h| t.connect(h, &addr))
            .await?;

        if rc != 0 {
            return Err(self.fail(rc, "connect", SocketError::Connect));
        }

        debug!(handle = %self.inner.handle, address, "[ManagedSocket] connected");
        self.emit(&SocketEvent::Connected(None));
        Ok(())
    }

    /// Remove a bind.
    ///
    /// Emits no lifecycle event on success; the stored endpoint is cleared
    /// if it was bound to `address`. Failures emit `Error`.
    pub async fn unbind(&self, address: &str) -> Result<()> {
        let addr = address.to_owned();
        let rc = self
            .call(&self.inner.control, move |t, h| t.unbind(h, &addr))
            .await?;

        if rc < 0 {
            return Err(self.fail(rc, "unbind", SocketError::Unbind));
        }

        let mut bound = self.inner.bound.lock();
        if bound.as_ref().is_some_and(|ep| ep.address == address) {
            *bound = None;
        }
        debug!(handle = %self.inner.handle, address, "[ManagedSocket] unbound");
        Ok(())
    }

    /// Send one message.
    ///
    /// On success, waits the configured settle delay before returning the
    /// transport's return code. Failures return immediately.
    pub async fn send(&self, payload: impl Into<Bytes>) -> Result<u32> {
        let payload: Bytes = payload.into();
        let len = payload.len();
        let rc = self
            .call(&self.inner.control, move |t, h| t.send(h, &payload))
            .await?;

        if rc < 0 {
            return Err(self.fail(rc, "send", SocketError::Send));
        }

        trace!(handle = %self.inner.handle, len, rc, "[ManagedSocket] sent");
        let settle = self.inner.options.send_settle;
        if !settle.is_zero() {
            compio::time::sleep(settle).await;
        }
        Ok(rc as u32)
    }

    /// Apply a transport socket option.
    pub async fn set_option(&self, option: SocketOption) -> Result<()> {
        debug!(handle = %self.inner.handle, ?option, "[ManagedSocket] setting option");
        let rc = self
            .call(&self.inner.control, move |t, h| t.set_option(h, &option))
            .await?;

        if rc < 0 {
            return Err(self.fail(rc, "set_option", SocketError::SetOption));
        }
        Ok(())
    }

    /// Read a transport socket option.
    pub async fn get_option(&self, name: OptionName) -> Result<OptionValue> {
        let value = self
            .call(&self.inner.control, move |t, h| t.get_option(h, name))
            .await?;

        value.map_err(|code| self.fail(code, "get_option", SocketError::GetOption))
    }

    /// Bind to `address`, then emit a `Data` event per received message
    /// until stopped, destroyed, or the receive faults.
    ///
    /// A failed bind is returned as `Err` and the loop never starts. A
    /// [`stop`](Self::stop) that arrives while the bind is in flight ends the
    /// call with [`ListenExit::Stopped`] before the first receive. A receive
    /// fault emits `Error`, destroys the socket, and ends the loop with
    /// [`ListenExit::Faulted`]; it is not retried.
    pub async fn listen(&self, address: &str) -> Result<ListenExit> {
        self.ensure_alive()?;
        if self.inner.loop_active.swap(true, Ordering::SeqCst) {
            return Err(SocketError::AlreadyListening);
        }
        let _guard = LoopGuard {
            loop_active: &self.inner.loop_active,
            listening: &self.inner.listening,
            stop_requested: &self.inner.stop_requested,
        };

        self.bind(address).await?;
        self.inner.listening.store(true, Ordering::SeqCst);
        if self.inner.stop_requested.load(Ordering::SeqCst) {
            self.inner.listening.store(false, Ordering::SeqCst);
        }
        debug!(handle = %self.inner.handle, address, "[ManagedSocket] listen loop started");

        let slice = self.inner.options.recv_poll_interval;
        let exit = loop {
            if self.is_destroyed() {
                break ListenExit::Destroyed;
            }
            if !self.is_listening() {
                break ListenExit::Stopped;
            }

            let received = match self
                .call(&self.inner.receiver, move |t, h| t.recv(h, Some(slice)))
                .await
            {
                Ok(received) => received,
                Err(SocketError::Destroyed) => break ListenExit::Destroyed,
                Err(e) => return Err(e),
            };

            match received {
                Ok(Some(payload)) => {
                    trace!(handle = %self.inner.handle, len = payload.len(), "[ManagedSocket] received");
                    self.emit(&SocketEvent::Data(payload));
                }
                Ok(None) => {}
                Err(_) if self.is_destroyed() => break ListenExit::Destroyed,
                Err(code) => {
                    let err = self.report(code, "recv");
                    self.destroy();
                    return Ok(ListenExit::Faulted(err));
                }
            }
        };

        if exit == ListenExit::Stopped {
            self.emit(&SocketEvent::Stopped);
        }
        debug!(handle = %self.inner.handle, ?exit, "[ManagedSocket] listen loop ended");
        Ok(exit)
    }

    /// Ask the listen loop to exit. It notices within one receive slice, or
    /// right after the bind when called while `listen` is still binding.
    ///
    /// Returns whether a `listen` call was in progress.
    pub fn stop(&self) -> bool {
        if !self.inner.loop_active.load(Ordering::SeqCst) {
            return false;
        }
        self.inner.stop_requested.store(true, Ordering::SeqCst);
        self.inner.listening.store(false, Ordering::SeqCst);
        true
    }

    /// Release the transport handle.
    ///
    /// The first call emits `Disconnected` with the handle, releases it and
    /// stops any listen loop. Later calls do nothing.
    pub fn destroy(&self) {
        self.inner.destroy();
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(SocketError::Destroyed);
        }
        Ok(())
    }

    /// Run one transport call on `worker`.
    async fn call<F, R>(&self, worker: &Worker, f: F) -> Result<R>
    where
        F: FnOnce(&T, Handle) -> R + Send + 'static,
        R: Send + 'static,
    {
        self.ensure_alive()?;
        let transport = Arc::clone(&self.inner.transport);
        let handle = self.inner.handle;
        worker.run(move || f(&transport, handle)).await
    }

    /// Describe `code`, log it and emit it as an `Error` event.
    fn report(&self, code: i32, op: &str) -> TransportError {
        let err = TransportError::new(code, self.inner.transport.strerror(code));
        warn!(handle = %self.inner.handle, op, rc = code, "[ManagedSocket] {}", err.description);
        self.emit(&SocketEvent::Error(err.clone()));
        err
    }

    fn fail(&self, code: i32, op: &str, wrap: fn(TransportError) -> SocketError) -> SocketError {
        wrap(self.report(code, op))
    }
}

/// Non-owning reference to a [`ManagedSocket`].
///
/// Meant for listeners that need to act on their own socket, such as a reply
/// socket echoing each `Data` event.
pub struct WeakSocket<T: TransportAdapter> {
    inner: Weak<Inner<T>>,
}

impl<T: TransportAdapter> WeakSocket<T> {
    /// The socket, unless every [`ManagedSocket`] clone has been dropped.
    pub fn upgrade(&self) -> Option<ManagedSocket<T>> {
        self.inner.upgrade().map(|inner| ManagedSocket { inner })
    }
}

impl<T: TransportAdapter> Clone for WeakSocket<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T: TransportAdapter> fmt::Debug for WeakSocket<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakSocket")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<T: TransportAdapter> fmt::Debug for ManagedSocket<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedSocket")
            .field("handle", &self.inner.handle)
            .field("socket_type", &self.inner.socket_type)
            .field("listening", &self.is_listening())
            .field("destroyed", &self.is_destroyed())
            .field("bound", &self.bound_endpoint())
            .field("listeners", &self.inner.events)
            .finish()
    }
}
