//! Scripted in-memory transport for managed socket tests.

#![allow(dead_code)]

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicI32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use zsock::prelude::*;

/// Transport whose return codes and receive outcomes are set by the test.
///
/// With an empty receive script, `recv` sleeps for its timeout and reports
/// that no message arrived.
pub struct MockTransport {
    pub create_rc: AtomicI32,
    pub bind_rc: AtomicI32,
    pub connect_rc: AtomicI32,
    pub unbind_rc: AtomicI32,
    pub send_rc: AtomicI32,
    pub option_rc: AtomicI32,
    pub bind_delay_ms: AtomicU64,
    pub destroy_calls: AtomicUsize,
    pub recv_calls: AtomicUsize,
    pub sent: Mutex<Vec<Bytes>>,
    pub options: Mutex<Vec<SocketOption>>,
    recv_script: Mutex<VecDeque<Result<Option<Bytes>, i32>>>,
    next_handle: AtomicU64,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            create_rc: AtomicI32::new(0),
            bind_rc: AtomicI32::new(0),
            connect_rc: AtomicI32::new(0),
            unbind_rc: AtomicI32::new(0),
            send_rc: AtomicI32::new(0),
            option_rc: AtomicI32::new(0),
            bind_delay_ms: AtomicU64::new(0),
            destroy_calls: AtomicUsize::new(0),
            recv_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
            recv_script: Mutex::new(VecDeque::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn with_bind_rc(self, rc: i32) -> Self {
        self.bind_rc.store(rc, Ordering::SeqCst);
        self
    }

    /// Make every bind block for `delay` before returning.
    pub fn with_bind_delay(self, delay: Duration) -> Self {
        self.bind_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
        self
    }

    pub fn with_connect_rc(self, rc: i32) -> Self {
        self.connect_rc.store(rc, Ordering::SeqCst);
        self
    }

    pub fn with_unbind_rc(self, rc: i32) -> Self {
        self.unbind_rc.store(rc, Ordering::SeqCst);
        self
    }

    pub fn with_send_rc(self, rc: i32) -> Self {
        self.send_rc.store(rc, Ordering::SeqCst);
        self
    }

    pub fn with_option_rc(self, rc: i32) -> Self {
        self.option_rc.store(rc, Ordering::SeqCst);
        self
    }

    pub fn with_create_rc(self, rc: i32) -> Self {
        self.create_rc.store(rc, Ordering::SeqCst);
        self
    }

    /// Queue messages, delivered one per receive.
    pub fn with_messages(self, messages: &[&'static str]) -> Self {
        {
            let mut script = self.recv_script.lock();
            for msg in messages {
                script.push_back(Ok(Some(Bytes::from_static(msg.as_bytes()))));
            }
        }
        self
    }

    /// Queue a receive fault after the messages queued so far.
    pub fn with_recv_fault(self, code: i32) -> Self {
        self.recv_script.lock().push_back(Err(code));
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn destroy_count(&self) -> usize {
        self.destroy_calls.load(Ordering::SeqCst)
    }

    pub fn recv_count(&self) -> usize {
        self.recv_calls.load(Ordering::SeqCst)
    }
}

impl TransportAdapter for MockTransport {
    fn create_socket(&self, _socket_type: SocketType) -> Result<Handle, i32> {
        match self.create_rc.load(Ordering::SeqCst) {
            rc if rc < 0 => Err(rc),
            _ => Ok(Handle::new(self.next_handle.fetch_add(1, Ordering::SeqCst))),
        }
    }

    fn destroy(&self, _handle: Handle) {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn bind(&self, _handle: Handle, _address: &str) -> i32 {
        let delay = self.bind_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        self.bind_rc.load(Ordering::SeqCst)
    }

    fn connect(&self, _handle: Handle, _address: &str) -> i32 {
        self.connect_rc.load(Ordering::SeqCst)
    }

    fn unbind(&self, _handle: Handle, _address: &str) -> i32 {
        self.unbind_rc.load(Ordering::SeqCst)
    }

    fn recv(&self, _handle: Handle, timeout: Option<Duration>) -> Result<Option<Bytes>, i32> {
        self.recv_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(outcome) = self.recv_script.lock().pop_front() {
            return outcome;
        }
        std::thread::sleep(timeout.unwrap_or(Duration::from_millis(5)));
        Ok(None)
    }

    fn send(&self, _handle: Handle, payload: &[u8]) -> i32 {
        let rc = self.send_rc.load(Ordering::SeqCst);
        if rc >= 0 {
            self.sent.lock().push(Bytes::copy_from_slice(payload));
        }
        rc
    }

    fn set_option(&self, _handle: Handle, option: &SocketOption) -> i32 {
        self.options.lock().push(option.clone());
        self.option_rc.load(Ordering::SeqCst)
    }

    /// Reads report `option_rc` as an integer value, or fail with it.
    fn get_option(&self, _handle: Handle, _name: OptionName) -> Result<OptionValue, i32> {
        match self.option_rc.load(Ordering::SeqCst) {
            rc if rc < 0 => Err(rc),
            rc => Ok(OptionValue::Int(rc)),
        }
    }

    fn strerror(&self, code: i32) -> String {
        format!("mock error {code}")
    }
}

/// Records every event delivered to the listeners it is attached to.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<SocketEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to all event kinds of `socket`.
    pub fn attach<T: TransportAdapter>(&self, socket: &ManagedSocket<T>) {
        for kind in EventKind::ALL {
            let events = Arc::clone(&self.events);
            socket.on(kind, move |event| events.lock().push(event.clone()));
        }
    }

    pub fn events(&self) -> Vec<SocketEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(SocketEvent::kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }
}

/// Options with short timings so tests stay fast.
pub fn fast_options() -> SocketOptions {
    SocketOptions::new()
        .with_send_settle(Duration::from_millis(20))
        .with_recv_poll_interval(Duration::from_millis(5))
}
