//! Process-wide libzmq context.
//!
//! Every native socket keeps an `Arc` of the shared context. The registry
//! itself only holds a `Weak`, so the context is created by the first socket
//! and terminated once the last socket holding it is destroyed. A later socket
//! starts a fresh context.
//!
//! Context options set here apply to the live context and are replayed on
//! every context created later.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

use crate::rc;

/// libzmq's default IO thread pool size
pub const DEFAULT_IO_THREADS: i32 = 1;

struct SharedContext {
    live: Weak<zmq::Context>,
    /// Replayed on every new context
    io_threads: Option<i32>,
}

/// Global slot for the live context
static SHARED_CONTEXT: once_cell::sync::Lazy<Mutex<SharedContext>> =
    once_cell::sync::Lazy::new(|| {
        Mutex::new(SharedContext {
            live: Weak::new(),
            io_threads: None,
        })
    });

/// Get the live context, creating it if no socket currently holds one.
pub fn acquire() -> Arc<zmq::Context> {
    let mut shared = SHARED_CONTEXT.lock();
    if let Some(context) = shared.live.upgrade() {
        return context;
    }

    let context = zmq::Context::new();
    if let Some(threads) = shared.io_threads {
        if let Err(e) = context.set_io_threads(threads) {
            warn!(threads, error = %e, "[zmq] could not apply IO thread count");
        }
    }
    let context = Arc::new(context);
    shared.live = Arc::downgrade(&context);
    debug!("[zmq] context created");
    context
}

/// True while at least one holder keeps the context alive.
pub fn is_active() -> bool {
    SHARED_CONTEXT.lock().live.strong_count() > 0
}

/// IO thread pool size of the live context, or the size the next context
/// will be created with.
pub fn io_threads() -> Result<i32, i32> {
    let shared = SHARED_CONTEXT.lock();
    match shared.live.upgrade() {
        Some(context) => context.get_io_threads().map_err(rc),
        None => Ok(shared.io_threads.unwrap_or(DEFAULT_IO_THREADS)),
    }
}

/// Set the IO thread pool size. libzmq only honors it before the context's
/// first socket, so it takes full effect on the next context.
///
/// Fails with `-EINVAL` for a negative count.
pub fn set_io_threads(threads: i32) -> Result<(), i32> {
    if threads < 0 {
        return Err(rc(zmq::Error::EINVAL));
    }

    let mut shared = SHARED_CONTEXT.lock();
    if let Some(context) = shared.live.upgrade() {
        context.set_io_threads(threads).map_err(rc)?;
    }
    shared.io_threads = Some(threads);
    debug!(threads, "[zmq] IO threads configured");
    Ok(())
}
