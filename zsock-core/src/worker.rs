//! Dedicated threads for blocking transport calls.
//!
//! Transport primitives block. Each [`Worker`] owns one OS thread that runs
//! submitted jobs in order; callers await the result through a flume channel,
//! so the async executor never blocks on the transport.

use std::io;
use std::thread;
use tracing::{debug, trace};

use crate::error::{Result, SocketError};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Commands sent from the owning socket to the worker thread
enum WorkerCommand {
    /// Run one blocking call
    Run(Job),
    /// Exit after the jobs already queued
    Shutdown,
}

/// A single OS thread running blocking jobs in submission order.
///
/// The thread exits when the `Worker` is dropped or [`shutdown`](Self::shutdown)
/// is called; jobs already queued still run.
pub struct Worker {
    name: String,
    tx: flume::Sender<WorkerCommand>,
}

impl Worker {
    /// Spawn a named worker thread.
    pub fn spawn(name: impl Into<String>) -> io::Result<Self> {
        let name = name.into();
        let (tx, rx) = flume::unbounded();
        let thread_name = name.clone();

        thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_thread(&thread_name, rx))?;

        Ok(Self { name, tx })
    }

    /// Thread name of this worker.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `job` on the worker thread and wait for its result.
    ///
    /// Fails with [`SocketError::WorkerGone`] if the thread has exited or the
    /// job panicked.
    pub async fn run<F, R>(&self, job: F) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = flume::bounded(1);
        let job: Job = Box::new(move || {
            let _ = reply_tx.send(job());
        });

        self.tx
            .send(WorkerCommand::Run(job))
            .map_err(|_| SocketError::WorkerGone)?;

        reply_rx.recv_async().await.map_err(|_| SocketError::WorkerGone)
    }

    /// Ask the thread to exit once its queue drains.
    pub fn shutdown(&self) {
        let _ = self.tx.send(WorkerCommand::Shutdown);
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker").field("name", &self.name).finish()
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_thread(name: &str, rx: flume::Receiver<WorkerCommand>) {
    debug!("[Worker {}] Starting", name);

    loop {
        match rx.recv() {
            Ok(WorkerCommand::Run(job)) => {
                trace!("[Worker {}] Running job", name);
                job();
            }
            Ok(WorkerCommand::Shutdown) => {
                debug!("[Worker {}] Shutting down", name);
                break;
            }
            Err(_) => {
                debug!("[Worker {}] Channel closed, exiting", name);
                break;
            }
        }
    }

    debug!("[Worker {}] Stopped", name);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[compio::test]
    async fn test_run_returns_job_result() {
        let worker = Worker::spawn("test-worker").unwrap();
        let value = worker.run(|| 2 + 3).await.unwrap();
        assert_eq!(value, 5);
    }

    #[compio::test]
    async fn test_jobs_run_off_the_caller_thread() {
        let worker = Worker::spawn("off-thread").unwrap();
        let name = worker
            .run(|| thread::current().name().map(str::to_owned))
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("off-thread"));
    }

    #[compio::test]
    async fn test_jobs_run_in_order() {
        let worker = Worker::spawn("ordered").unwrap();
        let (tx, rx) = flume::unbounded();
        for i in 0..5 {
            let tx = tx.clone();
            worker.run(move || tx.send(i).unwrap()).await.unwrap();
        }
        let seen: Vec<i32> = rx.try_iter().collect();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[compio::test]
    async fn test_panicking_job_reports_worker_gone() {
        let worker = Worker::spawn("panicky").unwrap();
        let result: Result<()> = worker.run(|| panic!("transport blew up")).await;
        assert!(matches!(result, Err(SocketError::WorkerGone)));
    }

    #[compio::test]
    async fn test_run_after_shutdown_fails() {
        let worker = Worker::spawn("stopped").unwrap();
        worker.shutdown();
        // Give the thread a moment to drain and exit.
        compio::time::sleep(std::time::Duration::from_millis(20)).await;
        let result = worker.run(|| ()).await;
        assert!(matches!(result, Err(SocketError::WorkerGone)));
    }
}
