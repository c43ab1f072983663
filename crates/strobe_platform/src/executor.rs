//! Serial UI executors
//!
//! A [`UiExecutor`] accepts closures from any thread and runs them later,
//! one at a time and strictly in submission order, on the thread that owns
//! the UI. Two implementations are provided:
//!
//! - [`ThreadExecutor`] - owns a dedicated, named UI thread
//! - [`ManualExecutor`] - queues work until the owner drains it on its own
//!   thread (event-loop integration and deterministic tests)

use crate::error::{PlatformError, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle, ThreadId};

/// A unit of work posted to the UI thread
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Single-threaded dispatcher that owns the UI
///
/// Posting is fire-and-forget. Tasks from all posters run in one global FIFO
/// order. The only failure is an executor that has already shut down.
/// Implementations must never run a task inline inside `post`.
pub trait UiExecutor: Send + Sync {
    /// Enqueue `task` for later execution on the UI thread
    fn post(&self, task: UiTask) -> Result<()>;
}

/// Run a task, keeping the executor alive if it panics
fn run_task(task: UiTask) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        tracing::error!("UI task panicked: {}", panic_message(payload.as_ref()));
    }
}

/// Best-effort extraction of a panic payload message
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

// ============================================================================
// Thread Executor
// ============================================================================

/// Executor backed by a dedicated UI thread
///
/// The thread drains an mpsc channel in order until the executor is shut
/// down (explicitly or on drop). Shutdown lets already-posted tasks finish.
///
/// ```ignore
/// let executor = ThreadExecutor::spawn("strobe-ui")?;
/// executor.post(Box::new(|| println!("on the UI thread")))?;
/// executor.flush()?;
/// ```
pub struct ThreadExecutor {
    sender: Mutex<Option<mpsc::Sender<UiTask>>>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
    thread_id: ThreadId,
}

impl ThreadExecutor {
    /// Spawn the UI thread with the given name
    pub fn spawn(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<UiTask>();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                tracing::debug!("UI executor thread started");
                for task in receiver {
                    run_task(task);
                }
                tracing::debug!("UI executor thread exiting");
            })
            .map_err(|e| PlatformError::ExecutorSpawn(format!("{}: {}", name, e)))?;

        Ok(Self {
            thread_id: handle.thread().id(),
            sender: Mutex::new(Some(sender)),
            thread_handle: Mutex::new(Some(handle)),
        })
    }

    /// Whether the caller is running on this executor's UI thread
    pub fn is_executor_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Block until every task posted before this call has run
    ///
    /// Must not be called from the UI thread itself.
    pub fn flush(&self) -> Result<()> {
        if self.is_executor_thread() {
            return Err(PlatformError::Other(
                "flush() called from the UI executor thread".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel();
        self.post(Box::new(move || {
            let _ = tx.send(());
        }))?;
        rx.recv().map_err(|_| PlatformError::ExecutorClosed)
    }

    /// Stop accepting work and join the UI thread after it drains its queue
    pub fn shutdown(&self) {
        // Dropping the sender ends the receive loop once the queue is empty
        self.sender.lock().take();

        if self.is_executor_thread() {
            return;
        }
        if let Some(handle) = self.thread_handle.lock().take() {
            if handle.join().is_err() {
                tracing::warn!("UI executor thread terminated abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.sender.lock().is_some()
    }
}

impl UiExecutor for ThreadExecutor {
    fn post(&self, task: UiTask) -> Result<()> {
        match self.sender.lock().as_ref() {
            Some(sender) => sender.send(task).map_err(|_| PlatformError::ExecutorClosed),
            None => Err(PlatformError::ExecutorClosed),
        }
    }
}

impl Drop for ThreadExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// Manual Executor
// ============================================================================

/// Executor whose queue is drained explicitly by its owner
///
/// Whichever thread calls [`ManualExecutor::run_until_idle`] acts as the UI
/// thread. Useful for embedding into a foreign event loop and for tests that
/// need full control over when UI work happens.
#[derive(Default)]
pub struct ManualExecutor {
    queue: Mutex<VecDeque<UiTask>>,
    closed: AtomicBool,
}

impl ManualExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run the oldest queued task, returning false if the queue was empty
    pub fn run_one(&self) -> bool {
        // Lock is released before running so tasks may post more work
        let task = self.queue.lock().pop_front();
        match task {
            Some(task) => {
                run_task(task);
                true
            }
            None => false,
        }
    }

    /// Run queued tasks (including ones posted while running) until empty
    ///
    /// Returns the number of tasks executed.
    pub fn run_until_idle(&self) -> usize {
        let mut count = 0;
        while self.run_one() {
            count += 1;
        }
        count
    }

    /// Reject all further posts and discard queued work
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.queue.lock().clear();
    }
}

impl UiExecutor for ManualExecutor {
    fn post(&self, task: UiTask) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PlatformError::ExecutorClosed);
        }
        self.queue.lock().push_back(task);
        Ok(())
    }
}
