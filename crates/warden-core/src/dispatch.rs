//! Main-thread dispatch: a FIFO of closures that any thread may enqueue
//! and only the simulation thread drains.
//!
//! Producers call [`DispatchQueue::enqueue`] and get a [`TaskHandle`]
//! back immediately. The simulation thread calls
//! [`DispatchQueue::drain_all`] once per tick with its mutable context.
//! The drain swaps the whole pending batch out under the lock and runs it
//! with the lock released, so tasks enqueued while a drain is in progress
//! run on the next drain.
//!
//! A panicking task is caught at the drain boundary. Its handle resolves
//! to [`DispatchError::Panicked`] and the rest of the batch still runs.
//!
//! Once the owner stops draining it calls [`DispatchQueue::close`]. Tasks
//! still pending, and any enqueued afterwards, resolve to
//! [`DispatchError::Abandoned`] instead of waiting forever.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;
use tracing::{debug, error, trace, warn};

/// Failure delivered to a task's waiter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The task body panicked.
    #[error("task panicked: {message}")]
    Panicked {
        /// The panic payload, when it was a string.
        message: String,
    },

    /// The queue was closed or dropped before the task ran.
    #[error("task abandoned before it ran")]
    Abandoned,
}

/// Lifecycle of a dispatch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    /// Queued, not yet picked up by a drain.
    Pending = 0,
    /// Executing on the simulation thread.
    Running = 1,
    /// Finished and its result was delivered.
    Completed = 2,
    /// Panicked, or abandoned by a closed queue.
    Failed = 3,
}

impl TaskState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Completed,
            _ => Self::Failed,
        }
    }
}

/// Counts from one [`DispatchQueue::drain_all`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Tasks executed, including failed ones.
    pub ran: u32,
    /// Tasks that panicked.
    pub failed: u32,
}

/// Type-erased task body. Returns the panic message on failure.
type Job<S> = Box<dyn FnOnce(&mut S) -> Result<(), String> + Send>;

struct DispatchTask<S> {
    seq: u64,
    enqueued_at: DateTime<Utc>,
    state: Arc<AtomicU8>,
    job: Job<S>,
}

struct Pending<S> {
    tasks: Vec<DispatchTask<S>>,
    next_seq: u64,
    closed: bool,
}

/// Multi-producer, single-consumer task queue over a context `S`.
///
/// Share it behind an [`Arc`]; the queue itself holds no reference to the
/// context, which is passed in by the drainer.
pub struct DispatchQueue<S> {
    pending: Mutex<Pending<S>>,
}

impl<S> Default for DispatchQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for DispatchQueue<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchQueue")
            .field("pending", &self.len())
            .finish()
    }
}

impl<S> DispatchQueue<S> {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            pending: Mutex::new(Pending {
                tasks: Vec::new(),
                next_seq: 0,
                closed: false,
            }),
        }
    }

    /// Queue `f` for the next drain and return a handle to its result.
    ///
    /// Never blocks beyond the append. Sequence numbers are assigned under
    /// the same lock as the append, so sequence order is execution order.
    /// On a closed queue the task is never stored and the handle resolves
    /// to [`DispatchError::Abandoned`] at once.
    pub fn enqueue<R, F>(&self, f: F) -> TaskHandle<R>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let state = Arc::new(AtomicU8::new(TaskState::Pending as u8));

        // The terminal state is stored before the result is sent, so a woken
        // waiter never observes `Running`.
        let job_state = Arc::clone(&state);
        let job: Job<S> = Box::new(move |ctx: &mut S| {
            match panic::catch_unwind(AssertUnwindSafe(|| f(ctx))) {
                Ok(value) => {
                    job_state.store(TaskState::Completed as u8, Ordering::Release);
                    deliver(tx, Ok(value));
                    Ok(())
                }
                Err(payload) => {
                    let message = panic_message(&*payload);
                    job_state.store(TaskState::Failed as u8, Ordering::Release);
                    deliver(
                        tx,
                        Err(DispatchError::Panicked {
                            message: message.clone(),
                        }),
                    );
                    Err(message)
                }
            }
        });

        let mut pending = self.lock();
        let seq = pending.next_seq;
        pending.next_seq = seq.wrapping_add(1);
        if pending.closed {
            drop(pending);
            state.store(TaskState::Failed as u8, Ordering::Release);
            // Dropping the job drops its sender; the waiter sees `Abandoned`.
            drop(job);
            debug!(seq, "Task rejected, queue closed");
        } else {
            pending.tasks.push(DispatchTask {
                seq,
                enqueued_at: Utc::now(),
                state: Arc::clone(&state),
                job,
            });
            drop(pending);
            trace!(seq, "Task enqueued");
        }

        TaskHandle { seq, state, rx }
    }

    /// Run every task pending at the time of the call, in FIFO order, on
    /// the calling thread.
    pub fn drain_all(&self, ctx: &mut S) -> DrainReport {
        let batch = std::mem::take(&mut self.lock().tasks);
        let mut report = DrainReport::default();
        if batch.is_empty() {
            return report;
        }

        for task in batch {
            task.state.store(TaskState::Running as u8, Ordering::Release);
            let waited_ms = Utc::now()
                .signed_duration_since(task.enqueued_at)
                .num_milliseconds();
            report.ran = report.ran.saturating_add(1);

            match (task.job)(ctx) {
                Ok(()) => trace!(seq = task.seq, waited_ms, "Task completed"),
                Err(message) => {
                    report.failed = report.failed.saturating_add(1);
                    error!(seq = task.seq, waited_ms, panic = %message, "Dispatch task panicked");
                }
            }
        }

        debug!(ran = report.ran, failed = report.failed, "Dispatch drain complete");
        report
    }

    /// Stop accepting work. Tasks still pending are abandoned, as is
    /// anything enqueued later. Returns how many tasks were abandoned.
    pub fn close(&self) -> usize {
        let batch = {
            let mut pending = self.lock();
            pending.closed = true;
            std::mem::take(&mut pending.tasks)
        };
        let abandoned = batch.len();
        if abandoned > 0 {
            warn!(abandoned, "Dispatch queue closed with pending tasks");
        }
        abandon(batch);
        abandoned
    }

    /// Whether [`DispatchQueue::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Tasks waiting for the next drain.
    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Whether no task is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Pending<S>> {
        // Tasks never run under the lock, so a poisoned guard still holds
        // a consistent task list.
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S> Drop for DispatchQueue<S> {
    fn drop(&mut self) {
        let pending = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if pending.tasks.is_empty() {
            return;
        }
        warn!(abandoned = pending.tasks.len(), "Dispatch queue dropped with pending tasks");
        abandon(std::mem::take(&mut pending.tasks));
    }
}

fn abandon<S>(tasks: Vec<DispatchTask<S>>) {
    for task in tasks {
        task.state.store(TaskState::Failed as u8, Ordering::Release);
        // Dropping the job drops its sender; the waiter sees `Abandoned`.
    }
}

/// Caller-side view of a queued task.
#[derive(Debug)]
pub struct TaskHandle<R> {
    seq: u64,
    state: Arc<AtomicU8>,
    rx: oneshot::Receiver<Result<R, DispatchError>>,
}

impl<R> TaskHandle<R> {
    /// Sequence number assigned at enqueue time.
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Await the task's result.
    pub async fn wait(self) -> Result<R, DispatchError> {
        self.rx.await.unwrap_or(Err(DispatchError::Abandoned))
    }

    /// Block the current thread until the task's result is available.
    ///
    /// Must not be called from inside an async runtime.
    pub fn wait_blocking(self) -> Result<R, DispatchError> {
        self.rx.blocking_recv().unwrap_or(Err(DispatchError::Abandoned))
    }

    /// Take the result if it is already available.
    pub fn try_take(&mut self) -> Option<Result<R, DispatchError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(DispatchError::Abandoned)),
        }
    }
}

fn deliver<R>(tx: oneshot::Sender<Result<R, DispatchError>>, result: Result<R, DispatchError>) {
    if tx.send(result).is_err() {
        trace!("Task result dropped, waiter gone");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}
