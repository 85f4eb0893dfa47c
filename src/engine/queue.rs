//! Latest-wins coalescing queue.
//!
//! At most one run executes at a time and at most one submission waits behind
//! it. A submission that arrives while another is waiting replaces it; the
//! replaced submission resolves to [`Submission::Superseded`] without running.
//!
//! ```text
//!            submit                 submit                  submit
//!   Idle ──────────────► Running ──────────► RunningWithPending ──┐
//!    ▲                     │  ▲                    │     ▲        │ replace,
//!    │   run done,         │  │   run done,        │     └────────┘ supersede old
//!    └── nothing pending ──┘  └── start pending ───┘
//! ```
//!
//! Completion with a pending submission starts it immediately, without a new
//! external trigger, until a run finishes with nothing pending.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::error::QueueError;

type BoxedRun<R> = Pin<Box<dyn Future<Output = R> + Send>>;
type Runner<T, R> = Arc<dyn Fn(T) -> BoxedRun<R> + Send + Sync>;

/// How a submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission<R> {
    /// The submission ran and produced this result
    Completed(R),

    /// A newer submission replaced this one before it ran
    Superseded,
}

/// Handle to the outcome of one submission.
#[derive(Debug)]
pub struct Ticket<R> {
    rx: oneshot::Receiver<Submission<R>>,
}

impl<R> Ticket<R> {
    /// Wait for the submission to run or be superseded.
    ///
    /// Fails with [`QueueError::Aborted`] if the run panicked.
    pub async fn outcome(self) -> Result<Submission<R>, QueueError> {
        self.rx.await.map_err(|_| QueueError::Aborted)
    }
}

struct Job<T, R> {
    item: T,
    reply: oneshot::Sender<Submission<R>>,
}

enum PendingWork<T, R> {
    Idle,
    Running,
    RunningWithPending(Job<T, R>),
}

/// A one-slot mailbox in front of an async runner.
pub struct CoalescingQueue<T, R> {
    state: Arc<Mutex<PendingWork<T, R>>>,
    runner: Runner<T, R>,
}

impl<T, R> CoalescingQueue<T, R>
where
    T: Send + 'static,
    R: Send + 'static,
{
    /// Create a queue whose runs are executed by `runner`.
    pub fn new<F, Fut>(runner: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        Self {
            state: Arc::new(Mutex::new(PendingWork::Idle)),
            runner: Arc::new(move |item: T| -> BoxedRun<R> { Box::pin(runner(item)) }),
        }
    }

    /// Submit an item. Must be called from within a tokio runtime.
    ///
    /// If the queue is idle the item starts running right away. Otherwise it
    /// becomes the pending item, superseding any item already pending.
    pub fn submit(&self, item: T) -> Ticket<R> {
        let (reply, rx) = oneshot::channel();
        let job = Job { item, reply };

        let mut state = lock(&self.state);
        match std::mem::replace(&mut *state, PendingWork::Running) {
            PendingWork::Idle => {
                drop(state);
                debug!("Queue idle, starting run");
                self.spawn_drive(job);
            }
            PendingWork::Running => {
                debug!("Run in progress, submission pending");
                *state = PendingWork::RunningWithPending(job);
            }
            PendingWork::RunningWithPending(replaced) => {
                *state = PendingWork::RunningWithPending(job);
                drop(state);
                debug!("Pending submission superseded");
                // The caller may have stopped waiting
                let _ = replaced.reply.send(Submission::Superseded);
            }
        }

        Ticket { rx }
    }

    /// Whether a run is currently executing.
    pub fn is_running(&self) -> bool {
        !matches!(*lock(&self.state), PendingWork::Idle)
    }

    /// Whether a submission is waiting behind the current run.
    pub fn has_pending(&self) -> bool {
        matches!(*lock(&self.state), PendingWork::RunningWithPending(_))
    }

    fn spawn_drive(&self, first: Job<T, R>) {
        let state = self.state.clone();
        let runner = self.runner.clone();

        tokio::spawn(async move {
            let mut job = first;
            loop {
                let Job { item, reply } = job;

                // Run on its own task so a panic does not take the drive loop
                // down with it.
                match tokio::spawn(runner(item)).await {
                    Ok(result) => {
                        let _ = reply.send(Submission::Completed(result));
                    }
                    Err(e) => {
                        error!("Queued run aborted: {}", e);
                        drop(reply);
                    }
                }

                let mut guard = lock(&state);
                match std::mem::replace(&mut *guard, PendingWork::Idle) {
                    PendingWork::RunningWithPending(next) => {
                        *guard = PendingWork::Running;
                        debug!("Starting pending run");
                        job = next;
                    }
                    _ => {
                        debug!("Queue drained");
                        break;
                    }
                }
            }
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
