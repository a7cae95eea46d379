use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;
use log::{trace, warn};
use tokio::sync::oneshot;

use crate::errors::SessionError;

struct StackInner {
    queue: Vec<BoxFuture<'static, ()>>,
    running: bool,
    closed: bool,
}

/// Single-slot execution stack: at most one job runs at a time, queued jobs
/// are serviced most-recent-first.
///
/// LIFO is deliberate. The most recently issued request corresponds to the
/// user's latest action and must win over older, possibly abandoned backlog;
/// very old queued entries may starve under sustained load, which is the
/// accepted trade-off. The running slot is always drained before the next
/// pop, even when a job panics.
#[derive(Clone)]
pub struct OrderingStack {
    inner: Arc<Mutex<StackInner>>,
}

impl OrderingStack {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StackInner {
                queue: Vec::new(),
                running: false,
                closed: false,
            })),
        }
    }

    /// Enqueue `job` and await its outcome. The job starts once every job
    /// queued after it (and the one currently running) has finished or been
    /// popped ahead of it. Returns [`SessionError::Closed`] if the stack is
    /// closed before the job completes.
    pub async fn run<T, F>(&self, job: F) -> Result<T, SessionError>
    where
        F: std::future::Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let wrapped: BoxFuture<'static, ()> = async move {
            match AssertUnwindSafe(job).catch_unwind().await {
                Ok(value) => {
                    let _ = tx.send(value);
                }
                Err(_) => {
                    // Dropping the sender surfaces Closed to the waiter; the
                    // drain loop below keeps servicing the queue.
                    warn!("ordering stack: job panicked");
                }
            }
        }
        .boxed();

        let start_drain = {
            let mut inner = self.inner.lock().unwrap();
            if inner.closed {
                return Err(SessionError::Closed);
            }
            inner.queue.push(wrapped);
            if inner.running {
                false
            } else {
                inner.running = true;
                true
            }
        };

        if start_drain {
            let inner = self.inner.clone();
            tokio::spawn(async move {
                loop {
                    let job = {
                        let mut guard = inner.lock().unwrap();
                        match guard.queue.pop() {
                            Some(job) => job,
                            None => {
                                guard.running = false;
                                break;
                            }
                        }
                    };
                    trace!("ordering stack: job starting");
                    job.await;
                }
            });
        }

        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Discard every queued job; their waiters observe [`SessionError::Closed`].
    /// A job already in its running slot finishes undisturbed.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        inner.queue.clear();
    }

    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.inner.lock().unwrap().running
    }
}

impl Default for OrderingStack {
    fn default() -> Self {
        Self::new()
    }
}
