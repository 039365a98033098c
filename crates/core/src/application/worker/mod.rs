// Worker Pool - bounded concurrent execution of pipeline runs

pub mod constants;
mod panic_guard;
mod shutdown;

pub use panic_guard::{execute_guarded, PanicGuardResult};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::domain::JobId;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use constants::PANIC_FAILURE_REASON;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

/// Work executed by the pool for one job id
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Drive the job to a terminal state
    async fn run(&self, job_id: &JobId) -> Result<()>;

    /// Force the job to Failed (used when a run panics)
    async fn fail(&self, job_id: &JobId, reason: &str);
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<JobId>>>;

/// Fixed-size pool of workers fed by an unbounded FIFO queue
///
/// The pool owns no job state; it only hands job ids to the runner.
pub struct WorkerPool {
    sender: Mutex<Option<mpsc::UnboundedSender<JobId>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    abort_handles: Vec<AbortHandle>,
    active: Arc<AtomicUsize>,
    queued: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Spawn `size` workers (at least one) on the current runtime
    pub fn start(size: usize, runner: Arc<dyn JobRunner>) -> Self {
        let size = size.max(1);
        let (tx, rx) = mpsc::unbounded_channel();
        let rx: SharedReceiver = Arc::new(tokio::sync::Mutex::new(rx));
        let active = Arc::new(AtomicUsize::new(0));
        let queued = Arc::new(AtomicUsize::new(0));

        let handles: Vec<JoinHandle<()>> = (0..size)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    Arc::clone(&rx),
                    Arc::clone(&runner),
                    Arc::clone(&active),
                    Arc::clone(&queued),
                ))
            })
            .collect();
        let abort_handles = handles.iter().map(JoinHandle::abort_handle).collect();

        info!(workers = size, "Worker pool started");

        Self {
            sender: Mutex::new(Some(tx)),
            handles: Mutex::new(handles),
            abort_handles,
            active,
            queued,
        }
    }

    /// Queue a job for execution (never blocks)
    ///
    /// # Errors
    /// - AppError::Conflict if the pool has been shut down
    pub fn submit(&self, job_id: JobId) -> Result<()> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = sender.as_ref() else {
            return Err(AppError::Conflict("Worker pool is shut down".to_string()));
        };

        self.queued.fetch_add(1, Ordering::SeqCst);
        if let Err(mpsc::error::SendError(job_id)) = tx.send(job_id) {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(AppError::Conflict(format!(
                "Worker pool stopped before accepting job {}",
                job_id
            )));
        }
        Ok(())
    }

    /// Close the queue and wait until queued and in-flight jobs have finished
    pub async fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);

        let handles: Vec<JoinHandle<()>> = std::mem::take(
            &mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner),
        );
        info!(
            queued = self.queued(),
            active = self.active(),
            "Draining worker pool"
        );

        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                if !e.is_cancelled() {
                    error!(error = %e, "Worker terminated abnormally");
                }
            }
        }
        info!("Worker pool drained");
    }

    /// Abort every worker immediately, abandoning in-flight and queued jobs
    pub fn cancel_all(&self) {
        drop(
            self.sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        for handle in &self.abort_handles {
            handle.abort();
        }
        warn!(
            queued = self.queued(),
            active = self.active(),
            "Worker pool cancelled"
        );
    }

    /// Jobs currently executing
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Jobs waiting for a free worker
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }
}

struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: SharedReceiver,
    runner: Arc<dyn JobRunner>,
    active: Arc<AtomicUsize>,
    queued: Arc<AtomicUsize>,
) {
    debug!(worker_id, "Worker started");
    loop {
        // The receiver lock is only held while waiting for the next id
        let next = rx.lock().await.recv().await;
        let Some(job_id) = next else {
            break;
        };

        queued.fetch_sub(1, Ordering::SeqCst);
        active.fetch_add(1, Ordering::SeqCst);
        let _active = ActiveGuard(Arc::clone(&active));

        debug!(worker_id, job_id = %job_id, "Worker picked up job");
        match execute_guarded(runner.run(&job_id)).await {
            PanicGuardResult::Success(Ok(())) => {}
            PanicGuardResult::Success(Err(e)) => {
                error!(worker_id, job_id = %job_id, error = %e, "Pipeline run failed");
            }
            PanicGuardResult::Panicked(msg) => {
                error!(worker_id, job_id = %job_id, panic_msg = %msg, "Pipeline run panicked");
                runner.fail(&job_id, PANIC_FAILURE_REASON).await;
            }
        }
    }
    debug!(worker_id, "Worker stopped");
}
