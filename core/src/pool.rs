//! Worker pools that run pooled calls off the caller's thread.

use std::sync::Arc;

use tracing::{debug, error};

use crate::error::ApiError;

/// A unit of work submitted to an executor.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs jobs on some set of worker threads.
pub trait Executor: Send + Sync {
    fn execute(&self, job: Job);
}

impl Executor for rayon::ThreadPool {
    fn execute(&self, job: Job) {
        self.spawn(job);
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(&self, job: Job) {
        (**self).execute(job);
    }
}

/// Build a rayon pool with `workers` named threads.
pub fn worker_pool(workers: usize) -> Result<rayon::ThreadPool, ApiError> {
    let workers = workers.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|index| format!("restbind-worker-{index}"))
        .panic_handler(|_| error!("worker job panicked"))
        .build()
        .map_err(|e| ApiError::Pool(e.to_string()))?;
    debug!(workers, "started worker pool");
    Ok(pool)
}
