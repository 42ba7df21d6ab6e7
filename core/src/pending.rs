//! Handles to calls still running on a worker pool.
//!
//! # Design
//! A `PendingResult` is the receiving end of a one-slot channel. Waiting with
//! a timeout has two distinct outcomes: `Outcome::Complete` carries whatever
//! the task produced (including its error), `Outcome::Incomplete` hands the
//! still-pending handle back. A timeout never cancels the task.

use std::cell::OnceCell;
use std::fmt;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::error::ApiError;

/// How long `PendingResult::result` waits before giving up.
pub const DEFAULT_ASYNC_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of waiting on a `PendingResult` with a timeout.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The task finished, successfully or not.
    Complete(Result<T, ApiError>),
    /// The task is still running; the handle can be waited on again.
    Incomplete(PendingResult<T>),
}

impl<T> Outcome<T> {
    pub fn is_complete(&self) -> bool {
        matches!(self, Outcome::Complete(_))
    }

    /// The task's result, if it finished.
    pub fn complete(self) -> Option<Result<T, ApiError>> {
        match self {
            Outcome::Complete(result) => Some(result),
            Outcome::Incomplete(_) => None,
        }
    }
}

/// A call dispatched to a worker pool that may not have finished yet.
pub struct PendingResult<T> {
    receiver: Receiver<Result<T, ApiError>>,
    received: OnceCell<Result<T, ApiError>>,
}

/// Sending half handed to the task that fills a `PendingResult`.
pub(crate) struct Completion<T> {
    sender: Sender<Result<T, ApiError>>,
}

impl<T> Completion<T> {
    pub(crate) fn complete(self, result: Result<T, ApiError>) {
        // The caller may have dropped the handle; the result is then unwanted.
        let _ = self.sender.send(result);
    }
}

impl<T> PendingResult<T> {
    pub(crate) fn channel() -> (Completion<T>, PendingResult<T>) {
        let (sender, receiver) = bounded(1);
        let pending = PendingResult {
            receiver,
            received: OnceCell::new(),
        };
        (Completion { sender }, pending)
    }

    /// A handle that is already complete.
    pub fn ready(result: Result<T, ApiError>) -> Self {
        let (completion, pending) = Self::channel();
        completion.complete(result);
        pending
    }

    /// Poll without blocking.
    pub fn is_complete(&self) -> bool {
        if self.received.get().is_some() {
            return true;
        }
        match self.receiver.try_recv() {
            Ok(result) => self.store(result),
            Err(TryRecvError::Empty) => false,
            Err(TryRecvError::Disconnected) => self.store(Err(ApiError::WorkerLost)),
        }
    }

    /// Wait at most `timeout` for the task to finish.
    pub fn wait_timeout(self, timeout: Duration) -> Outcome<T> {
        if self.received.get().is_some() {
            return Outcome::Complete(self.take());
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => Outcome::Complete(result),
            Err(RecvTimeoutError::Timeout) => Outcome::Incomplete(self),
            Err(RecvTimeoutError::Disconnected) => Outcome::Complete(Err(ApiError::WorkerLost)),
        }
    }

    /// Block until the task finishes.
    pub fn wait(self) -> Result<T, ApiError> {
        if self.received.get().is_some() {
            return self.take();
        }
        self.receiver.recv().unwrap_or(Err(ApiError::WorkerLost))
    }

    /// Wait up to `DEFAULT_ASYNC_TIMEOUT`, reporting an unfinished task as
    /// `ApiError::Timeout`.
    pub fn result(self) -> Result<T, ApiError> {
        self.result_within(DEFAULT_ASYNC_TIMEOUT)
    }

    /// Like `result`, with an explicit timeout.
    pub fn result_within(self, timeout: Duration) -> Result<T, ApiError> {
        match self.wait_timeout(timeout) {
            Outcome::Complete(result) => result,
            Outcome::Incomplete(_) => Err(ApiError::Timeout(timeout)),
        }
    }

    fn store(&self, result: Result<T, ApiError>) -> bool {
        let _ = self.received.set(result);
        true
    }

    fn take(self) -> Result<T, ApiError> {
        self.received.into_inner().unwrap_or(Err(ApiError::WorkerLost))
    }
}

impl<T> fmt::Debug for PendingResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResult")
            .field("complete", &self.received.get().is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn timeout_is_distinct_from_failure() {
        let (completion, pending) = PendingResult::<u32>::channel();
        let pending = match pending.wait_timeout(Duration::from_millis(20)) {
            Outcome::Incomplete(pending) => pending,
            Outcome::Complete(result) => panic!("nothing was sent yet: {result:?}"),
        };
        completion.complete(Err(ApiError::InvalidHeaders));
        match pending.wait_timeout(Duration::from_secs(1)) {
            Outcome::Complete(Err(ApiError::InvalidHeaders)) => {}
            other => panic!("expected the task's error, got {other:?}"),
        }
    }

    #[test]
    fn polling_caches_the_result() {
        let (completion, pending) = PendingResult::channel();
        assert!(!pending.is_complete());
        completion.complete(Ok(7));
        assert!(pending.is_complete());
        assert!(pending.is_complete());
        assert_eq!(pending.wait().unwrap(), 7);
    }

    #[test]
    fn result_reports_timeout() {
        let (_completion, pending) = PendingResult::<()>::channel();
        let err = pending.result_within(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, ApiError::Timeout(d) if d == Duration::from_millis(10)));
    }

    #[test]
    fn dropped_completion_is_worker_lost() {
        let (completion, pending) = PendingResult::<()>::channel();
        drop(completion);
        assert!(pending.is_complete());
        assert!(matches!(pending.wait(), Err(ApiError::WorkerLost)));
    }

    #[test]
    fn completes_from_another_thread() {
        let (completion, pending) = PendingResult::channel();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            completion.complete(Ok("done"));
        });
        assert_eq!(pending.result().unwrap(), "done");
    }

    #[test]
    fn ready_handles_are_complete() {
        let pending = PendingResult::ready(Ok(1));
        assert!(pending.is_complete());
        assert!(pending.wait_timeout(Duration::ZERO).is_complete());
    }
}
