// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Time-bounded background work.
//!
//! [`run_bounded`] runs a future as its own tokio task and waits for it up to
//! a deadline. The task's `JoinHandle` is the single completion signal: when
//! the deadline passes first, the handle is aborted and the caller moves on.
//!
//! An aborted task is abandoned, not guaranteed stopped. Cancellation takes
//! effect at the task's next await point; work stuck in blocking I/O keeps
//! running until it yields.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{debug, warn};

/// How a bounded task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundedOutcome<T> {
    /// The task finished in time with this value
    Completed(T),
    /// The deadline passed; the task was aborted
    TimedOut,
    /// The task panicked or was cancelled from elsewhere
    Failed(String),
}

impl<T> BoundedOutcome<T> {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Run `task` on the runtime, waiting at most `timeout` for it.
pub async fn run_bounded<T, F>(name: &str, timeout: Duration, task: F) -> BoundedOutcome<T>
where
    T: Send + 'static,
    F: Future<Output = T> + Send + 'static,
{
    debug!(task = %name, timeout_secs = timeout.as_secs(), "Starting bounded task");
    let mut handle = tokio::spawn(task);

    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(value)) => BoundedOutcome::Completed(value),
        Ok(Err(e)) => {
            let reason = join_failure(e);
            warn!(task = %name, "Bounded task failed: {}", reason);
            BoundedOutcome::Failed(reason)
        }
        Err(_) => {
            handle.abort();
            warn!(
                task = %name,
                "Task did not finish within {}s, abandoning it",
                timeout.as_secs()
            );
            BoundedOutcome::TimedOut
        }
    }
}

fn join_failure(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let panic = err.into_panic();
    let msg = if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    format!("panicked: {msg}")
}

#[cfg(test)]
#[path = "bounded_tests.rs"]
mod bounded_tests;
