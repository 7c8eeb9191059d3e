// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Convergence polling.
//!
//! [`poll_until`] is the one polling loop in the crate: wait the policy's
//! initial delay, evaluate, and keep re-evaluating every poll interval until
//! the condition holds or the maximum wait is used up. The last sleep is
//! clamped to the time remaining, so a deadline is never overshot by more than
//! one evaluation.
//!
//! [`await_convergence`] drives it with the resource enumerator, and
//! [`cleanup`] runs a full sweep: one deletion pass over every namespace, then
//! a convergence wait per namespace.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{InconclusivePolicy, RetryPolicy};
use crate::context::Context;
use crate::enumerator::enumerate;
use crate::errors::{require_namespace, HarnessError, Result};
use crate::kinds::{tracked_kinds, ResourceKind};
use crate::orchestrator::{delete_artifacts, DeletionSummary};

/// A polled condition held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Time from the start of the wait to the successful evaluation
    pub elapsed: Duration,
    /// Number of evaluations, including the successful one
    pub attempts: u32,
}

/// Poll `condition` on the schedule given by `policy`.
///
/// # Errors
///
/// - [`HarnessError::Config`] if the policy's poll interval is zero
/// - [`HarnessError::Timeout`] if the condition still does not hold once
///   `max_wait` has elapsed
pub async fn poll_until<F, Fut>(
    policy: &RetryPolicy,
    description: &str,
    mut condition: F,
) -> Result<PollOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    policy.validate()?;

    let start = Instant::now();
    let max_wait = policy.max_wait();
    tokio::time::sleep(policy.initial_delay()).await;

    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        if condition().await {
            let elapsed = start.elapsed();
            debug!(
                description = %description,
                elapsed_secs = elapsed.as_secs(),
                attempts,
                "Condition met"
            );
            return Ok(PollOutcome { elapsed, attempts });
        }

        let elapsed = start.elapsed();
        if elapsed >= max_wait {
            return Err(HarnessError::Timeout {
                description: description.to_string(),
                elapsed,
                attempts,
            });
        }

        let remaining = max_wait - elapsed;
        info!(
            "Waiting for {} (elapsed time {}s, remaining time {}s)",
            description,
            elapsed.as_secs(),
            remaining.as_secs()
        );
        tokio::time::sleep(policy.poll_interval().min(remaining)).await;
    }
}

/// Wait until no tracked kind in `namespace` reports remaining objects.
///
/// # Errors
///
/// - [`HarnessError::InvalidInput`] for an empty namespace
/// - [`HarnessError::Timeout`] if artifacts remain after `policy.max_wait`
pub async fn await_convergence(
    namespace: &str,
    kinds: &[Box<dyn ResourceKind>],
    policy: &RetryPolicy,
    inconclusive: InconclusivePolicy,
) -> Result<PollOutcome> {
    let namespace = require_namespace(namespace)?;
    let description = format!("artifacts in namespace {namespace} to be deleted");

    poll_until(policy, &description, move || async move {
        match enumerate(namespace, kinds).await {
            Ok(report) if report.is_converged(inconclusive) => true,
            Ok(report) => {
                debug!(
                    namespace = %namespace,
                    present = ?report.present_kinds(),
                    inconclusive = report.has_inconclusive(),
                    "Artifacts remain"
                );
                false
            }
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "Failed to enumerate artifacts");
                false
            }
        }
    })
    .await
}

/// How waiting for one namespace ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Convergence {
    Converged(PollOutcome),
    /// Artifacts remained when the wait gave up; holds the timeout message
    TimedOut(String),
}

/// Cleanup result for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceCleanup {
    pub namespace: String,
    pub deletion: DeletionSummary,
    pub convergence: Convergence,
}

/// Result of a full cleanup sweep, one entry per namespace in input order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CleanupReport {
    pub namespaces: Vec<NamespaceCleanup>,
}

impl CleanupReport {
    /// True if every namespace converged.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.namespaces
            .iter()
            .all(|ns| matches!(ns.convergence, Convergence::Converged(_)))
    }

    /// Namespaces whose artifacts were still present when the wait gave up.
    #[must_use]
    pub fn timed_out(&self) -> Vec<&str> {
        self.namespaces
            .iter()
            .filter(|ns| matches!(ns.convergence, Convergence::TimedOut(_)))
            .map(|ns| ns.namespace.as_str())
            .collect()
    }
}

/// Delete every tracked artifact in `namespaces` and wait for each to empty.
///
/// Timeouts do not fail the call; they are logged and recorded in the
/// returned report.
///
/// # Errors
///
/// Returns [`HarnessError::InvalidInput`] for an empty namespace name and
/// [`HarnessError::Config`] for an unusable cleanup policy.
pub async fn cleanup(ctx: &Context, namespaces: &[String]) -> Result<CleanupReport> {
    let kinds = tracked_kinds(ctx);
    cleanup_with_kinds(
        namespaces,
        &kinds,
        &ctx.config.cleanup,
        ctx.config.inconclusive,
    )
    .await
}

/// [`cleanup`] over an explicit kind table and schedule.
///
/// # Errors
///
/// Same as [`cleanup`].
pub async fn cleanup_with_kinds(
    namespaces: &[String],
    kinds: &[Box<dyn ResourceKind>],
    policy: &RetryPolicy,
    inconclusive: InconclusivePolicy,
) -> Result<CleanupReport> {
    policy.validate()?;
    info!("Cleaning up artifacts in namespaces {:?}", namespaces);

    let deletions = delete_artifacts(namespaces, kinds).await?;

    let mut report = CleanupReport::default();
    for deletion in deletions {
        let convergence =
            match await_convergence(&deletion.namespace, kinds, policy, inconclusive).await {
                Ok(outcome) => {
                    info!(
                        namespace = %deletion.namespace,
                        elapsed_secs = outcome.elapsed.as_secs(),
                        "Namespace cleaned up"
                    );
                    Convergence::Converged(outcome)
                }
                Err(e @ HarnessError::Timeout { .. }) => {
                    warn!(namespace = %deletion.namespace, "{}", e);
                    Convergence::TimedOut(e.to_string())
                }
                Err(e) => return Err(e),
            };

        report.namespaces.push(NamespaceCleanup {
            namespace: deletion.namespace.clone(),
            deletion,
            convergence,
        });
    }

    Ok(report)
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod poller_tests;
