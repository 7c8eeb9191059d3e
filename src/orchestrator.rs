// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Deletion orchestrator: one best-effort delete pass per namespace.
//!
//! For every namespace, every tracked kind is listed and each listed object
//! gets exactly one delete-by-name call. Nothing is retried within a pass;
//! whatever survives is for the convergence poller to notice.
//!
//! # Ordering
//!
//! Kinds are processed in table order, except that kinds with
//! [`KindScope::Namespace`] always run after every other kind. Children are
//! deleted explicitly before the namespace rather than relying on the
//! namespace's cascade alone.
//!
//! # Failure Handling
//!
//! - A delete answered with 404 counts as already gone
//! - Any other delete failure is logged and recorded, and the pass moves on
//! - A list failure skips that kind for this pass and is recorded

use tracing::{debug, info, warn};

use crate::errors::{is_not_found, require_namespace, Result};
use crate::kinds::{KindScope, ResourceKind};

/// What the pass did for one kind in one namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindDeletion {
    pub kind: String,
    /// Objects whose delete call succeeded
    pub deleted: Vec<String>,
    /// Objects already gone when their delete call landed
    pub already_gone: Vec<String>,
    /// Objects whose delete call failed, with the error
    pub failed: Vec<(String, String)>,
    /// Set when the kind could not be listed
    pub list_error: Option<String>,
}

impl KindDeletion {
    fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Self::default()
        }
    }

    /// True if nothing went wrong for this kind.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.list_error.is_none()
    }
}

/// Outcome of one pass over one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionSummary {
    pub namespace: String,
    /// Per-kind outcomes in the order the kinds were processed
    pub kinds: Vec<KindDeletion>,
}

impl DeletionSummary {
    /// True if every kind listed and every delete succeeded or found nothing.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.kinds.iter().all(KindDeletion::is_clean)
    }

    /// Total number of delete calls that succeeded.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.kinds.iter().map(|k| k.deleted.len()).sum()
    }

    /// Outcome recorded for `kind`.
    #[must_use]
    pub fn kind(&self, kind: &str) -> Option<&KindDeletion> {
        self.kinds.iter().find(|k| k.kind == kind)
    }
}

/// Kinds in processing order: everything else first, the namespace last.
fn processing_order(kinds: &[Box<dyn ResourceKind>]) -> Vec<&dyn ResourceKind> {
    let (namespace_kinds, others): (Vec<&dyn ResourceKind>, Vec<&dyn ResourceKind>) = kinds
        .iter()
        .map(AsRef::as_ref)
        .partition(|kind| kind.scope() == KindScope::Namespace);
    others.into_iter().chain(namespace_kinds).collect()
}

/// Run one delete pass over a single namespace.
///
/// # Errors
///
/// Returns [`crate::errors::HarnessError::InvalidInput`] for an empty
/// namespace; API failures are recorded in the summary instead.
pub async fn delete_namespace_artifacts(
    namespace: &str,
    kinds: &[Box<dyn ResourceKind>],
) -> Result<DeletionSummary> {
    let namespace = require_namespace(namespace)?;
    info!("Cleaning up artifacts in namespace {}", namespace);

    let mut summary = DeletionSummary {
        namespace: namespace.to_string(),
        kinds: Vec::with_capacity(kinds.len()),
    };

    for kind in processing_order(kinds) {
        let mut outcome = KindDeletion::new(kind.name());

        let names = match kind.list(namespace).await {
            Ok(names) => names,
            Err(e) if is_not_found(&e) => Vec::new(),
            Err(e) => {
                warn!(
                    namespace = %namespace,
                    kind = %kind.name(),
                    error = %e,
                    "Failed to cleanup {}", kind.name()
                );
                outcome.list_error = Some(e.to_string());
                summary.kinds.push(outcome);
                continue;
            }
        };

        for name in names {
            match kind.delete(namespace, &name).await {
                Ok(()) => {
                    debug!(namespace = %namespace, kind = %kind.name(), name = %name, "Deleted");
                    outcome.deleted.push(name);
                }
                Err(e) if is_not_found(&e) => {
                    debug!(namespace = %namespace, kind = %kind.name(), name = %name, "Already absent");
                    outcome.already_gone.push(name);
                }
                Err(e) => {
                    warn!(
                        namespace = %namespace,
                        kind = %kind.name(),
                        name = %name,
                        error = %e,
                        "Failed to delete {} {}", kind.name(), name
                    );
                    outcome.failed.push((name, e.to_string()));
                }
            }
        }

        summary.kinds.push(outcome);
    }

    info!(
        namespace = %namespace,
        deleted = summary.deleted_count(),
        clean = summary.is_clean(),
        "Finished delete pass"
    );
    Ok(summary)
}

/// Run one delete pass over each namespace in turn.
///
/// # Errors
///
/// Returns [`crate::errors::HarnessError::InvalidInput`] if any namespace
/// name is empty; nothing is deleted in that case.
pub async fn delete_artifacts(
    namespaces: &[String],
    kinds: &[Box<dyn ResourceKind>],
) -> Result<Vec<DeletionSummary>> {
    for namespace in namespaces {
        require_namespace(namespace)?;
    }

    let mut summaries = Vec::with_capacity(namespaces.len());
    for namespace in namespaces {
        summaries.push(delete_namespace_artifacts(namespace, kinds).await?);
    }
    Ok(summaries)
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod orchestrator_tests;
