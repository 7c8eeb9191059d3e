// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Resource enumerator: does anything tracked still exist in a namespace?
//!
//! One list call per tracked kind, issued sequentially. Each call is guarded on
//! its own, so a failing kind never hides the others:
//!
//! - items returned: the kind is [`KindOutcome::Present`]
//! - no items, or an explicit 404 (type not served): [`KindOutcome::Absent`]
//! - any other failure: [`KindOutcome::Inconclusive`], logged at warn
//!
//! The enumerator only reads.

use tracing::{debug, info, warn};

use crate::config::InconclusivePolicy;
use crate::errors::{is_not_found, require_namespace, Result};
use crate::kinds::ResourceKind;

/// What one round learned about one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindOutcome {
    /// Objects of this kind still exist
    Present(Vec<String>),
    /// No objects of this kind exist
    Absent,
    /// The list call failed; nothing is known
    Inconclusive(String),
}

/// Per-namespace aggregate of one enumeration round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistenceReport {
    pub namespace: String,
    /// Outcomes in kind-table order, keyed by kind name
    pub kinds: Vec<(String, KindOutcome)>,
}

impl ExistenceReport {
    /// True if any kind still has objects.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.kinds
            .iter()
            .any(|(_, outcome)| matches!(outcome, KindOutcome::Present(_)))
    }

    /// True if any kind could not be listed this round.
    #[must_use]
    pub fn has_inconclusive(&self) -> bool {
        self.kinds
            .iter()
            .any(|(_, outcome)| matches!(outcome, KindOutcome::Inconclusive(_)))
    }

    /// Whether this round counts as converged under `policy`.
    #[must_use]
    pub fn is_converged(&self, policy: InconclusivePolicy) -> bool {
        match policy {
            InconclusivePolicy::TreatAsPresent => !self.exists() && !self.has_inconclusive(),
            InconclusivePolicy::Ignore => !self.exists(),
        }
    }

    /// Outcome recorded for `kind`, if that kind was enumerated.
    #[must_use]
    pub fn outcome(&self, kind: &str) -> Option<&KindOutcome> {
        self.kinds
            .iter()
            .find(|(name, _)| name == kind)
            .map(|(_, outcome)| outcome)
    }

    /// Names of the kinds still present.
    #[must_use]
    pub fn present_kinds(&self) -> Vec<&str> {
        self.kinds
            .iter()
            .filter(|(_, outcome)| matches!(outcome, KindOutcome::Present(_)))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Enumerate every tracked kind in `namespace`.
///
/// # Errors
///
/// Returns [`crate::errors::HarnessError::InvalidInput`] for an empty
/// namespace. API failures never produce an error; they become
/// [`KindOutcome::Inconclusive`].
pub async fn enumerate(namespace: &str, kinds: &[Box<dyn ResourceKind>]) -> Result<ExistenceReport> {
    let namespace = require_namespace(namespace)?;
    let mut outcomes = Vec::with_capacity(kinds.len());

    for kind in kinds {
        let outcome = match kind.list(namespace).await {
            Ok(names) if names.is_empty() => {
                debug!(namespace = %namespace, kind = %kind.name(), "No objects left");
                KindOutcome::Absent
            }
            Ok(names) => {
                debug!(
                    namespace = %namespace,
                    kind = %kind.name(),
                    objects = ?names,
                    "Objects still exist"
                );
                info!("{} still exists in namespace {}", kind.name(), namespace);
                KindOutcome::Present(names)
            }
            Err(e) if is_not_found(&e) => {
                debug!(namespace = %namespace, kind = %kind.name(), "Kind not served, treating as absent");
                KindOutcome::Absent
            }
            Err(e) => {
                warn!(
                    namespace = %namespace,
                    kind = %kind.name(),
                    error = %e,
                    "Failed to list {}", kind.name()
                );
                KindOutcome::Inconclusive(e.to_string())
            }
        };
        outcomes.push((kind.name().to_string(), outcome));
    }

    Ok(ExistenceReport {
        namespace: namespace.to_string(),
        kinds: outcomes,
    })
}

#[cfg(test)]
#[path = "enumerator_tests.rs"]
mod enumerator_tests;
