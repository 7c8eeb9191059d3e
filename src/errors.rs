// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the kubesweep harness.
//!
//! Most failures met during a cleanup or diagnostics sweep are not errors at
//! all from the caller's point of view: they are logged and recorded in the
//! sweep's summary. [`HarnessError`] is reserved for what the caller must see:
//!
//! - programming errors such as an empty namespace name
//! - a convergence poll that ran out of time
//! - failures setting up the harness itself (configuration, results directory)

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::constants::{HTTP_CONFLICT, HTTP_NOT_FOUND};

/// Errors surfaced by the harness to its caller.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// A required argument was missing or empty
    ///
    /// Treated as a programming error and never retried.
    #[error("Invalid input: {field} {reason}")]
    InvalidInput {
        /// The argument that was rejected
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// A polled condition did not hold before its deadline
    #[error("Timed out after {elapsed:?} waiting for {description} ({attempts} checks)")]
    Timeout {
        /// What was being waited for
        description: String,
        /// Time spent waiting
        elapsed: Duration,
        /// Number of condition evaluations performed
        attempts: u32,
    },

    /// A Kubernetes API call failed
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Reading or writing a local file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Serializing an object to YAML, or parsing a YAML config, failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A configuration value could not be used
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl HarnessError {
    /// Shorthand for [`HarnessError::InvalidInput`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used across the crate.
pub type Result<T, E = HarnessError> = std::result::Result<T, E>;

/// Reject empty namespace names before any API call is made.
///
/// # Errors
///
/// Returns [`HarnessError::InvalidInput`] if `namespace` is empty or blank.
pub fn require_namespace(namespace: &str) -> Result<&str> {
    if namespace.trim().is_empty() {
        return Err(HarnessError::invalid("namespace", "must not be empty"));
    }
    Ok(namespace)
}

/// Whether a Kubernetes error is an explicit "not found" from the API server.
///
/// A 404 on a delete means the object is already gone. A 404 on a list means
/// the resource type is not served (for example a CRD that was never
/// installed), which is equally an explicit absence.
#[must_use]
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == HTTP_NOT_FOUND)
}

/// Whether a Kubernetes error reports that the object already exists.
#[must_use]
pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == HTTP_CONFLICT)
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
