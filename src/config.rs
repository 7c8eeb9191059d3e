// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Harness configuration.
//!
//! Configuration is plain data handed to [`crate::context::Context`] at
//! construction time. It can come from three places:
//!
//! - [`HarnessConfig::default`] - the built-in values from [`crate::constants`]
//! - [`HarnessConfig::from_env`] - defaults overridden by environment variables
//! - [`HarnessConfig::from_yaml_file`] - a YAML document, missing fields defaulted
//!
//! # Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `LOGS_DIR` | `logs_dir` |
//! | `CLEANUP_MAX_WAIT_SECS` | `cleanup.max_wait_secs` |
//! | `CLEANUP_POLL_INTERVAL_SECS` | `cleanup.poll_interval_secs` |
//! | `COPY_TIMEOUT_SECS` | `copy_timeout_secs` |

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    CLEANUP_INITIAL_DELAY_SECS, CLEANUP_MAX_WAIT_SECS, CLEANUP_POLL_INTERVAL_SECS,
    DEFAULT_LOGS_DIR_NAME, DOMAIN_GROUP, DOMAIN_KIND, DOMAIN_PLURAL, DOMAIN_VERSION,
    KUBE_LIST_PAGE_SIZE, SCRATCH_INITIAL_DELAY_SECS, SCRATCH_MAX_WAIT_SECS,
    SCRATCH_POLL_INTERVAL_SECS, VOLUME_COPY_TIMEOUT_SECS,
};
use crate::errors::{HarnessError, Result};
use crate::labels::{default_domain_uid_labels, OPERATOR_NAME_LABEL};

/// Schedule for polling a condition: `(initial delay, poll interval, maximum wait)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Seconds to wait before the first evaluation
    #[serde(default)]
    pub initial_delay_secs: u64,
    /// Seconds between evaluations
    pub poll_interval_secs: u64,
    /// Seconds after which the wait gives up
    pub max_wait_secs: u64,
}

impl RetryPolicy {
    /// Build a policy from durations.
    ///
    /// Schedules are kept in whole seconds, so a duration with a sub-second
    /// part is rejected rather than truncated.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] if any duration is not a whole number
    /// of seconds.
    pub fn new(initial_delay: Duration, poll_interval: Duration, max_wait: Duration) -> Result<Self> {
        Ok(Self {
            initial_delay_secs: whole_secs("initial delay", initial_delay)?,
            poll_interval_secs: whole_secs("poll interval", poll_interval)?,
            max_wait_secs: whole_secs("maximum wait", max_wait)?,
        })
    }

    /// Policy used while waiting for cleanup to converge (2s / 10s / 3m).
    #[must_use]
    pub fn cleanup() -> Self {
        Self {
            initial_delay_secs: CLEANUP_INITIAL_DELAY_SECS,
            poll_interval_secs: CLEANUP_POLL_INTERVAL_SECS,
            max_wait_secs: CLEANUP_MAX_WAIT_SECS,
        }
    }

    /// Policy used while waiting for the scratch PV and pod (2s / 5s / 1m).
    #[must_use]
    pub fn scratch() -> Self {
        Self {
            initial_delay_secs: SCRATCH_INITIAL_DELAY_SECS,
            poll_interval_secs: SCRATCH_POLL_INTERVAL_SECS,
            max_wait_secs: SCRATCH_MAX_WAIT_SECS,
        }
    }

    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    /// Reject schedules that could never make progress.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] if the poll interval is zero.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            return Err(HarnessError::Config(
                "poll interval must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

/// How the convergence poller reads a kind whose list call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum InconclusivePolicy {
    /// A failed list keeps the namespace "not yet converged"
    #[default]
    TreatAsPresent,
    /// A failed list is left out of the round's signal
    Ignore,
}

/// Coordinates of the operator's `Domain` custom resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainResource {
    pub group: String,
    pub version: String,
    pub kind: String,
    pub plural: String,
}

impl Default for DomainResource {
    fn default() -> Self {
        Self {
            group: DOMAIN_GROUP.to_string(),
            version: DOMAIN_VERSION.to_string(),
            kind: DOMAIN_KIND.to_string(),
            plural: DOMAIN_PLURAL.to_string(),
        }
    }
}

/// Complete harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HarnessConfig {
    /// Root directory for diagnostic results
    pub logs_dir: PathBuf,
    /// Schedule of the convergence poller
    pub cleanup: RetryPolicy,
    /// Schedule of scratch PV/pod readiness checks
    pub scratch: RetryPolicy,
    /// Upper bound on one copy out of a persistent volume, in seconds
    pub copy_timeout_secs: u64,
    /// How failed list calls count towards convergence
    pub inconclusive: InconclusivePolicy,
    /// Where the `Domain` custom resource is served
    pub domain: DomainResource,
    /// Label keys linking PVCs and PVs to a domain, tried in order
    pub domain_uid_labels: Vec<String>,
    /// Label scoping cluster roles and bindings to an operator namespace
    pub operator_name_label: String,
    /// Page size for list calls
    pub list_page_size: u32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            logs_dir: std::env::temp_dir().join(DEFAULT_LOGS_DIR_NAME),
            cleanup: RetryPolicy::cleanup(),
            scratch: RetryPolicy::scratch(),
            copy_timeout_secs: VOLUME_COPY_TIMEOUT_SECS,
            inconclusive: InconclusivePolicy::default(),
            domain: DomainResource::default(),
            domain_uid_labels: default_domain_uid_labels(),
            operator_name_label: OPERATOR_NAME_LABEL.to_string(),
            list_page_size: KUBE_LIST_PAGE_SIZE,
        }
    }
}

impl HarnessConfig {
    /// Defaults overridden by environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] if a numeric variable does not parse,
    /// or the resulting schedule is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`HarnessConfig::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] on unparsable or invalid values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("LOGS_DIR").filter(|v| !v.is_empty()) {
            config.logs_dir = PathBuf::from(dir);
        }
        if let Some(secs) = parse_secs(&lookup, "CLEANUP_MAX_WAIT_SECS")? {
            config.cleanup.max_wait_secs = secs;
        }
        if let Some(secs) = parse_secs(&lookup, "CLEANUP_POLL_INTERVAL_SECS")? {
            config.cleanup.poll_interval_secs = secs;
        }
        if let Some(secs) = parse_secs(&lookup, "COPY_TIMEOUT_SECS")? {
            config.copy_timeout_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load a YAML configuration file; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// describes an invalid schedule.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the schedules and label keys.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        self.cleanup.validate()?;
        self.scratch.validate()?;
        if self.domain_uid_labels.is_empty()
            || self.domain_uid_labels.iter().any(String::is_empty)
            || self.operator_name_label.is_empty()
        {
            return Err(HarnessError::Config(
                "label keys must not be empty".to_string(),
            ));
        }
        if self.list_page_size == 0 {
            return Err(HarnessError::Config(
                "list page size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn copy_timeout(&self) -> Duration {
        Duration::from_secs(self.copy_timeout_secs)
    }
}

fn whole_secs(field: &str, value: Duration) -> Result<u64> {
    if value.subsec_nanos() != 0 {
        return Err(HarnessError::Config(format!(
            "{field} must be a whole number of seconds, got {value:?}"
        )));
    }
    Ok(value.as_secs())
}

fn parse_secs<F>(lookup: &F, key: &str) -> Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| HarnessError::Config(format!("{key}={value:?}: {e}"))),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
