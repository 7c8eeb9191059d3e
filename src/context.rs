// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context handed to every harness component.
//!
//! The context owns the Kubernetes client and the harness configuration. It is
//! built once per test session and passed explicitly into the enumerator, the
//! deletion orchestrator, the poller and the diagnostics writer, so no
//! component reaches for a process-wide client.

use kube::Client;
use std::sync::Arc;
use tracing::debug;

use crate::config::HarnessConfig;
use crate::errors::Result;

/// Kubernetes client plus configuration, cheap to clone.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Harness configuration
    pub config: Arc<HarnessConfig>,
}

impl Context {
    /// Wrap an existing client and configuration.
    #[must_use]
    pub fn new(client: Client, config: HarnessConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    /// Infer a client from the environment (kubeconfig or in-cluster) and
    /// read configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if no client configuration can be inferred or an
    /// environment variable is invalid.
    pub async fn try_default() -> Result<Self> {
        let config = HarnessConfig::from_env()?;
        debug!("Initializing Kubernetes client");
        let client = Client::try_default().await?;
        debug!("Kubernetes client initialized successfully");
        Ok(Self::new(client, config))
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
