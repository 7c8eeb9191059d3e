// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Test sessions: namespaces created for one test, snapshotted and swept
//! when it ends.
//!
//! ```rust,no_run
//! use kubesweep::context::Context;
//! use kubesweep::session::TestSession;
//!
//! # async fn example() -> kubesweep::errors::Result<()> {
//! let ctx = Context::try_default().await?;
//! let session = TestSession::start(ctx, "ItDomainLifecycle", 2).await?;
//!
//! let (outcome, cleanup) = session
//!     .run(|_ctx, namespaces| async move {
//!         assert_eq!(namespaces.len(), 2);
//!         "deployed"
//!     })
//!     .await;
//! assert_eq!(outcome, "deployed");
//! assert!(cleanup?.is_complete());
//! # Ok(())
//! # }
//! ```

use futures::FutureExt;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::PostParams;
use kube::Api;
use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{info, warn};

use crate::constants::{MAX_NAMESPACE_NAME_ATTEMPTS, TEST_NAMESPACE_PREFIX};
use crate::context::Context;
use crate::diagnostics::collect_logs;
use crate::errors::{is_conflict, HarnessError, Result};
use crate::labels::{MANAGED_BY_KUBESWEEP, TEST_NAMESPACE_LABEL};
use crate::poller::{cleanup, CleanupReport};

/// Namespaces owned by one test.
#[derive(Debug)]
pub struct TestSession {
    ctx: Context,
    test_name: String,
    namespaces: Vec<String>,
}

impl TestSession {
    /// Create `count` fresh namespaces for `test_name`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidInput`] for an empty test name, or the
    /// API error that prevented a namespace from being created.
    pub async fn start(ctx: Context, test_name: &str, count: usize) -> Result<Self> {
        if test_name.trim().is_empty() {
            return Err(HarnessError::invalid("test_name", "must not be empty"));
        }

        let mut namespaces = Vec::with_capacity(count);
        for _ in 0..count {
            namespaces.push(create_test_namespace(&ctx).await?);
        }
        info!(test = %test_name, namespaces = ?namespaces, "Test session started");

        Ok(Self {
            ctx,
            test_name: test_name.to_string(),
            namespaces,
        })
    }

    /// Take over namespaces that already exist.
    #[must_use]
    pub fn adopt(ctx: Context, test_name: &str, namespaces: Vec<String>) -> Self {
        Self {
            ctx,
            test_name: test_name.to_string(),
            namespaces,
        }
    }

    #[must_use]
    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    #[must_use]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Snapshot the session's namespaces, then delete everything in them.
    ///
    /// A failed snapshot is logged and does not prevent the cleanup.
    ///
    /// # Errors
    ///
    /// Same as [`crate::poller::cleanup`]; incomplete cleanup is reported in
    /// the returned [`CleanupReport`] rather than as an error.
    pub async fn finish(&self) -> Result<CleanupReport> {
        match collect_logs(&self.ctx, &self.test_name, &self.namespaces).await {
            Ok(dir) => info!("Diagnostics for {} written to {}", self.test_name, dir.display()),
            Err(e) => warn!(test = %self.test_name, error = %e, "Failed to collect diagnostics"),
        }

        let report = cleanup(&self.ctx, &self.namespaces).await?;
        if !report.is_complete() {
            warn!(
                test = %self.test_name,
                namespaces = ?report.timed_out(),
                "Artifacts still present after cleanup"
            );
        }
        Ok(report)
    }

    /// Run `body`, then [`TestSession::finish`] no matter how the body ended.
    ///
    /// Returns the body's output with the cleanup result. If the body
    /// panicked, the panic is resumed after the session has finished.
    pub async fn run<F, Fut, T>(&self, body: F) -> (T, Result<CleanupReport>)
    where
        F: FnOnce(Context, Vec<String>) -> Fut,
        Fut: Future<Output = T>,
    {
        let result = AssertUnwindSafe(body(self.ctx.clone(), self.namespaces.clone()))
            .catch_unwind()
            .await;
        let report = self.finish().await;

        match result {
            Ok(output) => (output, report),
            Err(panic) => {
                warn!(test = %self.test_name, "Test body panicked, session finished");
                std::panic::resume_unwind(panic)
            }
        }
    }
}

/// Create one labelled namespace under a free random name.
async fn create_test_namespace(ctx: &Context) -> Result<String> {
    let api: Api<Namespace> = Api::all(ctx.client.clone());
    let mut last_conflict = None;

    for _ in 0..MAX_NAMESPACE_NAME_ATTEMPTS {
        let name = format!("{TEST_NAMESPACE_PREFIX}-{}", rand::random::<u32>());
        let namespace = Namespace {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                labels: Some(BTreeMap::from([(
                    TEST_NAMESPACE_LABEL.to_string(),
                    MANAGED_BY_KUBESWEEP.to_string(),
                )])),
                ..Default::default()
            },
            ..Default::default()
        };

        match api.create(&PostParams::default(), &namespace).await {
            Ok(_) => {
                info!("Created namespace {}", name);
                return Ok(name);
            }
            Err(e) if is_conflict(&e) => {
                info!("Namespace {} already exists, picking another name", name);
                last_conflict = Some(e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(last_conflict.map_or_else(
        || HarnessError::Config("no namespace name attempts configured".to_string()),
        HarnessError::from,
    ))
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
