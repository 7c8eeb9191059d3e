// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # kubesweep - Cleanup and diagnostics harness for Kubernetes integration tests
//!
//! kubesweep removes everything an operator integration test left behind in
//! its namespaces, waits until the cluster confirms the removal, and snapshots
//! those namespaces for post-mortem analysis before they disappear.
//!
//! ## Overview
//!
//! - A table of tracked resource kinds, from the operator's `Domain` custom
//!   resource down to the namespace itself
//! - A read-only enumerator answering "does anything still exist here?"
//! - A best-effort deletion pass, one delete per object, namespace last
//! - A convergence poller with a bounded wait and an explicit timeout error
//! - A diagnostics writer dumping YAML and pod logs, and archiving domain
//!   persistent volumes through a scratch pod
//!
//! ## Modules
//!
//! - [`kinds`] - Tracked resource kinds and their list/delete operations
//! - [`enumerator`] - Existence checks per namespace
//! - [`orchestrator`] - The deletion pass
//! - [`poller`] - Convergence polling and the full cleanup sweep
//! - [`diagnostics`] - Log and YAML snapshots
//! - [`volume`] - Persistent volume archiving through a scratch pod
//! - [`session`] - Namespaces owned by one test
//!
//! ## Example
//!
//! ```rust,no_run
//! use kubesweep::context::Context;
//! use kubesweep::poller::cleanup;
//!
//! # async fn example() -> kubesweep::errors::Result<()> {
//! let ctx = Context::try_default().await?;
//! let namespaces = vec!["ns-a".to_string(), "ns-b".to_string()];
//!
//! let report = cleanup(&ctx, &namespaces).await?;
//! if !report.is_complete() {
//!     eprintln!("still present in {:?}", report.timed_out());
//! }
//! # Ok(())
//! # }
//! ```

pub mod bounded;
pub mod config;
pub mod constants;
pub mod context;
pub mod diagnostics;
pub mod enumerator;
pub mod errors;
pub mod kinds;
pub mod labels;
pub mod orchestrator;
pub mod pagination;
pub mod poller;
pub mod session;
pub mod telemetry;
pub mod volume;

#[cfg(test)]
mod testing;
