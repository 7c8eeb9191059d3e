// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label keys and label selector builders used to scope cleanup and diagnostics.
//!
//! Most tracked kinds are listed by namespace alone. Two kinds need labels:
//!
//! - Persistent volumes are cluster-scoped, so they are found through the
//!   domain-UID label carried by the namespace's persistent volume claims.
//! - Cluster roles and bindings are cluster-scoped, so they are found through
//!   the operator-name label the operator chart stamps with its namespace.

use std::collections::BTreeMap;

// ============================================================================
// Operator Labels
// ============================================================================

/// Label carrying the domain UID on operator-managed objects
pub const DOMAIN_UID_LABEL: &str = "weblogic.domainUID";

/// Lower-case spelling of [`DOMAIN_UID_LABEL`] stamped by older domain charts
pub const DOMAIN_UID_LABEL_LOWER: &str = "weblogic.domainUid";

/// Label carrying the operator's namespace on cluster-scoped RBAC objects
pub const OPERATOR_NAME_LABEL: &str = "weblogic.operatorName";

// ============================================================================
// Harness Labels
// ============================================================================

/// Label put on every namespace created by a test session
pub const TEST_NAMESPACE_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of [`TEST_NAMESPACE_LABEL`] on test session namespaces
pub const MANAGED_BY_KUBESWEEP: &str = "kubesweep";

/// Build a set-based selector matching any of `values` on `key`.
///
/// ```rust
/// use kubesweep::labels::set_selector;
///
/// assert_eq!(set_selector("weblogic.domainUID", &["dom1"]), "weblogic.domainUID in (dom1)");
/// ```
#[must_use]
pub fn set_selector(key: &str, values: &[&str]) -> String {
    format!("{key} in ({})", values.join(","))
}

/// Default domain-UID label keys, tried in order.
#[must_use]
pub fn default_domain_uid_labels() -> Vec<String> {
    vec![DOMAIN_UID_LABEL.to_string(), DOMAIN_UID_LABEL_LOWER.to_string()]
}

/// First of `keys` present in `labels`, with its value.
#[must_use]
pub fn find_label<'a>(
    labels: &'a BTreeMap<String, String>,
    keys: &'a [String],
) -> Option<(&'a str, &'a str)> {
    keys.iter()
        .find_map(|key| labels.get(key).map(|value| (key.as_str(), value.as_str())))
}

/// Build an equality selector `key=value`.
#[must_use]
pub fn equality_selector(key: &str, value: &str) -> String {
    format!("{key}={value}")
}
