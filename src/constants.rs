// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the kubesweep test harness.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Domain Custom Resource Constants
// ============================================================================

/// API group of the operator's `Domain` custom resource
pub const DOMAIN_GROUP: &str = "weblogic.oracle";

/// API version of the `Domain` custom resource
pub const DOMAIN_VERSION: &str = "v7";

/// Kind name of the `Domain` custom resource
pub const DOMAIN_KIND: &str = "Domain";

/// Plural resource name of the `Domain` custom resource
pub const DOMAIN_PLURAL: &str = "domains";

// ============================================================================
// Kubernetes API Constants
// ============================================================================

/// Page size for paginated list calls
pub const KUBE_LIST_PAGE_SIZE: u32 = 100;

/// Grace period applied to every delete issued by the cleanup pass
pub const DELETE_GRACE_PERIOD_SECS: u32 = 0;

/// HTTP status code the API server uses for missing objects and unserved types
pub const HTTP_NOT_FOUND: u16 = 404;

/// HTTP status code the API server uses when an object already exists
pub const HTTP_CONFLICT: u16 = 409;

// ============================================================================
// Cleanup Polling Constants
// ============================================================================

/// Delay before the first convergence check after the deletion pass (2 seconds)
pub const CLEANUP_INITIAL_DELAY_SECS: u64 = 2;

/// Interval between convergence checks (10 seconds)
pub const CLEANUP_POLL_INTERVAL_SECS: u64 = 10;

/// Maximum time to wait for a namespace to converge (3 minutes)
pub const CLEANUP_MAX_WAIT_SECS: u64 = 180;

// ============================================================================
// Scratch Pod Constants
// ============================================================================

/// Delay before the first readiness check of the scratch PV/pod
pub const SCRATCH_INITIAL_DELAY_SECS: u64 = 2;

/// Interval between readiness checks of the scratch PV/pod
pub const SCRATCH_POLL_INTERVAL_SECS: u64 = 5;

/// Maximum time to wait for the scratch PV to bind and the pod to run (1 minute)
pub const SCRATCH_MAX_WAIT_SECS: u64 = 60;

/// Upper bound on a single copy out of a persistent volume (1 minute)
pub const VOLUME_COPY_TIMEOUT_SECS: u64 = 60;

/// Name prefix of the scratch persistent volume, completed with the namespace
pub const SCRATCH_PV_PREFIX: &str = "pv-pod-pv-";

/// Name prefix of the scratch persistent volume claim
pub const SCRATCH_PVC_PREFIX: &str = "pv-pod-pvc-";

/// Name prefix of the scratch pod
pub const SCRATCH_POD_PREFIX: &str = "pv-pod-";

/// Suffix of the storage class binding the scratch claim to the scratch volume
pub const SCRATCH_STORAGE_CLASS_SUFFIX: &str = "-weblogic-domain-storage-class";

/// Access mode of the scratch volume and claim
pub const SCRATCH_ACCESS_MODE: &str = "ReadWriteMany";

/// Reclaim policy of the scratch volume
pub const SCRATCH_RECLAIM_POLICY: &str = "Recycle";

/// Container image used by the scratch pod
pub const SCRATCH_POD_IMAGE: &str = "nginx";

/// Container name inside the scratch pod
pub const SCRATCH_CONTAINER_NAME: &str = "pv-container";

/// Mount path of the persistent volume inside the scratch pod
pub const SCRATCH_MOUNT_PATH: &str = "/shared";

/// Capacity declared on the scratch persistent volume
pub const SCRATCH_PV_CAPACITY: &str = "10Gi";

/// Storage requested by the scratch persistent volume claim
pub const SCRATCH_PVC_REQUEST: &str = "2Gi";

/// Name of the archive written for each copied volume
pub const VOLUME_ARCHIVE_FILE: &str = "shared.tar";

// ============================================================================
// Diagnostics Constants
// ============================================================================

/// Timestamp format of the per-run results directory
pub const RESULTS_DIR_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Directory name under the system temp dir used when no logs dir is configured
pub const DEFAULT_LOGS_DIR_NAME: &str = "kubesweep-diagnostics";

// ============================================================================
// Test Session Constants
// ============================================================================

/// Prefix of namespaces created by a test session
pub const TEST_NAMESPACE_PREFIX: &str = "ns";

/// Attempts at finding a free random namespace name before giving up
pub const MAX_NAMESPACE_NAME_ATTEMPTS: usize = 5;
