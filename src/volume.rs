// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Archiving the contents of a persistent volume through a scratch pod.
//!
//! A host-path persistent volume cannot be read from outside the cluster, so
//! its path is mounted into a short-lived pod and streamed out as a tar:
//!
//! 1. [`VolumeAccess::provision`] creates a scratch PV pointing at the same
//!    host path, a claim bound to it, and an nginx pod mounting the claim
//! 2. [`VolumeAccess::copy_task`] streams `/shared` out of the pod into
//!    `<dest>/shared.tar`, bounded by the copy timeout
//! 3. [`VolumeAccess::release`] deletes the pod, claim and volume
//!
//! [`copy_from_volume`] sequences the three steps and always releases, whether
//! provisioning failed, the copy failed, or the copy was abandoned.

use anyhow::{Context as _, Result as AnyResult};
use async_trait::async_trait;
use futures::future::BoxFuture;
use k8s_openapi::api::core::v1::{
    Container, HostPathVolumeSource, PersistentVolume, PersistentVolumeClaim,
    PersistentVolumeClaimSpec, PersistentVolumeClaimVolumeSource, PersistentVolumeSpec, Pod,
    PodSpec, Volume, VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{AttachParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::bounded::{run_bounded, BoundedOutcome};
use crate::config::RetryPolicy;
use crate::constants::{
    SCRATCH_ACCESS_MODE, SCRATCH_CONTAINER_NAME, SCRATCH_MOUNT_PATH, SCRATCH_POD_IMAGE,
    SCRATCH_POD_PREFIX, SCRATCH_PVC_PREFIX, SCRATCH_PVC_REQUEST, SCRATCH_PV_CAPACITY,
    SCRATCH_PV_PREFIX, SCRATCH_RECLAIM_POLICY, SCRATCH_STORAGE_CLASS_SUFFIX, VOLUME_ARCHIVE_FILE,
};
use crate::errors::{is_conflict, is_not_found, require_namespace, Result};
use crate::kinds::delete_params;
use crate::poller::poll_until;

/// Names of the scratch objects for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchNames {
    pub volume: String,
    pub claim: String,
    pub pod: String,
    pub storage_class: String,
}

impl ScratchNames {
    #[must_use]
    pub fn for_namespace(namespace: &str) -> Self {
        Self {
            volume: format!("{SCRATCH_PV_PREFIX}{namespace}"),
            claim: format!("{SCRATCH_PVC_PREFIX}{namespace}"),
            pod: format!("{SCRATCH_POD_PREFIX}{namespace}"),
            storage_class: format!("{namespace}{SCRATCH_STORAGE_CLASS_SUFFIX}"),
        }
    }
}

/// Access to a persistent volume's files through scratch objects.
#[async_trait]
pub trait VolumeAccess: Send + Sync {
    /// Create the scratch objects for `host_path` and wait until the pod runs.
    async fn provision(&self, namespace: &str, host_path: &str) -> AnyResult<()>;

    /// A self-contained copy of the mounted volume into `archive`.
    ///
    /// The returned future owns everything it needs so it can run as its own
    /// task. Resolves to the number of bytes written.
    fn copy_task(&self, namespace: &str, archive: PathBuf) -> BoxFuture<'static, AnyResult<u64>>;

    /// Delete the scratch objects. Never fails; problems are logged.
    async fn release(&self, namespace: &str);
}

/// Archive the files under `host_path` into `dest_dir`.
///
/// The scratch objects are released on every path out of this function.
///
/// # Errors
///
/// Returns [`crate::errors::HarnessError::InvalidInput`] for an empty
/// namespace. Provisioning and copy failures are reported as
/// [`BoundedOutcome::Failed`].
pub async fn copy_from_volume(
    access: &dyn VolumeAccess,
    namespace: &str,
    host_path: &str,
    dest_dir: &Path,
    copy_timeout: Duration,
) -> Result<BoundedOutcome<u64>> {
    let namespace = require_namespace(namespace)?;

    let outcome = match access.provision(namespace, host_path).await {
        Ok(()) => {
            let archive = dest_dir.join(VOLUME_ARCHIVE_FILE);
            info!(
                "Copying from PV path {} to {}",
                host_path,
                archive.display()
            );
            let task = access.copy_task(namespace, archive);
            match run_bounded("volume copy", copy_timeout, task).await {
                BoundedOutcome::Completed(Ok(bytes)) => {
                    info!(bytes, "Done copying");
                    BoundedOutcome::Completed(bytes)
                }
                BoundedOutcome::Completed(Err(e)) => {
                    warn!(namespace = %namespace, "Copy from volume failed: {:#}", e);
                    BoundedOutcome::Failed(format!("{e:#}"))
                }
                BoundedOutcome::TimedOut => BoundedOutcome::TimedOut,
                BoundedOutcome::Failed(reason) => BoundedOutcome::Failed(reason),
            }
        }
        Err(e) => {
            warn!(namespace = %namespace, "Failed to set up scratch pod: {:#}", e);
            BoundedOutcome::Failed(format!("{e:#}"))
        }
    };

    access.release(namespace).await;
    Ok(outcome)
}

/// The scratch persistent volume exposing `host_path`.
#[must_use]
pub fn scratch_volume(names: &ScratchNames, host_path: &str) -> PersistentVolume {
    PersistentVolume {
        metadata: ObjectMeta {
            name: Some(names.volume.clone()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeSpec {
            access_modes: Some(vec![SCRATCH_ACCESS_MODE.into()]),
            storage_class_name: Some(names.storage_class.clone()),
            capacity: Some(BTreeMap::from([(
                "storage".to_string(),
                Quantity(SCRATCH_PV_CAPACITY.into()),
            )])),
            persistent_volume_reclaim_policy: Some(SCRATCH_RECLAIM_POLICY.into()),
            host_path: Some(HostPathVolumeSource {
                path: host_path.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// The claim binding the scratch volume into `namespace`.
#[must_use]
pub fn scratch_claim(names: &ScratchNames, namespace: &str) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(names.claim.clone()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            volume_name: Some(names.volume.clone()),
            access_modes: Some(vec![SCRATCH_ACCESS_MODE.into()]),
            storage_class_name: Some(names.storage_class.clone()),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(SCRATCH_PVC_REQUEST.into()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// The pod mounting the scratch claim at `/shared`.
#[must_use]
pub fn scratch_pod(names: &ScratchNames) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(names.pod.clone()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: SCRATCH_CONTAINER_NAME.into(),
                image: Some(SCRATCH_POD_IMAGE.into()),
                image_pull_policy: Some("IfNotPresent".into()),
                volume_mounts: Some(vec![VolumeMount {
                    name: names.volume.clone(),
                    mount_path: SCRATCH_MOUNT_PATH.into(),
                    ..Default::default()
                }]),
                ..Default::default()
            }],
            volumes: Some(vec![Volume {
                name: names.volume.clone(),
                persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                    claim_name: names.claim.clone(),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn is_bound(pv: &PersistentVolume) -> bool {
    pv.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .is_some_and(|phase| phase == "Bound")
}

fn is_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
}

fn is_terminating<K: Resource>(obj: &K) -> bool {
    obj.meta().deletion_timestamp.is_some()
}

fn host_path_of(pv: &PersistentVolume) -> Option<&str> {
    pv.spec
        .as_ref()
        .and_then(|s| s.host_path.as_ref())
        .map(|h| h.path.as_str())
}

/// Create `obj`, dealing with a same-named object left by an earlier copy.
///
/// An existing object is reused only when it is not terminating and
/// `reusable` accepts it. Otherwise it is deleted (if it is not already
/// terminating), awaited until gone under `policy`, and `obj` is created anew.
async fn create_scratch<K, F>(
    api: &Api<K>,
    obj: &K,
    what: &str,
    policy: &RetryPolicy,
    reusable: F,
) -> AnyResult<()>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Debug,
    F: Fn(&K) -> bool,
{
    let name = obj.name_any();
    match api.create(&PostParams::default(), obj).await {
        Ok(_) => {
            debug!("Created scratch {} {}", what, name);
            return Ok(());
        }
        Err(e) if is_conflict(&e) => {}
        Err(e) => return Err(e).with_context(|| format!("failed to create scratch {what}")),
    }

    let existing = api
        .get_opt(&name)
        .await
        .with_context(|| format!("failed to read existing scratch {what} {name}"))?;
    if let Some(existing) = &existing {
        if !is_terminating(existing) && reusable(existing) {
            debug!("Scratch {} {} already exists, reusing it", what, name);
            return Ok(());
        }
        info!("Scratch {} {} is stale, waiting for it to be removed", what, name);
        if !is_terminating(existing) {
            match api.delete(&name, &delete_params()).await {
                Ok(_) => {}
                Err(e) if is_not_found(&e) => {}
                Err(e) => {
                    return Err(e).with_context(|| format!("failed to delete stale scratch {what}"))
                }
            }
        }
    }

    let description = format!("stale scratch {what} {name} to be removed");
    let name_ref = name.as_str();
    poll_until(policy, &description, move || async move {
        matches!(api.get_opt(name_ref).await, Ok(None))
    })
    .await?;

    api.create(&PostParams::default(), obj)
        .await
        .with_context(|| format!("failed to create scratch {what}"))?;
    debug!("Created scratch {} {}", what, name);
    Ok(())
}

/// [`VolumeAccess`] backed by the Kubernetes API.
pub struct KubeVolumeAccess {
    client: Client,
    readiness: RetryPolicy,
}

impl KubeVolumeAccess {
    #[must_use]
    pub fn new(client: Client, readiness: RetryPolicy) -> Self {
        Self { client, readiness }
    }
}

#[async_trait]
impl VolumeAccess for KubeVolumeAccess {
    async fn provision(&self, namespace: &str, host_path: &str) -> AnyResult<()> {
        let names = ScratchNames::for_namespace(namespace);
        let pvs: Api<PersistentVolume> = Api::all(self.client.clone());
        let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);

        let policy = &self.readiness;
        create_scratch(&pvs, &scratch_volume(&names, host_path), "volume", policy, |pv| {
            host_path_of(pv) == Some(host_path)
        })
        .await?;
        create_scratch(&pvcs, &scratch_claim(&names, namespace), "claim", policy, |pvc| {
            pvc.spec.as_ref().and_then(|s| s.volume_name.as_deref()) == Some(names.volume.as_str())
        })
        .await?;

        let (pv_api, pv_name) = (&pvs, names.volume.as_str());
        let description = format!("pv {pv_name} to be bound");
        poll_until(&self.readiness, &description, move || async move {
            matches!(pv_api.get_opt(pv_name).await, Ok(Some(pv)) if is_bound(&pv))
        })
        .await?;

        create_scratch(&pods, &scratch_pod(&names), "pod", policy, |_| true).await?;

        let (pod_api, pod_name) = (&pods, names.pod.as_str());
        let description = format!("{pod_name} to be ready in namespace {namespace}");
        poll_until(&self.readiness, &description, move || async move {
            matches!(pod_api.get_opt(pod_name).await, Ok(Some(pod)) if is_ready(&pod))
        })
        .await?;

        info!("{} ready", names.pod);
        Ok(())
    }

    fn copy_task(&self, namespace: &str, archive: PathBuf) -> BoxFuture<'static, AnyResult<u64>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod_name = ScratchNames::for_namespace(namespace).pod;

        Box::pin(async move {
            let params = AttachParams::default()
                .container(SCRATCH_CONTAINER_NAME)
                .stdout(true)
                .stderr(false);
            let mut process = pods
                .exec(&pod_name, ["tar", "cf", "-", SCRATCH_MOUNT_PATH], &params)
                .await
                .with_context(|| format!("failed to exec tar in {pod_name}"))?;
            let mut stdout = process
                .stdout()
                .context("exec session has no stdout stream")?;

            let mut file = tokio::fs::File::create(&archive)
                .await
                .with_context(|| format!("failed to create {}", archive.display()))?;
            let bytes = tokio::io::copy(&mut stdout, &mut file)
                .await
                .with_context(|| format!("failed to write {}", archive.display()))?;
            drop(stdout);

            process.join().await.context("exec session did not end cleanly")?;
            Ok(bytes)
        })
    }

    async fn release(&self, namespace: &str) {
        let names = ScratchNames::for_namespace(namespace);
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        let pvs: Api<PersistentVolume> = Api::all(self.client.clone());

        let results = [
            ("pod", pods.delete(&names.pod, &delete_params()).await.map(|_| ())),
            ("claim", pvcs.delete(&names.claim, &delete_params()).await.map(|_| ())),
            ("volume", pvs.delete(&names.volume, &delete_params()).await.map(|_| ())),
        ];

        for (what, result) in results {
            match result {
                Ok(()) => debug!(namespace = %namespace, "Deleted scratch {}", what),
                Err(e) if is_not_found(&e) => {}
                Err(e) => warn!(namespace = %namespace, error = %e, "Failed to delete scratch {}", what),
            }
        }
    }
}

#[cfg(test)]
#[path = "volume_tests.rs"]
mod volume_tests;
