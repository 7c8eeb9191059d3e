// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Diagnostic snapshots of a test's namespaces.
//!
//! [`collect_logs`] creates `<logs_dir>/<test_name>/<timestamp>` and fills it
//! with one YAML dump per resource kind and namespace, one log file per pod,
//! and an archive of every domain persistent volume.
//!
//! # Files Written per Namespace
//!
//! | File | Contents |
//! |------|----------|
//! | `<ns>_sa.log` | service accounts |
//! | `<ns>_ns.log` | the namespace object |
//! | `<ns>_pvc.log` | persistent volume claims |
//! | `<uid>_pv.log` | persistent volumes labelled with a claim's domain UID |
//! | `<pvc>/<pv>/shared.tar` | files stored in that volume |
//! | `<ns>_secrets.log`, `<ns>_cm.log` | secrets, config maps |
//! | `<ns>_jobs.log`, `<ns>_deploy.log`, `<ns>_rs.log` | jobs, deployments, replica sets |
//! | `<ns>_domains.log` | `Domain` resources |
//! | `<ns>_pods.log` | pods |
//! | `<ns>-pod_<pod>.log` | the pod's container log |
//!
//! Every step is guarded on its own: a failing step is logged at warn and the
//! sweep moves on to the next one.

use anyhow::{Context as _, Result as AnyResult};
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, PersistentVolume, PersistentVolumeClaim, Pod, Secret, ServiceAccount,
};
use kube::api::{ApiResource, DynamicObject, ListParams, LogParams};
use kube::core::{GroupVersionKind, NamespaceResourceScope};
use kube::{Api, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::bounded::BoundedOutcome;
use crate::constants::RESULTS_DIR_TIMESTAMP_FORMAT;
use crate::context::Context;
use crate::errors::{require_namespace, HarnessError, Result};
use crate::labels::{equality_selector, find_label};
use crate::pagination::list_all_paginated;
use crate::volume::{copy_from_volume, KubeVolumeAccess};

/// Snapshot `namespaces` into a fresh results directory and return its path.
///
/// # Errors
///
/// - [`HarnessError::InvalidInput`] for an empty test name or namespace
/// - [`HarnessError::Io`] if the results directory cannot be created
///
/// Failures while collecting individual artifacts are logged, not returned.
pub async fn collect_logs(ctx: &Context, test_name: &str, namespaces: &[String]) -> Result<PathBuf> {
    if test_name.trim().is_empty() {
        return Err(HarnessError::invalid("test_name", "must not be empty"));
    }
    for namespace in namespaces {
        require_namespace(namespace)?;
    }

    info!("Collecting logs...");
    let stamp = chrono::Local::now()
        .format(RESULTS_DIR_TIMESTAMP_FORMAT)
        .to_string();
    let result_dir = ctx.config.logs_dir.join(test_name).join(stamp);
    tokio::fs::create_dir_all(&result_dir)
        .await
        .map_err(|e| HarnessError::io(&result_dir, e))?;

    for namespace in namespaces {
        generate_log(ctx, namespace, &result_dir).await;
    }

    Ok(result_dir)
}

/// Write every diagnostic for `namespace` into `result_dir`.
pub async fn generate_log(ctx: &Context, namespace: &str, result_dir: &Path) {
    info!("Collecting logs in namespace : {}", namespace);

    dump_namespaced::<ServiceAccount>(ctx, namespace, result_dir, "service accounts", "sa").await;

    guarded(namespace, "namespace", async {
        let namespaces: Api<Namespace> = Api::all(ctx.client.clone());
        let ns = namespaces.get_opt(namespace).await?;
        write_yaml(ns.as_ref(), result_dir, &format!("{namespace}_ns.log")).await?;
        Ok::<(), anyhow::Error>(())
    })
    .await;

    dump_namespaced::<PersistentVolumeClaim>(ctx, namespace, result_dir, "claims", "pvc").await;
    guarded(
        namespace,
        "persistent volumes",
        archive_volumes(ctx, namespace, result_dir),
    )
    .await;

    dump_namespaced::<Secret>(ctx, namespace, result_dir, "secrets", "secrets").await;
    dump_namespaced::<ConfigMap>(ctx, namespace, result_dir, "config maps", "cm").await;
    dump_namespaced::<Job>(ctx, namespace, result_dir, "jobs", "jobs").await;
    dump_namespaced::<Deployment>(ctx, namespace, result_dir, "deployments", "deploy").await;
    dump_namespaced::<ReplicaSet>(ctx, namespace, result_dir, "replica sets", "rs").await;

    let domain = &ctx.config.domain;
    let gvk = GroupVersionKind::gvk(&domain.group, &domain.version, &domain.kind);
    let domains: Api<DynamicObject> = Api::namespaced_with(
        ctx.client.clone(),
        namespace,
        &ApiResource::from_gvk_with_plural(&gvk, &domain.plural),
    );
    guarded(
        namespace,
        "domains",
        dump_list(
            domains,
            ctx.config.list_page_size,
            result_dir,
            format!("{namespace}_domains.log"),
        ),
    )
    .await;

    dump_namespaced::<Pod>(ctx, namespace, result_dir, "pods", "pods").await;
    guarded(namespace, "pod logs", write_pod_logs(ctx, namespace, result_dir)).await;
}

/// Dump every `K` in `namespace` to `<ns>_<suffix>.log`, guarded.
async fn dump_namespaced<K>(ctx: &Context, namespace: &str, dir: &Path, what: &str, suffix: &str)
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Serialize
        + Debug,
{
    let api: Api<K> = Api::namespaced(ctx.client.clone(), namespace);
    let file_name = format!("{namespace}_{suffix}.log");
    guarded(
        namespace,
        what,
        dump_list(api, ctx.config.list_page_size, dir, file_name),
    )
    .await;
}

/// Run one collection step, logging its failure instead of returning it.
async fn guarded<F>(namespace: &str, what: &str, step: F)
where
    F: Future<Output = AnyResult<()>>,
{
    if let Err(e) = step.await {
        warn!(namespace = %namespace, "Failed to collect {}: {:#}", what, e);
    }
}

/// Write the YAML form of `obj` to `<dir>/<file_name>`.
///
/// `None` writes nothing and creates no file.
///
/// # Errors
///
/// Returns [`HarnessError::Yaml`] if `obj` cannot be serialized and
/// [`HarnessError::Io`] if the file cannot be written.
pub async fn write_yaml<T: Serialize + ?Sized>(
    obj: Option<&T>,
    dir: &Path,
    file_name: &str,
) -> Result<()> {
    let path = dir.join(file_name);
    info!("Generating {}", path.display());
    match obj {
        Some(obj) => {
            let yaml = serde_yaml::to_string(obj)?;
            tokio::fs::write(&path, yaml)
                .await
                .map_err(|e| HarnessError::io(&path, e))
        }
        None => {
            info!("Nothing to write in {} list is empty", path.display());
            Ok(())
        }
    }
}

/// List every object behind `api` and dump the list as YAML.
async fn dump_list<K>(api: Api<K>, page_size: u32, dir: &Path, file_name: String) -> AnyResult<()>
where
    K: Clone + DeserializeOwned + Serialize + Debug,
{
    let items = list_all_paginated(&api, ListParams::default(), page_size)
        .await
        .with_context(|| format!("failed to list objects for {file_name}"))?;
    write_yaml(Some(&items), dir, &file_name).await?;
    Ok(())
}

/// Dump and archive the persistent volumes behind the namespace's labelled claims.
async fn archive_volumes(ctx: &Context, namespace: &str, result_dir: &Path) -> AnyResult<()> {
    let page = ctx.config.list_page_size;
    let keys = ctx.config.domain_uid_labels.as_slice();
    let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(ctx.client.clone(), namespace);
    let pvs: Api<PersistentVolume> = Api::all(ctx.client.clone());
    let access = KubeVolumeAccess::new(ctx.client.clone(), ctx.config.scratch);

    let claims = list_all_paginated(&pvcs, ListParams::default(), page).await?;
    for claim in &claims {
        let Some((key, uid)) = find_label(claim.labels(), keys) else {
            continue;
        };

        let selector = equality_selector(key, uid);
        let volumes = list_all_paginated(&pvs, ListParams::default().labels(&selector), page)
            .await
            .with_context(|| format!("failed to list persistent volumes for {selector}"))?;
        write_yaml(Some(&volumes), result_dir, &format!("{uid}_pv.log")).await?;

        for volume in &volumes {
            let claim_name = claim.name_any();
            let volume_name = volume.name_any();
            let Some(host_path) = volume
                .spec
                .as_ref()
                .and_then(|s| s.host_path.as_ref())
                .map(|h| h.path.clone())
            else {
                info!("{} has no host path, not archiving it", volume_name);
                continue;
            };

            let dest = result_dir.join(&claim_name).join(&volume_name);
            if let Err(e) = tokio::fs::create_dir_all(&dest).await {
                warn!("Failed to create {}: {}", dest.display(), e);
                continue;
            }

            match copy_from_volume(&access, namespace, &host_path, &dest, ctx.config.copy_timeout()).await? {
                BoundedOutcome::Completed(_) => {}
                BoundedOutcome::TimedOut => {
                    warn!("Copy of {} did not finish, archive may be partial", volume_name);
                }
                BoundedOutcome::Failed(reason) => {
                    warn!("Copy of {} failed: {}", volume_name, reason);
                }
            }
        }
        info!("Done archiving the persistent volumes");
    }

    Ok(())
}

/// Write one `<ns>-pod_<pod>.log` per pod with its container log.
async fn write_pod_logs(ctx: &Context, namespace: &str, result_dir: &Path) -> AnyResult<()> {
    let pods: Api<Pod> = Api::namespaced(ctx.client.clone(), namespace);
    let items = list_all_paginated(&pods, ListParams::default(), ctx.config.list_page_size).await?;

    for pod in &items {
        let pod_name = pod.name_any();
        let path = result_dir.join(format!("{namespace}-pod_{pod_name}.log"));
        match pods.logs(&pod_name, &LogParams::default()).await {
            Ok(log) => {
                info!("Generating {}", path.display());
                tokio::fs::write(&path, log)
                    .await
                    .map_err(|e| HarnessError::io(&path, e))?;
            }
            Err(e) => warn!(namespace = %namespace, pod = %pod_name, error = %e, "Failed to get pod log"),
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "diagnostics_tests.rs"]
mod diagnostics_tests;
