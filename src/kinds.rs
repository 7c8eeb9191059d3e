// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Descriptors for every resource kind the cleanup loop tracks.
//!
//! Each kind is a [`ResourceKind`]: a name, a scope, a list operation returning
//! object names for a namespace, and a delete-by-name operation. The enumerator
//! and the deletion orchestrator iterate the table from [`tracked_kinds`]
//! generically instead of repeating the same list-then-act block per kind.
//!
//! # Tracked Kinds
//!
//! | Kind | Scope | Listed by |
//! |------|-------|-----------|
//! | Domain | namespaced | namespace |
//! | ReplicaSet, Job, ConfigMap, Secret | namespaced | namespace |
//! | PersistentVolume | cluster | domain-UID label of the namespace's PVCs |
//! | Deployment, PersistentVolumeClaim, Service, ServiceAccount | namespaced | namespace |
//! | Ingress, Role, RoleBinding | namespaced | namespace |
//! | ClusterRole, ClusterRoleBinding | cluster | `<operator-name-label>=<namespace>` |
//! | Namespace | the namespace itself | name |

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, ReplicaSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, PersistentVolume, PersistentVolumeClaim, Secret, Service,
    ServiceAccount,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use kube::api::{ApiResource, DeleteParams, DynamicObject, ListParams};
use kube::core::{GroupVersionKind, NamespaceResourceScope};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::fmt::Debug;
use tracing::debug;

use crate::config::{DomainResource, HarnessConfig};
use crate::constants::DELETE_GRACE_PERIOD_SECS;
use crate::context::Context;
use crate::labels::{equality_selector, find_label, set_selector};
use crate::pagination::list_all_paginated;

/// Where objects of a kind live relative to the namespace being cleaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindScope {
    /// Objects live inside the namespace
    Namespaced,
    /// Objects are cluster-scoped and tied to the namespace by labels
    Cluster,
    /// The namespace object itself; always handled after everything it contains
    Namespace,
}

/// A resource kind the harness can enumerate and delete.
#[async_trait]
pub trait ResourceKind: Send + Sync {
    /// Human-readable kind name used in logs and summaries
    fn name(&self) -> &str;

    /// Scope of the kind's objects
    fn scope(&self) -> KindScope;

    /// Names of the objects of this kind that belong to `namespace`.
    async fn list(&self, namespace: &str) -> Result<Vec<String>, kube::Error>;

    /// Delete one object of this kind by name.
    async fn delete(&self, namespace: &str, name: &str) -> Result<(), kube::Error>;
}

/// Delete options shared by every kind: background cascade, no grace period.
#[must_use]
pub fn delete_params() -> DeleteParams {
    DeleteParams::background().grace_period(DELETE_GRACE_PERIOD_SECS)
}

/// A built-in Kubernetes kind addressed through `Api<K>`.
pub struct TypedKind<K> {
    client: Client,
    kind_name: String,
    scope: KindScope,
    selector_label: Option<String>,
    page_size: u32,
    api_for: fn(Client, &str) -> Api<K>,
}

impl<K> TypedKind<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    /// A namespaced kind, listed without a selector.
    #[must_use]
    pub fn namespaced(client: Client, page_size: u32) -> Self
    where
        K: Resource<Scope = NamespaceResourceScope>,
    {
        Self {
            client,
            kind_name: K::kind(&()).to_string(),
            scope: KindScope::Namespaced,
            selector_label: None,
            page_size,
            api_for: |client: Client, namespace: &str| Api::namespaced(client, namespace),
        }
    }

    /// A cluster-scoped kind, listed with `<label>=<namespace>`.
    #[must_use]
    pub fn cluster_labelled(client: Client, page_size: u32, label: &str) -> Self {
        Self {
            client,
            kind_name: K::kind(&()).to_string(),
            scope: KindScope::Cluster,
            selector_label: Some(label.to_string()),
            page_size,
            api_for: |client: Client, _namespace: &str| Api::all(client),
        }
    }

    fn api(&self, namespace: &str) -> Api<K> {
        (self.api_for)(self.client.clone(), namespace)
    }

    fn list_params(&self, namespace: &str) -> ListParams {
        match &self.selector_label {
            Some(label) => ListParams::default().labels(&equality_selector(label, namespace)),
            None => ListParams::default(),
        }
    }
}

#[async_trait]
impl<K> ResourceKind for TypedKind<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.kind_name
    }

    fn scope(&self) -> KindScope {
        self.scope
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>, kube::Error> {
        let items = list_all_paginated(
            &self.api(namespace),
            self.list_params(namespace),
            self.page_size,
        )
        .await?;
        Ok(items.iter().map(ResourceExt::name_any).collect())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        self.api(namespace).delete(name, &delete_params()).await?;
        Ok(())
    }
}

/// The operator's `Domain` custom resource, addressed dynamically.
///
/// Domains are deleted by resource name.
pub struct DomainKind {
    client: Client,
    resource: ApiResource,
    page_size: u32,
}

impl DomainKind {
    #[must_use]
    pub fn new(client: Client, domain: &DomainResource, page_size: u32) -> Self {
        let gvk = GroupVersionKind::gvk(&domain.group, &domain.version, &domain.kind);
        Self {
            client,
            resource: ApiResource::from_gvk_with_plural(&gvk, &domain.plural),
            page_size,
        }
    }

    fn api(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &self.resource)
    }
}

#[async_trait]
impl ResourceKind for DomainKind {
    fn name(&self) -> &str {
        &self.resource.kind
    }

    fn scope(&self) -> KindScope {
        KindScope::Namespaced
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>, kube::Error> {
        let items =
            list_all_paginated(&self.api(namespace), ListParams::default(), self.page_size)
                .await?;
        Ok(items.iter().map(ResourceExt::name_any).collect())
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        self.api(namespace).delete(name, &delete_params()).await?;
        Ok(())
    }
}

/// Persistent volumes bound to a namespace's domains.
///
/// PVs are cluster-scoped, so they are resolved through the namespace's PVCs:
/// every PVC carrying one of the domain-UID label keys contributes the PVs
/// selected by `<key> in (<uid>)` under that same key. PVCs without any of the
/// keys contribute nothing.
pub struct PersistentVolumeKind {
    client: Client,
    domain_uid_labels: Vec<String>,
    page_size: u32,
}

impl PersistentVolumeKind {
    #[must_use]
    pub fn new(client: Client, domain_uid_labels: &[String], page_size: u32) -> Self {
        Self {
            client,
            domain_uid_labels: domain_uid_labels.to_vec(),
            page_size,
        }
    }

    /// Distinct `(label key, domain UID)` pairs found on the namespace's PVCs.
    async fn domain_uids(
        &self,
        namespace: &str,
    ) -> Result<BTreeSet<(String, String)>, kube::Error> {
        let pvcs: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        let claims = list_all_paginated(&pvcs, ListParams::default(), self.page_size).await?;

        Ok(claims
            .iter()
            .filter_map(|pvc| find_label(pvc.labels(), &self.domain_uid_labels))
            .map(|(key, uid)| (key.to_string(), uid.to_string()))
            .collect())
    }
}

#[async_trait]
impl ResourceKind for PersistentVolumeKind {
    fn name(&self) -> &str {
        "PersistentVolume"
    }

    fn scope(&self) -> KindScope {
        KindScope::Cluster
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>, kube::Error> {
        let uids = self.domain_uids(namespace).await?;
        let pvs: Api<PersistentVolume> = Api::all(self.client.clone());

        let mut names = BTreeSet::new();
        for (key, uid) in &uids {
            let selector = set_selector(key, &[uid.as_str()]);
            debug!(namespace = %namespace, selector = %selector, "Resolving persistent volumes");
            let volumes =
                list_all_paginated(&pvs, ListParams::default().labels(&selector), self.page_size)
                    .await?;
            names.extend(volumes.iter().map(ResourceExt::name_any));
        }

        Ok(names.into_iter().collect())
    }

    async fn delete(&self, _namespace: &str, name: &str) -> Result<(), kube::Error> {
        let pvs: Api<PersistentVolume> = Api::all(self.client.clone());
        pvs.delete(name, &delete_params()).await?;
        Ok(())
    }
}

/// The namespace object itself.
pub struct NamespaceKind {
    client: Client,
}

impl NamespaceKind {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResourceKind for NamespaceKind {
    fn name(&self) -> &str {
        "Namespace"
    }

    fn scope(&self) -> KindScope {
        KindScope::Namespace
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>, kube::Error> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        Ok(namespaces
            .get_opt(namespace)
            .await?
            .map(|ns| vec![ns.name_any()])
            .unwrap_or_default())
    }

    async fn delete(&self, _namespace: &str, name: &str) -> Result<(), kube::Error> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        namespaces.delete(name, &delete_params()).await?;
        Ok(())
    }
}

/// Build the table of tracked kinds, in enumeration and deletion order.
///
/// Persistent volumes precede persistent volume claims so they can still be
/// resolved through the claims' labels. The namespace comes last.
#[must_use]
pub fn tracked_kinds(ctx: &Context) -> Vec<Box<dyn ResourceKind>> {
    kinds_for(&ctx.client, &ctx.config)
}

/// [`tracked_kinds`] from a bare client and configuration.
#[must_use]
pub fn kinds_for(client: &Client, config: &HarnessConfig) -> Vec<Box<dyn ResourceKind>> {
    let page = config.list_page_size;
    let c = || client.clone();
    let operator_label = config.operator_name_label.as_str();

    vec![
        Box::new(DomainKind::new(c(), &config.domain, page)),
        Box::new(TypedKind::<ReplicaSet>::namespaced(c(), page)),
        Box::new(TypedKind::<Job>::namespaced(c(), page)),
        Box::new(TypedKind::<ConfigMap>::namespaced(c(), page)),
        Box::new(TypedKind::<Secret>::namespaced(c(), page)),
        Box::new(PersistentVolumeKind::new(c(), &config.domain_uid_labels, page)),
        Box::new(TypedKind::<Deployment>::namespaced(c(), page)),
        Box::new(TypedKind::<PersistentVolumeClaim>::namespaced(c(), page)),
        Box::new(TypedKind::<Service>::namespaced(c(), page)),
        Box::new(TypedKind::<ServiceAccount>::namespaced(c(), page)),
        Box::new(TypedKind::<Ingress>::namespaced(c(), page)),
        Box::new(TypedKind::<Role>::namespaced(c(), page)),
        Box::new(TypedKind::<RoleBinding>::namespaced(c(), page)),
        Box::new(TypedKind::<ClusterRole>::cluster_labelled(c(), page, operator_label)),
        Box::new(TypedKind::<ClusterRoleBinding>::cluster_labelled(c(), page, operator_label)),
        Box::new(NamespaceKind::new(c())),
    ]
}

#[cfg(test)]
#[path = "kinds_tests.rs"]
mod kinds_tests;
