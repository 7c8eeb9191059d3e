// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared fixtures for unit tests: API error builders, a wiremock-backed
//! client, and in-memory resource kinds.

use async_trait::async_trait;
use kube::Client;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use wiremock::MockServer;

use crate::kinds::{KindScope, ResourceKind};

/// Build a `kube::Error::Api` with the given HTTP code and reason.
pub fn api_error(code: u16, reason: &str) -> kube::Error {
    let status = kube::core::Status::failure(&format!("{reason} ({code})"), reason).with_code(code);
    kube::Error::Api(Box::new(status))
}

/// A kube client talking to a wiremock server.
pub fn mock_client(server: &MockServer) -> Client {
    let config = kube::Config::new(server.uri().parse().expect("mock server uri"));
    Client::try_from(config).expect("client for mock server")
}

/// A `v1` list body as returned by the API server.
pub fn list_body(api_version: &str, kind: &str, items: Vec<Value>) -> Value {
    json!({
        "apiVersion": api_version,
        "kind": format!("{kind}List"),
        "metadata": { "resourceVersion": "1" },
        "items": items,
    })
}

/// A minimal object body with name, namespace and labels.
pub fn object(
    api_version: &str,
    kind: &str,
    name: &str,
    namespace: Option<&str>,
    labels: &[(&str, &str)],
) -> Value {
    let labels: BTreeMap<&str, &str> = labels.iter().copied().collect();
    let mut metadata = json!({ "name": name, "labels": labels });
    if let Some(ns) = namespace {
        metadata["namespace"] = json!(ns);
    }
    json!({ "apiVersion": api_version, "kind": kind, "metadata": metadata })
}

/// A `Status` failure body.
pub fn status_body(code: u16, reason: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Status",
        "metadata": {},
        "status": "Failure",
        "message": format!("{reason} ({code})"),
        "reason": reason,
        "code": code,
    })
}

/// In-memory cluster shared by [`FakeKind`]s.
#[derive(Default)]
pub struct FakeCluster {
    objects: Mutex<BTreeMap<(String, String), BTreeSet<String>>>,
    list_failures: Mutex<HashMap<String, u16>>,
    delete_failures: Mutex<HashSet<(String, String)>>,
    deletes: Mutex<Vec<(String, String, String)>>,
}

impl FakeCluster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(&self, kind: &str, namespace: &str, name: &str) {
        self.objects
            .lock()
            .unwrap()
            .entry((kind.to_string(), namespace.to_string()))
            .or_default()
            .insert(name.to_string());
    }

    /// Remove an object behind the harness's back.
    pub fn remove(&self, kind: &str, namespace: &str, name: &str) {
        if let Some(names) = self
            .objects
            .lock()
            .unwrap()
            .get_mut(&(kind.to_string(), namespace.to_string()))
        {
            names.remove(name);
        }
    }

    pub fn names(&self, kind: &str, namespace: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .get(&(kind.to_string(), namespace.to_string()))
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn fail_list(&self, kind: &str, code: u16) {
        self.list_failures
            .lock()
            .unwrap()
            .insert(kind.to_string(), code);
    }

    pub fn heal_list(&self, kind: &str) {
        self.list_failures.lock().unwrap().remove(kind);
    }

    pub fn fail_delete(&self, kind: &str, name: &str) {
        self.delete_failures
            .lock()
            .unwrap()
            .insert((kind.to_string(), name.to_string()));
    }

    /// Every delete call issued, in order, as `(kind, namespace, name)`.
    pub fn deletes(&self) -> Vec<(String, String, String)> {
        self.deletes.lock().unwrap().clone()
    }
}

/// A resource kind backed by a [`FakeCluster`].
pub struct FakeKind {
    name: String,
    scope: KindScope,
    cluster: Arc<FakeCluster>,
}

impl FakeKind {
    pub fn boxed(name: &str, scope: KindScope, cluster: &Arc<FakeCluster>) -> Box<dyn ResourceKind> {
        Box::new(Self {
            name: name.to_string(),
            scope,
            cluster: Arc::clone(cluster),
        })
    }
}

#[async_trait]
impl ResourceKind for FakeKind {
    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> KindScope {
        self.scope
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>, kube::Error> {
        if let Some(code) = self.cluster.list_failures.lock().unwrap().get(&self.name) {
            return Err(api_error(*code, "ListFailed"));
        }
        Ok(self.cluster.names(&self.name, namespace))
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<(), kube::Error> {
        self.cluster.deletes.lock().unwrap().push((
            self.name.clone(),
            namespace.to_string(),
            name.to_string(),
        ));

        if self
            .cluster
            .delete_failures
            .lock()
            .unwrap()
            .contains(&(self.name.clone(), name.to_string()))
        {
            return Err(api_error(500, "InternalError"));
        }

        let key = (self.name.clone(), namespace.to_string());
        let mut objects = self.cluster.objects.lock().unwrap();
        match objects.get_mut(&key).map(|names| names.remove(name)) {
            Some(true) => Ok(()),
            _ => Err(api_error(404, "NotFound")),
        }
    }
}

/// A kind holding one object that the "cluster" removes at a fixed instant.
pub struct ScheduledKind {
    removed_at: Instant,
    lists: Arc<Mutex<Vec<Instant>>>,
}

impl ScheduledKind {
    pub fn boxed(removed_at: Instant, lists: &Arc<Mutex<Vec<Instant>>>) -> Box<dyn ResourceKind> {
        Box::new(Self {
            removed_at,
            lists: Arc::clone(lists),
        })
    }
}

#[async_trait]
impl ResourceKind for ScheduledKind {
    fn name(&self) -> &str {
        "ConfigMap"
    }

    fn scope(&self) -> KindScope {
        KindScope::Namespaced
    }

    async fn list(&self, _namespace: &str) -> Result<Vec<String>, kube::Error> {
        let now = Instant::now();
        self.lists.lock().unwrap().push(now);
        if now < self.removed_at {
            Ok(vec!["lingering".to_string()])
        } else {
            Ok(Vec::new())
        }
    }

    async fn delete(&self, _namespace: &str, _name: &str) -> Result<(), kube::Error> {
        Ok(())
    }
}
