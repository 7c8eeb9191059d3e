// Common test utilities for integration tests

#![allow(dead_code)]

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::{Api, PostParams};
use kube::client::Client;
use kubesweep::config::HarnessConfig;
use kubesweep::context::Context;
use serde_json::json;

/// Get a harness context or skip the test if not in a cluster
pub async fn get_context_or_skip() -> Option<Context> {
    kubesweep::telemetry::init_tracing();

    let config = match HarnessConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("⊘ Skipping integration test: invalid harness configuration: {e}");
            return None;
        }
    };

    match Client::try_default().await {
        Ok(client) => {
            println!("✓ Successfully connected to Kubernetes cluster");
            Some(Context::new(client, config))
        }
        Err(e) => {
            eprintln!("⊘ Skipping integration test: not running in Kubernetes cluster: {e}");
            None
        }
    }
}

/// Create a config map with one entry
pub async fn create_config_map(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let api: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
    let cm: ConfigMap = serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": { "name": name, "namespace": namespace },
        "data": { "hello": "world" }
    }))?;
    api.create(&PostParams::default(), &cm).await?;
    println!("✓ Created config map {namespace}/{name}");
    Ok(())
}

/// Create an opaque secret with one entry
pub async fn create_secret(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret: Secret = serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": { "name": name, "namespace": namespace },
        "type": "Opaque",
        "stringData": { "password": "not-a-real-password" }
    }))?;
    api.create(&PostParams::default(), &secret).await?;
    println!("✓ Created secret {namespace}/{name}");
    Ok(())
}
