// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Integration tests for the cleanup harness against a live cluster
//!
//! These tests create real namespaces and objects, then check that the sweep
//! removes them and that diagnostics land on disk.
//!
//! Run with: cargo test --test cleanup_integration -- --ignored

mod common;

use common::{create_config_map, create_secret, get_context_or_skip};
use kubesweep::diagnostics::collect_logs;
use kubesweep::enumerator::{enumerate, KindOutcome};
use kubesweep::kinds::tracked_kinds;
use kubesweep::session::TestSession;

#[tokio::test]
#[ignore = "requires a Kubernetes cluster"]
async fn test_session_cleanup_removes_config_map_and_secret() {
    let Some(ctx) = get_context_or_skip().await else {
        return;
    };

    let session = TestSession::start(ctx.clone(), "CleanupIntegration", 1)
        .await
        .expect("Failed to start session");
    let namespace = session.namespaces()[0].clone();

    create_config_map(&ctx.client, &namespace, "cm1")
        .await
        .expect("Failed to create config map");
    create_secret(&ctx.client, &namespace, "sec1")
        .await
        .expect("Failed to create secret");

    let kinds = tracked_kinds(&ctx);
    let before = enumerate(&namespace, &kinds).await.unwrap();
    assert!(matches!(
        before.outcome("ConfigMap"),
        Some(KindOutcome::Present(names)) if names.contains(&"cm1".to_string())
    ));

    let report = session.finish().await.expect("Cleanup failed");
    assert!(report.is_complete(), "Artifacts left behind: {report:?}");

    let after = enumerate(&namespace, &kinds).await.unwrap();
    assert!(!after.exists(), "Still present: {:?}", after.present_kinds());
    println!("✓ Namespace {namespace} fully cleaned up");
}

#[tokio::test]
#[ignore = "requires a Kubernetes cluster"]
async fn test_collect_logs_writes_namespace_dumps() {
    let Some(ctx) = get_context_or_skip().await else {
        return;
    };

    let session = TestSession::start(ctx.clone(), "DiagnosticsIntegration", 1)
        .await
        .expect("Failed to start session");
    let namespace = session.namespaces()[0].clone();
    create_config_map(&ctx.client, &namespace, "cm1")
        .await
        .expect("Failed to create config map");

    let result_dir = collect_logs(&ctx, "DiagnosticsIntegration", session.namespaces())
        .await
        .expect("Failed to collect logs");

    let cm = std::fs::read_to_string(result_dir.join(format!("{namespace}_cm.log")))
        .expect("Config map dump missing");
    assert!(cm.contains("cm1"));
    assert!(result_dir.join(format!("{namespace}_ns.log")).exists());
    println!("✓ Diagnostics written to {}", result_dir.display());

    let report = session.finish().await.expect("Cleanup failed");
    assert!(report.is_complete());
}

#[tokio::test]
#[ignore = "requires a Kubernetes cluster"]
async fn test_session_run_cleans_up_after_body() {
    let Some(ctx) = get_context_or_skip().await else {
        return;
    };

    let session = TestSession::start(ctx, "RunIntegration", 2)
        .await
        .expect("Failed to start session");

    let (created, cleanup) = session
        .run(|ctx, namespaces| async move {
            for ns in &namespaces {
                if create_config_map(&ctx.client, ns, "cm1").await.is_err()
                    || create_secret(&ctx.client, ns, "sec1").await.is_err()
                {
                    return false;
                }
            }
            true
        })
        .await;

    assert!(created, "Failed to seed namespaces");
    assert!(cleanup.expect("Cleanup failed").is_complete());
    println!("✓ Session namespaces cleaned up after the test body");
}
