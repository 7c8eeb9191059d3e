// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `orchestrator.rs`

#[cfg(test)]
mod tests {
    use crate::config::{HarnessConfig, InconclusivePolicy};
    use crate::enumerator::{enumerate, KindOutcome};
    use crate::errors::HarnessError;
    use crate::kinds::{KindScope, PersistentVolumeKind, ResourceKind};
    use crate::orchestrator::*;
    use crate::testing::{list_body, mock_client, object, status_body, FakeCluster, FakeKind};
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn kinds(cluster: &Arc<FakeCluster>) -> Vec<Box<dyn ResourceKind>> {
        vec![
            // Deliberately not last in the table
            FakeKind::boxed("Namespace", KindScope::Namespace, cluster),
            FakeKind::boxed("ConfigMap", KindScope::Namespaced, cluster),
            FakeKind::boxed("Secret", KindScope::Namespaced, cluster),
            FakeKind::boxed("ServiceAccount", KindScope::Namespaced, cluster),
        ]
    }

    /// ns-a holds cm1 and sec1; one pass removes both
    #[tokio::test]
    async fn test_pass_removes_config_map_and_secret() {
        let cluster = FakeCluster::new();
        cluster.add("ConfigMap", "ns-a", "cm1");
        cluster.add("Secret", "ns-a", "sec1");
        let kinds = kinds(&cluster);

        let summary = delete_namespace_artifacts("ns-a", &kinds).await.unwrap();

        assert!(summary.is_clean());
        assert_eq!(summary.kind("ConfigMap").unwrap().deleted, vec!["cm1"]);
        assert_eq!(summary.kind("Secret").unwrap().deleted, vec!["sec1"]);

        let report = enumerate("ns-a", &kinds).await.unwrap();
        assert_eq!(report.outcome("ConfigMap"), Some(&KindOutcome::Absent));
        assert_eq!(report.outcome("Secret"), Some(&KindOutcome::Absent));
    }

    #[tokio::test]
    async fn test_namespace_deleted_after_contents() {
        let cluster = FakeCluster::new();
        cluster.add("ConfigMap", "ns-a", "cm1");
        cluster.add("ServiceAccount", "ns-a", "default");
        cluster.add("Namespace", "ns-a", "ns-a");

        delete_namespace_artifacts("ns-a", &kinds(&cluster))
            .await
            .unwrap();

        let order: Vec<String> = cluster.deletes().into_iter().map(|(k, _, _)| k).collect();
        assert_eq!(order, vec!["ConfigMap", "ServiceAccount", "Namespace"]);
    }

    /// A second pass over an emptied namespace absorbs everything
    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let cluster = FakeCluster::new();
        cluster.add("ConfigMap", "ns-a", "cm1");
        cluster.add("Namespace", "ns-a", "ns-a");
        let kinds = kinds(&cluster);

        let first = delete_namespace_artifacts("ns-a", &kinds).await.unwrap();
        let second = delete_namespace_artifacts("ns-a", &kinds).await.unwrap();

        assert!(first.is_clean());
        assert!(second.is_clean());
        assert_eq!(second.deleted_count(), 0);
    }

    #[tokio::test]
    async fn test_object_vanishing_between_list_and_delete_is_absorbed() {
        let cluster = FakeCluster::new();
        cluster.add("Secret", "ns-a", "sec1");
        let kinds: Vec<Box<dyn ResourceKind>> = vec![Box::new(VanishingKind {
            cluster: Arc::clone(&cluster),
        })];

        let summary = delete_namespace_artifacts("ns-a", &kinds).await.unwrap();

        assert!(summary.is_clean());
        assert_eq!(summary.kind("Secret").unwrap().already_gone, vec!["sec1"]);
    }

    #[tokio::test]
    async fn test_failing_kind_does_not_block_later_kinds() {
        let cluster = FakeCluster::new();
        cluster.fail_list("ConfigMap", 500);
        cluster.add("Secret", "ns-a", "sec1");
        cluster.add("Secret", "ns-a", "sec2");
        cluster.fail_delete("Secret", "sec1");
        cluster.add("ServiceAccount", "ns-a", "sa1");

        let summary = delete_namespace_artifacts("ns-a", &kinds(&cluster))
            .await
            .unwrap();

        assert!(!summary.is_clean());
        assert!(summary.kind("ConfigMap").unwrap().list_error.is_some());
        let secrets = summary.kind("Secret").unwrap();
        assert_eq!(secrets.deleted, vec!["sec2"]);
        assert_eq!(secrets.failed.len(), 1);
        assert_eq!(secrets.failed[0].0, "sec1");
        assert_eq!(summary.kind("ServiceAccount").unwrap().deleted, vec!["sa1"]);
    }

    /// No retries within a pass: a failed delete is attempted exactly once
    #[tokio::test]
    async fn test_failed_delete_is_not_retried() {
        let cluster = FakeCluster::new();
        cluster.add("Secret", "ns-a", "sec1");
        cluster.fail_delete("Secret", "sec1");

        delete_namespace_artifacts("ns-a", &kinds(&cluster))
            .await
            .unwrap();

        let attempts = cluster
            .deletes()
            .iter()
            .filter(|(k, _, n)| k == "Secret" && n == "sec1")
            .count();
        assert_eq!(attempts, 1);
        assert_eq!(cluster.names("Secret", "ns-a"), vec!["sec1"]);
    }

    #[tokio::test]
    async fn test_namespaces_processed_in_order() {
        let cluster = FakeCluster::new();
        cluster.add("ConfigMap", "ns-a", "cm-a");
        cluster.add("ConfigMap", "ns-b", "cm-b");

        let summaries = delete_artifacts(&["ns-b".to_string(), "ns-a".to_string()], &kinds(&cluster))
            .await
            .unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].namespace, "ns-b");
        let order: Vec<String> = cluster.deletes().into_iter().map(|(_, ns, _)| ns).collect();
        assert_eq!(order, vec!["ns-b", "ns-a"]);
    }

    /// A second delete of the same object answers not-found
    #[tokio::test]
    async fn test_repeated_delete_reports_not_found() {
        let cluster = FakeCluster::new();
        cluster.add("ConfigMap", "ns-a", "cm1");
        let kind = FakeKind::boxed("ConfigMap", KindScope::Namespaced, &cluster);

        assert!(kind.delete("ns-a", "cm1").await.is_ok());
        let again = kind.delete("ns-a", "cm1").await;

        assert!(matches!(again, Err(ref e) if crate::errors::is_not_found(e)));
        assert!(cluster.names("ConfigMap", "ns-a").is_empty());
    }

    #[tokio::test]
    async fn test_empty_namespace_rejected_before_any_delete() {
        let cluster = FakeCluster::new();
        cluster.add("ConfigMap", "ns-a", "cm1");

        let result = delete_artifacts(&["ns-a".to_string(), String::new()], &kinds(&cluster)).await;

        assert!(matches!(result, Err(HarnessError::InvalidInput { .. })));
        assert!(cluster.deletes().is_empty());
    }

    /// ns-b: PV resolved through the PVC's domain-UID label, already removed
    /// out-of-band; the 404 is absorbed and the pass stays clean
    #[tokio::test]
    async fn test_persistent_volume_removed_out_of_band_is_absorbed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/ns-b/persistentvolumeclaims"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body(
                "v1",
                "PersistentVolumeClaim",
                vec![object(
                    "v1",
                    "PersistentVolumeClaim",
                    "dom1-pvc",
                    Some("ns-b"),
                    &[("weblogic.domainUid", "dom1")],
                )],
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/persistentvolumes"))
            .and(query_param("labelSelector", "weblogic.domainUid in (dom1)"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body(
                "v1",
                "PersistentVolume",
                vec![object(
                    "v1",
                    "PersistentVolume",
                    "dom1-pv",
                    None,
                    &[("weblogic.domainUid", "dom1")],
                )],
            )))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/persistentvolumes/dom1-pv"))
            .respond_with(ResponseTemplate::new(404).set_body_json(status_body(404, "NotFound")))
            .expect(1)
            .mount(&server)
            .await;

        let kinds: Vec<Box<dyn ResourceKind>> = vec![Box::new(PersistentVolumeKind::new(
            mock_client(&server),
            &HarnessConfig::default().domain_uid_labels,
            100,
        ))];

        let summary = delete_namespace_artifacts("ns-b", &kinds).await.unwrap();

        assert!(summary.is_clean());
        let pvs = summary.kind("PersistentVolume").unwrap();
        assert!(pvs.deleted.is_empty());
        assert_eq!(pvs.already_gone, vec!["dom1-pv"]);
    }

    #[tokio::test]
    async fn test_report_after_pass_converges() {
        let cluster = FakeCluster::new();
        cluster.add("ConfigMap", "ns-a", "cm1");
        cluster.add("Namespace", "ns-a", "ns-a");
        let kinds = kinds(&cluster);

        delete_namespace_artifacts("ns-a", &kinds).await.unwrap();
        let report = enumerate("ns-a", &kinds).await.unwrap();

        assert!(report.is_converged(InconclusivePolicy::TreatAsPresent));
    }

    /// Lists an object that someone else deletes before our delete lands.
    struct VanishingKind {
        cluster: Arc<FakeCluster>,
    }

    #[async_trait::async_trait]
    impl ResourceKind for VanishingKind {
        fn name(&self) -> &str {
            "Secret"
        }

        fn scope(&self) -> KindScope {
            KindScope::Namespaced
        }

        async fn list(&self, namespace: &str) -> Result<Vec<String>, kube::Error> {
            let names = self.cluster.names("Secret", namespace);
            for name in &names {
                self.cluster.remove("Secret", namespace, name);
            }
            Ok(names)
        }

        async fn delete(&self, _namespace: &str, _name: &str) -> Result<(), kube::Error> {
            Err(crate::testing::api_error(404, "NotFound"))
        }
    }
}
