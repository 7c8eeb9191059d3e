// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `pagination.rs`

#[cfg(test)]
mod tests {
    use crate::constants::KUBE_LIST_PAGE_SIZE;
    use crate::pagination::list_all_paginated;
    use crate::testing::{list_body, mock_client, object};
    use k8s_openapi::api::core::v1::Secret;
    use kube::api::{Api, ListParams};
    use kube::ResourceExt;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Test that pagination constant has expected value
    #[test]
    fn test_pagination_constant() {
        assert_eq!(
            KUBE_LIST_PAGE_SIZE, 100,
            "Page size should be 100 items per page"
        );
    }

    /// Test that continue tokens are followed until the last page
    #[tokio::test]
    async fn test_follows_continue_token() {
        let server = MockServer::start().await;

        let mut first = list_body(
            "v1",
            "Secret",
            vec![object("v1", "Secret", "sec1", Some("ns-a"), &[])],
        );
        first["metadata"] = json!({ "resourceVersion": "1", "continue": "page-2" });

        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/ns-a/secrets"))
            .and(query_param("continue", "page-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body(
                "v1",
                "Secret",
                vec![object("v1", "Secret", "sec2", Some("ns-a"), &[])],
            )))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/ns-a/secrets"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(first))
            .expect(1)
            .mount(&server)
            .await;

        let api: Api<Secret> = Api::namespaced(mock_client(&server), "ns-a");
        let items = list_all_paginated(&api, ListParams::default(), 2)
            .await
            .unwrap();

        let names: Vec<String> = items.iter().map(ResourceExt::name_any).collect();
        assert_eq!(names, vec!["sec1".to_string(), "sec2".to_string()]);
    }

    #[tokio::test]
    async fn test_propagates_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/namespaces/ns-a/secrets"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(crate::testing::status_body(403, "Forbidden")),
            )
            .mount(&server)
            .await;

        let api: Api<Secret> = Api::namespaced(mock_client(&server), "ns-a");
        let result = list_all_paginated(&api, ListParams::default(), 100).await;

        assert!(matches!(result, Err(kube::Error::Api(ae)) if ae.code == 403));
    }
}
