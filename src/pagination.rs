// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pagination helpers for Kubernetes API list operations.
//!
//! Test namespaces rarely hold many objects, but cluster-scoped lists (PVs,
//! cluster roles) can be large on shared clusters, so every list goes through
//! pages rather than one unbounded call.

use kube::{api::ListParams, Api};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// List all resources with automatic pagination.
///
/// Works for typed resources and for `DynamicObject` alike, since the scope
/// and dynamic type are already fixed by `api`.
///
/// # Arguments
///
/// * `api` - Kubernetes API client for the resource type
/// * `list_params` - Base list parameters (labels, fields, etc.)
/// * `page_size` - Items per page
///
/// # Example
///
/// ```no_run
/// use k8s_openapi::api::core::v1::ConfigMap;
/// use kube::{Api, Client, api::ListParams};
/// use kubesweep::pagination::list_all_paginated;
///
/// # async fn example() -> Result<(), kube::Error> {
/// let client = Client::try_default().await?;
/// let api: Api<ConfigMap> = Api::namespaced(client, "ns-a");
///
/// let maps = list_all_paginated(&api, ListParams::default(), 100).await?;
/// println!("Found {} config maps", maps.len());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the first Kubernetes API error met; items from earlier pages are
/// discarded.
pub async fn list_all_paginated<K>(
    api: &Api<K>,
    mut list_params: ListParams,
    page_size: u32,
) -> Result<Vec<K>, kube::Error>
where
    K: Clone + DeserializeOwned + Debug,
{
    list_params.limit = Some(page_size);

    let mut all_items = Vec::new();
    let mut page_count = 0;

    loop {
        page_count += 1;
        let result = api.list(&list_params).await?;

        let item_count = result.items.len();
        all_items.extend(result.items);

        debug!(
            page = page_count,
            items_in_page = item_count,
            total_items = all_items.len(),
            "Fetched page from Kubernetes API"
        );

        match result.metadata.continue_ {
            Some(token) if !token.is_empty() => list_params.continue_token = Some(token),
            _ => break,
        }
    }

    Ok(all_items)
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod pagination_tests;
