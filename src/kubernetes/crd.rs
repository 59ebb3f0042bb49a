// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! CRD availability checking utilities

use crate::constants::crd::{GROUP, KIND, POLL_INTERVAL_SECS, POLL_MAX_INTERVAL_SECS, VERSION};
use crate::error::Result;
use kube::{discovery::Discovery, Client};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Wait for the DynaKube CRD to become available in the cluster.
/// This uses exponential backoff starting at POLL_INTERVAL_SECS seconds.
pub async fn wait_for_dynakube_crd(client: &Client) -> Result<()> {
    let mut interval = POLL_INTERVAL_SECS;

    loop {
        match check_dynakube_crd_exists(client).await {
            Ok(true) => {
                info!("DynaKube CRD ({}/{}) is available", GROUP, VERSION);
                return Ok(());
            }
            Ok(false) => {
                info!(
                    "DynaKube CRD ({}/{}) not yet available, waiting {} seconds...",
                    GROUP, VERSION, interval
                );
            }
            Err(e) => {
                warn!(
                    "Error checking for DynaKube CRD: {}, retrying in {} seconds...",
                    e, interval
                );
            }
        }

        sleep(Duration::from_secs(interval)).await;

        // Exponential backoff with max cap
        interval = (interval * 2).min(POLL_MAX_INTERVAL_SECS);
    }
}

/// Check if the DynaKube CRD is served by attempting to discover it.
async fn check_dynakube_crd_exists(client: &Client) -> Result<bool> {
    let discovery = Discovery::new(client.clone())
        .filter(&[GROUP])
        .run()
        .await?;

    for group in discovery.groups() {
        if group.name() == GROUP {
            for (ar, _) in group.recommended_resources() {
                if ar.kind == KIND && ar.version == VERSION {
                    return Ok(true);
                }
            }
        }
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockService;

    fn api_groups(groups: serde_json::Value) -> String {
        serde_json::json!({
            "kind": "APIGroupList",
            "apiVersion": "v1",
            "groups": groups
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_crd_served() {
        let groups = api_groups(serde_json::json!([{
            "name": GROUP,
            "versions": [{ "groupVersion": "dynatrace.com/v1beta1", "version": VERSION }],
            "preferredVersion": { "groupVersion": "dynatrace.com/v1beta1", "version": VERSION }
        }]));
        let resources = serde_json::json!({
            "kind": "APIResourceList",
            "apiVersion": "v1",
            "groupVersion": "dynatrace.com/v1beta1",
            "resources": [{
                "name": "dynakubes",
                "singularName": "dynakube",
                "namespaced": true,
                "kind": KIND,
                "verbs": ["get", "list", "watch", "patch"]
            }]
        })
        .to_string();
        let client = MockService::new()
            .on_get("/apis", 200, &groups)
            .on_get("/apis/dynatrace.com/v1beta1", 200, &resources)
            .into_client();

        assert!(check_dynakube_crd_exists(&client).await.unwrap());
    }

    #[tokio::test]
    async fn test_crd_not_served() {
        let client = MockService::new()
            .on_get("/apis", 200, &api_groups(serde_json::json!([])))
            .into_client();

        assert!(!check_dynakube_crd_exists(&client).await.unwrap());
    }
}
