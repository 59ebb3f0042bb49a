// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace store backed by the Kubernetes API

use crate::constants::OPERATOR_NAME;
use crate::error::StoreError;
use crate::mapper::store::{NamespaceRecord, NamespaceStore};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{ListParams, Patch, PatchParams},
    core::Selector,
    Api, Client, ResourceExt,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Reads namespaces and writes their labels/annotations with resourceVersion preconditions
#[derive(Clone)]
pub struct KubeNamespaceStore {
    namespaces: Api<Namespace>,
}

impl KubeNamespaceStore {
    pub fn new(client: Client) -> Self {
        Self {
            namespaces: Api::all(client),
        }
    }
}

fn to_record(ns: &Namespace) -> NamespaceRecord {
    NamespaceRecord {
        name: ns.name_any(),
        labels: ns.labels().clone(),
        annotations: ns.annotations().clone(),
        resource_version: ns.resource_version(),
    }
}

fn map_error(name: &str, err: kube::Error) -> StoreError {
    match err {
        kube::Error::Api(ref resp) if resp.code == 404 => StoreError::NotFound(name.to_string()),
        kube::Error::Api(ref resp) if resp.code == 409 => {
            StoreError::VersionConflict(name.to_string())
        }
        e => StoreError::Unavailable(e),
    }
}

/// Merge-patch entries turning `current` into `desired`: changed keys are set, dropped keys are nulled
fn map_diff(current: &BTreeMap<String, String>, desired: &BTreeMap<String, String>) -> Value {
    let mut diff = Map::new();
    for key in current.keys().filter(|k| !desired.contains_key(*k)) {
        diff.insert(key.clone(), Value::Null);
    }
    for (key, value) in desired {
        if current.get(key) != Some(value) {
            diff.insert(key.clone(), Value::String(value.clone()));
        }
    }
    Value::Object(diff)
}

/// JSON merge patch for an ownership update. Carrying `resourceVersion` makes the API server
/// reject the patch with 409 if the namespace changed since `current` was read.
pub fn ownership_patch(current: &NamespaceRecord, desired: &NamespaceRecord) -> Value {
    let mut metadata = Map::new();
    if let Some(version) = &current.resource_version {
        metadata.insert("resourceVersion".to_string(), Value::String(version.clone()));
    }
    metadata.insert("labels".to_string(), map_diff(&current.labels, &desired.labels));
    metadata.insert(
        "annotations".to_string(),
        map_diff(&current.annotations, &desired.annotations),
    );
    serde_json::json!({ "metadata": metadata })
}

#[async_trait]
impl NamespaceStore for KubeNamespaceStore {
    #[instrument(skip(self))]
    async fn get(&self, name: &str) -> Result<NamespaceRecord, StoreError> {
        let ns = self
            .namespaces
            .get(name)
            .await
            .map_err(|e| map_error(name, e))?;
        Ok(to_record(&ns))
    }

    #[instrument(skip(self, selector))]
    async fn list(&self, selector: Option<&Selector>) -> Result<Vec<String>, StoreError> {
        let lp = match selector {
            Some(selector) => ListParams::default().labels_from(selector),
            None => ListParams::default(),
        };
        let list = self.namespaces.list(&lp).await?;
        debug!("Listed {} namespaces", list.items.len());

        Ok(list.items.iter().map(|ns| ns.name_any()).collect())
    }

    #[instrument(skip(self, current, desired), fields(namespace = %current.name))]
    async fn update(
        &self,
        current: &NamespaceRecord,
        desired: &NamespaceRecord,
    ) -> Result<(), StoreError> {
        let patch = ownership_patch(current, desired);
        self.namespaces
            .patch(
                &current.name,
                &PatchParams {
                    field_manager: Some(OPERATOR_NAME.to_string()),
                    ..Default::default()
                },
                &Patch::Merge(&patch),
            )
            .await
            .map_err(|e| map_error(&current.name, e))?;
        Ok(())
    }
}
