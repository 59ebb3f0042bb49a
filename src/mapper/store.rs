// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Collaborator interfaces the mapper reads and writes through.

use crate::constants::annotations;
use crate::error::StoreError;
use crate::types::Feature;
use async_trait::async_trait;
use kube::core::Selector;
use std::collections::BTreeMap;

/// Snapshot of a namespace's mutable metadata together with the version it was read at
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamespaceRecord {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub resource_version: Option<String>,
}

impl NamespaceRecord {
    /// Owner of a feature on this namespace, if any. An empty label value names nobody.
    pub fn owner(&self, feature: Feature) -> Option<&str> {
        self.labels
            .get(feature.label_key())
            .map(String::as_str)
            .filter(|owner| !owner.is_empty())
    }

    /// All feature claims recorded on this namespace
    pub fn claims(&self) -> BTreeMap<Feature, String> {
        self.labels
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .filter_map(|(k, v)| Feature::from_label_key(k).map(|f| (f, v.clone())))
            .collect()
    }

    pub fn is_marked(&self) -> bool {
        self.annotations.contains_key(annotations::UPDATED_VIA_DYNAKUBE)
    }

    /// Record `owner` as the owner of `feature` and mark the namespace as managed
    pub fn write(&mut self, feature: Feature, owner: &str) {
        self.labels
            .insert(feature.label_key().to_string(), owner.to_string());
        self.mark();
    }

    /// Drop the claim for `feature`. The marker stays, and is added if it was missing.
    pub fn remove(&mut self, feature: Feature) {
        self.labels.remove(feature.label_key());
        self.mark();
    }

    fn mark(&mut self) {
        self.annotations
            .entry(annotations::UPDATED_VIA_DYNAKUBE.to_string())
            .or_insert_with(|| annotations::UPDATED_VIA_DYNAKUBE_VALUE.to_string());
    }

    /// Labels and annotations are equal; versions are not compared
    pub fn same_metadata(&self, other: &NamespaceRecord) -> bool {
        self.labels == other.labels && self.annotations == other.annotations
    }
}

/// Read/write access to namespaces with optimistic concurrency
#[async_trait]
pub trait NamespaceStore: Send + Sync {
    /// Fetch one namespace. Fails with `StoreError::NotFound` if it does not exist.
    async fn get(&self, name: &str) -> Result<NamespaceRecord, StoreError>;

    /// Names of the namespaces matching `selector`, or of every namespace for `None`
    async fn list(&self, selector: Option<&Selector>) -> Result<Vec<String>, StoreError>;

    /// Replace the labels and annotations of `current` with those of `desired`.
    /// Fails with `StoreError::VersionConflict` if the namespace changed since `current` was read.
    async fn update(
        &self,
        current: &NamespaceRecord,
        desired: &NamespaceRecord,
    ) -> Result<(), StoreError>;
}

/// Read-only view of the DynaKubes known to the cluster
#[async_trait]
pub trait DynaKubeLookup: Send + Sync {
    async fn exists(&self, name: &str) -> Result<bool, StoreError>;
}
