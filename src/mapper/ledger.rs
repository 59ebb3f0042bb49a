// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-namespace ownership records, persisted as namespace labels and annotations.

use crate::error::{Result, StoreError};
use crate::mapper::selector::SelectorMatcher;
use crate::mapper::store::{NamespaceRecord, NamespaceStore};
use crate::types::Feature;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Reads and writes ownership claims through a namespace store
#[derive(Clone)]
pub struct OwnershipLedger {
    store: Arc<dyn NamespaceStore>,
}

impl OwnershipLedger {
    pub fn new(store: Arc<dyn NamespaceStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn NamespaceStore {
        self.store.as_ref()
    }

    /// Current claims on a namespace; empty if the namespace does not exist
    pub async fn read(&self, namespace: &str) -> Result<BTreeMap<Feature, String>> {
        Ok(self
            .fetch(namespace)
            .await?
            .map(|record| record.claims())
            .unwrap_or_default())
    }

    /// Versioned read of a namespace, `None` if it does not exist
    pub async fn fetch(&self, namespace: &str) -> Result<Option<NamespaceRecord>> {
        match self.store.get(namespace).await {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Namespaces on which `owner` holds `feature`
    pub async fn owned_by(&self, feature: Feature, owner: &str) -> Result<BTreeSet<String>> {
        let selector = SelectorMatcher::owned_by(feature, owner)?;
        let names = self.store.list(Some(&selector)).await?;
        Ok(names.into_iter().collect())
    }

    /// Persist `desired` if it differs from `current`, guarded by the version `current` was read at.
    /// Returns whether a write was issued.
    #[instrument(skip(self, current, desired), fields(namespace = %current.name))]
    pub async fn commit(
        &self,
        current: &NamespaceRecord,
        desired: &NamespaceRecord,
    ) -> std::result::Result<bool, StoreError> {
        if current.same_metadata(desired) {
            debug!("Namespace already up to date");
            return Ok(false);
        }

        self.store.update(current, desired).await?;
        debug!("Namespace updated");
        Ok(true)
    }
}
