// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Maps DynaKubes onto namespaces.
//!
//! Every feature of a namespace is owned by at most one DynaKube. Ownership lives on the
//! namespace itself (one label per feature plus a marker annotation), so the invariant is kept
//! with per-namespace read-modify-write cycles guarded by the namespace's resourceVersion
//! rather than with any lock.

pub mod conflict;
pub mod ledger;
pub mod selector;
pub mod store;

use crate::config::Config;
use crate::error::{MapperError, Result, StoreError};
use crate::types::{DynaKube, Feature};
use conflict::{resolve, Resolution};
use kube::ResourceExt;
use ledger::OwnershipLedger;
use selector::SelectorMatcher;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use store::{DynaKubeLookup, NamespaceRecord, NamespaceStore};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// What a map/unmap call changed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MappingSummary {
    /// Feature claims newly taken
    pub claimed: usize,
    /// Feature claims the DynaKube already held
    pub reaffirmed: usize,
    /// Feature claims given up
    pub released: usize,
    /// Namespaces that disappeared while being processed
    pub skipped: usize,
}

/// Owner liveness answers, cached for the duration of one call
type OwnerCache = HashMap<String, bool>;

pub struct DynakubeMapper {
    ledger: OwnershipLedger,
    dynakubes: Arc<dyn DynaKubeLookup>,
    matcher: SelectorMatcher,
    deadline: Duration,
    max_attempts: u32,
}

impl DynakubeMapper {
    pub fn new(
        store: Arc<dyn NamespaceStore>,
        dynakubes: Arc<dyn DynaKubeLookup>,
        operator_namespace: &str,
    ) -> Self {
        Self {
            ledger: OwnershipLedger::new(store),
            dynakubes,
            matcher: SelectorMatcher::new(operator_namespace),
            deadline: Duration::from_secs(crate::constants::mapping::DEFAULT_DEADLINE_SECS),
            max_attempts: crate::constants::mapping::DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn from_config(
        store: Arc<dyn NamespaceStore>,
        dynakubes: Arc<dyn DynaKubeLookup>,
        config: &Config,
    ) -> Self {
        Self::new(store, dynakubes, &config.operator_namespace)
            .with_deadline(config.mapping_deadline)
            .with_max_attempts(config.max_attempts)
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn ledger(&self) -> &OwnershipLedger {
        &self.ledger
    }

    /// Claim every enabled feature of `dk` on the namespaces its selectors match, and release
    /// claims on namespaces it no longer matches or for features it no longer enables.
    ///
    /// Stops at the first conflicting namespace; namespaces handled before it keep their
    /// new state and the next call converges.
    #[instrument(skip(self, dk), fields(dynakube = %dk.name_any()))]
    pub async fn map_from_dynakube(&self, dk: &DynaKube) -> Result<MappingSummary> {
        self.bounded(self.map(dk)).await
    }

    /// Release every claim held by the DynaKube `name`. Marker annotations stay.
    #[instrument(skip(self))]
    pub async fn unmap_from_dynakube(&self, name: &str) -> Result<MappingSummary> {
        self.bounded(self.unmap(name)).await
    }

    async fn bounded<F>(&self, work: F) -> Result<MappingSummary>
    where
        F: Future<Output = Result<MappingSummary>>,
    {
        timeout(self.deadline, work)
            .await
            .map_err(|_| MapperError::DeadlineExceeded(self.deadline))?
    }

    async fn map(&self, dk: &DynaKube) -> Result<MappingSummary> {
        let name = dk.name_any();

        // All selectors must parse before anything is written
        let mut selectors = Vec::new();
        for feature in dk.enabled_features() {
            selectors.push((
                feature,
                SelectorMatcher::parse(feature, dk.selector_for(feature))?,
            ));
        }

        let mut candidates: BTreeMap<Feature, BTreeSet<String>> = BTreeMap::new();
        for (feature, selector) in &selectors {
            let matched = self
                .matcher
                .candidates(self.ledger.store(), selector.as_ref())
                .await?;
            debug!("{} matches {} namespaces for {}", name, matched.len(), feature);
            candidates.insert(*feature, matched);
        }

        let mut stale: BTreeMap<String, Vec<Feature>> = BTreeMap::new();
        for feature in Feature::ALL {
            let wanted = candidates.get(&feature);
            for namespace in self.ledger.owned_by(feature, &name).await? {
                if !wanted.is_some_and(|c| c.contains(&namespace)) {
                    stale.entry(namespace).or_default().push(feature);
                }
            }
        }

        let mut summary = MappingSummary::default();
        for (namespace, features) in &stale {
            self.release(namespace, features, &name, &mut summary)
                .await?;
        }

        let mut claims: BTreeMap<String, Vec<Feature>> = BTreeMap::new();
        for (feature, namespaces) in &candidates {
            for namespace in namespaces {
                claims.entry(namespace.clone()).or_default().push(*feature);
            }
        }

        let mut owners = OwnerCache::new();
        for (namespace, features) in &claims {
            self.claim(namespace, features, &name, &mut owners, &mut summary)
                .await?;
        }

        info!(
            "Mapped DynaKube {}: {} claimed, {} reaffirmed, {} released",
            name, summary.claimed, summary.reaffirmed, summary.released
        );
        Ok(summary)
    }

    async fn unmap(&self, name: &str) -> Result<MappingSummary> {
        let mut owned: BTreeMap<String, Vec<Feature>> = BTreeMap::new();
        for feature in Feature::ALL {
            for namespace in self.ledger.owned_by(feature, name).await? {
                owned.entry(namespace).or_default().push(feature);
            }
        }

        let mut summary = MappingSummary::default();
        for (namespace, features) in &owned {
            self.release(namespace, features, name, &mut summary)
                .await?;
        }

        info!(
            "Unmapped DynaKube {} from {} namespaces",
            name,
            owned.len()
        );
        Ok(summary)
    }

    /// Take `features` on `namespace` for `owner` in a single versioned update.
    /// A conflict on any feature leaves the namespace untouched.
    async fn claim(
        &self,
        namespace: &str,
        features: &[Feature],
        owner: &str,
        owners: &mut OwnerCache,
        summary: &mut MappingSummary,
    ) -> Result<()> {
        for attempt in 1..=self.max_attempts {
            let Some(current) = self.ledger.fetch(namespace).await? else {
                debug!("Namespace {} vanished, skipping", namespace);
                summary.skipped += 1;
                return Ok(());
            };

            let mut desired = current.clone();
            let (mut claimed, mut reaffirmed) = (0, 0);
            for &feature in features {
                let existing = self.live_owner(&current, feature, owners).await?;
                match resolve(existing.as_deref(), owner) {
                    Resolution::Accept => claimed += 1,
                    Resolution::NoOpAlreadyOwned => reaffirmed += 1,
                    Resolution::Conflict => {
                        let existing = existing.unwrap_or_default();
                        warn!(
                            "Namespace {} is already mapped to {} for {}",
                            namespace, existing, feature
                        );
                        return Err(MapperError::Conflict {
                            namespace: namespace.to_string(),
                            feature,
                            owner: existing,
                            candidate: owner.to_string(),
                        });
                    }
                }
                desired.write(feature, owner);
            }

            match self.ledger.commit(&current, &desired).await {
                Ok(_) => {
                    if claimed > 0 {
                        info!("Namespace {} mapped to {}", namespace, owner);
                    }
                    summary.claimed += claimed;
                    summary.reaffirmed += reaffirmed;
                    return Ok(());
                }
                Err(StoreError::VersionConflict(_)) => {
                    debug!(attempt, "Namespace {} changed underneath us, retrying", namespace);
                }
                Err(StoreError::NotFound(_)) => {
                    summary.skipped += 1;
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(MapperError::RetriesExhausted {
            namespace: namespace.to_string(),
            attempts: self.max_attempts,
        })
    }

    /// Drop the claims `owner` still holds for `features` on `namespace`
    async fn release(
        &self,
        namespace: &str,
        features: &[Feature],
        owner: &str,
        summary: &mut MappingSummary,
    ) -> Result<()> {
        for attempt in 1..=self.max_attempts {
            let Some(current) = self.ledger.fetch(namespace).await? else {
                summary.skipped += 1;
                return Ok(());
            };

            let mut desired = current.clone();
            let mut released = 0;
            for &feature in features {
                if current.owner(feature) == Some(owner) {
                    desired.remove(feature);
                    released += 1;
                }
            }
            if released == 0 {
                return Ok(());
            }

            match self.ledger.commit(&current, &desired).await {
                Ok(_) => {
                    info!("Namespace {} released by {}", namespace, owner);
                    summary.released += released;
                    return Ok(());
                }
                Err(StoreError::VersionConflict(_)) => {
                    debug!(attempt, "Namespace {} changed underneath us, retrying", namespace);
                }
                Err(StoreError::NotFound(_)) => {
                    summary.skipped += 1;
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(MapperError::RetriesExhausted {
            namespace: namespace.to_string(),
            attempts: self.max_attempts,
        })
    }

    /// Owner of `feature` on `record`, ignoring claims of DynaKubes that no longer exist
    async fn live_owner(
        &self,
        record: &NamespaceRecord,
        feature: Feature,
        owners: &mut OwnerCache,
    ) -> Result<Option<String>> {
        let Some(owner) = record.owner(feature) else {
            return Ok(None);
        };

        let alive = match owners.get(owner) {
            Some(alive) => *alive,
            None => {
                let alive = self.dynakubes.exists(owner).await?;
                owners.insert(owner.to_string(), alive);
                alive
            }
        };

        if alive {
            Ok(Some(owner.to_string()))
        } else {
            info!(
                "Namespace {} holds an orphaned {} claim of {}",
                record.name, feature, owner
            );
            Ok(None)
        }
    }
}
