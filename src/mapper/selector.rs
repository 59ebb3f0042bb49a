// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace selector evaluation

use crate::error::{MapperError, Result};
use crate::mapper::store::NamespaceStore;
use crate::types::Feature;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::core::Selector;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Resolves selectors to the set of namespaces a DynaKube may claim.
/// The operator's own namespace is never a candidate.
#[derive(Debug, Clone)]
pub struct SelectorMatcher {
    operator_namespace: String,
}

impl SelectorMatcher {
    pub fn new(operator_namespace: impl Into<String>) -> Self {
        Self {
            operator_namespace: operator_namespace.into(),
        }
    }

    /// Parse a feature's selector. An absent selector selects everything.
    pub fn parse(feature: Feature, selector: Option<&LabelSelector>) -> Result<Option<Selector>> {
        let Some(selector) = selector else {
            return Ok(None);
        };

        Selector::try_from(selector.clone())
            .map(Some)
            .map_err(|e| MapperError::SelectorParse {
                feature,
                message: e.to_string(),
            })
    }

    /// Selector for the namespaces whose `feature` label names `owner`
    pub fn owned_by(feature: Feature, owner: &str) -> Result<Selector> {
        let selector = LabelSelector {
            match_labels: Some(BTreeMap::from([(
                feature.label_key().to_string(),
                owner.to_string(),
            )])),
            ..Default::default()
        };

        Selector::try_from(selector).map_err(|e| MapperError::SelectorParse {
            feature,
            message: e.to_string(),
        })
    }

    /// Namespaces matching `selector`, sorted by name
    pub async fn candidates(
        &self,
        store: &dyn NamespaceStore,
        selector: Option<&Selector>,
    ) -> Result<BTreeSet<String>> {
        let names = store.list(selector).await?;
        let candidates = self.exclude_operator_namespace(names);
        debug!("Selector matched {} namespaces", candidates.len());
        Ok(candidates)
    }

    fn exclude_operator_namespace(&self, names: Vec<String>) -> BTreeSet<String> {
        names
            .into_iter()
            .filter(|name| *name != self.operator_namespace)
            .collect()
    }
}
