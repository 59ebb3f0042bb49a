// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{labels, NAMESPACES_MAPPED_CONDITION};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "dynatrace.com", version = "v1beta1", kind = "DynaKube")]
#[kube(namespaced, shortname = "dk")]
#[kube(status = "DynaKubeStatus")]
#[serde(rename_all = "camelCase")]
pub struct DynaKubeSpec {
    /// Default selector for every feature that does not bring its own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<LabelSelector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_modules: Option<FeatureSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_ingest: Option<FeatureSpec>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_selector: Option<LabelSelector>,
}

/// A monitoring capability that is owned per namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    CodeModules,
    DataIngest,
}

impl Feature {
    /// Every feature, in the order they are mapped
    pub const ALL: [Feature; 2] = [Feature::CodeModules, Feature::DataIngest];

    /// Namespace label that records the owner of this feature
    pub fn label_key(self) -> &'static str {
        match self {
            Feature::CodeModules => labels::CODE_MODULES_INSTANCE,
            Feature::DataIngest => labels::DATA_INGEST_INSTANCE,
        }
    }

    pub fn from_label_key(key: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.label_key() == key)
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::CodeModules => write!(f, "codeModules"),
            Feature::DataIngest => write!(f, "dataIngest"),
        }
    }
}

impl DynaKube {
    fn feature_spec(&self, feature: Feature) -> Option<&FeatureSpec> {
        match feature {
            Feature::CodeModules => self.spec.code_modules.as_ref(),
            Feature::DataIngest => self.spec.data_ingest.as_ref(),
        }
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        self.feature_spec(feature).is_some_and(|f| f.enabled)
    }

    /// Enabled features in mapping order
    pub fn enabled_features(&self) -> Vec<Feature> {
        Feature::ALL
            .into_iter()
            .filter(|f| self.is_enabled(*f))
            .collect()
    }

    /// The selector that scopes a feature: its own, falling back to the DynaKube-wide one
    pub fn selector_for(&self, feature: Feature) -> Option<&LabelSelector> {
        self.feature_spec(feature)
            .and_then(|f| f.namespace_selector.as_ref())
            .or(self.spec.namespace_selector.as_ref())
    }

    /// Current NamespacesMapped condition, if any
    pub fn mapped_condition(&self) -> Option<&Condition> {
        self.status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .and_then(|conditions| {
                conditions
                    .iter()
                    .find(|c| c.condition_type == NAMESPACES_MAPPED_CONDITION)
            })
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DynaKubeStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<Condition>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    /// Same type, status, reason and message; the transition time is ignored
    pub fn same_state(&self, other: &Condition) -> bool {
        self.condition_type == other.condition_type
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}
