// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! DynaKube lookup backed by the Kubernetes API

use crate::error::StoreError;
use crate::mapper::store::DynaKubeLookup;
use crate::types::DynaKube;
use async_trait::async_trait;
use kube::{Api, Client};
use tracing::instrument;

/// Answers whether a DynaKube still exists in the operator namespace
#[derive(Clone)]
pub struct KubeDynaKubeLookup {
    dynakubes: Api<DynaKube>,
}

impl KubeDynaKubeLookup {
    pub fn new(client: Client, operator_namespace: &str) -> Self {
        Self {
            dynakubes: Api::namespaced(client, operator_namespace),
        }
    }
}

#[async_trait]
impl DynaKubeLookup for KubeDynaKubeLookup {
    #[instrument(skip(self))]
    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.dynakubes.get_opt(name).await?.is_some())
    }
}
