// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::types::Feature;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Invalid namespace selector for feature {feature}: {message}")]
    SelectorParse { feature: Feature, message: String },

    #[error(
        "Namespace {namespace} is already mapped to DynaKube {owner} for feature {feature}, refusing to map it to {candidate}"
    )]
    Conflict {
        namespace: String,
        feature: Feature,
        owner: String,
        candidate: String,
    },

    #[error("Gave up updating namespace {namespace} after {attempts} concurrent modifications")]
    RetriesExhausted { namespace: String, attempts: u32 },

    #[error("Namespace mapping did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("DynaKube {0} has no namespace")]
    MissingNamespace(String),

    #[error("Finalizer error: {0}")]
    FinalizerError(#[source] Box<kube::runtime::finalizer::Error<MapperError>>),
}

impl MapperError {
    /// Short machine-readable reason, used on status conditions
    pub fn reason(&self) -> &'static str {
        match self {
            MapperError::SelectorParse { .. } => "InvalidSelector",
            MapperError::Conflict { .. } => "OwnershipConflict",
            MapperError::RetriesExhausted { .. } => "ConcurrentModification",
            MapperError::DeadlineExceeded(_) => "DeadlineExceeded",
            MapperError::Store(_) | MapperError::KubeError(_) => "StoreError",
            MapperError::MissingNamespace(_) | MapperError::FinalizerError(_) => "ReconcileError",
        }
    }
}

/// Failures reported by a namespace store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Namespace {0} not found")]
    NotFound(String),

    #[error("Namespace {0} was modified concurrently")]
    VersionConflict(String),

    #[error("Namespace store unavailable: {0}")]
    Unavailable(#[from] kube::Error),
}

pub type Result<T> = std::result::Result<T, MapperError>;
