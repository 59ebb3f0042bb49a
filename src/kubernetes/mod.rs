// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes-backed implementations of the mapper's stores and CRD discovery.

pub mod crd;
pub mod dynakubes;
pub mod namespaces;

pub use crd::wait_for_dynakube_crd;
pub use dynakubes::KubeDynaKubeLookup;
pub use namespaces::KubeNamespaceStore;
