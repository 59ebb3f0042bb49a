// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Custom resource types.

pub mod dynakube;

pub use dynakube::{Condition, DynaKube, DynaKubeSpec, DynaKubeStatus, Feature, FeatureSpec};
