// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Claim resolution for a single (namespace, feature) pair.

/// Outcome of a claim attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Nobody owns the feature, the candidate takes it
    Accept,
    /// The candidate already owns the feature
    NoOpAlreadyOwned,
    /// Another DynaKube owns the feature
    Conflict,
}

/// Decide whether `candidate` may own a feature currently owned by `existing`.
///
/// Ownership is never transferred: a differing owner is a conflict, not a handover.
/// Callers pass `None` for claims whose owner no longer exists.
pub fn resolve(existing: Option<&str>, candidate: &str) -> Resolution {
    match existing {
        None => Resolution::Accept,
        Some(owner) if owner == candidate => Resolution::NoOpAlreadyOwned,
        Some(_) => Resolution::Conflict,
    }
}
