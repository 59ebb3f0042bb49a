// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Namespace label keys, one per mappable feature. The value is the owning DynaKube's name.
pub mod labels {
    /// Owner of code-module injection for the namespace
    pub const CODE_MODULES_INSTANCE: &str = "dynakube.internal.dynatrace.com/instance";
    /// Owner of data-ingest metadata enrichment for the namespace
    pub const DATA_INGEST_INSTANCE: &str = "dynakube.internal.dynatrace.com/data-ingest";
}

/// Namespace annotation keys
pub mod annotations {
    /// Set to "true" once the mapper has touched a namespace. Never removed.
    pub const UPDATED_VIA_DYNAKUBE: &str = "dynatrace.com/updated-via-dynakube";
    pub const UPDATED_VIA_DYNAKUBE_VALUE: &str = "true";
}

/// The operator name used as field manager
pub const OPERATOR_NAME: &str = "dynatrace-operator";

/// Finalizer that holds a DynaKube until its namespace claims are released
pub const FINALIZER: &str = "dynatrace.com/namespace-mapping";

/// Status condition reported on each DynaKube
pub const NAMESPACES_MAPPED_CONDITION: &str = "NamespacesMapped";

/// CRD polling configuration
pub mod crd {
    pub const GROUP: &str = "dynatrace.com";
    pub const KIND: &str = "DynaKube";
    pub const VERSION: &str = "v1beta1";
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}

/// Defaults for a single map/unmap call
pub mod mapping {
    pub const DEFAULT_DEADLINE_SECS: u64 = 30;
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
}
