// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::mapping::{DEFAULT_DEADLINE_SECS, DEFAULT_MAX_ATTEMPTS};
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace the operator is installed in. DynaKubes live here and it is never mapped.
    pub operator_namespace: String,
    /// Upper bound for a single map/unmap call
    pub mapping_deadline: Duration,
    /// How many times a namespace update is attempted before giving up on version conflicts
    pub max_attempts: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let operator_namespace =
            env::var("POD_NAMESPACE").context("POD_NAMESPACE environment variable not set")?;

        let deadline_secs: u64 = match env::var("MAPPING_DEADLINE_SECS") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("Invalid MAPPING_DEADLINE_SECS: {}", v))?,
            Err(_) => DEFAULT_DEADLINE_SECS,
        };

        let max_attempts: u32 = match env::var("MAPPING_MAX_ATTEMPTS") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("Invalid MAPPING_MAX_ATTEMPTS: {}", v))?,
            Err(_) => DEFAULT_MAX_ATTEMPTS,
        };

        Ok(Config {
            operator_namespace,
            mapping_deadline: Duration::from_secs(deadline_secs),
            max_attempts: max_attempts.max(1),
        })
    }
}
