// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dynakube_mapper::config::Config;
use dynakube_mapper::kubernetes::{wait_for_dynakube_crd, KubeDynaKubeLookup, KubeNamespaceStore};
use dynakube_mapper::mapper::DynakubeMapper;
use dynakube_mapper::reconcilers::DynaKubeReconciler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting DynaKube namespace mapper");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: operator_namespace={}, mapping_deadline={:?}, max_attempts={}",
        config.operator_namespace, config.mapping_deadline, config.max_attempts
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Wait for the DynaKube CRD before starting the reconciler
    info!("Waiting for DynaKube CRD to become available...");
    wait_for_dynakube_crd(&client).await?;

    let mapper = DynakubeMapper::from_config(
        Arc::new(KubeNamespaceStore::new(client.clone())),
        Arc::new(KubeDynaKubeLookup::new(
            client.clone(),
            &config.operator_namespace,
        )),
        &config,
    );
    let reconciler = DynaKubeReconciler::new(client, mapper, &config);

    info!("Starting reconciler...");
    reconciler.run().await?;

    warn!("Reconciler stopped");
    Ok(())
}
