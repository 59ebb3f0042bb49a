// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! DynaKube reconciler - keeps namespace claims in line with each DynaKube's selectors.

use crate::config::Config;
use crate::constants::{FINALIZER, NAMESPACES_MAPPED_CONDITION, OPERATOR_NAME};
use crate::error::{MapperError, Result};
use crate::mapper::{DynakubeMapper, MappingSummary};
use crate::types::{Condition, DynaKube};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{Patch, PatchParams},
    runtime::{
        controller::Action,
        finalizer::{finalizer, Event as Finalizer},
        reflector::ObjectRef,
        Controller,
    },
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Requeue interval after a successful mapping, catches drift the watches missed
const RESYNC_INTERVAL: Duration = Duration::from_secs(300);
const ERROR_REQUEUE: Duration = Duration::from_secs(60);

pub struct DynaKubeReconciler {
    client: Client,
    mapper: DynakubeMapper,
    operator_namespace: String,
}

impl DynaKubeReconciler {
    pub fn new(client: Client, mapper: DynakubeMapper, config: &Config) -> Self {
        Self {
            client,
            mapper,
            operator_namespace: config.operator_namespace.clone(),
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let dynakubes: Api<DynaKube> = Api::namespaced(self.client.clone(), &self.operator_namespace);
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let operator_namespace = self.operator_namespace.clone();
        let context = Arc::new(self);

        let controller = Controller::new(dynakubes, WatcherConfig::default());
        let store = controller.store();

        // Any namespace change may alter what a selector matches, so every DynaKube gets another look
        controller
            .watches(namespaces, WatcherConfig::default(), move |ns: Namespace| {
                if ns.name_any() == operator_namespace {
                    return Vec::new();
                }
                store
                    .state()
                    .iter()
                    .map(|dk| ObjectRef::from_obj(dk.as_ref()))
                    .collect::<Vec<_>>()
            })
            .shutdown_on_signal()
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled DynaKube: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        info!("DynaKube reconciler stopped");
        Ok(())
    }

    /// Map the DynaKube and publish the outcome on its status
    #[instrument(skip(self, api, dk), fields(dynakube = %dk.name_any()))]
    async fn apply(&self, api: &Api<DynaKube>, dk: &DynaKube) -> Result<Action> {
        let result = self.mapper.map_from_dynakube(dk).await;

        if let Err(e) = &result {
            warn!("Mapping failed: {}", e);
        }

        let condition = mapped_condition(&result, dk.mapped_condition(), Utc::now());
        let patched = if needs_status_update(dk.mapped_condition(), &condition) {
            let status_patch = serde_json::json!({
                "status": { "conditions": with_condition(dk, condition) }
            });
            api.patch_status(
                &dk.name_any(),
                &PatchParams {
                    field_manager: Some(OPERATOR_NAME.to_string()),
                    ..Default::default()
                },
                &Patch::Merge(&status_patch),
            )
            .await
            .map(|_| debug!("Status updated"))
        } else {
            Ok(())
        };

        // The mapping outcome wins over a failed status write
        result?;
        patched?;
        Ok(Action::requeue(RESYNC_INTERVAL))
    }

    /// Release every claim before the DynaKube goes away
    #[instrument(skip(self, dk), fields(dynakube = %dk.name_any()))]
    async fn cleanup(&self, dk: &DynaKube) -> Result<Action> {
        let summary = self.mapper.unmap_from_dynakube(&dk.name_any()).await?;
        info!("Released {} claims of deleted DynaKube", summary.released);
        Ok(Action::await_change())
    }
}

async fn reconcile(dk: Arc<DynaKube>, ctx: Arc<DynaKubeReconciler>) -> Result<Action> {
    let namespace = dk
        .namespace()
        .ok_or_else(|| MapperError::MissingNamespace(dk.name_any()))?;
    let api: Api<DynaKube> = Api::namespaced(ctx.client.clone(), &namespace);

    debug!("Reconciling DynaKube: {}", dk.name_any());

    finalizer(&api, FINALIZER, dk, |event| async {
        match event {
            Finalizer::Apply(dk) => ctx.apply(&api, &dk).await,
            Finalizer::Cleanup(dk) => ctx.cleanup(&dk).await,
        }
    })
    .await
    .map_err(|e| MapperError::FinalizerError(Box::new(e)))
}

fn error_policy(
    _dk: Arc<DynaKube>,
    error: &MapperError,
    _ctx: Arc<DynaKubeReconciler>,
) -> Action {
    warn!("Reconciliation error: {}", error);
    Action::requeue(ERROR_REQUEUE)
}

/// The NamespacesMapped condition describing `result`.
/// The transition time only moves when the status flips.
pub fn mapped_condition(
    result: &Result<MappingSummary>,
    previous: Option<&Condition>,
    now: DateTime<Utc>,
) -> Condition {
    let (status, reason, message) = match result {
        Ok(summary) => (
            "True",
            "Mapped",
            format!(
                "Holding {} namespace feature claims",
                summary.claimed + summary.reaffirmed
            ),
        ),
        Err(e) => ("False", e.reason(), e.to_string()),
    };

    let last_transition_time = match previous {
        Some(p) if p.status == status => p.last_transition_time.clone(),
        _ => Some(now.to_rfc3339()),
    };

    Condition {
        condition_type: NAMESPACES_MAPPED_CONDITION.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message),
        last_transition_time,
    }
}

/// Only write status when it changes, every write triggers another reconcile
pub fn needs_status_update(previous: Option<&Condition>, next: &Condition) -> bool {
    previous.map_or(true, |p| !p.same_state(next))
}

/// The DynaKube's conditions with the NamespacesMapped one replaced
fn with_condition(dk: &DynaKube, condition: Condition) -> Vec<Condition> {
    let mut conditions = dk
        .status
        .as_ref()
        .and_then(|s| s.conditions.clone())
        .unwrap_or_default();
    conditions.retain(|c| c.condition_type != NAMESPACES_MAPPED_CONDITION);
    conditions.push(condition);
    conditions
}
