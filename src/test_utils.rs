// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses and the mapper's stores.

use crate::error::StoreError;
use crate::mapper::store::{DynaKubeLookup, NamespaceRecord, NamespaceStore};
use async_trait::async_trait;
use http::{Request, Response};
use kube::client::Body;
use kube::core::{Selector, SelectorExt};
use kube::Client;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response for GET requests matching the exact path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for PATCH requests matching the exact path
    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
        self
    }

    /// Method and path-and-query of every request received so far
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Try prefix match for paths like /api/v1/namespaces/foo
        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.to_string())
            .unwrap_or_else(|| path.clone());
        self.requests
            .lock()
            .unwrap()
            .push((method.clone(), path_and_query));

        let response = self.find_response(&method, &path);

        Box::pin(async move {
            match response {
                Some((status, body)) => Ok(Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(Body::from(body.into_bytes()))
                    .unwrap()),
                None => {
                    // Default 404 for unmatched requests
                    let body = r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"not found","reason":"NotFound","code":404}"#;
                    Ok(Response::builder()
                        .status(404)
                        .header("content-type", "application/json")
                        .body(Body::from(body.as_bytes().to_vec()))
                        .unwrap())
                }
            }
        })
    }
}

/// Create a mock namespace JSON response
pub fn namespace_json(
    name: &str,
    labels: &[(&str, &str)],
    annotations: &[(&str, &str)],
    resource_version: &str,
) -> serde_json::Value {
    let labels: BTreeMap<_, _> = labels.iter().copied().collect();
    let annotations: BTreeMap<_, _> = annotations.iter().copied().collect();
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid",
            "resourceVersion": resource_version,
            "labels": labels,
            "annotations": annotations
        }
    })
}

/// Create a mock namespace list JSON response
pub fn namespace_list_json(items: Vec<serde_json::Value>) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "NamespaceList",
        "metadata": { "resourceVersion": "1" },
        "items": items
    })
    .to_string()
}

/// Create an API status response with the given code and reason
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    status_json(
        404,
        "NotFound",
        &format!("{} \"{}\" not found", resource, name),
    )
}

#[derive(Debug, Clone, Default)]
struct StoredNamespace {
    labels: BTreeMap<String, String>,
    annotations: BTreeMap<String, String>,
    version: u64,
}

#[derive(Default)]
struct StoreState {
    namespaces: BTreeMap<String, StoredNamespace>,
    /// Label writes applied by a "concurrent" writer right before the next update of a namespace
    races: HashMap<String, VecDeque<BTreeMap<String, String>>>,
    /// Namespaces deleted right before their next update
    vanishing: BTreeSet<String>,
    updates: usize,
}

/// Namespace store backed by a map, with resource versions and injectable races
#[derive(Default)]
pub struct InMemoryNamespaceStore {
    state: Mutex<StoreState>,
}

fn to_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl InMemoryNamespaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(
        self,
        name: &str,
        labels: &[(&str, &str)],
        annotations: &[(&str, &str)],
    ) -> Self {
        self.state.lock().unwrap().namespaces.insert(
            name.to_string(),
            StoredNamespace {
                labels: to_map(labels),
                annotations: to_map(annotations),
                version: 1,
            },
        );
        self
    }

    /// Labels and annotations of a namespace
    pub fn snapshot(
        &self,
        name: &str,
    ) -> Option<(BTreeMap<String, String>, BTreeMap<String, String>)> {
        self.state
            .lock()
            .unwrap()
            .namespaces
            .get(name)
            .map(|ns| (ns.labels.clone(), ns.annotations.clone()))
    }

    /// Number of successful updates
    pub fn update_count(&self) -> usize {
        self.state.lock().unwrap().updates
    }

    /// Merge labels into a namespace now, as another writer would
    pub fn concurrent_write(&self, name: &str, labels: &[(&str, &str)]) {
        let mut state = self.state.lock().unwrap();
        if let Some(ns) = state.namespaces.get_mut(name) {
            ns.labels.extend(to_map(labels));
            ns.version += 1;
        }
    }

    /// Merge labels into a namespace right before the next update to it arrives
    pub fn race_next_update(&self, name: &str, labels: &[(&str, &str)]) {
        self.state
            .lock()
            .unwrap()
            .races
            .entry(name.to_string())
            .or_default()
            .push_back(to_map(labels));
    }

    /// Delete a namespace right before the next update to it arrives
    pub fn vanish_before_update(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .vanishing
            .insert(name.to_string());
    }
}

#[async_trait]
impl NamespaceStore for InMemoryNamespaceStore {
    async fn get(&self, name: &str) -> Result<NamespaceRecord, StoreError> {
        let state = self.state.lock().unwrap();
        let ns = state
            .namespaces
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        Ok(NamespaceRecord {
            name: name.to_string(),
            labels: ns.labels.clone(),
            annotations: ns.annotations.clone(),
            resource_version: Some(ns.version.to_string()),
        })
    }

    async fn list(&self, selector: Option<&Selector>) -> Result<Vec<String>, StoreError> {
        let state = self.state.lock().unwrap();

        Ok(state
            .namespaces
            .iter()
            .filter(|(_, ns)| selector.map_or(true, |s| s.matches(&ns.labels)))
            .map(|(name, _)| name.clone())
            .collect())
    }

    async fn update(
        &self,
        current: &NamespaceRecord,
        desired: &NamespaceRecord,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        let name = current.name.clone();

        if state.vanishing.remove(&name) {
            state.namespaces.remove(&name);
        }

        let race = state.races.get_mut(&name).and_then(|q| q.pop_front());
        let ns = state
            .namespaces
            .get_mut(&name)
            .ok_or_else(|| StoreError::NotFound(name.clone()))?;

        if let Some(labels) = race {
            ns.labels.extend(labels);
            ns.version += 1;
        }

        if current.resource_version != Some(ns.version.to_string()) {
            return Err(StoreError::VersionConflict(name));
        }

        ns.labels = desired.labels.clone();
        ns.annotations = desired.annotations.clone();
        ns.version += 1;
        state.updates += 1;
        Ok(())
    }
}

/// DynaKube lookup over a fixed set of names
#[derive(Default)]
pub struct InMemoryDynaKubes {
    names: Mutex<BTreeSet<String>>,
}

impl InMemoryDynaKubes {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: Mutex::new(names.iter().map(|n| n.to_string()).collect()),
        }
    }
}

#[async_trait]
impl DynaKubeLookup for InMemoryDynaKubes {
    async fn exists(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.names.lock().unwrap().contains(name))
    }
}
