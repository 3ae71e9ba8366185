use crate::{function::function_status, metrics::SizedIndex};
use ahash::AHashMap as HashMap;
use faas_replicas_core::FunctionStatus;
use faas_replicas_k8s_api::{Deployment, MarkerLabel, ResourceExt};
use kubert::index::IndexNamespacedResource;
use parking_lot::RwLock;
use std::{collections::BTreeMap, sync::Arc};

pub type SharedIndex = Arc<RwLock<Index>>;

/// Indexes function deployments by namespace and name.
#[derive(Debug)]
pub struct Index {
    marker: MarkerLabel,
    by_ns: HashMap<String, BTreeMap<String, FunctionStatus>>,
}

impl IndexNamespacedResource<Deployment> for Index {
    fn apply(&mut self, deployment: Deployment) {
        let name = deployment.name_unchecked();
        let Some(ns) = deployment.namespace() else {
            tracing::warn!(%name, "deployment has no namespace");
            return;
        };

        // A deployment that stops carrying the marker is no longer a function.
        if !self.marker.matches(deployment.labels()) {
            tracing::debug!(%ns, %name, "deployment is not a function");
            self.delete(ns, name);
            return;
        }

        match function_status(&deployment) {
            Some(function) => {
                tracing::debug!(%ns, %name, replicas = function.replicas, "indexing function");
                self.by_ns.entry(ns).or_default().insert(name, function);
            }
            None => {
                tracing::warn!(%ns, %name, "function deployment has no containers");
                self.delete(ns, name);
            }
        }
    }

    fn delete(&mut self, namespace: String, name: String) {
        if let Some(functions) = self.by_ns.get_mut(&namespace) {
            if functions.remove(&name).is_some() {
                tracing::debug!(ns = %namespace, %name, "deleted function");
            }
            if functions.is_empty() {
                self.by_ns.remove(&namespace);
            }
        }
    }
}

impl SizedIndex for Index {
    fn size(&self, namespace: &str) -> usize {
        self.by_ns.get(namespace).map_or(0, BTreeMap::len)
    }
}

// === impl Index ===

impl Index {
    pub fn shared(marker: MarkerLabel) -> SharedIndex {
        Arc::new(RwLock::new(Self {
            marker,
            by_ns: HashMap::default(),
        }))
    }

    /// Lists the functions in `namespace`, ordered by name.
    pub fn list(&self, namespace: &str) -> Vec<FunctionStatus> {
        self.by_ns
            .get(namespace)
            .map(|functions| functions.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<FunctionStatus> {
        self.by_ns.get(namespace)?.get(name).cloned()
    }
}
