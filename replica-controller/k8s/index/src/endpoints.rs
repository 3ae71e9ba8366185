use crate::metrics::SizedIndex;
use ahash::AHashMap as HashMap;
use faas_replicas_core::{FunctionRef, NoEndpoints, ResolvedAddress};
use faas_replicas_k8s_api::{Endpoints, ResourceExt};
use kubert::index::IndexNamespacedResource;
use parking_lot::RwLock;
use std::{
    net::{IpAddr, SocketAddr},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

pub type SharedEndpoints = Arc<RwLock<EndpointsIndex>>;

/// Indexes the ready addresses of each function's service endpoints.
#[derive(Debug)]
pub struct EndpointsIndex {
    /// The port the watchdog listens on in every function instance.
    watchdog_port: u16,
    by_ns: HashMap<String, HashMap<String, Vec<IpAddr>>>,
    next: AtomicUsize,
}

impl IndexNamespacedResource<Endpoints> for EndpointsIndex {
    fn apply(&mut self, endpoints: Endpoints) {
        let name = endpoints.name_unchecked();
        let Some(ns) = endpoints.namespace() else {
            tracing::warn!(%name, "endpoints have no namespace");
            return;
        };

        let ready = endpoints
            .subsets
            .iter()
            .flatten()
            .flat_map(|subset| subset.addresses.iter().flatten())
            .filter_map(|addr| match addr.ip.parse::<IpAddr>() {
                Ok(ip) => Some(ip),
                Err(error) => {
                    tracing::warn!(%error, %ns, %name, ip = %addr.ip, "invalid endpoint address");
                    None
                }
            })
            .collect::<Vec<_>>();

        if ready.is_empty() {
            self.delete(ns, name);
            return;
        }

        tracing::trace!(%ns, %name, ?ready, "indexing endpoints");
        self.by_ns.entry(ns).or_default().insert(name, ready);
    }

    fn delete(&mut self, namespace: String, name: String) {
        if let Some(services) = self.by_ns.get_mut(&namespace) {
            services.remove(&name);
            if services.is_empty() {
                self.by_ns.remove(&namespace);
            }
        }
    }
}

impl SizedIndex for EndpointsIndex {
    fn size(&self, namespace: &str) -> usize {
        self.by_ns.get(namespace).map_or(0, |services| services.len())
    }
}

// === impl EndpointsIndex ===

impl EndpointsIndex {
    pub fn shared(watchdog_port: u16) -> SharedEndpoints {
        Arc::new(RwLock::new(Self {
            watchdog_port,
            by_ns: HashMap::default(),
            next: AtomicUsize::new(0),
        }))
    }

    /// Picks a ready instance of `function`, rotating through its addresses
    /// on successive calls.
    pub fn resolve(&self, function: &FunctionRef) -> Result<ResolvedAddress, NoEndpoints> {
        let ips = self
            .by_ns
            .get(&function.namespace)
            .and_then(|services| services.get(&function.name))
            .filter(|ips| !ips.is_empty())
            .ok_or_else(|| NoEndpoints(function.clone()))?;

        let idx = self.next.fetch_add(1, Ordering::Relaxed) % ips.len();
        Ok(SocketAddr::new(ips[idx], self.watchdog_port).into())
    }
}
