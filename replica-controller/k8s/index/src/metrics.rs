use faas_replicas_k8s_api::ResourceExt;
use kubert::index::{IndexNamespacedResource, NamespacedRemoved};
use parking_lot::RwLock;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};
use std::sync::Arc;

/// Wraps an index, recording its size and the watch events applied to it.
pub struct IndexMetrics<T> {
    inner: Arc<RwLock<T>>,
    kind: &'static str,
    size: Family<NamespaceLabels, Gauge>,
    applies: Family<NamespaceLabels, Counter>,
    deletes: Family<NamespaceLabels, Counter>,
    resets: Family<KindLabels, Counter>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct NamespaceLabels {
    kind: &'static str,
    namespace: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct KindLabels {
    kind: &'static str,
}

pub trait SizedIndex {
    /// The number of resources indexed in `namespace`.
    fn size(&self, namespace: &str) -> usize;
}

// === impl IndexMetrics ===

impl<T> IndexMetrics<T> {
    pub fn register(inner: Arc<RwLock<T>>, kind: &'static str, prom: &mut Registry) -> Self {
        let size = Family::default();
        prom.register(
            "size",
            "Gauge of the number of resources in the index",
            size.clone(),
        );

        let applies = Family::default();
        prom.register("applies", "Count of applies to the index", applies.clone());

        let deletes = Family::default();
        prom.register("deletes", "Count of deletes from the index", deletes.clone());

        let resets = Family::default();
        prom.register("resets", "Count of resets of the index", resets.clone());

        Self {
            inner,
            kind,
            size,
            applies,
            deletes,
            resets,
        }
    }

    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }

    fn labels(&self, namespace: String) -> NamespaceLabels {
        NamespaceLabels {
            kind: self.kind,
            namespace,
        }
    }
}

impl<T: SizedIndex> IndexMetrics<T> {
    fn observe_size(&self, namespace: String) {
        let size = self.inner.read().size(&namespace);
        self.size.get_or_create(&self.labels(namespace)).set(size as i64);
    }
}

impl<R, T> IndexNamespacedResource<R> for IndexMetrics<T>
where
    T: IndexNamespacedResource<R> + SizedIndex,
    R: ResourceExt<DynamicType = ()>,
{
    fn apply(&mut self, resource: R) {
        let namespace = resource.namespace().unwrap_or_default();
        self.applies.get_or_create(&self.labels(namespace.clone())).inc();
        self.inner.write().apply(resource);
        self.observe_size(namespace);
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.deletes.get_or_create(&self.labels(namespace.clone())).inc();
        self.inner.write().delete(namespace.clone(), name);
        self.observe_size(namespace);
    }

    fn reset(&mut self, resources: Vec<R>, removed: NamespacedRemoved) {
        let mut namespaces = resources
            .iter()
            .filter_map(|r| r.namespace())
            .chain(removed.iter().map(|(namespace, _)| namespace.clone()))
            .collect::<Vec<_>>();
        namespaces.sort();
        namespaces.dedup();

        self.resets.get_or_create(&KindLabels { kind: self.kind }).inc();
        self.inner.write().reset(resources, removed);
        for namespace in namespaces {
            self.observe_size(namespace);
        }
    }
}
