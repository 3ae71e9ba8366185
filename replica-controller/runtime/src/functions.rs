use crate::{metrics::FunctionMetrics, watchdog::Watchdog, Error};
use bytes::Bytes;
use faas_replicas_core::{
    AddressResolver, FunctionCatalog, FunctionRef, FunctionStatus, NamespacePolicy,
    ReplicaStats, ScaleRequest, ScaleStatus,
};
use futures::prelude::*;
use hyper::{http, StatusCode};
use tokio::time;

/// Combines cached function metadata with the live counters reported by each
/// function's watchdog.
///
/// Every call resolves its instances anew; nothing learned from a watchdog
/// outlives the request that asked for it.
#[derive(Clone, Debug)]
pub struct Functions<C, R> {
    catalog: C,
    resolver: R,
    watchdog: Watchdog,
    namespaces: NamespacePolicy,
    list_concurrency: usize,
    metrics: FunctionMetrics,
}

// === impl Functions ===

impl<C, R> Functions<C, R>
where
    C: FunctionCatalog + Send + Sync,
    R: AddressResolver + Send + Sync,
{
    pub fn new(
        catalog: C,
        resolver: R,
        watchdog: Watchdog,
        namespaces: NamespacePolicy,
        list_concurrency: usize,
        metrics: FunctionMetrics,
    ) -> Self {
        Self {
            catalog,
            resolver,
            watchdog,
            namespaces,
            list_concurrency: list_concurrency.max(1),
            metrics,
        }
    }

    pub(crate) fn metrics(&self) -> &FunctionMetrics {
        &self.metrics
    }

    /// Lists the functions in a namespace with their live replica counts.
    ///
    /// Stats are read concurrently, at most `list_concurrency` at a time, and
    /// the catalog's order is preserved. A function whose stats cannot be read
    /// keeps its cached counts.
    pub async fn list(&self, namespace: Option<&str>) -> Result<Vec<FunctionStatus>, Error> {
        let ns = self.namespaces.lookup(namespace)?;
        let functions = self
            .catalog
            .list_functions(ns)
            .await
            .map_err(Error::Catalog)?;

        let functions = stream::iter(functions)
            .map(|function| self.with_stats(function))
            .buffered(self.list_concurrency)
            .collect::<Vec<_>>()
            .await;
        Ok(functions)
    }

    /// Describes a single function with its live replica counts.
    ///
    /// Unknown functions fail without contacting any watchdog.
    pub async fn status(
        &self,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<FunctionStatus, Error> {
        let start = time::Instant::now();
        let ns = self.namespaces.lookup(namespace)?;
        let function = self
            .catalog
            .get_function(ns, name)
            .await
            .map_err(Error::Catalog)?
            .ok_or_else(|| Error::NotFound(FunctionRef::new(ns, name)))?;

        let function = self.with_stats(function).await;
        tracing::info!(
            %ns,
            %name,
            replicas = function.replicas,
            available = function.available_replicas,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Replicas",
        );
        Ok(function)
    }

    /// Reads a function's counters directly from one of its instances.
    pub async fn scale_status(
        &self,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ScaleStatus, Error> {
        let function = self.function_ref(namespace, name)?;
        let stats = self.read_stats(&function).await?;
        Ok(ScaleStatus {
            name: function.name,
            stats,
        })
    }

    /// Relays a scale request to one of the function's instances, returning
    /// the instance's response status.
    ///
    /// The body is validated before the function is resolved, and is
    /// forwarded unmodified.
    pub async fn scale(
        &self,
        namespace: Option<&str>,
        name: &str,
        parts: &http::request::Parts,
        body: Bytes,
    ) -> Result<StatusCode, Error> {
        let req = serde_json::from_slice::<ScaleRequest>(&body).map_err(Error::MalformedRequest)?;
        let function = self.function_ref(namespace, name)?;
        let addr = self.resolver.resolve(&function).await?;

        tracing::info!(%function, replicas = req.replicas, %addr, "Set replicas");
        let status = self
            .watchdog
            .forward_scale(addr, parts, body)
            .await
            .map_err(|source| Error::Upstream {
                function: function.clone(),
                source,
            })?;
        self.metrics.scale_forwarded(status);

        tracing::debug!(%function, %status, "Scale request relayed");
        Ok(status)
    }

    /// Names the function targeted by a request. The name may carry its own
    /// namespace as `name.namespace`.
    fn function_ref(&self, namespace: Option<&str>, name: &str) -> Result<FunctionRef, Error> {
        let ns = self.namespaces.lookup(namespace)?;
        let function = FunctionRef::parse(name, ns);
        self.namespaces.check(&function.namespace)?;
        Ok(function)
    }

    async fn with_stats(&self, mut function: FunctionStatus) -> FunctionStatus {
        let target = FunctionRef::new(function.namespace.as_str(), function.name.as_str());
        match self.read_stats(&target).await {
            Ok(stats) => function.merge_stats(&stats),
            Err(error) => {
                self.metrics.stats_failed();
                tracing::info!(%error, function = %target, "Using cached replica counts");
            }
        }
        function
    }

    async fn read_stats(&self, function: &FunctionRef) -> Result<ReplicaStats, Error> {
        let addr = self.resolver.resolve(function).await?;
        self.watchdog
            .read_stats(addr)
            .await
            .map_err(|source| Error::Upstream {
                function: function.clone(),
                source,
            })
    }
}
