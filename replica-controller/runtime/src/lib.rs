#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use faas_replicas_core as core;
pub use faas_replicas_k8s_api as k8s;
pub use faas_replicas_k8s_index as index;

mod api;
mod args;
mod error;
mod functions;
mod metrics;
mod server;
pub mod watchdog;


pub use self::{
    api::FunctionApi, args::Args, error::Error, functions::Functions, metrics::FunctionMetrics,
    server::serve, watchdog::Watchdog,
};

/// Serves function metadata from the deployment index.
#[derive(Clone, Debug)]
pub struct Catalog(index::SharedIndex);

/// Resolves functions to ready instances from the endpoints index.
#[derive(Clone, Debug)]
pub struct Resolver(index::SharedEndpoints);

impl Catalog {
    pub fn new(index: index::SharedIndex) -> Self {
        Self(index)
    }
}

impl Resolver {
    pub fn new(index: index::SharedEndpoints) -> Self {
        Self(index)
    }
}

#[async_trait::async_trait]
impl core::FunctionCatalog for Catalog {
    async fn list_functions(&self, namespace: &str) -> anyhow::Result<Vec<core::FunctionStatus>> {
        Ok(self.0.read().list(namespace))
    }

    async fn get_function(
        &self,
        namespace: &str,
        name: &str,
    ) -> anyhow::Result<Option<core::FunctionStatus>> {
        Ok(self.0.read().get(namespace, name))
    }
}

#[async_trait::async_trait]
impl core::AddressResolver for Resolver {
    async fn resolve(
        &self,
        function: &core::FunctionRef,
    ) -> Result<core::ResolvedAddress, core::NoEndpoints> {
        self.0.read().resolve(function)
    }
}
