#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod function;
mod namespace;
mod resolve;

pub use self::{
    function::{FunctionResources, FunctionStatus, ReplicaStats, ScaleRequest, ScaleStatus},
    namespace::{NamespacePolicy, Unauthorized},
    resolve::{FunctionRef, NoEndpoints, ResolvedAddress},
};
use anyhow::Result;

/// Reads function metadata from the orchestrator's cache.
///
/// Implementations only return entries that carry the function marker label.
/// Results may lag the cluster; callers treat replica counts as advisory.
#[async_trait::async_trait]
pub trait FunctionCatalog {
    async fn list_functions(&self, namespace: &str) -> Result<Vec<FunctionStatus>>;

    /// Returns `None` when the function is not known in `namespace`.
    async fn get_function(&self, namespace: &str, name: &str) -> Result<Option<FunctionStatus>>;
}

/// Maps a function to the address of one ready instance.
#[async_trait::async_trait]
pub trait AddressResolver {
    async fn resolve(&self, function: &FunctionRef) -> Result<ResolvedAddress, NoEndpoints>;
}
