//! Function indexes
//!
//! Two watch-fed indexes back the replica API:
//!
//! - The function catalog indexes `Deployment`s that carry the function marker
//!   label. Each deployment is converted to a `FunctionStatus` once, when it is
//!   applied, so lookups only clone cached values.
//! - The endpoints index tracks the ready addresses of each function's
//!   `Endpoints` object and picks one per resolution.
//!
//! Both indexes are written by a single watch task and read by API requests.
//! Neither corrects for watch lag: a function's cached replica counts are only
//! as fresh as the last deployment update.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod endpoints;
mod function;
pub mod metrics;

#[cfg(test)]
mod tests;

pub use self::{
    catalog::{Index, SharedIndex},
    endpoints::{EndpointsIndex, SharedEndpoints},
    function::function_status,
    metrics::IndexMetrics,
};
