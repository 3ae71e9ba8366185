#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod labels;

pub use self::labels::MarkerLabel;
pub use k8s_openapi::{
    api::{
        apps::v1::Deployment,
        core::v1::{Container, Endpoints, ResourceRequirements},
    },
    apimachinery::pkg::{api::resource::Quantity, apis::meta::v1::Time},
};
pub use kube::ResourceExt;
