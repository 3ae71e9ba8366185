use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Describes a deployed function, merging cached deployment metadata with the
/// live counters reported by the function's watchdog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FunctionStatus {
    pub name: String,
    pub namespace: String,
    pub image: String,

    /// The process the watchdog forks for each invocation.
    pub env_process: String,

    /// Desired replicas.
    pub replicas: u64,
    pub available_replicas: u64,

    /// Best-effort count of invocations, as reported by the watchdog.
    pub invocation_count: f64,

    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Node placement constraints, formatted as `key=value`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_vars: Option<BTreeMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<FunctionResources>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests: Option<FunctionResources>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_root_filesystem: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
}

/// Live replica counters read from a watchdog's `/scale-reader` endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReplicaStats {
    pub replicas: u64,
    pub available_replicas: u64,
    pub invocation_count: f64,
}

/// Replica counters of a named function, as returned by the scale-status API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleStatus {
    pub name: String,
    #[serde(flatten)]
    pub stats: ReplicaStats,
}

/// Requests that a function be scaled to `replicas` instances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    pub replicas: u64,
}

// === impl FunctionStatus ===

impl FunctionStatus {
    /// Overwrites the cached replica counters with live values.
    pub fn merge_stats(&mut self, stats: &ReplicaStats) {
        self.replicas = stats.replicas;
        self.available_replicas = stats.available_replicas;
        self.invocation_count = stats.invocation_count;
    }
}
