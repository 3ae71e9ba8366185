use faas_replicas_core::{FunctionResources, FunctionStatus};
use faas_replicas_k8s_api::{
    Container, Deployment, Quantity, ResourceExt, ResourceRequirements, Time,
};
use std::collections::BTreeMap;

/// The environment variable holding the watchdog's function process.
const ENV_PROCESS: &str = "fprocess";

/// Describes a function deployment.
///
/// Returns `None` if the deployment has no containers.
pub fn function_status(deployment: &Deployment) -> Option<FunctionStatus> {
    let spec = deployment.spec.as_ref()?;
    let pod = spec.template.spec.as_ref()?;
    let container = pod.containers.first()?;
    let template = spec.template.metadata.clone().unwrap_or_default();

    let env_process = container
        .env
        .iter()
        .flatten()
        .find(|var| var.name == ENV_PROCESS)
        .and_then(|var| var.value.clone())
        .unwrap_or_default();

    let env_vars = container
        .env
        .iter()
        .flatten()
        .filter(|var| var.name != ENV_PROCESS)
        .filter_map(|var| Some((var.name.clone(), var.value.clone()?)))
        .collect::<BTreeMap<_, _>>();

    let constraints = pod.node_selector.as_ref().map(|selector| {
        selector
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
    });

    let read_only_root_filesystem = container
        .security_context
        .as_ref()
        .and_then(|ctx| ctx.read_only_root_filesystem);

    Some(FunctionStatus {
        name: deployment.name_any(),
        namespace: deployment.namespace().unwrap_or_default(),
        image: container.image.clone().unwrap_or_default(),
        env_process,
        replicas: spec.replicas.map(non_negative).unwrap_or(0),
        available_replicas: deployment
            .status
            .as_ref()
            .and_then(|status| status.available_replicas)
            .map(non_negative)
            .unwrap_or(0),
        invocation_count: 0.0,
        labels: template.labels.unwrap_or_default(),
        annotations: template.annotations.unwrap_or_default(),
        created_at: deployment
            .metadata
            .creation_timestamp
            .as_ref()
            .map(|&Time(at)| at),
        constraints,
        env_vars: Some(env_vars).filter(|vars| !vars.is_empty()),
        limits: resources(container, |r| r.limits.as_ref()),
        requests: resources(container, |r| r.requests.as_ref()),
        read_only_root_filesystem,
    })
}

fn non_negative(n: i32) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

fn resources<F>(container: &Container, select: F) -> Option<FunctionResources>
where
    F: Fn(&ResourceRequirements) -> Option<&BTreeMap<String, Quantity>>,
{
    let quantities = container.resources.as_ref().and_then(select)?;
    let resources = FunctionResources {
        memory: quantities.get("memory").map(|q| q.0.clone()),
        cpu: quantities.get("cpu").map(|q| q.0.clone()),
    };
    Some(resources).filter(|r| r.memory.is_some() || r.cpu.is_some())
}
