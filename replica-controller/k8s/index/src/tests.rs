use super::*;
use faas_replicas_core::{FunctionRef, FunctionResources, NoEndpoints};
use faas_replicas_k8s_api::{Deployment, Endpoints, MarkerLabel};
use kubert::index::IndexNamespacedResource;
use maplit::btreemap;
use std::net::SocketAddr;

fn marker() -> MarkerLabel {
    "faas_function".parse().unwrap()
}

fn mk_deployment(ns: &str, name: &str, function: bool) -> Deployment {
    let labels = if function {
        serde_json::json!({ "faas_function": name })
    } else {
        serde_json::json!({ "app": name })
    };
    serde_json::from_value(serde_json::json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "namespace": ns,
            "name": name,
            "labels": labels,
            "creationTimestamp": "2023-04-01T10:00:00Z",
        },
        "spec": {
            "replicas": 2,
            "selector": { "matchLabels": { "faas_function": name } },
            "template": {
                "metadata": {
                    "labels": { "faas_function": name, "uid": "1234" },
                    "annotations": { "prometheus.io.scrape": "false" },
                },
                "spec": {
                    "nodeSelector": { "kubernetes.io/arch": "amd64" },
                    "containers": [{
                        "name": name,
                        "image": format!("ghcr.io/openfaas/{name}:latest"),
                        "env": [
                            { "name": "fprocess", "value": "node index.js" },
                            { "name": "write_debug", "value": "true" },
                        ],
                        "resources": {
                            "limits": { "memory": "128Mi" },
                        },
                        "securityContext": { "readOnlyRootFilesystem": true },
                    }],
                },
            },
        },
        "status": { "availableReplicas": 1 },
    }))
    .expect("deployment must be valid")
}

fn mk_endpoints(ns: &str, name: &str, ready: &[&str], not_ready: &[&str]) -> Endpoints {
    let addrs = |ips: &[&str]| {
        ips.iter()
            .map(|ip| serde_json::json!({ "ip": ip }))
            .collect::<Vec<_>>()
    };
    serde_json::from_value(serde_json::json!({
        "apiVersion": "v1",
        "kind": "Endpoints",
        "metadata": { "namespace": ns, "name": name },
        "subsets": [{
            "addresses": addrs(ready),
            "notReadyAddresses": addrs(not_ready),
            "ports": [{ "port": 8080 }],
        }],
    }))
    .expect("endpoints must be valid")
}

#[test]
fn lists_only_marked_deployments() {
    let index = Index::shared(marker());
    index.write().apply(mk_deployment("openfaas-fn", "nodeinfo", true));
    index.write().apply(mk_deployment("openfaas-fn", "figlet", true));
    index.write().apply(mk_deployment("openfaas-fn", "gateway", false));
    index.write().apply(mk_deployment("staging-fn", "env", true));

    let names = index
        .read()
        .list("openfaas-fn")
        .into_iter()
        .map(|f| f.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["figlet", "nodeinfo"]);

    assert!(index.read().get("openfaas-fn", "gateway").is_none());
    assert_eq!(index.read().list("staging-fn").len(), 1);
    assert!(index.read().list("default").is_empty());
}

#[test]
fn converts_deployment_to_function() {
    let index = Index::shared(marker());
    index.write().apply(mk_deployment("openfaas-fn", "nodeinfo", true));

    let function = index
        .read()
        .get("openfaas-fn", "nodeinfo")
        .expect("function must be indexed");
    assert_eq!(function.name, "nodeinfo");
    assert_eq!(function.namespace, "openfaas-fn");
    assert_eq!(function.image, "ghcr.io/openfaas/nodeinfo:latest");
    assert_eq!(function.env_process, "node index.js");
    assert_eq!(function.replicas, 2);
    assert_eq!(function.available_replicas, 1);
    assert_eq!(function.invocation_count, 0.0);
    assert_eq!(
        function.labels,
        btreemap! {
            "faas_function".to_string() => "nodeinfo".to_string(),
            "uid".to_string() => "1234".to_string(),
        }
    );
    assert_eq!(
        function.annotations,
        btreemap! { "prometheus.io.scrape".to_string() => "false".to_string() }
    );
    assert_eq!(
        function.created_at,
        Some("2023-04-01T10:00:00Z".parse().unwrap())
    );
    assert_eq!(
        function.constraints,
        Some(vec!["kubernetes.io/arch=amd64".to_string()])
    );
    assert_eq!(
        function.env_vars,
        Some(btreemap! { "write_debug".to_string() => "true".to_string() })
    );
    assert_eq!(
        function.limits,
        Some(FunctionResources {
            memory: Some("128Mi".to_string()),
            cpu: None,
        })
    );
    assert_eq!(function.requests, None);
    assert_eq!(function.read_only_root_filesystem, Some(true));
}

#[test]
fn unmarking_deployment_removes_function() {
    let index = Index::shared(marker());
    index.write().apply(mk_deployment("openfaas-fn", "nodeinfo", true));
    assert!(index.read().get("openfaas-fn", "nodeinfo").is_some());

    index.write().apply(mk_deployment("openfaas-fn", "nodeinfo", false));
    assert!(index.read().get("openfaas-fn", "nodeinfo").is_none());
}

#[test]
fn deployment_without_containers_is_ignored() {
    let index = Index::shared(marker());
    let mut deployment = mk_deployment("openfaas-fn", "nodeinfo", true);
    deployment
        .spec
        .as_mut()
        .and_then(|spec| spec.template.spec.as_mut())
        .unwrap()
        .containers
        .clear();
    index.write().apply(deployment);
    assert!(index.read().list("openfaas-fn").is_empty());
}

#[test]
fn deletes_function() {
    let index = Index::shared(marker());
    index.write().apply(mk_deployment("openfaas-fn", "nodeinfo", true));
    index.write().apply(mk_deployment("openfaas-fn", "figlet", true));

    index
        .write()
        .delete("openfaas-fn".to_string(), "nodeinfo".to_string());
    assert!(index.read().get("openfaas-fn", "nodeinfo").is_none());
    assert!(index.read().get("openfaas-fn", "figlet").is_some());

    // Deleting an unknown function is a no-op.
    index
        .write()
        .delete("openfaas-fn".to_string(), "nodeinfo".to_string());
    assert_eq!(index.read().list("openfaas-fn").len(), 1);
}

#[test]
fn resolves_ready_endpoints_in_turn() {
    let index = EndpointsIndex::shared(8080);
    index.write().apply(mk_endpoints(
        "openfaas-fn",
        "nodeinfo",
        &["10.42.0.7", "10.42.0.8"],
        &["10.42.0.9"],
    ));

    let function = FunctionRef::new("openfaas-fn", "nodeinfo");
    let mut seen = (0..4)
        .map(|_| index.read().resolve(&function).unwrap().addr())
        .collect::<Vec<SocketAddr>>();
    seen.sort();
    seen.dedup();
    assert_eq!(
        seen,
        vec![
            "10.42.0.7:8080".parse::<SocketAddr>().unwrap(),
            "10.42.0.8:8080".parse().unwrap(),
        ]
    );
}

#[test]
fn resolve_fails_without_ready_endpoints() {
    let index = EndpointsIndex::shared(8080);
    let function = FunctionRef::new("openfaas-fn", "nodeinfo");
    assert_eq!(
        index.read().resolve(&function),
        Err(NoEndpoints(function.clone()))
    );

    // Scaled to zero: the endpoints exist but nothing is ready.
    index
        .write()
        .apply(mk_endpoints("openfaas-fn", "nodeinfo", &[], &["10.42.0.9"]));
    assert!(index.read().resolve(&function).is_err());

    index
        .write()
        .apply(mk_endpoints("openfaas-fn", "nodeinfo", &["10.42.0.7"], &[]));
    assert!(index.read().resolve(&function).is_ok());

    index
        .write()
        .delete("openfaas-fn".to_string(), "nodeinfo".to_string());
    assert!(index.read().resolve(&function).is_err());
}

#[test]
fn metrics_track_index_size() {
    let mut prom = prometheus_client::registry::Registry::default();
    let catalog = Index::shared(marker());
    let metrics = IndexMetrics::register(catalog.clone(), "Deployment", &mut prom).shared();

    metrics
        .write()
        .apply(mk_deployment("openfaas-fn", "nodeinfo", true));
    metrics
        .write()
        .apply(mk_deployment("openfaas-fn", "figlet", true));
    IndexNamespacedResource::<Deployment>::delete(
        &mut *metrics.write(),
        "openfaas-fn".to_string(),
        "figlet".to_string(),
    );
    assert_eq!(catalog.read().list("openfaas-fn").len(), 1);

    let mut text = String::new();
    prometheus_client::encoding::text::encode(&mut text, &prom).unwrap();
    assert!(
        text.contains(r#"size{kind="Deployment",namespace="openfaas-fn"} 1"#),
        "{text}"
    );
    assert!(
        text.contains(r#"applies_total{kind="Deployment",namespace="openfaas-fn"} 2"#),
        "{text}"
    );
    assert!(
        text.contains(r#"deletes_total{kind="Deployment",namespace="openfaas-fn"} 1"#),
        "{text}"
    );
}
