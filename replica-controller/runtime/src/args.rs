use crate::{
    core::NamespacePolicy,
    index::{EndpointsIndex, Index, IndexMetrics},
    k8s::{Deployment, Endpoints, MarkerLabel},
    Catalog, FunctionApi, FunctionMetrics, Functions, Resolver, Watchdog,
};
use anyhow::{bail, Result};
use clap::Parser;
use kube::runtime::watcher;
use prometheus_client::registry::Registry;
use std::net::SocketAddr;
use tokio::{net::TcpListener, time::Duration};
use tracing::{info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(
    name = "faas-replicas",
    about = "Serves function status and relays scaling requests to function watchdogs"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "faas_replicas=info,warn",
        env = "FAAS_REPLICAS_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    client: kubert::ClientArgs,

    #[clap(flatten)]
    admin: kubert::AdminArgs,

    #[clap(long, default_value = "0.0.0.0:8081")]
    api_addr: SocketAddr,

    /// The namespace served when a request does not name one.
    #[clap(long, default_value = "openfaas-fn")]
    default_namespace: String,

    /// A namespace that is never served.
    #[clap(long, default_value = "kube-system")]
    reserved_namespace: String,

    /// The label key that marks a deployment as a function.
    #[clap(long, default_value = "faas_function")]
    function_label: MarkerLabel,

    #[clap(long, default_value = "8080")]
    watchdog_port: u16,

    #[clap(long, default_value = "5000")]
    watchdog_timeout_ms: u64,

    #[clap(long, default_value = "90")]
    watchdog_pool_idle_timeout_secs: u64,

    /// The maximum number of watchdogs queried concurrently while listing.
    #[clap(long, default_value = "8", value_parser = clap::value_parser!(u16).range(1..))]
    list_concurrency: u16,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            client,
            admin,
            api_addr,
            default_namespace,
            reserved_namespace,
            function_label,
            watchdog_port,
            watchdog_timeout_ms,
            watchdog_pool_idle_timeout_secs,
            list_concurrency,
        } = self;

        let catalog = Index::shared(function_label.clone());
        let endpoints = EndpointsIndex::shared(watchdog_port);

        let mut prom = <Registry>::default();
        let catalog_metrics = IndexMetrics::register(
            catalog.clone(),
            "Deployment",
            prom.sub_registry_with_prefix("catalog_index"),
        )
        .shared();
        let endpoints_metrics = IndexMetrics::register(
            endpoints.clone(),
            "Endpoints",
            prom.sub_registry_with_prefix("endpoints_index"),
        )
        .shared();
        let api_metrics = FunctionMetrics::register(prom.sub_registry_with_prefix("function_api"));
        let rt_metrics = kubert::RuntimeMetrics::register(prom.sub_registry_with_prefix("kube"));

        let mut runtime = kubert::Runtime::builder()
            .with_log(log_level, log_format)
            .with_metrics(rt_metrics)
            .with_admin(admin.into_builder().with_prometheus(prom))
            .with_client(client)
            .build()
            .await?;

        // Spawn resource watches.

        let deployments = runtime.watch_all::<Deployment>(
            watcher::Config::default().labels(function_label.selector()),
        );
        tokio::spawn(
            kubert::index::namespaced(catalog_metrics, deployments)
                .instrument(info_span!("deployments")),
        );

        let services = runtime.watch_all::<Endpoints>(watcher::Config::default());
        tokio::spawn(
            kubert::index::namespaced(endpoints_metrics, services)
                .instrument(info_span!("endpoints")),
        );

        // Every watchdog call, across all requests, shares one connection pool.
        let watchdog = Watchdog::new(
            Watchdog::http_client(Duration::from_secs(watchdog_pool_idle_timeout_secs)),
            Duration::from_millis(watchdog_timeout_ms),
        );
        let functions = Functions::new(
            Catalog::new(catalog),
            Resolver::new(endpoints),
            watchdog,
            NamespacePolicy::new(default_namespace, reserved_namespace),
            list_concurrency.into(),
            api_metrics,
        );

        let listener = TcpListener::bind(api_addr).await?;
        tokio::spawn(
            crate::serve(
                listener,
                FunctionApi::new(functions),
                runtime.shutdown_handle(),
            )
            .instrument(info_span!("api")),
        );

        // Block the main thread on the shutdown signal. Once it fires, wait for the background tasks to
        // complete before exiting.
        if runtime.run().await.is_err() {
            bail!("Aborted");
        }

        Ok(())
    }
}
