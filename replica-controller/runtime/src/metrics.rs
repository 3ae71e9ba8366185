use hyper::StatusCode;
use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{
        counter::Counter,
        family::Family,
        histogram::{exponential_buckets, Histogram},
    },
    registry::Registry,
};
use tokio::time;

#[derive(Clone, Debug)]
pub struct FunctionMetrics {
    requests: Family<RouteLabels, Counter>,
    handling: Family<RouteLabels, Histogram>,
    stats_failures: Counter,
    scale_forwards: Family<StatusLabels, Counter>,
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct RouteLabels {
    route: &'static str,
    status: String,
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug)]
struct StatusLabels {
    status: String,
}

// === impl FunctionMetrics ===

impl FunctionMetrics {
    pub fn register(reg: &mut Registry) -> Self {
        let requests = Family::<RouteLabels, Counter>::default();
        reg.register(
            "requests",
            "Total number of function API requests handled",
            requests.clone(),
        );

        let handling = Family::<RouteLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.001, 2.0, 14))
        });
        reg.register(
            "request_duration_seconds",
            "Time taken to handle function API requests",
            handling.clone(),
        );

        let stats_failures = Counter::default();
        reg.register(
            "stats_failures",
            "Total number of replica stats reads that fell back to the cached status",
            stats_failures.clone(),
        );

        let scale_forwards = Family::<StatusLabels, Counter>::default();
        reg.register(
            "scale_forwards",
            "Total number of scale requests relayed to a watchdog, by watchdog response status",
            scale_forwards.clone(),
        );

        Self {
            requests,
            handling,
            stats_failures,
            scale_forwards,
        }
    }

    pub(crate) fn handled(&self, route: &'static str, status: StatusCode, start: time::Instant) {
        let labels = RouteLabels {
            route,
            status: status.as_u16().to_string(),
        };
        self.handling
            .get_or_create(&labels)
            .observe(start.elapsed().as_secs_f64());
        self.requests.get_or_create(&labels).inc();
    }

    pub(crate) fn stats_failed(&self) {
        self.stats_failures.inc();
    }

    pub(crate) fn scale_forwarded(&self, status: StatusCode) {
        self.scale_forwards
            .get_or_create(&StatusLabels {
                status: status.as_u16().to_string(),
            })
            .inc();
    }
}

impl Default for FunctionMetrics {
    /// Metrics that are not exported.
    fn default() -> Self {
        Self::register(&mut Registry::default())
    }
}
