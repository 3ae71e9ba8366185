//! A client for the watchdog process running in each function instance.

use bytes::Bytes;
use faas_replicas_core::{ReplicaStats, ResolvedAddress};
use http_body_util::BodyExt;
use hyper::{
    body::Incoming,
    header::{self, HeaderMap, HeaderName},
    http, Request, Response, StatusCode,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};
use thiserror::Error;
use tokio::time;

/// Reports the instance's replica counters.
pub const SCALE_READER_PATH: &str = "/scale-reader";

/// Accepts scale requests.
pub const SCALE_UPDATER_PATH: &str = "/scale-updater";

type Body = http_body_util::Full<Bytes>;

pub type HttpClient = Client<HttpConnector, Body>;

/// Issues requests to watchdogs over a shared connection pool.
///
/// Clones share the pool. Every call is bounded by `timeout`; no call is
/// retried.
#[derive(Clone, Debug)]
pub struct Watchdog {
    client: HttpClient,
    timeout: time::Duration,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid watchdog uri: {0}")]
    Uri(#[from] http::uri::InvalidUri),

    #[error("invalid watchdog request: {0}")]
    Request(#[from] http::Error),

    #[error("watchdog request failed: {0}")]
    Client(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read watchdog response: {0}")]
    Body(#[from] hyper::Error),

    #[error("watchdog did not respond within {0:?}")]
    Timeout(time::Duration),

    #[error("watchdog responded with {0}")]
    Status(StatusCode),

    #[error("invalid watchdog response: {0}")]
    Decode(#[from] serde_json::Error),
}

// === impl Watchdog ===

impl Watchdog {
    pub fn new(client: HttpClient, timeout: time::Duration) -> Self {
        Self { client, timeout }
    }

    /// Builds the process-wide client from which all watchdog calls are made.
    pub fn http_client(pool_idle_timeout: time::Duration) -> HttpClient {
        Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(pool_idle_timeout)
            .build_http()
    }

    /// Reads the instance's current replica counters.
    pub async fn read_stats(&self, addr: ResolvedAddress) -> Result<ReplicaStats, Error> {
        let uri = addr.uri(SCALE_READER_PATH)?;
        let req = Request::get(uri).body(Body::default())?;

        let read = async {
            let rsp = self.client.request(req).await?;
            if !rsp.status().is_success() {
                return Err(Error::Status(rsp.status()));
            }
            let body = rsp.into_body().collect().await?.to_bytes();
            Ok::<_, Error>(serde_json::from_slice::<ReplicaStats>(&body)?)
        };
        time::timeout(self.timeout, read)
            .await
            .map_err(|_| Error::Timeout(self.timeout))?
    }

    /// Relays a scale request to the instance, returning the watchdog's
    /// response status.
    ///
    /// The method, headers, query, and body of the inbound request are
    /// preserved; hop-by-hop headers are dropped.
    pub async fn forward_scale(
        &self,
        addr: ResolvedAddress,
        parts: &http::request::Parts,
        body: Bytes,
    ) -> Result<StatusCode, Error> {
        let uri = match parts.uri.query() {
            Some(query) => addr.uri(&format!("{SCALE_UPDATER_PATH}?{query}"))?,
            None => addr.uri(SCALE_UPDATER_PATH)?,
        };

        let mut req = Request::builder()
            .method(parts.method.clone())
            .uri(uri)
            .body(Body::from(body))?;
        *req.headers_mut() = forwarded_headers(&parts.headers);

        let rsp = self.send(req).await?;
        Ok(rsp.status())
    }

    async fn send(&self, req: Request<Body>) -> Result<Response<Incoming>, Error> {
        time::timeout(self.timeout, self.client.request(req))
            .await
            .map_err(|_| Error::Timeout(self.timeout))?
            .map_err(Into::into)
    }
}

fn forwarded_headers(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !is_hop_by_hop(name) && *name != header::HOST)
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "proxy-connection"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}
