use crate::{Error, Functions};
use bytes::Bytes;
use faas_replicas_core::{AddressResolver, FunctionCatalog};
use futures::future;
use http_body_util::BodyExt;
use hyper::{body::Body as HttpBody, header, http, Method, Request, Response, StatusCode};
use serde::Serialize;
use std::convert::Infallible;
use tokio::time;
use tracing::{debug, trace, warn};

type Body = http_body_util::Full<Bytes>;

/// Serves the function replica API.
#[derive(Clone, Debug)]
pub struct FunctionApi<C, R> {
    functions: Functions<C, R>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Route {
    List,
    Status(String),
    ScaleStatus(String),
    Scale(String),
}

// === impl FunctionApi ===

impl<C, R> FunctionApi<C, R> {
    pub fn new(functions: Functions<C, R>) -> Self {
        Self { functions }
    }
}

impl<C, R, B> tower::Service<Request<B>> for FunctionApi<C, R>
where
    C: FunctionCatalog + Clone + Send + Sync + 'static,
    R: AddressResolver + Clone + Send + Sync + 'static,
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = future::BoxFuture<'static, Result<Response<Body>, Infallible>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        trace!(method = %req.method(), uri = %req.uri());
        let functions = self.functions.clone();
        Box::pin(async move {
            let start = time::Instant::now();
            let route = Route::parse(req.method(), req.uri().path());
            let label = route.as_ref().map_or("unknown", Route::label);

            let rsp = match route {
                Ok(route) => match handle(&functions, route, req).await {
                    Ok(rsp) => rsp,
                    Err(error) => error_response(error),
                },
                Err(status) => empty_response(status),
            };

            debug!(route = label, status = %rsp.status());
            functions.metrics().handled(label, rsp.status(), start);
            Ok(rsp)
        })
    }
}

async fn handle<C, R, B>(
    functions: &Functions<C, R>,
    route: Route,
    req: Request<B>,
) -> Result<Response<Body>, Error>
where
    C: FunctionCatalog + Send + Sync,
    R: AddressResolver + Send + Sync,
    B: HttpBody<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let namespace = namespace_param(req.uri());
    let ns = namespace.as_deref();
    match route {
        Route::List => json_response(&functions.list(ns).await?),
        Route::Status(name) => json_response(&functions.status(ns, &name).await?),
        Route::ScaleStatus(name) => json_response(&functions.scale_status(ns, &name).await?),
        Route::Scale(name) => {
            let (parts, body) = req.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|error| Error::Body(error.into()))?
                .to_bytes();
            let status = functions.scale(ns, &name, &parts, body).await?;
            Ok(empty_response(status))
        }
    }
}

// === impl Route ===

impl Route {
    fn parse(method: &Method, path: &str) -> Result<Self, StatusCode> {
        let (route, methods): (Self, &[Method]) = if path == "/functions" {
            (Self::List, &[Method::GET])
        } else if let Some(name) = path_name(path, "/function/") {
            (Self::Status(name), &[Method::GET])
        } else if let Some(name) = path_name(path, "/scale-status/") {
            (Self::ScaleStatus(name), &[Method::GET])
        } else if let Some(name) = path_name(path, "/scale/") {
            (Self::Scale(name), &[Method::POST, Method::PUT])
        } else {
            return Err(StatusCode::NOT_FOUND);
        };

        if !methods.contains(method) {
            return Err(StatusCode::METHOD_NOT_ALLOWED);
        }
        Ok(route)
    }

    fn label(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Status(_) => "status",
            Self::ScaleStatus(_) => "scale_status",
            Self::Scale(_) => "scale",
        }
    }
}

/// Extracts the single, non-empty path segment following `prefix`, percent-decoded.
fn path_name(path: &str, prefix: &str) -> Option<String> {
    let name = path.strip_prefix(prefix)?;
    if name.contains('/') {
        return None;
    }
    // An encoded separator still names more than one segment.
    let name = urlencoding::decode(name).ok()?;
    if name.is_empty() || name.contains('/') {
        return None;
    }
    Some(name.into_owned())
}

/// Reads the form-decoded `namespace` query parameter.
fn namespace_param(uri: &http::Uri) -> Option<String> {
    url::form_urlencoded::parse(uri.query()?.as_bytes())
        .find(|(key, _)| key == "namespace")
        .map(|(_, value)| value.into_owned())
}

fn json_response<T: Serialize>(value: &T) -> Result<Response<Body>, Error> {
    let json = serde_json::to_vec(value).map_err(Error::Serialize)?;
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json))
        .expect("json response must be valid"))
}

fn empty_response(status: StatusCode) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::default())
        .expect("empty response must be valid")
}

fn error_response(error: Error) -> Response<Body> {
    let status = error.status();
    match error {
        Error::Serialize(_) | Error::Catalog(_) => {
            tracing::error!(%error, "Failed to serve request")
        }
        _ if status.is_server_error() => warn!(%error, "Request failed"),
        _ => debug!(%error, "Request rejected"),
    }

    let body = error.body();
    if body.is_empty() {
        return empty_response(status);
    }
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from(body))
        .expect("error response must be valid")
}
