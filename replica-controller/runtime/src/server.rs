use anyhow::Result;
use bytes::Bytes;
use hyper::{body::Incoming, Request, Response};
use hyper_util::{
    rt::{TokioExecutor, TokioIo},
    server::conn::auto,
    service::TowerToHyperService,
};
use std::convert::Infallible;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, debug_span, info, instrument, warn, Instrument};

type Body = http_body_util::Full<Bytes>;

/// Accepts API connections until the drain signal fires. Connections that are
/// open at that point are shut down gracefully before the drain is released.
///
/// A client that disconnects mid-request drops the request's future, along
/// with any watchdog call it is waiting on.
#[instrument(skip_all)]
pub async fn serve<S>(listener: TcpListener, svc: S, drain: drain::Watch) -> Result<()>
where
    S: tower::Service<Request<Incoming>, Response = Response<Body>, Error = Infallible>,
    S: Clone + Send + 'static,
    S::Future: Send + 'static,
{
    let addr = listener.local_addr()?;
    info!(%addr, "function API server listening");

    let signaled = drain.clone().signaled();
    tokio::pin!(signaled);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (io, client) = match accepted {
                    Ok(conn) => conn,
                    Err(error) => {
                        warn!(%error, "Failed to accept connection");
                        continue;
                    }
                };
                tokio::spawn(
                    serve_conn(io, svc.clone(), drain.clone())
                        .instrument(debug_span!("conn", %client)),
                );
            }
            handle = &mut signaled => {
                debug!("Stopped accepting connections");
                drop(handle);
                return Ok(());
            }
        }
    }
}

async fn serve_conn<S>(io: TcpStream, svc: S, drain: drain::Watch)
where
    S: tower::Service<Request<Incoming>, Response = Response<Body>, Error = Infallible>,
    S: Clone + Send + 'static,
    S::Future: Send + 'static,
{
    let builder = auto::Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection(TokioIo::new(io), TowerToHyperService::new(svc));
    tokio::pin!(conn);

    let res = tokio::select! {
        res = conn.as_mut() => res,
        handle = drain.signaled() => {
            conn.as_mut().graceful_shutdown();
            handle.release_after(conn).await
        }
    };
    if let Err(error) = res {
        debug!(%error, "Connection closed");
    }
}
