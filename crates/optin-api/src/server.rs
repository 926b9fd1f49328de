//! HTTP server for the consent API
//!
//! One tokio task per connection, hyper HTTP/1. Shutdown stops accepting,
//! asks open connections to finish their in-flight request and waits for
//! them, then drains the audit writes, so every pending audit entry is
//! written before `run` returns.

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Pause after a failed `accept` before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

use crate::context::ApiContext;
use crate::router::route;

/// HTTP server that serves the consent routes
pub struct ApiServer {
    ctx: Arc<ApiContext>,
    listener: TcpListener,
    addr: SocketAddr,
}

impl ApiServer {
    /// Binds the listening socket.
    ///
    /// # Arguments
    /// * `ctx` - The shared request context
    /// * `endpoint` - Address to bind, e.g. `"127.0.0.1:3000"`; port 0 picks
    ///   a free port
    pub async fn bind(ctx: Arc<ApiContext>, endpoint: &str) -> anyhow::Result<Self> {
        let addr: SocketAddr = endpoint.parse()?;
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        Ok(Self {
            ctx,
            listener,
            addr,
        })
    }

    /// The address the server is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serves requests until the cancellation token is triggered.
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        info!(addr = %self.addr, "Consent API listening");
        let connections = TaskTracker::new();

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    let Some((stream, peer)) = accepted(result) else {
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    };
                    let io = TokioIo::new(stream);
                    let ctx = Arc::clone(&self.ctx);
                    let shutdown = shutdown.clone();

                    connections.spawn(async move {
                        let service = service_fn(move |req| {
                            let ctx = Arc::clone(&ctx);
                            async move { Ok::<_, Infallible>(route(&ctx, req).await) }
                        });

                        let conn = http1::Builder::new().serve_connection(io, service);
                        tokio::pin!(conn);
                        let result = tokio::select! {
                            result = conn.as_mut() => result,
                            _ = shutdown.cancelled() => {
                                conn.as_mut().graceful_shutdown();
                                conn.await
                            }
                        };
                        if let Err(e) = result {
                            debug!(error = %e, peer = %peer, "HTTP connection error");
                        }
                    });
                }
                _ = shutdown.cancelled() => {
                    info!("Consent API shutting down");
                    break;
                }
            }
        }

        connections.close();
        connections.wait().await;
        info!("All connections closed");

        self.ctx.audit.drain().await;
        debug!("Audit writes drained");
        Ok(())
    }
}

/// Unwraps an accepted connection; failures are logged and skipped
///
/// Errors such as `EMFILE` or `ECONNABORTED` affect one connection attempt,
/// not the listener.
fn accepted<T>(result: io::Result<T>) -> Option<T> {
    match result {
        Ok(conn) => Some(conn),
        Err(e) => {
            warn!(error = %e, "Failed to accept connection");
            None
        }
    }
}
