//! MetricsServer: the HTTP endpoint as a closable handle

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::api::{routes, ApiState};
use crate::error::ExporterError;

pub struct MetricsServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<std::io::Result<()>>,
}

impl MetricsServer {
    /// Bind `addr` and serve in a background task
    pub async fn start(addr: &str, state: ApiState) -> Result<Self, ExporterError> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;

        let app = routes()
            .with_state(state)
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { signal.cancelled().await })
                .await
        });

        tracing::info!("[Server] Listening on {}", addr);

        Ok(Self {
            addr,
            shutdown,
            handle,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for the server task to finish
    pub async fn close(self) {
        self.shutdown.cancel();
        match self.handle.await {
            Ok(Ok(())) => tracing::info!("[Server] Closed {}", self.addr),
            Ok(Err(e)) => tracing::warn!("[Server] {} failed: {}", self.addr, e),
            Err(e) => tracing::warn!("[Server] Task for {} aborted: {}", self.addr, e),
        }
    }
}
