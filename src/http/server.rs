//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router for the demo endpoints
//! - Wrap every route (and the fallback) in the request log layer
//! - Serve with peer addresses available to the interceptor
//! - Stop accepting on the shutdown broadcast

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::capture::{BypassRules, RecordSink, RequestLogLayer};
use crate::config::CaptureConfig;
use crate::http::handlers;

/// Demo HTTP server.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server whose records go to `sink`.
    pub fn new(capture: &CaptureConfig, sink: Arc<dyn RecordSink>) -> Self {
        let routes = Router::new()
            .route("/health", get(handlers::health))
            .route("/test", post(handlers::echo));

        Self {
            router: instrument(routes, capture, sink),
        }
    }

    /// The fully layered router, for serving or for `oneshot` tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Accept connections until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Apply the request log layer and HTTP tracing to an application router.
pub fn instrument(router: Router, capture: &CaptureConfig, sink: Arc<dyn RecordSink>) -> Router {
    router
        .layer(RequestLogLayer::new(sink, BypassRules::from_config(capture)))
        .layer(TraceLayer::new_for_http())
}
