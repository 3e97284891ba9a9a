use crate::channel::wire::{CONSOLE_PATH, HEALTH_PATH, SEND_PATH, STATUS_PATH};
use crate::config::BridgeConfig;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use log::{info, warn};
use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use super::handlers::{console_handler, health_handler, send_handler, status_handler};
use super::Bridge;

/// HTTP front end of the bridge
pub struct BridgeServer {
    config: BridgeConfig,
    bridge: Arc<Bridge>,
}

impl BridgeServer {
    pub fn new(config: BridgeConfig, bridge: Arc<Bridge>) -> Self {
        Self { config, bridge }
    }

    /// Build the router with all bridge routes
    pub fn router(&self) -> Router {
        let router = Router::new()
            .route(SEND_PATH, post(send_handler))
            .route(STATUS_PATH, get(status_handler))
            .route(CONSOLE_PATH, get(console_handler))
            .route(HEALTH_PATH, get(health_handler))
            .with_state(Arc::clone(&self.bridge));

        match cors_layer(&self.config.allowed_origin) {
            Some(cors) => router.layer(cors),
            None => router,
        }
    }

    /// Bind the configured address
    pub async fn bind(&self) -> io::Result<TcpListener> {
        let listener = TcpListener::bind(&self.config.listen).await?;
        info!("Bridge listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
    }
}

/// CORS for the browser operator UI; `None` when no origin is configured
fn cors_layer(origin: &str) -> Option<CorsLayer> {
    if origin.trim().is_empty() {
        return None;
    }

    match HeaderValue::from_str(origin) {
        Ok(origin) => Some(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE]),
        ),
        Err(e) => {
            warn!("Ignoring invalid CORS origin '{}': {}", origin, e);
            None
        }
    }
}
