//! HTTP trigger for the downgrade workflow.
//!
//! `POST /api/SetSiteReadOnly` is guarded by the function key and always
//! answers 200 `{"SetReadOnly":true}` or 503 with a JSON string message.
//! `GET /api/health` is open.

mod handlers;
mod middleware;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use secrecy::SecretString;
use tokio::net::TcpListener;
use tracing::{info, warn};

use siteward_core::{SessionProvider, SiteAccessDowngrader};

use middleware::FunctionKey;

/// Read-only state shared by every request.
pub struct AppState<P> {
    pub downgrader: Arc<SiteAccessDowngrader<P>>,
    pub function_key: FunctionKey,
}

impl<P> AppState<P> {
    pub fn new(downgrader: SiteAccessDowngrader<P>, function_key: SecretString) -> Self {
        Self {
            downgrader: Arc::new(downgrader),
            function_key: FunctionKey::new(function_key),
        }
    }
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            downgrader: Arc::clone(&self.downgrader),
            function_key: self.function_key.clone(),
        }
    }
}

pub fn router<P>(state: AppState<P>) -> Router
where
    P: SessionProvider + 'static,
{
    let protected = Router::new()
        .route("/api/SetSiteReadOnly", post(handlers::set_site_read_only::<P>))
        .route_layer(axum::middleware::from_fn_with_state(
            state.function_key.clone(),
            middleware::require_function_key,
        ));

    Router::new()
        .route("/api/health", get(handlers::health))
        .merge(protected)
        .layer(axum::middleware::from_fn(middleware::logging_middleware))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl+C or SIGTERM.
pub async fn serve<P>(addr: SocketAddr, state: AppState<P>) -> std::io::Result<()>
where
    P: SessionProvider + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
