//! Listener binding and graceful serving.

use agentnet_runtime::supervisor::shutdown_signal;
use agentnet_types::error::{AgentNetError, AgentNetResult};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

/// Bind a TCP listener on `listen` (`host:port`).
pub async fn bind(listen: &str) -> AgentNetResult<TcpListener> {
    TcpListener::bind(listen)
        .await
        .map_err(|e| AgentNetError::Config(format!("failed to bind {listen}: {e}")))
}

/// Serve `app` on `listener` until `shutdown` flips to `true`.
pub async fn serve_on(
    listener: TcpListener,
    app: Router,
    shutdown: watch::Receiver<bool>,
) -> AgentNetResult<()> {
    let addr = local_addr(&listener)?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .map_err(|e| AgentNetError::Internal(format!("server error: {e}")))?;

    info!(%addr, "HTTP server stopped");
    Ok(())
}

/// Bind and serve in one step.
pub async fn serve(listen: &str, app: Router, shutdown: watch::Receiver<bool>) -> AgentNetResult<()> {
    let listener = bind(listen).await?;
    serve_on(listener, app, shutdown).await
}

pub fn local_addr(listener: &TcpListener) -> AgentNetResult<SocketAddr> {
    listener
        .local_addr()
        .map_err(|e| AgentNetError::Internal(format!("listener has no address: {e}")))
}
