pub mod responses;
pub mod routes;
pub mod state;

use std::future::Future;

use axum::Router;
use log::info;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::error::{Context, Result};

pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    routes::create_router().with_state(state)
}

/// Bind the configured address and serve until `shutdown` resolves.
pub async fn serve<F>(config: &Config, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!("Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped");
    Ok(())
}
