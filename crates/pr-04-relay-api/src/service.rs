//! HTTP server lifecycle.

use crate::domain::config::ApiConfig;
use crate::domain::error::ApiError;
use crate::ports::Minter;
use crate::router::build_router;
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub struct RelayApi {
    config: ApiConfig,
    router: Router,
}

impl RelayApi {
    pub fn new(config: ApiConfig, minter: Arc<dyn Minter>) -> Result<Self, ApiError> {
        config.validate()?;
        let router = build_router(minter, &config.allowed_origins);
        Ok(Self { config, router })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Bind the configured address. Split from [`serve`](Self::serve) so the
    /// caller learns the bound address (port 0 in tests) before serving.
    pub async fn bind(&self) -> Result<TcpListener, ApiError> {
        Ok(TcpListener::bind(self.config.addr()).await?)
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ApiError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listener.local_addr()?;
        info!(%addr, "Relay API listening");
        info!("  POST /api/mint - Mint tokens");
        info!("  GET  /health   - Health check");
        info!("  GET  /metrics  - Prometheus metrics");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Relay API stopped");
        Ok(())
    }
}
