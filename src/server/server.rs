use crate::config::ServerConfig;
use crate::service::ChatService;
use anyhow::Result;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

use super::router;

/// HTTP front end for the chat service
pub struct HttpServer {
    config: ServerConfig,
    service: Arc<ChatService>,
}

impl HttpServer {
    pub fn new(config: ServerConfig, service: Arc<ChatService>) -> Self {
        Self { config, service }
    }

    fn build_router(&self) -> Router {
        router::build_router(self.service.clone())
    }

    /// Serve until `shutdown` resolves
    pub async fn run(&self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let app = self.build_router();
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("HTTP server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("HTTP server shutting down");
            })
            .await?;

        Ok(())
    }
}
