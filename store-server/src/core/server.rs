//! Server Implementation
//!
//! HTTP 服务器启动和管理

use crate::api::build_app;
use crate::core::tasks::BackgroundTasks;
use crate::core::{Config, Result, ServerState};

/// HTTP Server
pub struct Server {
    config: Config,
    state: ServerState,
    tasks: BackgroundTasks,
}

impl Server {
    pub fn with_state(config: Config, state: ServerState, tasks: BackgroundTasks) -> Self {
        Self {
            config,
            state,
            tasks,
        }
    }

    pub async fn run(self) -> Result<()> {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Store server listening on {}", addr);

        let app = build_app(&self.state).with_state(self.state.clone());

        let shutdown = async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down...");
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        self.tasks.shutdown().await;
        Ok(())
    }
}
