use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use tower_http::cors::{Any, CorsLayer};

use qurse_chat::ChatService;

use crate::web::routes::{self, AppState};

/// Web server configuration
pub struct WebServerConfig {
    pub bind_addr: SocketAddr,
}

/// Web server instance
pub struct WebServer {
    config: WebServerConfig,
    service: Arc<ChatService>,
}

impl WebServer {
    pub fn new(config: WebServerConfig, service: Arc<ChatService>) -> Self {
        Self { config, service }
    }

    /// Start the web server
    pub async fn start(self) -> Result<()> {
        let app_state = AppState {
            service: self.service,
        };

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let app = routes::create_router(app_state).layer(cors);

        println!(
            "{}",
            format!("Qurse server starting on http://{}", self.config.bind_addr).bright_cyan()
        );
        println!("   Chat endpoint: http://{}/v1/chat/completions", self.config.bind_addr);
        println!("   Model listing: http://{}/v1/models", self.config.bind_addr);

        let listener = tokio::net::TcpListener::bind(&self.config.bind_addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
