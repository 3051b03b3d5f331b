pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod guide;
pub mod models;
pub mod server;
pub mod upstream;

use cli::Args;
use config::GatewayConfig;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = GatewayConfig::from_args(&args)?;

    info!("--- Core Configuration ---");
    info!("Server Address: {}", config.server_addr);
    info!("Upstream Base URL: {}", config.upstream.base_url);
    info!("Upstream Dialect: {:?}", config.upstream.dialect);
    info!("Model: {}", config.upstream.model);
    info!("Chat Timeout: {}s", config.upstream.chat_timeout.as_secs());
    info!("Guide Timeout: {}s", config.upstream.guide_timeout.as_secs());
    info!("CORS: {}", config.cors.describe());
    info!("TLS Enabled: {}", config.tls.is_some());
    info!("-------------------------");

    let server = Server::new(Arc::new(config));
    server.run().await
}
