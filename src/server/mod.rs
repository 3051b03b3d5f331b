pub mod api;
pub mod cors;

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use log::info;

use crate::config::GatewayConfig;

pub struct Server {
    config: Arc<GatewayConfig>,
}

impl Server {
    pub fn new(config: Arc<GatewayConfig>) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.config.server_addr.parse::<SocketAddr>()?;
        let state = api::AppState::new(self.config.clone());
        let app = api::router(state);

        if let Some(tls) = &self.config.tls {
            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                &tls.cert_path,
                &tls.key_path,
            ).await?;

            info!("Starting HTTPS gateway on: https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        } else {
            info!("Starting HTTP gateway on: http://{}", addr);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app.into_make_service()).await?;
        }

        Ok(())
    }
}
