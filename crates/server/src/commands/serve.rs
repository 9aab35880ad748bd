//! Serve command handler.

use crate::api::{self, AppState};
use clap::Args;
use vecgate_core::{AppConfig, AppResult};

/// Run the HTTP API
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (overrides VECGATE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides VECGATE_PORT)
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing serve command");

        let host = self.host.as_deref().unwrap_or(&config.host);
        let port = self.port.unwrap_or(config.port);

        let service = super::build_service(config).await?;
        let chat = match super::build_chat(config, service.clone()) {
            Ok(chat) => chat,
            Err(e) => {
                service.shutdown().await?;
                return Err(e);
            }
        };

        api::serve(AppState::new(service, chat), &format!("{}:{}", host, port)).await
    }
}
