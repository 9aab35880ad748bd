//! Chat command handler.

use clap::Args;
use vecgate_core::{AppConfig, AppResult};

/// Send one chat message and print the reply
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// User the conversation belongs to
    pub user_id: String,

    /// Message text
    pub message: String,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let service = super::build_service(config).await?;
        let result = match super::build_chat(config, service.clone()) {
            Ok(chat) => chat.send(&self.user_id, &self.message).await,
            Err(e) => Err(e),
        };
        service.shutdown().await?;
        let turn = result?;

        println!("{}", serde_json::to_string_pretty(&turn)?);
        Ok(())
    }
}
