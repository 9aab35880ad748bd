//! History command handler.

use clap::Args;
use vecgate_chat::{ChatHistory, SqliteHistory};
use vecgate_core::{AppConfig, AppResult};

/// Print a user's chat history, newest first
#[derive(Args, Debug)]
pub struct HistoryCommand {
    /// User whose turns are listed
    pub user_id: String,
}

impl HistoryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing history command");

        // Reading history needs neither the vector store nor the LLM
        let history = SqliteHistory::open(&config.chat.history_path)?;
        let turns = history.for_user(&self.user_id).await?;

        tracing::debug!("Found {} turns", turns.len());
        println!("{}", serde_json::to_string_pretty(&turns)?);
        Ok(())
    }
}
