//! Search command handler.

use clap::Args;
use serde_json::json;
use vecgate_core::{AppConfig, AppResult};

/// Search stored texts by similarity
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text
    pub query: String,

    /// Maximum number of results
    #[arg(short, long, default_value_t = 5)]
    pub limit: usize,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command");
        tracing::debug!("Search options: {:?}", self);

        let service = super::build_service(config).await?;
        let result = service.embed_and_search(&self.query, self.limit).await;
        service.shutdown().await?;
        let results = result?;

        tracing::debug!("Found {} results", results.len());
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "results": results }))?
        );

        Ok(())
    }
}
