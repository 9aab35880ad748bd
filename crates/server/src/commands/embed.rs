//! Embed command handler.
//!
//! Stores one text without going through the HTTP server.

use clap::Args;
use serde_json::{json, Value};
use vecgate_core::{AppConfig, AppError, AppResult};
use vecgate_store::Metadata;

/// Embed a text and store it in the configured backend
#[derive(Args, Debug)]
pub struct EmbedCommand {
    /// Text to embed
    pub text: String,

    /// Metadata as a JSON object, e.g. '{"session": "abc"}'
    #[arg(short, long)]
    pub metadata: Option<String>,
}

impl EmbedCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing embed command");
        tracing::debug!("Embed options: {:?}", self);

        let metadata = self.metadata.as_deref().map(parse_metadata).transpose()?;

        let service = super::build_service(config).await?;
        let result = service.embed_and_store(&self.text, metadata).await;
        service.shutdown().await?;
        let record = result?;

        let summary = json!({
            "id": record.id,
            "timestamp": record.timestamp,
            "metadata": record.metadata,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);

        Ok(())
    }
}

fn parse_metadata(raw: &str) -> AppResult<Metadata> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Config(format!(
            "--metadata must be a JSON object, got: {}",
            other
        ))),
    }
}
