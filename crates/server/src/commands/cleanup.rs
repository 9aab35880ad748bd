//! Cleanup command handler.

use crate::api::handlers::describe_cleanup;
use clap::Args;
use vecgate_core::{AppConfig, AppResult};

/// Delete entries stored before a Unix timestamp
#[derive(Args, Debug)]
pub struct CleanupCommand {
    /// Unix timestamp in seconds; strictly older entries are deleted
    #[arg(allow_negative_numbers = true)]
    pub timestamp: i64,
}

impl CleanupCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing cleanup command");

        let service = super::build_service(config).await?;
        let result = service.purge_before(self.timestamp).await;
        service.shutdown().await?;
        let outcome = result?;

        println!(
            "{}",
            describe_cleanup(service.backend().as_ref(), self.timestamp, outcome)
        );

        Ok(())
    }
}
