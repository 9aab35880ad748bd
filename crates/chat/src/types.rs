//! Chat data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One user message and the assistant's reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub response: String,

    /// Stored texts the reply was grounded on, best match first
    #[serde(default)]
    pub context: Vec<String>,

    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(
        user_id: impl Into<String>,
        message: impl Into<String>,
        response: impl Into<String>,
        context: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            message: message.into(),
            response: response.into(),
            context,
            created_at: Utc::now(),
        }
    }
}
