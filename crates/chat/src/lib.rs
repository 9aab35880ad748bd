//! Retrieval-augmented chat for vecgate.
//!
//! Each user turn is answered by an LLM that sees the most similar texts
//! already in the vector store. The turn is saved to a [`ChatHistory`] and
//! both sides of it are embedded back into the store, so later turns can
//! draw on earlier ones.

pub mod history;
pub mod prompt;
pub mod service;
pub mod types;

pub use history::{ChatHistory, SqliteHistory};
pub use service::{ChatOptions, ChatService};
pub use types::ChatTurn;
