//! Prompt assembly for chat turns.

/// Build the user prompt, prefixing retrieved context when there is any.
pub fn build_prompt(context: &[String], message: &str) -> String {
    if context.is_empty() {
        format!("User: {}\nAssistant:", message)
    } else {
        format!(
            "Context:\n{}\n\nUser: {}\nAssistant:",
            context.join("\n"),
            message
        )
    }
}
