//! Prompt templating
//!
//! Pure functions: same query and context always give the same messages.

use crate::types::ChatMessage;

pub const SYSTEM_PROMPT: &str = "You are a helpful patent analyst.";

/// User turn wrapping the question around the retrieved abstracts
pub fn user_prompt(query: &str, context: &str) -> String {
    format!(
        "Based on the following patent abstracts, answer the question: {}\n\n{}\n\nAnswer:",
        query, context
    )
}

/// System + user messages for one generation call
pub fn build_messages(query: &str, context: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(user_prompt(query, context)),
    ]
}
