//! Token count estimates for responses without usage data.

use xpilot_domain::Conversation;

const CHARS_PER_TOKEN: usize = 4;

/// Rough token count: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> u64 {
    text.chars().count().div_ceil(CHARS_PER_TOKEN) as u64
}

/// Estimated prompt tokens for every message in `conversation`.
pub fn estimate_prompt_tokens(conversation: &Conversation) -> u64 {
    conversation
        .messages()
        .iter()
        .map(|m| estimate_tokens(&m.content))
        .sum()
}
