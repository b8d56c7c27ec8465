//! Provider-agnostic token estimation for prompt budgeting.
//!
//! Approximation: ~4 characters per token, plus a small wrapper overhead per
//! chat message. Good enough to warn before a request overflows the context.

/// Tokens added by the chat format around each message.
const MESSAGE_OVERHEAD: usize = 4;

pub struct TokenCounter;

impl TokenCounter {
    pub fn estimate_tokens(text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        text.len().div_ceil(4)
    }

    /// Estimate for a `(role, content)` message list, formatting overhead included.
    pub fn estimate_messages_tokens(messages: &[(&str, &str)]) -> usize {
        let base_tokens = messages.len() * MESSAGE_OVERHEAD;
        let content_tokens: usize = messages
            .iter()
            .map(|(role, content)| Self::estimate_tokens(role) + Self::estimate_tokens(content))
            .sum();
        base_tokens + content_tokens
    }

    pub fn estimate_remaining(
        used_tokens: usize,
        context_window: usize,
        reserved_for_response: usize,
    ) -> usize {
        context_window
            .saturating_sub(used_tokens)
            .saturating_sub(reserved_for_response)
    }

    /// Whether the prompt plus the response reservation fits in the window.
    pub fn fits_in_context(prompt_tokens: usize, reserved_for_response: usize, context_window: usize) -> bool {
        prompt_tokens.saturating_add(reserved_for_response) <= context_window
    }
}
