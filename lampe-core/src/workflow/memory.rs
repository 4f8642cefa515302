//! Per-agent chat memory.
//!
//! Owned by one agent run and dropped at workflow completion; never shared
//! across workflows. The buffer is token-bounded: when it overflows, the
//! oldest non-system messages are evicted.

use llm_service::{ChatMessage, Role};

use crate::utils::token::count_token_string;

/// Default token budget for a conversation buffer.
const DEFAULT_TOKEN_LIMIT: usize = 180_000;

/// Bounded chat buffer with `push` and `snapshot` operations.
#[derive(Debug, Clone)]
pub struct ChatMemory {
    messages: Vec<ChatMessage>,
    token_limit: usize,
}

impl Default for ChatMemory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_TOKEN_LIMIT)
    }
}

impl ChatMemory {
    pub fn with_limit(token_limit: usize) -> Self {
        Self {
            messages: Vec::new(),
            token_limit,
        }
    }

    /// Appends a message, evicting oldest non-system messages if the
    /// buffer exceeds its token budget.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        while self.token_count() > self.token_limit {
            let Some(pos) = self.messages.iter().position(|m| m.role != Role::System) else {
                break;
            };
            // Never evict the newest message, even oversized.
            if pos + 1 == self.messages.len() {
                break;
            }
            self.messages.remove(pos);
        }
    }

    /// Current conversation, oldest first.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn token_count(&self) -> usize {
        self.messages.iter().map(|m| count_token_string(&m.content)).sum()
    }
}
