//! Chat completion client
//!
//! The runner only sees [`ChatModel`]; the DeepSeek client is the one real
//! implementation.

pub mod deepseek;

pub use deepseek::DeepSeekClient;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Sampling options for one call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionOptions {
    pub const fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self::new(0.6, 1200)
    }
}

/// Anything that turns a conversation into one reply
pub trait ChatModel {
    fn complete(&self, messages: &[ChatMessage], options: CompletionOptions) -> Result<String>;
}

#[cfg(test)]
pub mod testing {
    //! Scripted model for runner tests

    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;
    use crate::error::RunError;

    /// Replays canned replies in order and records every request
    #[derive(Default)]
    pub struct ScriptedModel {
        replies: RefCell<VecDeque<Result<String>>>,
        pub calls: RefCell<Vec<(Vec<ChatMessage>, CompletionOptions)>>,
    }

    impl ScriptedModel {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, text: &str) -> Self {
            self.replies.borrow_mut().push_back(Ok(text.to_string()));
            self
        }

        pub fn fail(self, err: RunError) -> Self {
            self.replies.borrow_mut().push_back(Err(err));
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    impl ChatModel for ScriptedModel {
        fn complete(&self, messages: &[ChatMessage], options: CompletionOptions) -> Result<String> {
            self.calls.borrow_mut().push((messages.to_vec(), options));
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(RunError::Network("script exhausted".to_string())))
        }
    }
}
