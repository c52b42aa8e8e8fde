//! Scripted model backend for tests.
//!
//! Replies are consumed in order; every call is recorded so tests can
//! assert on the assembled prompts and on how many calls were made.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{LlmError, ModelBackend, ModelReply, Usage};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub system: String,
    pub user_message: String,
}

enum Scripted {
    Reply(ModelReply),
    Fail { status: u16, message: String },
}

#[derive(Clone, Default)]
pub struct MockModel {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply with a fixed 100/50 token usage.
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.reply_with_usage(content, 100, 50)
    }

    pub fn reply_with_usage(self, content: impl Into<String>, input: u32, output: u32) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Reply(ModelReply {
            content: content.into(),
            usage: Usage {
                input_tokens: input,
                output_tokens: output,
            },
        }));
        self
    }

    pub fn fail(self, status: u16, message: impl Into<String>) -> Self {
        self.script.lock().unwrap().push_back(Scripted::Fail {
            status,
            message: message.into(),
        });
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelBackend for MockModel {
    async fn call(&self, system: &str, user_message: &str) -> Result<ModelReply, LlmError> {
        self.calls.lock().unwrap().push(RecordedCall {
            system: system.to_string(),
            user_message: user_message.to_string(),
        });
        match self.script.lock().unwrap().pop_front() {
            Some(Scripted::Reply(reply)) => Ok(reply),
            Some(Scripted::Fail { status, message }) => Err(LlmError::Api { status, message }),
            None => Err(LlmError::Api {
                status: 503,
                message: "mock script exhausted".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
