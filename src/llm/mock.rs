//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按脚本顺序吐出预置回复，脚本耗尽后返回错误；同时记录每次收到的
//! 用户消息内容，便于断言提示词构造与轮间状态传递。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message, Role};

/// Mock 客户端：按顺序返回预置回复
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<String>>,
    user_contents: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn with_replies(replies: Vec<impl Into<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            user_contents: Mutex::new(Vec::new()),
        }
    }

    /// 始终失败的客户端（模拟网络/端点故障）
    pub fn failing() -> Self {
        Self::default()
    }

    /// 每次调用时收到的 User 消息内容（按调用顺序）
    pub fn user_contents(&self) -> Vec<String> {
        self.user_contents
            .lock()
            .expect("mock requests lock poisoned")
            .clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Some(user) = messages.iter().rev().find(|m| m.role == Role::User) {
            self.user_contents
                .lock()
                .expect("mock requests lock poisoned")
                .push(user.content.clone());
        }
        self.replies
            .lock()
            .expect("mock replies lock poisoned")
            .pop_front()
            .ok_or_else(|| "mock replies exhausted".to_string())
    }
}
