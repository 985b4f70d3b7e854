//! LLM 客户端抽象
//!
//! 所有后端（OpenAI 兼容 / Mock）实现 LlmClient：complete（单次请求/响应）。
//! 系统严格按轮次运行，任一时刻至多一个未完成的 LLM 请求。

use async_trait::async_trait;

use crate::llm::Message;

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 单次完成：发送全部消息，返回首条回复文本
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;
}
