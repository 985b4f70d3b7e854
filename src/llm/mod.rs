//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use traits::LlmClient;

/// 从 LLM 输出中提取 JSON 块（```json ... ``` 围栏或首个 { 到末个 }）
///
/// 找不到任何 JSON 迹象时返回 None，由调用方决定如何处理。
pub fn extract_json(output: &str) -> Option<&str> {
    let trimmed = output.trim();

    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(
            rest.find("```")
                .map(|end| rest[..end].trim())
                .unwrap_or_else(|| rest.trim()),
        );
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&trimmed[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_fenced_json() {
        let out = "好的，结果如下：\n```json\n{\"task_id\": -2}\n```";
        assert_eq!(extract_json(out), Some("{\"task_id\": -2}"));
    }

    #[test]
    fn extract_bare_json() {
        let out = "前言 {\"task_id\": 1} 后记";
        assert_eq!(extract_json(out), Some("{\"task_id\": 1}"));
    }

    #[test]
    fn no_json_returns_none() {
        assert_eq!(extract_json("纯文本回答，没有结构化内容"), None);
    }
}
