//! Agent 错误类型
//!
//! 错误只在模块内部传递；调度器（agent）在公共边界将其折叠为 QueryStatus，
//! 不允许任何错误越过调度器向调用方抛出。

use thiserror::Error;

/// Agent 运行过程中可能出现的错误（LLM 调用、解析、配置、IO）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// 澄清结果虽是合法 JSON，但违反了字段约定
    /// （is_ambiguous 与 corrected_term / suggestions 的互斥关系）
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// 结果文件写入失败（对当前操作是致命的）
    #[error("Output write failed: {0}")]
    OutputWrite(String),

    /// 读取用户输入失败（stdin 关闭等）
    #[error("User input failed: {0}")]
    Input(String),
}
