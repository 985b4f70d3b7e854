//! RS Agent - 遥感知识问答智能体
//!
//! 模块划分：
//! - **agent**: 调度器（意图分类 → 交互式澄清 → 知识库查询 → 写结果文件）
//! - **clarify**: 交互式术语澄清循环（核心状态机）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **error**: Agent 错误类型
//! - **files**: 文件读写辅助（上传文件拼接、结果写入）
//! - **intent**: 任务意图分类器
//! - **knowledge**: 知识库抽象与实现（内存 / JSON 文件 / API 占位）
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod agent;
pub mod clarify;
pub mod config;
pub mod error;
pub mod files;
pub mod intent;
pub mod knowledge;
pub mod llm;

pub use agent::{Agent, QueryStatus};
pub use error::AgentError;
