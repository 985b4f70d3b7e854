//! 任务意图分类器
//!
//! 单次 LLM 调用：把用户请求（含可选文件内容）归类为标准任务 /
//! 可纠正的模糊查询 / 无关查询。要求模型输出严格 JSON
//! `{"task_id": N}`，解析失败或调用失败一律按"无关查询"处理
//! （失败关闭，不向调用方抛错），且不重试。

use serde::Deserialize;

use crate::llm::{extract_json, LlmClient, Message};

/// 分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentOutcome {
    /// 标准任务（编号 1-3）
    Task(u8),
    /// 可纠正的模糊查询（原始编码 -2）
    Ambiguous,
    /// 完全无关的查询（原始编码 -1）
    Irrelevant,
}

impl IntentOutcome {
    /// 与外部边界约定的整数编码：1/2/3、-2、-1
    pub fn as_code(self) -> i32 {
        match self {
            IntentOutcome::Task(n) => n as i32,
            IntentOutcome::Ambiguous => -2,
            IntentOutcome::Irrelevant => -1,
        }
    }

    fn from_code(code: i32) -> Option<Self> {
        match code {
            1..=3 => Some(IntentOutcome::Task(code as u8)),
            -2 => Some(IntentOutcome::Ambiguous),
            -1 => Some(IntentOutcome::Irrelevant),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TaskIdReply {
    task_id: i32,
}

/// 意图分类器：持有 LLM 句柄与标准术语表
pub struct IntentClassifier<'a> {
    llm: &'a dyn LlmClient,
    known_terms: &'a [String],
}

impl<'a> IntentClassifier<'a> {
    pub fn new(llm: &'a dyn LlmClient, known_terms: &'a [String]) -> Self {
        Self { llm, known_terms }
    }

    /// 分类用户请求。任何失败路径都折叠为 Irrelevant。
    pub async fn classify(&self, user_prompt: &str, file_content: &str) -> IntentOutcome {
        let system_prompt = self.system_prompt();

        let mut full_prompt = format!("用户请求：\n{}\n\n", user_prompt);
        if !file_content.is_empty() {
            full_prompt.push_str(&format!("用户上传的文件内容：\n{}", file_content));
        }

        let messages = vec![Message::system(system_prompt), Message::user(full_prompt)];

        let output = match self.llm.complete(&messages).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("意图分类调用 LLM 失败，按无关查询处理: {}", e);
                return IntentOutcome::Irrelevant;
            }
        };
        tracing::debug!(%output, "意图分类原始输出");

        parse_task_id(&output).unwrap_or_else(|| {
            tracing::warn!("意图分类输出无法解析，按无关查询处理: {}", output);
            IntentOutcome::Irrelevant
        })
    }

    fn system_prompt(&self) -> String {
        format!(
            r#"你是一个智能任务分类助手。你的任务是分析用户的请求，并将其归类为以下几种情况：

1. 标准任务类型（task_id 取对应编号）：
   1: 用户询问遥感领域知识（例如"什么是土壤湿度？"或"RSHub怎么用？"）
   2: 用户希望根据参数构建环境（例如"帮我用这些参数模拟一下场景"）
   3: 用户希望根据环境数据推断参数（例如"看看这个数据对应的土壤参数是什么"）

2. 可纠正的模糊查询（task_id 取 -2）：
   - 用户使用了与标准术语相近但不完全匹配的词语
   - 例如："土地湿度"（应为"土壤湿度"）、"微波传感器"（应为"微波遥感"）
   - 这类查询可以通过提供标准术语建议来纠正

3. 完全无关的查询（task_id 取 -1）：
   - 与遥感领域完全无关的问题
   - 例如："今天星期几？"、"帮我写个作文"等
   - 这类查询应该被拒绝

已知的标准技术术语列表：
{:?}

请严格按照以下规则判断：
1. 如果用户的请求完全匹配某个标准任务类型，task_id 取对应编号（1-3）
2. 如果用户的请求使用了模糊或相近的术语，但明显是在询问遥感领域的问题，task_id 取 -2
3. 如果用户的请求与遥感领域完全无关，task_id 取 -1

你必须只输出一个 JSON 对象 {{"task_id": N}}，不要添加任何额外的解释。"#,
            self.known_terms
        )
    }
}

/// 从 LLM 输出中解析 {"task_id": N}；非法编号视为解析失败
fn parse_task_id(output: &str) -> Option<IntentOutcome> {
    let json = extract_json(output)?;
    let reply: TaskIdReply = serde_json::from_str(json).ok()?;
    IntentOutcome::from_code(reply.task_id)
}
