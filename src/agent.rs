//! 调度器：意图分类 → 交互式澄清 → 知识库查询 → 写结果文件
//!
//! Agent 在构造时注入 LLM 与知识库句柄（依赖注入，无全局可换单例）。
//! 所有内部错误在本层折叠为 QueryStatus，不向调用方抛出。

use std::path::{Path, PathBuf};

use crate::clarify::{ClarifyLoop, ClarifyOutcome, UserPrompt};
use crate::config::AppConfig;
use crate::error::AgentError;
use crate::files;
use crate::intent::{IntentClassifier, IntentOutcome};
use crate::knowledge::{self, KnowledgeBase};
use crate::llm::{LlmClient, OpenAiClient};

/// 单次查询的公开结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStatus {
    /// 标准任务完成，结果已写入文件
    Completed,
    /// 模糊查询经交互式澄清后完成，结果已写入文件
    Clarified,
    /// 无关查询，未处理，不产生文件
    Irrelevant,
    /// 处理失败，携带状态码（负数）
    Failed(i32),
}

impl QueryStatus {
    /// 与外部边界约定的整数编码
    pub fn code(&self) -> i32 {
        match self {
            QueryStatus::Completed | QueryStatus::Clarified => 0,
            QueryStatus::Irrelevant => -1,
            QueryStatus::Failed(code) => *code,
        }
    }
}

/// 澄清后查库与写文件的内部结果
enum ClarifyReport {
    /// 命中词条，文件已写入
    Hit,
    /// 未命中，占位文本已写入文件（双重信号：有文件但报失败）
    Miss,
    /// 用户中止，未写文件
    Aborted,
    /// 轮数耗尽，未写文件
    Exhausted,
}

/// 遥感知识问答 Agent：持有 LLM、知识库句柄与术语表
pub struct Agent {
    llm: Box<dyn LlmClient>,
    knowledge: Box<dyn KnowledgeBase>,
    known_terms: Vec<String>,
    max_clarify_rounds: usize,
}

impl Agent {
    pub fn new(
        llm: Box<dyn LlmClient>,
        knowledge: Box<dyn KnowledgeBase>,
        known_terms: Vec<String>,
        max_clarify_rounds: usize,
    ) -> Self {
        Self {
            llm,
            knowledge,
            known_terms,
            max_clarify_rounds,
        }
    }

    /// 按配置构造：OpenAI 兼容 LLM + 配置选定的知识库后端
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            Box::new(OpenAiClient::from_config(&cfg.llm)),
            knowledge::backend_from_config(&cfg.knowledge),
            cfg.app.known_terms.clone(),
            cfg.app.max_clarify_rounds,
        )
    }

    /// 处理一条用户查询
    ///
    /// 先做意图分类；模糊查询与标准任务 1 走交互式澄清路径（需要输出路径），
    /// 无关查询直接拒绝，任务 2/3 为未实现的占位。
    pub async fn process_query(
        &self,
        prompt: &str,
        file_paths: &[PathBuf],
        output_path: Option<&Path>,
        prompter: &mut dyn UserPrompt,
    ) -> QueryStatus {
        let file_content = files::read_files_to_string(file_paths);

        println!("\n[Agent] 执行任务意图识别...");
        let classifier = IntentClassifier::new(self.llm.as_ref(), &self.known_terms);
        let outcome = classifier.classify(prompt, &file_content).await;

        match outcome {
            IntentOutcome::Ambiguous => {
                println!("[Agent] 识别到可纠正的模糊查询");
                self.run_clarified_lookup(prompt, output_path, prompter, true)
                    .await
            }
            IntentOutcome::Task(1) => {
                println!("[Agent] 识别到标准任务，任务ID: 1");
                self.run_clarified_lookup(prompt, output_path, prompter, false)
                    .await
            }
            IntentOutcome::Task(n) => {
                println!("[Agent] 识别到标准任务，任务ID: {}", n);
                println!("[Agent] 任务 {} 尚未实现。", n);
                QueryStatus::Failed(-1)
            }
            IntentOutcome::Irrelevant => {
                println!("[Agent] 识别到无关查询，拒绝处理");
                QueryStatus::Irrelevant
            }
        }
    }

    /// 澄清路径的外层：检查输出路径、映射内部结果与错误
    async fn run_clarified_lookup(
        &self,
        prompt: &str,
        output_path: Option<&Path>,
        prompter: &mut dyn UserPrompt,
        via_ambiguous: bool,
    ) -> QueryStatus {
        let Some(output_path) = output_path else {
            println!("[错误] 需要提供输出路径用于保存结果。");
            return QueryStatus::Failed(-1);
        };

        match self.clarify_and_lookup(prompt, output_path, prompter).await {
            Ok(ClarifyReport::Hit) => {
                if via_ambiguous {
                    QueryStatus::Clarified
                } else {
                    QueryStatus::Completed
                }
            }
            // 未命中时占位文本已写入文件，但整体仍报失败（保留双重信号）
            Ok(ClarifyReport::Miss) => QueryStatus::Failed(-1),
            Ok(ClarifyReport::Aborted) | Ok(ClarifyReport::Exhausted) => QueryStatus::Failed(-1),
            Err(e) => {
                println!("[错误] 处理查询时发生错误: {}", e);
                tracing::warn!(error = %e, "澄清路径失败");
                QueryStatus::Failed(-1)
            }
        }
    }

    /// 知识库问答（交互式澄清模式）：澄清 → 查库 → 写文件
    async fn clarify_and_lookup(
        &self,
        prompt: &str,
        output_path: &Path,
        prompter: &mut dyn UserPrompt,
    ) -> Result<ClarifyReport, AgentError> {
        println!("\n[Agent] 执行知识库问答 (交互式澄清模式)...");

        let clarify = ClarifyLoop::new(self.llm.as_ref(), &self.known_terms, self.max_clarify_rounds);
        let final_term = match clarify.run(prompt, prompter).await? {
            ClarifyOutcome::Resolved(term) => term,
            ClarifyOutcome::Aborted => return Ok(ClarifyReport::Aborted),
            ClarifyOutcome::Exhausted => return Ok(ClarifyReport::Exhausted),
        };

        println!("[Agent] 步骤 2/3: 查询知识库...");
        let knowledge_text = self.knowledge.query(&[(final_term, 1.0)]);

        println!("[Agent] 步骤 3/3: 写入文件...");
        files::write_result(output_path, &knowledge_text)?;

        if knowledge_text == knowledge::NOT_FOUND_TEXT {
            println!("[Agent] 知识库中无此信息，已将提示写入文件。");
            Ok(ClarifyReport::Miss)
        } else {
            println!("[Agent] 成功！结果已写入: {}", output_path.display());
            Ok(ClarifyReport::Hit)
        }
    }
}
