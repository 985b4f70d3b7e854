//! 交互式术语澄清循环（核心状态机）
//!
//! 针对固定标准术语表对用户的模糊提问做多轮消歧：每轮一次 LLM 调用，
//! 模糊时向用户出示 2-3 个候选并阻塞等待一行输入。严格按轮次、单线程，
//! 任一时刻至多一个未完成的 LLM 请求，两轮消歧不会重叠。
//!
//! 终止条件：术语澄清成功（Resolved）、用户输入中止关键词（Aborted）、
//! 轮数耗尽（Exhausted），或 LLM 调用/解析失败（Err，调用方丢弃全部
//! 中间状态，不写任何输出）。

use serde::Deserialize;

use crate::error::AgentError;
use crate::llm::{extract_json, LlmClient, Message};

/// 中止关键词（不区分大小写）
pub const ABORT_KEYWORDS: &[&str] = &["退出", "exit", "quit"];

/// 澄清循环的终态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClarifyOutcome {
    /// 澄清成功，携带最终标准术语
    Resolved(String),
    /// 用户主动中止
    Aborted,
    /// 轮数耗尽仍未消歧
    Exhausted,
}

/// 每轮 LLM 返回的澄清结果（固定 JSON 约定）
///
/// 约定：is_ambiguous 为 false 时 corrected_term 必填；
/// 为 true 时 suggestions 必填且非空，两者互斥。
#[derive(Debug, Clone, Deserialize)]
pub struct Clarification {
    pub is_ambiguous: bool,
    pub original_term: String,
    #[serde(default)]
    pub corrected_term: Option<String>,
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
}

/// 校验后的单轮判定
#[derive(Debug, Clone)]
pub enum Decision {
    /// 不模糊：已得到标准术语
    Resolved(String),
    /// 模糊：需出示候选并等待用户选择
    Ambiguous {
        original_term: String,
        suggestions: Vec<String>,
    },
}

impl Clarification {
    /// 执行字段互斥校验，违反约定视为澄清失败
    ///
    /// corrected_term 与 suggestions 必须恰好填一个（由 is_ambiguous 决定），
    /// 候选数上限为 3。
    pub fn into_decision(self) -> Result<Decision, AgentError> {
        if self.is_ambiguous {
            if self.corrected_term.is_some() {
                return Err(AgentError::SchemaViolation(
                    "is_ambiguous=true 但同时给出了 corrected_term".to_string(),
                ));
            }
            match self.suggestions {
                Some(suggestions) if suggestions.is_empty() => Err(AgentError::SchemaViolation(
                    "is_ambiguous=true 但 suggestions 为空".to_string(),
                )),
                Some(suggestions) if suggestions.len() > 3 => Err(AgentError::SchemaViolation(
                    format!("suggestions 超过 3 个候选: {}", suggestions.len()),
                )),
                Some(suggestions) => Ok(Decision::Ambiguous {
                    original_term: self.original_term,
                    suggestions,
                }),
                None => Err(AgentError::SchemaViolation(
                    "is_ambiguous=true 但缺少 suggestions".to_string(),
                )),
            }
        } else {
            if self.suggestions.is_some() {
                return Err(AgentError::SchemaViolation(
                    "is_ambiguous=false 但同时给出了 suggestions".to_string(),
                ));
            }
            match self.corrected_term {
                Some(term) => Ok(Decision::Resolved(term)),
                None => Err(AgentError::SchemaViolation(
                    "is_ambiguous=false 但缺少 corrected_term".to_string(),
                )),
            }
        }
    }
}

/// 用户输入来源：AWAITING_USER_CHOICE 状态下阻塞读一行
///
/// 生产实现读 stdin；测试用脚本实现，保证并行测试隔离。
pub trait UserPrompt {
    fn read_choice(&mut self) -> std::io::Result<String>;
}

/// 标准输入实现：人机节奏，无超时
pub struct StdinPrompt;

impl UserPrompt for StdinPrompt {
    fn read_choice(&mut self) -> std::io::Result<String> {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

/// 脚本输入实现（测试用）：按顺序吐出预置选择
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    inputs: std::collections::VecDeque<String>,
}

impl ScriptedPrompt {
    pub fn new(inputs: Vec<impl Into<String>>) -> Self {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
        }
    }
}

impl UserPrompt for ScriptedPrompt {
    fn read_choice(&mut self) -> std::io::Result<String> {
        self.inputs.pop_front().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "scripted inputs exhausted")
        })
    }
}

/// 澄清循环：持有 LLM 句柄、标准术语表与轮数上限
pub struct ClarifyLoop<'a> {
    llm: &'a dyn LlmClient,
    known_terms: &'a [String],
    max_rounds: usize,
}

impl<'a> ClarifyLoop<'a> {
    pub fn new(llm: &'a dyn LlmClient, known_terms: &'a [String], max_rounds: usize) -> Self {
        Self {
            llm,
            known_terms,
            max_rounds,
        }
    }

    /// 运行澄清循环直至终态
    ///
    /// 循环状态只有两个可变量：当前输入与上一轮的澄清轨迹（历史上下文），
    /// 两者随每轮更新并随每次 LLM 调用整体重发（LLM 端不保存会话状态）。
    /// 返回 Err 表示 LLM 调用失败或响应违反 JSON 约定，调用方不得写出任何结果。
    pub async fn run(
        &self,
        initial_input: &str,
        prompter: &mut dyn UserPrompt,
    ) -> Result<ClarifyOutcome, AgentError> {
        let system_prompt = self.system_prompt();
        let mut current_input = initial_input.to_string();
        let mut prior_context = String::new();

        for round in 1..=self.max_rounds {
            println!("{}", "-".repeat(20));
            println!("[Agent] 正在分析用户输入: '{}'", current_input);
            tracing::debug!(round, %current_input, "澄清循环新一轮");

            let user_content = format!(
                "用户当前输入: '{}'\n\n历史澄清上下文:\n{}",
                current_input,
                if prior_context.is_empty() {
                    "无"
                } else {
                    prior_context.as_str()
                }
            );
            let messages = vec![
                Message::system(system_prompt.clone()),
                Message::user(user_content),
            ];

            let output = self
                .llm
                .complete(&messages)
                .await
                .map_err(AgentError::Llm)?;
            tracing::debug!(%output, "澄清循环原始输出");

            let json = extract_json(&output).ok_or_else(|| {
                AgentError::JsonParse(format!("澄清响应中没有 JSON: {}", output))
            })?;
            let clarification: Clarification = serde_json::from_str(json)
                .map_err(|e| AgentError::JsonParse(format!("{}: {}", e, json)))?;

            match clarification.into_decision()? {
                Decision::Resolved(term) => {
                    println!("[Agent] 意图已澄清。识别出的标准术语为: '{}'", term);
                    return Ok(ClarifyOutcome::Resolved(term));
                }
                Decision::Ambiguous {
                    original_term,
                    suggestions,
                } => {
                    println!("\n[Agent] 您的提问 '{}' 似乎有些模糊。", original_term);
                    println!("您是不是想询问以下某个概念？");
                    for (i, term) in suggestions.iter().enumerate() {
                        println!("  {}. {}", i + 1, term);
                    }
                    println!("请直接输入您想查询的词语，或者输入序号，或输入'退出'来中止查询。");
                    print!("您的选择: ");
                    use std::io::Write;
                    if let Err(e) = std::io::stdout().flush() {
                        tracing::debug!("stdout flush 失败: {}", e);
                    }

                    let choice = prompter
                        .read_choice()
                        .map_err(|e| AgentError::Input(e.to_string()))?;
                    let choice = choice.trim().to_string();

                    if is_abort(&choice) {
                        println!("[Agent] 用户中止查询。");
                        return Ok(ClarifyOutcome::Aborted);
                    }

                    // 合法序号取对应候选；其余一律按自由重输处理，不做术语表校验
                    current_input = match choice.parse::<usize>() {
                        Ok(i) if (1..=suggestions.len()).contains(&i) => {
                            suggestions[i - 1].clone()
                        }
                        _ => choice,
                    };

                    prior_context = format!(
                        "上一轮识别到模糊词 '{}', 提供了选项 {:?}, 用户选择了 '{}'.",
                        original_term, suggestions, current_input
                    );
                }
            }
        }

        println!(
            "[Agent] 澄清轮数已达上限（{} 轮），仍无法确定术语，终止查询。",
            self.max_rounds
        );
        Ok(ClarifyOutcome::Exhausted)
    }

    fn system_prompt(&self) -> String {
        format!(
            r#"你是一个微波遥感领域的专家助手。你的任务是帮助用户澄清他们模糊的提问。
已知的标准技术术语列表为: {:?}
请分析用户的提问，并遵循以下规则：
1. 识别用户提问中的核心技术术语。
2. 将该术语与已知的标准技术术语列表进行比对。
3. 如果用户的术语是标准术语之一，或者是非常明确的同义词（例如"RSHub使用" -> "RSHub"），请判定为不模糊。
4. 如果用户的术语是模糊的、有错别字或不在列表中（例如"土地湿度"），请判定为模糊，并从标准列表中提供最相关的2-3个建议，建议只能取自标准术语列表。
5. 如果用户提供了之前的澄清上下文，请优先在上次建议的范围内进行判断。
你必须严格按照以下 JSON 格式输出，不要添加任何额外的解释：
{{"is_ambiguous": <true|false>, "original_term": "<原始术语>", "corrected_term": "<标准术语，仅在不模糊时给出>", "suggestions": ["<标准术语>", ...]（仅在模糊时给出）}}
is_ambiguous 为 false 时必须给出 corrected_term 且不给 suggestions；
is_ambiguous 为 true 时必须给出 2-3 个 suggestions 且不给 corrected_term。"#,
            self.known_terms
        )
    }
}

/// 是否命中中止关键词（不区分大小写）
pub fn is_abort(input: &str) -> bool {
    let lower = input.trim().to_lowercase();
    ABORT_KEYWORDS.iter().any(|k| lower == *k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    fn terms() -> Vec<String> {
        vec![
            "土壤湿度".to_string(),
            "微波遥感".to_string(),
            "地表粗糙度".to_string(),
        ]
    }

    fn ambiguous_reply() -> String {
        r#"{"is_ambiguous": true, "original_term": "土地湿度", "suggestions": ["土壤湿度", "地表粗糙度"]}"#
            .to_string()
    }

    fn resolved_reply(term: &str) -> String {
        format!(
            r#"{{"is_ambiguous": false, "original_term": "{0}", "corrected_term": "{0}"}}"#,
            term
        )
    }

    #[test]
    fn decision_requires_corrected_term_when_unambiguous() {
        let c = Clarification {
            is_ambiguous: false,
            original_term: "土壤湿度".into(),
            corrected_term: None,
            suggestions: None,
        };
        assert!(matches!(
            c.into_decision(),
            Err(AgentError::SchemaViolation(_))
        ));
    }

    #[test]
    fn decision_requires_suggestions_when_ambiguous() {
        let c = Clarification {
            is_ambiguous: true,
            original_term: "土地湿度".into(),
            corrected_term: None,
            suggestions: Some(vec![]),
        };
        assert!(matches!(
            c.into_decision(),
            Err(AgentError::SchemaViolation(_))
        ));
    }

    #[test]
    fn decision_rejects_both_fields_when_unambiguous() {
        let c = Clarification {
            is_ambiguous: false,
            original_term: "土地湿度".into(),
            corrected_term: Some("土壤湿度".into()),
            suggestions: Some(vec!["土壤湿度".into(), "地表粗糙度".into()]),
        };
        assert!(matches!(
            c.into_decision(),
            Err(AgentError::SchemaViolation(_))
        ));
    }

    #[test]
    fn decision_rejects_both_fields_when_ambiguous() {
        let c = Clarification {
            is_ambiguous: true,
            original_term: "土地湿度".into(),
            corrected_term: Some("土壤湿度".into()),
            suggestions: Some(vec!["土壤湿度".into(), "地表粗糙度".into()]),
        };
        assert!(matches!(
            c.into_decision(),
            Err(AgentError::SchemaViolation(_))
        ));
    }

    #[test]
    fn decision_rejects_more_than_three_suggestions() {
        let c = Clarification {
            is_ambiguous: true,
            original_term: "土地湿度".into(),
            corrected_term: None,
            suggestions: Some(vec![
                "土壤湿度".into(),
                "地表粗糙度".into(),
                "微波遥感".into(),
                "植被指数".into(),
            ]),
        };
        assert!(matches!(
            c.into_decision(),
            Err(AgentError::SchemaViolation(_))
        ));
    }

    #[test]
    fn abort_keywords_are_case_insensitive() {
        assert!(is_abort("退出"));
        assert!(is_abort("QUIT"));
        assert!(is_abort("  Exit "));
        assert!(!is_abort("继续"));
        assert!(!is_abort("1"));
    }

    #[tokio::test]
    async fn known_term_resolves_in_one_round() {
        let llm = MockLlmClient::with_replies(vec![resolved_reply("土壤湿度")]);
        let known = terms();
        let clarify = ClarifyLoop::new(&llm, &known, 5);
        let mut prompter = ScriptedPrompt::default();

        let outcome = clarify.run("什么是土壤湿度？", &mut prompter).await.unwrap();
        assert_eq!(outcome, ClarifyOutcome::Resolved("土壤湿度".to_string()));
        assert_eq!(llm.user_contents().len(), 1);
    }

    #[tokio::test]
    async fn index_choice_feeds_suggestion_verbatim() {
        let llm =
            MockLlmClient::with_replies(vec![ambiguous_reply(), resolved_reply("土壤湿度")]);
        let known = terms();
        let clarify = ClarifyLoop::new(&llm, &known, 5);
        let mut prompter = ScriptedPrompt::new(vec!["1"]);

        let outcome = clarify.run("土地湿度是什么？", &mut prompter).await.unwrap();
        assert_eq!(outcome, ClarifyOutcome::Resolved("土壤湿度".to_string()));

        // 第二轮的当前输入必须与候选文本逐字节一致，且轨迹带入上下文
        let requests = llm.user_contents();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].contains("用户当前输入: '土壤湿度'"));
        assert!(requests[1].contains("上一轮识别到模糊词 '土地湿度'"));
        assert!(requests[1].contains("用户选择了 '土壤湿度'"));
    }

    #[tokio::test]
    async fn freeform_input_is_passed_through_unvalidated() {
        let llm =
            MockLlmClient::with_replies(vec![ambiguous_reply(), resolved_reply("微波遥感")]);
        let known = terms();
        let clarify = ClarifyLoop::new(&llm, &known, 5);
        // 既不是序号也不是中止词，按原文重新提问（包括越界序号）
        let mut prompter = ScriptedPrompt::new(vec!["微波传感器"]);

        let outcome = clarify.run("土地湿度是什么？", &mut prompter).await.unwrap();
        assert_eq!(outcome, ClarifyOutcome::Resolved("微波遥感".to_string()));
        assert!(llm.user_contents()[1].contains("用户当前输入: '微波传感器'"));
    }

    #[tokio::test]
    async fn out_of_range_index_is_freeform() {
        let llm =
            MockLlmClient::with_replies(vec![ambiguous_reply(), resolved_reply("土壤湿度")]);
        let known = terms();
        let clarify = ClarifyLoop::new(&llm, &known, 5);
        let mut prompter = ScriptedPrompt::new(vec!["9"]);

        clarify.run("土地湿度是什么？", &mut prompter).await.unwrap();
        assert!(llm.user_contents()[1].contains("用户当前输入: '9'"));
    }

    #[tokio::test]
    async fn abort_terminates_loop() {
        let llm = MockLlmClient::with_replies(vec![ambiguous_reply()]);
        let known = terms();
        let clarify = ClarifyLoop::new(&llm, &known, 5);
        let mut prompter = ScriptedPrompt::new(vec!["退出"]);

        let outcome = clarify.run("土地湿度是什么？", &mut prompter).await.unwrap();
        assert_eq!(outcome, ClarifyOutcome::Aborted);
    }

    #[tokio::test]
    async fn rounds_exhausted_terminates_loop() {
        let llm = MockLlmClient::with_replies(vec![ambiguous_reply(), ambiguous_reply()]);
        let known = terms();
        let clarify = ClarifyLoop::new(&llm, &known, 2);
        let mut prompter = ScriptedPrompt::new(vec!["微波传感器", "微波传感器"]);

        let outcome = clarify.run("土地湿度是什么？", &mut prompter).await.unwrap();
        assert_eq!(outcome, ClarifyOutcome::Exhausted);
    }

    #[tokio::test]
    async fn malformed_response_is_an_error() {
        let llm = MockLlmClient::with_replies(vec!["这个词不太清楚，你能再说说吗？"]);
        let known = terms();
        let clarify = ClarifyLoop::new(&llm, &known, 5);
        let mut prompter = ScriptedPrompt::default();

        let err = clarify
            .run("土地湿度是什么？", &mut prompter)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::JsonParse(_)));
    }

    #[tokio::test]
    async fn schema_violation_is_an_error() {
        // 合法 JSON，但 is_ambiguous=true 却没有 suggestions
        let llm = MockLlmClient::with_replies(vec![
            r#"{"is_ambiguous": true, "original_term": "土地湿度"}"#,
        ]);
        let known = terms();
        let clarify = ClarifyLoop::new(&llm, &known, 5);
        let mut prompter = ScriptedPrompt::default();

        let err = clarify
            .run("土地湿度是什么？", &mut prompter)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::SchemaViolation(_)));
    }
}
