//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `RS_AGENT__*` 覆盖
//! （双下划线表示嵌套，如 `RS_AGENT__LLM__MODEL=deepseek-v3-250324`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub knowledge: KnowledgeSection,
}

/// [app] 段：输出目录、澄清轮数上限、标准术语表
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// 结果文件输出目录，未设置时用 ./output
    pub output_dir: Option<PathBuf>,
    /// 交互式澄清的最大轮数，超过则以失败终止
    #[serde(default = "default_max_clarify_rounds")]
    pub max_clarify_rounds: usize,
    /// 已知的标准技术术语表，会话期间只读
    #[serde(default = "default_known_terms")]
    pub known_terms: Vec<String>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            output_dir: None,
            max_clarify_rounds: default_max_clarify_rounds(),
            known_terms: default_known_terms(),
        }
    }
}

fn default_max_clarify_rounds() -> usize {
    5
}

fn default_known_terms() -> Vec<String> {
    vec![
        "土壤湿度".into(),
        "RSHub".into(),
        "微波遥感".into(),
        "地表粗糙度".into(),
        "植被指数".into(),
        "后向散射系数".into(),
    ]
}

/// [llm] 段：OpenAI 兼容端点、模型与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// OpenAI 兼容 API 的 base_url（默认火山方舟端点）
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// 存放 API Key 的环境变量名
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// 单次请求超时（秒），超时即失败，不重试
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://ark.cn-beijing.volces.com/api/v3".to_string()
}

fn default_model() -> String {
    "deepseek-v3-250324".to_string()
}

fn default_api_key_env() -> String {
    "ARK_API_KEY".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

/// [knowledge] 段：知识库后端选择
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct KnowledgeSection {
    /// 后端类型，构造时一次性选定
    pub backend: KnowledgeBackend,
    /// file 后端的 JSON 文件路径
    pub file_path: Option<PathBuf>,
    /// api 后端的地址与鉴权
    pub api_url: Option<String>,
    pub api_key: Option<String>,
}

/// 知识库后端变体（取代按字符串标签的运行时分发）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeBackend {
    #[default]
    Memory,
    File,
    Api,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            llm: LlmSection::default(),
            knowledge: KnowledgeSection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 RS_AGENT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 RS_AGENT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("RS_AGENT")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_known_terms() {
        let cfg = AppConfig::default();
        assert!(cfg.app.known_terms.iter().any(|t| t == "土壤湿度"));
        assert_eq!(cfg.app.max_clarify_rounds, 5);
        assert_eq!(cfg.knowledge.backend, KnowledgeBackend::Memory);
    }
}
