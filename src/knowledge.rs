//! 知识库抽象与实现
//!
//! 统一的 query 接口：传入 (关键词, 权重) 列表，返回解释文本。
//! 当前只消费首个关键词，权重在接口中保留（前向兼容多词加权查询）。
//! 后端在构造时一次性选定并以句柄注入调度器，不做全局单例。

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::{KnowledgeBackend, KnowledgeSection};

/// 查无此词时写入结果文件的固定文本
pub const NOT_FOUND_TEXT: &str = "抱歉，关于您提到的知识，我的知识库中暂无相关信息。";
/// 空关键词列表的固定文本
pub const EMPTY_QUERY_TEXT: &str = "抱歉，未能识别出有效查询关键词。";
/// API 后端占位文本（契约已定义，实现留空）
pub const API_STUB_TEXT: &str = "API知识库功能尚未实现";

/// 知识库接口：唯一能力是按关键词查询解释文本
pub trait KnowledgeBase: Send + Sync {
    /// 查询知识库。只消费首个关键词；空列表返回 EMPTY_QUERY_TEXT，
    /// 未命中返回 NOT_FOUND_TEXT，均不是错误。
    fn query(&self, keywords_with_weights: &[(String, f32)]) -> String;
}

fn lookup(data: &HashMap<String, String>, keywords: &[(String, f32)]) -> String {
    tracing::debug!(?keywords, "查询知识库");
    match keywords.first() {
        Some((term, _weight)) => data
            .get(term)
            .cloned()
            .unwrap_or_else(|| NOT_FOUND_TEXT.to_string()),
        None => EMPTY_QUERY_TEXT.to_string(),
    }
}

/// 内存知识库（默认后端），预置少量领域词条
pub struct MemoryKnowledgeBase {
    data: HashMap<String, String>,
}

impl MemoryKnowledgeBase {
    pub fn new(data: HashMap<String, String>) -> Self {
        Self { data }
    }
}

impl Default for MemoryKnowledgeBase {
    fn default() -> Self {
        let data = HashMap::from([
            (
                "土壤湿度".to_string(),
                "土壤湿度是影响微波后向散射系数的关键地表参数之一。通常，湿度越高，介电常数越大，导致更强的雷达回波信号。".to_string(),
            ),
            (
                "RSHub".to_string(),
                "RSHub是一个集成了多种微波遥感模型的平台，用户可以通过Python脚本调用其工具链，进行正向模拟和数据分析。".to_string(),
            ),
            (
                "微波遥感".to_string(),
                "微波遥感利用微波波段的电磁波来探测地表信息，其优势在于能够穿透云雾，实现全天时全天候观测。".to_string(),
            ),
            (
                "地表粗糙度".to_string(),
                "地表粗糙度描述了地表面的起伏状况，是影响雷达信号散射方向和强度的另一个重要因素。".to_string(),
            ),
        ]);
        Self { data }
    }
}

impl KnowledgeBase for MemoryKnowledgeBase {
    fn query(&self, keywords_with_weights: &[(String, f32)]) -> String {
        lookup(&self.data, keywords_with_weights)
    }
}

/// JSON 文件知识库：构造时整体载入（扁平 string→string 对象，无嵌套）
///
/// 文件缺失或格式错误时降级为空库并告警，不视为致命错误。
pub struct FileKnowledgeBase {
    data: HashMap<String, String>,
}

impl FileKnowledgeBase {
    pub fn load(path: &Path) -> Self {
        let data = match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str::<HashMap<String, String>>(&text) {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!("知识库文件 {} 格式错误（{}），使用空知识库", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) => {
                tracing::warn!("知识库文件 {} 不可读（{}），使用空知识库", path.display(), e);
                HashMap::new()
            }
        };
        Self { data }
    }
}

impl KnowledgeBase for FileKnowledgeBase {
    fn query(&self, keywords_with_weights: &[(String, f32)]) -> String {
        lookup(&self.data, keywords_with_weights)
    }
}

/// API 知识库：契约已定义，查询体未实现，调用恒返回占位文本
pub struct ApiKnowledgeBase {
    api_url: String,
    api_key: Option<String>,
}

impl ApiKnowledgeBase {
    pub fn new(api_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key,
        }
    }
}

impl KnowledgeBase for ApiKnowledgeBase {
    fn query(&self, keywords_with_weights: &[(String, f32)]) -> String {
        // TODO: 接入远程知识服务后替换占位实现
        let _ = (&self.api_key, keywords_with_weights);
        tracing::debug!(url = %self.api_url, "API 知识库尚未实现");
        API_STUB_TEXT.to_string()
    }
}

/// 按 [knowledge] 配置段选定后端，返回可注入的句柄
pub fn backend_from_config(cfg: &KnowledgeSection) -> Box<dyn KnowledgeBase> {
    match cfg.backend {
        KnowledgeBackend::Memory => Box::new(MemoryKnowledgeBase::default()),
        KnowledgeBackend::File => {
            let path = cfg
                .file_path
                .clone()
                .unwrap_or_else(|| PathBuf::from("knowledge_base.json"));
            Box::new(FileKnowledgeBase::load(&path))
        }
        KnowledgeBackend::Api => Box::new(ApiKnowledgeBase::new(
            cfg.api_url.clone().unwrap_or_default(),
            cfg.api_key.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn kw(term: &str) -> Vec<(String, f32)> {
        vec![(term.to_string(), 1.0)]
    }

    #[test]
    fn empty_keywords_returns_sentinel() {
        let kb = MemoryKnowledgeBase::default();
        assert_eq!(kb.query(&[]), EMPTY_QUERY_TEXT);
    }

    #[test]
    fn missing_term_returns_not_found() {
        let kb = MemoryKnowledgeBase::default();
        assert_eq!(kb.query(&kw("不存在的术语")), NOT_FOUND_TEXT);
    }

    #[test]
    fn seeded_term_returns_explanation() {
        let kb = MemoryKnowledgeBase::default();
        let text = kb.query(&kw("土壤湿度"));
        assert!(text.contains("介电常数"));
    }

    #[test]
    fn only_first_keyword_is_consulted() {
        let kb = MemoryKnowledgeBase::default();
        let keywords = vec![
            ("不存在的术语".to_string(), 0.3),
            ("土壤湿度".to_string(), 0.7),
        ];
        assert_eq!(kb.query(&keywords), NOT_FOUND_TEXT);
    }

    #[test]
    fn file_backend_round_trip() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, r#"{{"植被指数": "植被指数反映地表植被覆盖状况。"}}"#).unwrap();

        let kb = FileKnowledgeBase::load(f.path());
        assert_eq!(kb.query(&kw("植被指数")), "植被指数反映地表植被覆盖状况。");
        assert_eq!(kb.query(&kw("土壤湿度")), NOT_FOUND_TEXT);
    }

    #[test]
    fn missing_file_degrades_to_empty() {
        let kb = FileKnowledgeBase::load(Path::new("/nonexistent/kb.json"));
        assert_eq!(kb.query(&kw("土壤湿度")), NOT_FOUND_TEXT);
    }

    #[test]
    fn malformed_json_degrades_to_empty() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{{ not json").unwrap();

        let kb = FileKnowledgeBase::load(f.path());
        assert_eq!(kb.query(&kw("RSHub")), NOT_FOUND_TEXT);
    }

    #[test]
    fn api_backend_is_a_stub() {
        let kb = ApiKnowledgeBase::new("https://api.example.com/knowledge", None);
        assert_eq!(kb.query(&kw("土壤湿度")), API_STUB_TEXT);
    }
}
