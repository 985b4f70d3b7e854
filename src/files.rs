//! 文件读写辅助
//!
//! 读取用户上传文件并拼接为单个字符串；将查询结果写入输出文件。
//! 读失败按文件降级为占位行，写失败对当前操作是致命的。

use std::path::{Path, PathBuf};

use crate::error::AgentError;

/// 读取多个文本文件并拼接，每个文件带来源头
///
/// 不可读的文件以占位行内联替代，不中断整体读取。
pub fn read_files_to_string(file_paths: &[PathBuf]) -> String {
    if file_paths.is_empty() {
        return String::new();
    }

    let mut parts = Vec::with_capacity(file_paths.len());
    for path in file_paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        match std::fs::read_to_string(path) {
            Ok(content) => parts.push(format!("--- 文件: {} ---\n{}", name, content)),
            Err(e) => parts.push(format!("--- 无法读取文件: {}, 错误: {} ---", name, e)),
        }
    }
    parts.join("\n\n")
}

/// 将结果文本以 UTF-8 写入输出路径，按需创建父目录
pub fn write_result(output_path: &Path, content: &str) -> Result<(), AgentError> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AgentError::OutputWrite(format!("{}: {}", parent.display(), e)))?;
        }
    }
    std::fs::write(output_path, content)
        .map_err(|e| AgentError::OutputWrite(format!("{}: {}", output_path.display(), e)))
}
