use crate::error::SetupError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 批处理任务：对一组图纸执行同一个脚本/命令
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchJob {
    /// 脚本文件（.lsp）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<PathBuf>,
    /// 命令表达式
    #[serde(default)]
    pub command: String,
    /// 处理后关闭并放弃文档
    #[serde(default)]
    pub close_after: bool,
    /// 显式列出的图纸
    #[serde(default)]
    pub drawings: Vec<PathBuf>,
    /// 扫描该目录下的 .dwg 文件追加到图纸列表
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawing_folder: Option<PathBuf>,
}

impl BatchJob {
    /// 有效的脚本路径（空路径视为未设置）
    pub fn script_path(&self) -> Option<&PathBuf> {
        self.script.as_ref().filter(|p| !p.as_os_str().is_empty())
    }

    /// 有效的命令（全空白视为未设置）
    pub fn command(&self) -> Option<&str> {
        let command = self.command.trim();
        (!command.is_empty()).then_some(command)
    }

    /// 运行前检查
    ///
    /// # 参数
    /// - `drawing_count`: 队列中的图纸数量
    pub fn validate(&self, drawing_count: usize) -> Result<(), SetupError> {
        if drawing_count == 0 {
            return Err(SetupError::NoDrawings);
        }
        if self.command().is_some() && self.script_path().is_none() {
            return Err(SetupError::ScriptRequired);
        }
        Ok(())
    }
}
