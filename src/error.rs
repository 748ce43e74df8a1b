//! 错误类型
//!
//! 分层对应批处理的错误分类：
//! - `SetupError`：运行前即被拒绝的输入问题，无副作用
//! - `HostError`：宿主文档管理器返回的失败
//! - `OperationError`：单个图纸处理的结果，可恢复或致命
//! - `AppError`：应用层汇总

use std::path::PathBuf;
use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 运行前的输入校验失败
    #[error("任务设置错误: {0}")]
    Setup(#[from] SetupError),

    /// 批处理任务本身崩溃
    #[error("批处理任务异常终止: {0}")]
    Aborted(String),

    /// 文件操作错误
    #[error("文件错误 ({path}): {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 运行前被拒绝的任务输入
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    /// 没有选择任何图纸
    #[error("Please select drawing files first.")]
    NoDrawings,

    /// 提供了命令但没有脚本文件
    #[error("Please select a LISP file first when using commands.")]
    ScriptRequired,
}

/// 宿主文档管理器错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// 打开文档失败
    #[error("Failed to open document: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    /// 激活文档失败
    #[error("Failed to make document current")]
    ActivationFailed,

    /// 获取文档锁失败
    #[error("Failed to lock document: {0}")]
    LockFailed(String),

    /// 发送命令失败
    #[error("Command execution error: {reason}")]
    ExecutionFailed { command: String, reason: String },

    /// 读取结果符号失败
    #[error("Failed to read symbol {name}: {reason}")]
    SymbolFailed { name: String, reason: String },

    /// 保存失败
    #[error("Save failed: {0}")]
    SaveFailed(String),

    /// 关闭失败
    #[error("Close failed: {0}")]
    CloseFailed(String),

    /// 宿主环境已不可用，无法继续处理任何图纸
    #[error("Host unavailable: {0}")]
    Unavailable(String),
}

impl HostError {
    /// 是否为致命错误（中止整个批处理）
    pub fn is_fatal(&self) -> bool {
        matches!(self, HostError::Unavailable(_))
    }
}

/// 单个图纸操作的失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// 可恢复：记录到该图纸的结果上，批处理继续
    #[error("{0}")]
    Recoverable(String),

    /// 致命：中止整个批处理
    #[error("{0}")]
    Fatal(String),
}

impl OperationError {
    pub fn recoverable(message: impl Into<String>) -> Self {
        OperationError::Recoverable(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        OperationError::Fatal(message.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, OperationError::Fatal(_))
    }
}

impl From<HostError> for OperationError {
    fn from(err: HostError) -> Self {
        if err.is_fatal() {
            OperationError::Fatal(err.to_string())
        } else {
            OperationError::Recoverable(err.to_string())
        }
    }
}
