//! 文档宿主 - 基础设施层
//!
//! 宿主持有真正的文档管理器，这里只描述它暴露的能力：
//! 打开、激活、加锁、发送命令、读取结果符号、保存、关闭。

use crate::error::HostError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// 宿主中已打开文档的句柄
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentHandle {
    pub id: u64,
    pub path: PathBuf,
}

impl DocumentHandle {
    pub fn new(id: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }
}

/// 文档宿主能力
///
/// 职责：
/// - 持有宿主资源，只暴露操作文档的能力
/// - 不认识批处理和图纸结果
/// - 命令的执行是否完成由 `reports_completion` 决定能否确认
#[async_trait]
pub trait DocumentHost: Send + Sync {
    /// 打开文档
    async fn open(&self, path: &Path) -> Result<DocumentHandle, HostError>;

    /// 设为当前活动文档
    async fn activate(&self, doc: &DocumentHandle) -> Result<(), HostError>;

    /// 是否为当前活动文档
    async fn is_active(&self, doc: &DocumentHandle) -> Result<bool, HostError>;

    /// 获取文档独占锁
    async fn lock(&self, doc: &DocumentHandle) -> Result<(), HostError>;

    /// 释放文档锁
    async fn unlock(&self, doc: &DocumentHandle) -> Result<(), HostError>;

    /// 发送命令字符串执行
    async fn send_command(&self, doc: &DocumentHandle, command: &str) -> Result<(), HostError>;

    /// 读取命名的结果符号，不存在时返回 `None`
    async fn symbol(&self, doc: &DocumentHandle, name: &str) -> Result<Option<String>, HostError>;

    /// 保存文档
    async fn save(&self, doc: &DocumentHandle) -> Result<(), HostError>;

    /// 关闭并放弃修改
    async fn close(&self, doc: &DocumentHandle) -> Result<(), HostError>;

    /// 宿主能否确认异步操作已完成
    ///
    /// 返回 `false` 时调用方按固定时长等待。
    fn reports_completion(&self) -> bool {
        false
    }

    /// 等待文档上的异步操作全部完成
    async fn wait_until_idle(&self, _doc: &DocumentHandle) -> Result<(), HostError> {
        Ok(())
    }
}
