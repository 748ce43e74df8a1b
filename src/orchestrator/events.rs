//! 批处理事件与取消
//!
//! 批处理任务通过有序通道把进度推送给界面层，每次更新一条消息。

use crate::workflow::OutcomeClass;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 批处理任务发出的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// 即将处理第 `position` 张（从1开始）
    Progress {
        position: usize,
        total: usize,
        drawing_name: String,
    },
    /// 第 `index` 张（从0开始）处理结束
    ItemUpdated {
        index: usize,
        status: String,
        detail: String,
        class: OutcomeClass,
    },
    /// 批处理结束
    Finished {
        processed: usize,
        total: usize,
        log_path: PathBuf,
        outcome: RunOutcome,
    },
}

/// 批处理的结束方式
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// 全部图纸都已尝试
    Completed,
    /// 用户取消，剩余图纸保持待处理
    Cancelled,
    /// 不可恢复的错误中止了批处理
    Aborted(String),
}

/// 进度百分比（向下取整）
pub fn percentage(position: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (position * 100 / total) as u32
}

/// 协作式取消标记
///
/// 克隆共享同一个标记；批处理在每张图纸开始前检查一次。
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_down() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 66);
        assert_eq!(percentage(3, 3), 100);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn clones_share_cancellation() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }
}
