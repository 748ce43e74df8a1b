//! 图纸处理上下文
//!
//! 封装"我正在处理队列中第几张图纸"这一信息

use crate::models::drawing_result::file_name;
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// 图纸处理上下文
#[derive(Debug, Clone)]
pub struct DrawingCtx {
    /// 在队列中的下标（从0开始）
    pub index: usize,

    /// 队列总数
    pub total: usize,

    /// 图纸路径
    pub path: PathBuf,

    /// 文件名（用于日志）
    pub drawing_name: String,
}

impl DrawingCtx {
    pub fn new(index: usize, total: usize, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self {
            index,
            total,
            path: path.to_path_buf(),
            drawing_name: file_name(path),
        }
    }

    /// 从1开始的序号
    pub fn position(&self) -> usize {
        self.index + 1
    }
}

impl Display for DrawingCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[图纸 {}/{} {}]",
            self.position(),
            self.total,
            self.drawing_name
        )
    }
}
