use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 结果状态：处理失败
pub const ERROR_STATUS: &str = "ERROR";

/// 单张图纸的处理结果
///
/// 加入队列时创建（待处理状态），处理完成时由批处理器更新一次。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawingResult {
    /// 文件名
    pub drawing_name: String,
    /// 完整路径
    pub drawing_path: PathBuf,
    /// 状态词（输出的第一个单词，或 "ERROR"）
    pub result_status: String,
    /// 其余输出
    pub result_message: String,
    pub is_processed: bool,
    pub has_error: bool,
    /// 处理耗时
    #[serde(with = "duration_millis")]
    pub processing_time: Duration,
}

impl DrawingResult {
    /// 为待处理的图纸创建结果
    pub fn pending(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self {
            drawing_name: file_name(path),
            drawing_path: path.to_path_buf(),
            result_status: String::new(),
            result_message: String::new(),
            is_processed: false,
            has_error: false,
            processing_time: Duration::ZERO,
        }
    }

    /// 尚未被处理（既未成功也未失败）
    pub fn is_pending(&self) -> bool {
        !self.is_processed && !self.has_error
    }

    /// 已尝试处理（成功或失败）
    pub fn is_attempted(&self) -> bool {
        !self.is_pending()
    }

    pub fn mark_success(&mut self, status: String, message: String, elapsed: Duration) {
        self.result_status = status;
        self.result_message = message;
        self.is_processed = true;
        self.has_error = false;
        self.processing_time = elapsed;
    }

    pub fn mark_error(&mut self, message: String, elapsed: Duration) {
        self.result_status = ERROR_STATUS.to_string();
        self.result_message = message;
        self.has_error = true;
        self.processing_time = elapsed;
    }
}

/// 取路径中的文件名，没有文件名时退回完整路径
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
