//! 缓冲日志写入服务
//!
//! 只负责"把运行日志写进日志文件"，减少磁盘写入次数：
//! - 日志先进入内存缓冲
//! - 缓冲行数达到阈值时在同一临界区内同步写盘
//! - 后台定时任务周期性写盘
//! - 释放时停止定时任务并做最后一次写盘
//!
//! 写盘失败只记录到 tracing，不影响调用方流程。

use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;

/// 默认写盘阈值（行）
pub const DEFAULT_FLUSH_THRESHOLD: usize = 10;
/// 默认定时写盘间隔
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// 缓冲日志
pub struct BufferedLogger {
    inner: Arc<Inner>,
    disposed: AtomicBool,
    flush_task: Mutex<Option<JoinHandle<()>>>,
}

struct Inner {
    log_file_path: PathBuf,
    buffer: Mutex<Vec<String>>,
    flush_threshold: usize,
}

impl BufferedLogger {
    /// 使用默认阈值和间隔创建
    ///
    /// 必须在 tokio 运行时内调用（定时写盘任务）。
    pub fn new(log_file_path: impl Into<PathBuf>) -> Self {
        Self::with_options(log_file_path, DEFAULT_FLUSH_THRESHOLD, DEFAULT_FLUSH_INTERVAL)
    }

    /// 使用自定义阈值和间隔创建
    pub fn with_options(
        log_file_path: impl Into<PathBuf>,
        flush_threshold: usize,
        flush_interval: Duration,
    ) -> Self {
        let inner = Arc::new(Inner {
            log_file_path: log_file_path.into(),
            buffer: Mutex::new(Vec::new()),
            flush_threshold: flush_threshold.max(1),
        });
        inner.ensure_directory_exists();

        let flush_task = spawn_flush_timer(Arc::clone(&inner), flush_interval);

        Self {
            inner,
            disposed: AtomicBool::new(false),
            flush_task: Mutex::new(Some(flush_task)),
        }
    }

    /// 日志文件路径
    pub fn path(&self) -> &Path {
        &self.inner.log_file_path
    }

    /// 写入一行日志（加时间戳），释放后调用无效
    pub fn log(&self, message: impl AsRef<str>) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }

        let entry = format!(
            "[{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            message.as_ref()
        );

        let mut buffer = self.inner.buffer.lock();
        // dispose 的最后一次写盘也要拿这把锁
        if self.disposed.load(Ordering::Acquire) {
            return;
        }
        buffer.push(entry);
        if buffer.len() >= self.inner.flush_threshold {
            self.inner.flush_locked(&mut buffer);
        }
    }

    /// 立即把缓冲写入文件
    pub fn flush(&self) {
        self.inner.flush();
    }

    /// 当前缓冲中的行数
    pub fn pending(&self) -> usize {
        self.inner.buffer.lock().len()
    }

    /// 停止定时任务，最后写盘一次，之后的 `log` 调用被忽略
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(task) = self.flush_task.lock().take() {
            task.abort();
        }
        self.inner.flush();
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Drop for BufferedLogger {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Inner {
    fn flush(&self) {
        let mut buffer = self.buffer.lock();
        self.flush_locked(&mut buffer);
    }

    /// 一次追加写入所有缓冲行；失败时保留缓冲，下次再写
    fn flush_locked(&self, buffer: &mut Vec<String>) {
        if buffer.is_empty() {
            return;
        }

        let mut chunk = buffer.join("\n");
        chunk.push('\n');

        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)
            .and_then(|mut file| file.write_all(chunk.as_bytes()));

        match result {
            Ok(()) => buffer.clear(),
            Err(e) => warn!(
                "日志写入失败 ({}): {}",
                self.log_file_path.display(),
                e
            ),
        }
    }

    fn ensure_directory_exists(&self) {
        if let Some(dir) = self.log_file_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                if let Err(e) = fs::create_dir_all(dir) {
                    warn!("无法创建日志目录 ({}): {}", dir.display(), e);
                }
            }
        }
    }
}

fn spawn_flush_timer(inner: Arc<Inner>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        // interval 的第一次 tick 立即完成，这里从一个周期之后开始
        let start = tokio::time::Instant::now() + period;
        let mut ticker = tokio::time::interval_at(start, period);
        loop {
            ticker.tick().await;
            inner.flush();
        }
    })
}

/// 生成本次运行的日志文件路径: `{dir}/LispTool_Log_{yyyyMMdd_HHmmss}.txt`
pub fn log_file_path(log_dir: &Path, now: chrono::DateTime<chrono::Local>) -> PathBuf {
    log_dir.join(format!("LispTool_Log_{}.txt", now.format("%Y%m%d_%H%M%S")))
}
