//! 程序配置
//!
//! - `Config`：运行环境配置，默认值 + 环境变量覆盖
//! - `ProcessingConfig`：图纸处理的等待时间参数，以 XML 文件持久化

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 运行日志目录
    pub log_dir: PathBuf,
    /// 处理参数配置文件（XML）
    pub processing_config_file: PathBuf,
    /// 批处理任务清单（TOML）
    pub job_file: PathBuf,
    /// 无界面控制台宿主程序
    pub host_program: String,
    /// 宿主程序在图纸路径之前的参数
    pub host_args: Vec<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 日志缓冲多少行后写盘
    pub log_flush_threshold: usize,
    /// 日志定时写盘间隔（秒）
    pub log_flush_interval_secs: u64,
    /// 处理结果报告输出（JSON），为空则不输出
    pub report_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            processing_config_file: PathBuf::from("ProcessingConfig.xml"),
            job_file: PathBuf::from("job.toml"),
            host_program: "accoreconsole".to_string(),
            host_args: vec!["/i".to_string()],
            verbose_logging: false,
            log_flush_threshold: 10,
            log_flush_interval_secs: 5,
            report_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            log_dir: std::env::var("LOG_DIR").map(PathBuf::from).unwrap_or(default.log_dir),
            processing_config_file: std::env::var("PROCESSING_CONFIG_FILE").map(PathBuf::from).unwrap_or(default.processing_config_file),
            job_file: std::env::var("JOB_FILE").map(PathBuf::from).unwrap_or(default.job_file),
            host_program: std::env::var("HOST_PROGRAM").unwrap_or(default.host_program),
            host_args: std::env::var("HOST_ARGS").map(|v| v.split_whitespace().map(str::to_string).collect()).unwrap_or(default.host_args),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            log_flush_threshold: std::env::var("LOG_FLUSH_THRESHOLD").ok().and_then(|v| v.parse().ok()).unwrap_or(default.log_flush_threshold),
            log_flush_interval_secs: std::env::var("LOG_FLUSH_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.log_flush_interval_secs),
            report_file: std::env::var("REPORT_FILE").ok().filter(|v| !v.is_empty()).map(PathBuf::from).or(default.report_file),
        }
    }

    pub fn log_flush_interval(&self) -> Duration {
        Duration::from_secs(self.log_flush_interval_secs)
    }
}

/// 可执行文件所在目录下的 `Logs`
fn default_log_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Logs")
}

/// 图纸处理参数
///
/// 宿主的异步操作没有同步完成信号时，每一步之后按这里的时长等待。
/// 数值不做范围校验，负数原样保存，用作等待时长时按 0 处理。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename = "ProcessingConfig")]
pub struct ProcessingConfig {
    #[serde(rename = "DocumentActivationDelayMs")]
    pub document_activation_delay_ms: i32,
    #[serde(rename = "LispLoadDelayMs")]
    pub lisp_load_delay_ms: i32,
    #[serde(rename = "CommandExecutionDelayMs")]
    pub command_execution_delay_ms: i32,
    #[serde(rename = "SaveDelayMs")]
    pub save_delay_ms: i32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            document_activation_delay_ms: 50,
            lisp_load_delay_ms: 150,
            command_execution_delay_ms: 150,
            save_delay_ms: 300,
        }
    }
}

impl ProcessingConfig {
    /// 从 XML 文件加载配置
    ///
    /// 文件不存在或无法解析时返回默认值，不报告错误。
    pub fn load_from_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("处理参数文件不可读，使用默认值 ({}): {}", path.display(), e);
                return Self::default();
            }
        };

        match quick_xml::de::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                debug!("处理参数文件解析失败，使用默认值 ({}): {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// 保存配置到 XML 文件，失败时忽略
    pub fn save_to_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let xml = match quick_xml::se::to_string(self) {
            Ok(xml) => xml,
            Err(e) => {
                debug!("处理参数序列化失败: {}", e);
                return;
            }
        };

        if let Err(e) = fs::write(path, xml) {
            debug!("处理参数保存失败 ({}): {}", path.display(), e);
        }
    }

    pub fn document_activation_delay(&self) -> Duration {
        millis(self.document_activation_delay_ms)
    }

    pub fn lisp_load_delay(&self) -> Duration {
        millis(self.lisp_load_delay_ms)
    }

    pub fn command_execution_delay(&self) -> Duration {
        millis(self.command_execution_delay_ms)
    }

    pub fn save_delay(&self) -> Duration {
        millis(self.save_delay_ms)
    }
}

fn millis(ms: i32) -> Duration {
    Duration::from_millis(ms.max(0) as u64)
}
