/// 日志工具模块
///
/// 控制台日志初始化，以及批处理各阶段的日志输出辅助函数
use crate::config::Config;
use crate::models::drawing_result::file_name;
use crate::models::BatchJob;
use crate::orchestrator::RunSummary;
use crate::services::BufferedLogger;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化控制台日志
///
/// `RUST_LOG` 优先；否则默认 `info`，详细模式为 `debug`。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 测试中可能重复初始化
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 图纸批处理模式");
    info!("📁 日志目录: {}", config.log_dir.display());
    info!("🖥️ 宿主程序: {}", config.host_program);
    info!("{}", "=".repeat(60));
}

/// 写入运行日志的会话开头
///
/// # 参数
/// - `run_log`: 运行日志
/// - `job`: 批处理任务
/// - `total`: 图纸总数
pub fn log_session_start(run_log: &BufferedLogger, job: &BatchJob, total: usize) {
    let script = job
        .script_path()
        .map(|p| file_name(p))
        .unwrap_or_else(|| "None".to_string());
    let command = job.command().unwrap_or("None");

    run_log.log("=== LISP Tool Processing Session Started ===");
    run_log.log(format!("LISP File: {}", script));
    run_log.log(format!("Command: {}", command));
    run_log.log(format!("Total Drawings: {}", total));
    run_log.log("================================================");

    info!("✓ 共 {} 张图纸待处理", total);
    info!("📜 脚本: {} | 命令: {}", script, command);
}

/// 打印最终统计信息
///
/// # 参数
/// - `summary`: 批处理统计
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(summary: &RunSummary, log_file_path: &Path) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", summary.succeeded, summary.total);
    info!("❌ 失败: {}", summary.failed);
    info!("⏭️ 未处理: {}", summary.total - summary.processed);
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path.display());
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn truncates_by_chars() {
        assert_eq!(truncate_text("图纸处理完成", 2), "图纸...");
        assert_eq!(truncate_text("short", 10), "short");
    }

    #[tokio::test]
    async fn session_header_names_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let run_log = BufferedLogger::with_options(dir.path().join("run.txt"), 100, Duration::from_secs(3600));
        let job = BatchJob {
            script: Some(PathBuf::from("/tools/count.lsp")),
            command: "(c:count)".into(),
            ..Default::default()
        };

        log_session_start(&run_log, &job, 3);
        run_log.flush();

        let text = std::fs::read_to_string(run_log.path()).unwrap();
        assert!(text.contains("LISP File: count.lsp"));
        assert!(text.contains("Command: (c:count)"));
        assert!(text.contains("Total Drawings: 3"));
    }

    #[tokio::test]
    async fn session_header_without_script() {
        let dir = tempfile::tempdir().unwrap();
        let run_log = BufferedLogger::with_options(dir.path().join("run.txt"), 100, Duration::from_secs(3600));

        log_session_start(&run_log, &BatchJob::default(), 1);
        run_log.flush();

        let text = std::fs::read_to_string(run_log.path()).unwrap();
        assert!(text.contains("LISP File: None"));
        assert!(text.contains("Command: None"));
    }
}
