//! 应用 - 编排层入口
//!
//! ## 职责
//!
//! 1. **应用初始化**：加载处理参数，持有文档宿主
//! 2. **运行前检查**：拒绝空队列、只有命令没有脚本的任务
//! 3. **运行资源**：每次运行创建日志文件、事件通道、界面层
//! 4. **结果输出**：汇总统计，按需写出 JSON 报告
//!
//! 运行日志与事件通道只在一次运行内存在，结束后总会被释放。

use crate::config::{Config, ProcessingConfig};
use crate::error::AppError;
use crate::infrastructure::DocumentHost;
use crate::models::{BatchJob, BatchQueue, DrawingResult};
use crate::orchestrator::batch_processor::{BatchProcessor, RunSummary};
use crate::orchestrator::events::{CancelToken, RunOutcome};
use crate::orchestrator::reporter::{run_reporter, ProgressView};
use crate::services::{log_file_path, BufferedLogger};
use crate::utils::logging;
use crate::workflow::DrawingFlow;
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// 一次运行的完整报告
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub summary: RunSummary,
    pub log_path: PathBuf,
    pub results: Vec<DrawingResult>,
}

/// 应用主结构
pub struct App<H> {
    config: Config,
    processing: ProcessingConfig,
    host: Arc<H>,
}

impl<H: DocumentHost + 'static> App<H> {
    /// 初始化应用
    ///
    /// 处理参数文件不存在时写出一份默认值，方便修改。
    pub fn initialize(config: Config, host: H) -> Self {
        logging::log_startup(&config);

        let processing = ProcessingConfig::load_from_file(&config.processing_config_file);
        if !config.processing_config_file.exists() {
            processing.save_to_file(&config.processing_config_file);
        }
        info!("⏱️ 处理参数: {:?}", processing);

        Self {
            config,
            processing,
            host: Arc::new(host),
        }
    }

    /// 两次运行之间重新读取处理参数
    pub fn reload_processing_config(&mut self) {
        self.processing = ProcessingConfig::load_from_file(&self.config.processing_config_file);
        info!("⏱️ 处理参数已重新加载: {:?}", self.processing);
    }

    pub fn processing_config(&self) -> &ProcessingConfig {
        &self.processing
    }

    /// 运行批处理
    ///
    /// # 参数
    /// - `job`: 脚本、命令和关闭选项
    /// - `queue`: 待处理图纸
    /// - `cancel`: 取消标记
    ///
    /// # 返回
    /// 返回运行报告；任务设置错误时不产生任何副作用
    pub async fn run(&self, job: &BatchJob, mut queue: BatchQueue, cancel: CancelToken) -> Result<BatchReport> {
        if let Err(e) = job.validate(queue.len()) {
            warn!("⚠️ {}", e);
            return Err(AppError::Setup(e).into());
        }

        let total = queue.len();
        let run_log = Arc::new(BufferedLogger::with_options(
            log_file_path(&self.config.log_dir, chrono::Local::now()),
            self.config.log_flush_threshold,
            self.config.log_flush_interval(),
        ));
        logging::log_session_start(&run_log, job, total);

        let (tx, rx) = mpsc::unbounded_channel();
        let view = ProgressView::new(queue.results().iter().map(|r| r.drawing_name.clone()));
        let reporter = tokio::spawn(run_reporter(rx, view));

        let flow = Arc::new(DrawingFlow::new(
            Arc::clone(&self.host),
            Arc::clone(&run_log),
            self.processing.clone(),
            job,
        ));

        let summary = {
            let processor = BatchProcessor::new(Arc::clone(&run_log), tx);
            processor.run(&mut queue, flow, &cancel).await
        };

        // 处理器已释放发送端，界面层读完剩余事件后结束
        if let Err(e) = reporter.await {
            warn!("界面层任务异常结束: {}", e);
        }
        run_log.dispose();

        let log_path = run_log.path().to_path_buf();
        log_outcome(&summary);
        logging::print_final_stats(&summary, &log_path);

        let report = BatchReport {
            summary,
            log_path,
            results: queue.into_results(),
        };

        if let Some(report_file) = &self.config.report_file {
            write_report(report_file, &report)?;
            info!("📝 结果报告已写入: {}", report_file.display());
        }

        Ok(report)
    }
}

/// 把报告写成 JSON
pub fn write_report(path: &Path, report: &BatchReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).map_err(|source| AppError::File {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn log_outcome(summary: &RunSummary) {
    match &summary.outcome {
        RunOutcome::Completed => info!("✓ 批处理完成"),
        RunOutcome::Cancelled => warn!("⏹️ Processing was cancelled."),
        RunOutcome::Aborted(message) => {
            error!("💥 A critical error occurred during processing: {}", message)
        }
    }
}
