//! 批量图纸处理器 - 编排层
//!
//! ## 职责
//!
//! 按顺序对队列中的每张图纸执行同一个操作，是批处理的"指挥中心"。
//!
//! ## 核心功能
//!
//! 1. **顺序处理**：一次只处理一张图纸，宿主不支持并发操作多个文档
//! 2. **进度推送**：处理前发送进度事件，处理后发送结果事件
//! 3. **协作式取消**：每张图纸开始前检查一次，进行中的图纸会处理完
//! 4. **错误隔离**：单张图纸失败只记录在它的结果上，批处理继续
//! 5. **收尾**：无论如何结束都写入会话结尾日志并写盘
//!
//! ## 设计特点
//!
//! - **不认识宿主**：只依赖 `DocumentOperation`
//! - **结果原地更新**：`BatchQueue` 中对应下标的结果只更新一次
//! - **任务隔离**：每张图纸在独立任务中执行，崩溃视为不可恢复错误

use crate::error::OperationError;
use crate::models::BatchQueue;
use crate::orchestrator::events::{BatchEvent, CancelToken, RunOutcome};
use crate::services::BufferedLogger;
use crate::workflow::{classify, DocumentOperation, DrawingCtx, OutcomeClass};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

/// 一次批处理的统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// 已尝试处理的数量（成功或失败）
    pub processed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// 批量图纸处理器
pub struct BatchProcessor {
    run_log: Arc<BufferedLogger>,
    events: UnboundedSender<BatchEvent>,
}

impl BatchProcessor {
    pub fn new(run_log: Arc<BufferedLogger>, events: UnboundedSender<BatchEvent>) -> Self {
        Self { run_log, events }
    }

    /// 对队列中的每张图纸执行操作
    ///
    /// # 参数
    /// - `queue`: 待处理队列，结果原地更新
    /// - `operation`: 单张图纸的操作
    /// - `cancel`: 取消标记
    ///
    /// # 返回
    /// 返回本次批处理的统计
    pub async fn run<O>(&self, queue: &mut BatchQueue, operation: Arc<O>, cancel: &CancelToken) -> RunSummary
    where
        O: DocumentOperation + 'static,
    {
        let targets = queue.paths().to_vec();
        let total = targets.len();
        let mut outcome = RunOutcome::Completed;

        for (index, path) in targets.iter().enumerate() {
            tokio::task::yield_now().await;
            if cancel.is_cancelled() {
                info!("⏹️ 用户取消，剩余 {} 张图纸未处理", total - index);
                self.run_log.log("Processing cancelled by user");
                outcome = RunOutcome::Cancelled;
                break;
            }

            let ctx = DrawingCtx::new(index, total, path);
            log_drawing_start(&ctx);
            self.emit(BatchEvent::Progress {
                position: ctx.position(),
                total,
                drawing_name: ctx.drawing_name.clone(),
            });

            let started = Instant::now();
            let result = run_isolated(Arc::clone(&operation), ctx.clone()).await;
            let elapsed = started.elapsed();

            let Some(item) = queue.result_mut(index) else {
                warn!("{} 队列结果缺失，跳过记录", ctx);
                continue;
            };

            let (status, detail, class, output) = match result {
                Ok(output) => {
                    let (status, detail) = classify(&output);
                    item.mark_success(status.clone(), detail.clone(), elapsed);
                    info!("{} ✅ {} {}", ctx, status, detail);
                    (status, detail, OutcomeClass::Success, output)
                }
                Err(OperationError::Recoverable(message)) => {
                    error!("{} ❌ 处理失败: {}", ctx, message);
                    self.run_log.log(format!(
                        "General processing error for {}: {}",
                        ctx.drawing_name, message
                    ));
                    item.mark_error(message.clone(), elapsed);
                    (item.result_status.clone(), message.clone(), OutcomeClass::Error, message)
                }
                Err(OperationError::Fatal(message)) => {
                    error!("{} 💥 不可恢复的错误，中止批处理: {}", ctx, message);
                    self.run_log
                        .log(format!("Critical error during processing: {}", message));
                    outcome = RunOutcome::Aborted(message);
                    break;
                }
            };

            self.run_log
                .log(execution_entry(&ctx.drawing_name, class, &output));
            self.emit(BatchEvent::ItemUpdated {
                index,
                status,
                detail,
                class,
            });
        }

        self.finish(queue, outcome)
    }

    /// 写入会话结尾、写盘并发送结束事件
    fn finish(&self, queue: &BatchQueue, outcome: RunOutcome) -> RunSummary {
        let results = queue.results();
        let summary = RunSummary {
            outcome,
            processed: results.iter().filter(|r| r.is_attempted()).count(),
            total: results.len(),
            succeeded: results.iter().filter(|r| r.is_processed).count(),
            failed: results.iter().filter(|r| r.has_error).count(),
        };

        self.run_log.log("=== LISP Tool Processing Session Completed ===");
        self.run_log.log(format!(
            "Total drawings processed: {}/{}",
            summary.processed, summary.total
        ));
        self.run_log
            .log(format!("Log file location: {}", self.run_log.path().display()));
        self.run_log.flush();

        self.emit(BatchEvent::Finished {
            processed: summary.processed,
            total: summary.total,
            log_path: self.run_log.path().to_path_buf(),
            outcome: summary.outcome.clone(),
        });

        summary
    }

    fn emit(&self, event: BatchEvent) {
        if self.events.send(event).is_err() {
            debug!("界面层已关闭，事件丢弃");
        }
    }
}

/// 在独立任务中执行操作，任务崩溃转为不可恢复错误
async fn run_isolated<O>(operation: Arc<O>, ctx: DrawingCtx) -> Result<String, OperationError>
where
    O: DocumentOperation + 'static,
{
    let handle = tokio::spawn(async move { operation.apply(&ctx).await });
    match handle.await {
        Ok(result) => result,
        Err(e) => Err(OperationError::fatal(format!("处理任务异常终止: {}", e))),
    }
}

/// 执行记录：`{name}\t | SUCCESS |\t {output}`
pub fn execution_entry(drawing_name: &str, class: OutcomeClass, output: &str) -> String {
    format!("{}\t | {} |\t {}", drawing_name, class.label(), output)
}

fn log_drawing_start(ctx: &DrawingCtx) {
    info!("\n{} {}", ctx, "─".repeat(30));
    info!("{} 开始处理: {}", ctx, ctx.path.display());
}
