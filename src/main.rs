use anyhow::{Context, Result};
use drawing_batch::models::{collect_drawings, load_job};
use drawing_batch::utils::logging;
use drawing_batch::{App, AppError, BatchQueue, CancelToken, Config, ConsoleHost, RunOutcome};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(config.verbose_logging);

    // 加载任务和图纸
    let job = load_job(&config.job_file).await?;
    let mut queue = BatchQueue::new();
    let added = queue.append(collect_drawings(&job).await.context("无法收集图纸列表")?);
    info!("📋 已加入 {} 张图纸", added);

    // Ctrl-C 取消：当前图纸处理完后停止
    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⏹️ 收到中断信号，当前图纸处理完后停止");
            on_interrupt.cancel();
        }
    });

    // 初始化并运行应用
    let host = ConsoleHost::new(config.host_program.clone()).with_args(config.host_args.clone());
    let app = App::initialize(config, host);
    let report = app.run(&job, queue, cancel).await?;

    if let RunOutcome::Aborted(message) = report.summary.outcome {
        return Err(AppError::Aborted(message).into());
    }

    Ok(())
}
