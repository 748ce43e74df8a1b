//! 图纸处理流程 - 流程层
//!
//! 核心职责：定义"一张图纸"的完整处理流程
//!
//! 流程顺序：
//! 1. 打开 → 激活 → 确认已激活
//! 2. 加锁 → 加载脚本 → 执行命令 → 读取结果 → 保存 → 解锁
//! 3. 按需关闭（关闭失败只追加警告）
//!
//! 每一步都写入运行日志。宿主无法确认完成时按 `ProcessingConfig` 等待。

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ProcessingConfig;
use crate::error::{HostError, OperationError};
use crate::infrastructure::{DocumentHandle, DocumentHost};
use crate::models::BatchJob;
use crate::services::BufferedLogger;
use crate::workflow::drawing_ctx::DrawingCtx;

/// 保存命令结果的符号名
pub const RESULT_SYMBOL: &str = "resultVar";

/// 对单张图纸的操作
///
/// 返回自由文本输出；可恢复的失败只影响这一张图纸，致命失败中止整个批处理。
#[async_trait]
pub trait DocumentOperation: Send + Sync {
    async fn apply(&self, ctx: &DrawingCtx) -> Result<String, OperationError>;
}

/// 图纸处理流程
///
/// - 编排单张图纸的全部宿主调用
/// - 不持有队列和结果
/// - 只依赖宿主能力和运行日志
pub struct DrawingFlow<H> {
    host: Arc<H>,
    run_log: Arc<BufferedLogger>,
    processing: ProcessingConfig,
    script: Option<PathBuf>,
    command: Option<String>,
    close_after: bool,
}

impl<H: DocumentHost> DrawingFlow<H> {
    /// 创建新的图纸处理流程
    pub fn new(
        host: Arc<H>,
        run_log: Arc<BufferedLogger>,
        processing: ProcessingConfig,
        job: &BatchJob,
    ) -> Self {
        Self {
            host,
            run_log,
            processing,
            script: job.script_path().cloned(),
            command: job.command().map(str::to_string),
            close_after: job.close_after,
        }
    }

    /// 文档已打开后的处理，任何失败都会在返回前记录
    async fn process_document(&self, ctx: &DrawingCtx, doc: &DocumentHandle) -> Result<String, OperationError> {
        let name = &ctx.drawing_name;

        self.host.activate(doc).await?;
        self.settle(doc, self.processing.document_activation_delay()).await?;

        if !self.host.is_active(doc).await? {
            self.run_log.log(format!("Failed to make document current: {}", name));
            return Err(HostError::ActivationFailed.into());
        }

        self.host.lock(doc).await?;
        self.run_log.log(format!("Document locked for processing: {}", name));

        let outcome = self.run_locked(ctx, doc).await;

        // 锁总是释放
        let unlocked = self.host.unlock(doc).await;
        self.run_log.log(format!("Document lock released for: {}", name));

        let output = outcome?;
        unlocked?;
        Ok(output)
    }

    async fn run_locked(&self, ctx: &DrawingCtx, doc: &DocumentHandle) -> Result<String, OperationError> {
        let output = self.execute(ctx, doc).await.inspect_err(|e| {
            self.run_log.log(format!(
                "Command execution error for {}: {}",
                ctx.drawing_name, e
            ));
        })?;

        self.save(ctx, doc).await.inspect_err(|e| {
            self.run_log.log(format!("QSAVE failed for {}: {}", ctx.drawing_name, e));
        })?;

        Ok(output)
    }

    /// 执行脚本/命令，返回输出文本
    async fn execute(&self, ctx: &DrawingCtx, doc: &DocumentHandle) -> Result<String, OperationError> {
        let name = &ctx.drawing_name;

        match (&self.script, &self.command) {
            (Some(script), Some(command)) => {
                debug!("{} 加载脚本: {}", ctx, script.display());
                self.host.send_command(doc, &load_expression(script)).await?;
                self.settle(doc, self.processing.lisp_load_delay()).await?;

                let assignment = format!("(setq {} {})", RESULT_SYMBOL, command);
                self.host.send_command(doc, &assignment).await?;
                self.settle(doc, self.processing.command_execution_delay()).await?;

                let output = self
                    .host
                    .symbol(doc, RESULT_SYMBOL)
                    .await?
                    .unwrap_or_else(|| "LISP no result".to_string());

                self.run_log.log(format!("LISP command executed successfully for: {}", name));
                Ok(output)
            }
            (None, Some(command)) => {
                self.host.send_command(doc, command).await?;
                self.settle(doc, self.processing.command_execution_delay()).await?;

                self.run_log.log(format!("Command executed successfully for: {}", name));
                Ok("LISP executed".to_string())
            }
            _ => Ok("Document opened successfully".to_string()),
        }
    }

    async fn save(&self, ctx: &DrawingCtx, doc: &DocumentHandle) -> Result<(), OperationError> {
        let name = &ctx.drawing_name;

        if clear_read_only(&ctx.path).await? {
            self.run_log.log(format!("Removed read-only attribute from: {}", name));
        }

        self.host.save(doc).await?;
        self.settle(doc, self.processing.save_delay()).await?;
        self.run_log.log(format!("Document saved successfully: {}", name));
        Ok(())
    }

    /// 成功处理后按需关闭，关闭失败只追加到输出
    async fn finish(&self, ctx: &DrawingCtx, doc: &DocumentHandle, mut output: String) -> String {
        let name = &ctx.drawing_name;

        if !self.close_after {
            self.run_log.log(format!("Document left open: {}", name));
            return output;
        }

        match self.host.close(doc).await {
            Ok(()) => self.run_log.log(format!("Document closed: {}", name)),
            Err(e) => {
                warn!("{} ⚠️ 关闭文档失败: {}", ctx, e);
                output.push_str(&format!(" (Close warning: {})", e));
                self.run_log.log(format!("Close warning for {}: {}", name, e));
            }
        }
        output
    }

    /// 处理失败后按需关闭文档
    async fn close_after_error(&self, ctx: &DrawingCtx, doc: &DocumentHandle) {
        if !self.close_after {
            return;
        }

        match self.host.close(doc).await {
            Ok(()) => self
                .run_log
                .log(format!("Document closed after error: {}", ctx.drawing_name)),
            Err(_) => self
                .run_log
                .log(format!("Failed to close document after error: {}", ctx.drawing_name)),
        }
    }

    /// 等待宿主完成异步操作
    async fn settle(&self, doc: &DocumentHandle, delay: Duration) -> Result<(), HostError> {
        if self.host.reports_completion() {
            self.host.wait_until_idle(doc).await
        } else {
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}

#[async_trait]
impl<H: DocumentHost> DocumentOperation for DrawingFlow<H> {
    async fn apply(&self, ctx: &DrawingCtx) -> Result<String, OperationError> {
        let name = &ctx.drawing_name;

        self.run_log.log(format!("Attempting to open: {}", name));
        let doc = match self.host.open(&ctx.path).await {
            Ok(doc) => doc,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!("{} ❌ 打开失败: {}", ctx, e);
                self.run_log.log(format!("Failed to open document: {}", name));
                return Err(OperationError::recoverable("Failed to open document"));
            }
        };
        self.run_log.log(format!("Successfully opened: {}", name));

        match self.process_document(ctx, &doc).await {
            Ok(output) => {
                info!("{} ✓ 处理完成", ctx);
                Ok(self.finish(ctx, &doc, output).await)
            }
            Err(e) => {
                self.run_log
                    .log(format!("Document operation error for {}: {}", name, e));
                if !e.is_fatal() {
                    self.close_after_error(ctx, &doc).await;
                }
                Err(e)
            }
        }
    }
}

/// 加载脚本的表达式，路径中的反斜杠需要转义
fn load_expression(script: &Path) -> String {
    format!(
        "(load \"{}\")",
        script.to_string_lossy().replace('\\', "\\\\")
    )
}

/// 去掉文件的只读属性
///
/// # 返回
/// 原来是否为只读
#[allow(clippy::permissions_set_readonly_false)]
async fn clear_read_only(path: &Path) -> Result<bool, HostError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| HostError::SaveFailed(e.to_string()))?;

    let mut permissions = metadata.permissions();
    if !permissions.readonly() {
        return Ok(false);
    }

    permissions.set_readonly(false);
    tokio::fs::set_permissions(path, permissions)
        .await
        .map_err(|e| HostError::SaveFailed(e.to_string()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// 记录所有调用的宿主
    #[derive(Default)]
    struct ScriptedHost {
        calls: Mutex<Vec<String>>,
        symbol: Option<String>,
        fail_open: bool,
        fail_activation: bool,
        fail_close: bool,
        fail_command: Option<HostError>,
    }

    impl ScriptedHost {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl DocumentHost for ScriptedHost {
        async fn open(&self, path: &Path) -> Result<DocumentHandle, HostError> {
            self.record("open");
            if self.fail_open {
                return Err(HostError::OpenFailed {
                    path: path.to_path_buf(),
                    reason: "locked by another user".into(),
                });
            }
            Ok(DocumentHandle::new(1, path))
        }

        async fn activate(&self, _doc: &DocumentHandle) -> Result<(), HostError> {
            self.record("activate");
            Ok(())
        }

        async fn is_active(&self, _doc: &DocumentHandle) -> Result<bool, HostError> {
            Ok(!self.fail_activation)
        }

        async fn lock(&self, _doc: &DocumentHandle) -> Result<(), HostError> {
            self.record("lock");
            Ok(())
        }

        async fn unlock(&self, _doc: &DocumentHandle) -> Result<(), HostError> {
            self.record("unlock");
            Ok(())
        }

        async fn send_command(&self, _doc: &DocumentHandle, command: &str) -> Result<(), HostError> {
            self.record(format!("send {}", command));
            match &self.fail_command {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }

        async fn symbol(&self, _doc: &DocumentHandle, name: &str) -> Result<Option<String>, HostError> {
            self.record(format!("symbol {}", name));
            Ok(self.symbol.clone())
        }

        async fn save(&self, _doc: &DocumentHandle) -> Result<(), HostError> {
            self.record("save");
            Ok(())
        }

        async fn close(&self, _doc: &DocumentHandle) -> Result<(), HostError> {
            self.record("close");
            if self.fail_close {
                return Err(HostError::CloseFailed("document busy".into()));
            }
            Ok(())
        }

        fn reports_completion(&self) -> bool {
            true
        }
    }

    struct Fixture {
        log: Arc<BufferedLogger>,
        drawing: PathBuf,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let drawing = dir.path().join("A-101.dwg");
        std::fs::write(&drawing, b"").unwrap();
        let log = Arc::new(BufferedLogger::with_options(
            dir.path().join("run.txt"),
            100,
            Duration::from_secs(3600),
        ));
        Fixture {
            log,
            drawing,
            _dir: dir,
        }
    }

    fn script_job(close_after: bool) -> BatchJob {
        BatchJob {
            script: Some(PathBuf::from(r"C:\lisp\count.lsp")),
            command: "(c:count-blocks)".into(),
            close_after,
            ..Default::default()
        }
    }

    fn log_text(fx: &Fixture) -> String {
        fx.log.flush();
        std::fs::read_to_string(fx.log.path()).unwrap_or_default()
    }

    #[tokio::test]
    async fn script_and_command_run_in_order() {
        let fx = fixture();
        let host = Arc::new(ScriptedHost {
            symbol: Some("OK 12 blocks".into()),
            ..Default::default()
        });
        let flow = DrawingFlow::new(host.clone(), fx.log.clone(), ProcessingConfig::default(), &script_job(true));

        let output = flow.apply(&DrawingCtx::new(0, 1, &fx.drawing)).await.unwrap();

        assert_eq!(output, "OK 12 blocks");
        assert_eq!(
            host.calls(),
            vec![
                "open",
                "activate",
                "lock",
                r#"send (load "C:\\lisp\\count.lsp")"#,
                "send (setq resultVar (c:count-blocks))",
                "symbol resultVar",
                "save",
                "unlock",
                "close",
            ]
        );
        let log = log_text(&fx);
        assert!(log.contains("LISP command executed successfully for: A-101.dwg"));
        assert!(log.contains("Document closed: A-101.dwg"));
    }

    #[tokio::test]
    async fn missing_symbol_reports_no_result() {
        let fx = fixture();
        let host = Arc::new(ScriptedHost::default());
        let flow = DrawingFlow::new(host, fx.log.clone(), ProcessingConfig::default(), &script_job(false));

        let output = flow.apply(&DrawingCtx::new(0, 1, &fx.drawing)).await.unwrap();

        assert_eq!(output, "LISP no result");
        assert!(log_text(&fx).contains("Document left open: A-101.dwg"));
    }

    #[tokio::test]
    async fn no_command_only_opens_and_saves() {
        let fx = fixture();
        let host = Arc::new(ScriptedHost::default());
        let flow = DrawingFlow::new(host.clone(), fx.log.clone(), ProcessingConfig::default(), &BatchJob::default());

        let output = flow.apply(&DrawingCtx::new(0, 1, &fx.drawing)).await.unwrap();

        assert_eq!(output, "Document opened successfully");
        assert!(host.calls().contains(&"save".to_string()));
        assert!(!host.calls().iter().any(|c| c.starts_with("send")));
    }

    #[tokio::test]
    async fn open_failure_is_recoverable() {
        let fx = fixture();
        let host = Arc::new(ScriptedHost {
            fail_open: true,
            ..Default::default()
        });
        let flow = DrawingFlow::new(host, fx.log.clone(), ProcessingConfig::default(), &script_job(true));

        let err = flow.apply(&DrawingCtx::new(0, 1, &fx.drawing)).await.unwrap_err();

        assert_eq!(err, OperationError::recoverable("Failed to open document"));
        assert!(log_text(&fx).contains("Failed to open document: A-101.dwg"));
    }

    #[tokio::test]
    async fn activation_failure_closes_document() {
        let fx = fixture();
        let host = Arc::new(ScriptedHost {
            fail_activation: true,
            ..Default::default()
        });
        let flow = DrawingFlow::new(host.clone(), fx.log.clone(), ProcessingConfig::default(), &script_job(true));

        let err = flow.apply(&DrawingCtx::new(0, 1, &fx.drawing)).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to make document current");
        assert!(!host.calls().contains(&"lock".to_string()));
        assert_eq!(host.calls().last().map(String::as_str), Some("close"));
        assert!(log_text(&fx).contains("Document closed after error: A-101.dwg"));
    }

    #[tokio::test]
    async fn command_failure_still_unlocks() {
        let fx = fixture();
        let host = Arc::new(ScriptedHost {
            fail_command: Some(HostError::ExecutionFailed {
                command: "(load)".into(),
                reason: "malformed list".into(),
            }),
            ..Default::default()
        });
        let flow = DrawingFlow::new(host.clone(), fx.log.clone(), ProcessingConfig::default(), &script_job(false));

        let err = flow.apply(&DrawingCtx::new(0, 1, &fx.drawing)).await.unwrap_err();

        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Command execution error: malformed list");
        assert!(host.calls().contains(&"unlock".to_string()));
        assert!(!host.calls().contains(&"save".to_string()));
        assert!(log_text(&fx).contains("Command execution error for A-101.dwg"));
    }

    #[tokio::test]
    async fn unavailable_host_is_fatal() {
        let fx = fixture();
        let host = Arc::new(ScriptedHost {
            fail_command: Some(HostError::Unavailable("host exited".into())),
            ..Default::default()
        });
        let flow = DrawingFlow::new(host.clone(), fx.log.clone(), ProcessingConfig::default(), &script_job(true));

        let err = flow.apply(&DrawingCtx::new(0, 1, &fx.drawing)).await.unwrap_err();

        assert!(err.is_fatal());
        assert!(!host.calls().contains(&"close".to_string()));
    }

    #[tokio::test]
    async fn close_failure_becomes_warning() {
        let fx = fixture();
        let host = Arc::new(ScriptedHost {
            symbol: Some("OK".into()),
            fail_close: true,
            ..Default::default()
        });
        let flow = DrawingFlow::new(host, fx.log.clone(), ProcessingConfig::default(), &script_job(true));

        let output = flow.apply(&DrawingCtx::new(0, 1, &fx.drawing)).await.unwrap();

        assert_eq!(output, "OK (Close warning: Close failed: document busy)");
    }

    #[test]
    fn load_expression_escapes_backslashes() {
        assert_eq!(
            load_expression(Path::new(r"C:\tools\a.lsp")),
            r#"(load "C:\\tools\\a.lsp")"#
        );
    }

    #[tokio::test]
    async fn read_only_flag_is_cleared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.dwg");
        std::fs::write(&path, b"").unwrap();
        let mut permissions = std::fs::metadata(&path).unwrap().permissions();
        permissions.set_readonly(true);
        std::fs::set_permissions(&path, permissions).unwrap();

        assert!(clear_read_only(&path).await.unwrap());
        assert!(!std::fs::metadata(&path).unwrap().permissions().readonly());
        assert!(!clear_read_only(&path).await.unwrap());
    }
}
