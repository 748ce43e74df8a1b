//! 控制台宿主
//!
//! 通过无界面控制台程序（如 accoreconsole）操作图纸：
//! 打开图纸时启动一个宿主会话（参数为图纸路径），之后这张图纸的所有命令
//! 都写入同一个会话的 stdin，关闭图纸时结束会话。
//!
//! 每条命令后追加一条输出完成标记的表达式，读到标记行即表示命令已完成。

use crate::error::HostError;
use crate::infrastructure::document_host::{DocumentHandle, DocumentHost};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

/// 保存命令
const SAVE_COMMAND: &str = "QSAVE";
/// 命令完成标记前缀，完整标记为 `__CONSOLE_DONE_{n}__`
const DONE_MARKER: &str = "__CONSOLE_DONE_";
/// 符号值输出行前缀
const VALUE_PREFIX: &str = "__CONSOLE_VALUE__";
/// 关闭会话后等待宿主退出的时长
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// 一张图纸对应的宿主进程
struct ConsoleSession {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
    next_marker: u64,
}

impl ConsoleSession {
    async fn spawn(program: &str, args: &[String], path: &Path) -> Result<Self, HostError> {
        let mut child = Command::new(program)
            .args(args)
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                    HostError::Unavailable(format!("{}: {}", program, e))
                }
                _ => HostError::OpenFailed {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                },
            })?;

        let pipes_missing = || HostError::OpenFailed {
            path: path.to_path_buf(),
            reason: "console pipes unavailable".to_string(),
        };
        let stdin = child.stdin.take().ok_or_else(pipes_missing)?;
        let stdout = child.stdout.take().ok_or_else(pipes_missing)?;

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout).lines(),
            next_marker: 0,
        })
    }

    /// 写入一条命令并等待完成标记，返回标记之前的输出行
    async fn run(&mut self, command: &str) -> Result<Vec<String>, HostError> {
        self.next_marker += 1;
        let marker = format!("{}{}__", DONE_MARKER, self.next_marker);
        let input = format!("{}\n(princ \"\\n{}\\n\")\n", command, marker);

        let stdin = self.stdin.as_mut().ok_or_else(|| session_ended(command))?;
        stdin
            .write_all(input.as_bytes())
            .await
            .map_err(|e| execution_failed(command, e))?;
        stdin.flush().await.map_err(|e| execution_failed(command, e))?;

        let mut output = Vec::new();
        loop {
            match self
                .stdout
                .next_line()
                .await
                .map_err(|e| execution_failed(command, e))?
            {
                Some(line) if line.trim() == marker => return Ok(output),
                Some(line) => output.push(line),
                None => return Err(session_ended(command)),
            }
        }
    }

    /// 通过会话打印变量的值；`nil` 视为不存在
    async fn read_symbol(&mut self, name: &str) -> Result<Option<String>, HostError> {
        let query = format!(
            "(princ (strcat \"\\n{}\" (vl-princ-to-string {}) \"\\n\"))",
            VALUE_PREFIX, name
        );
        let output = self.run(&query).await?;

        let value = output
            .iter()
            .filter_map(|line| line.trim().strip_prefix(VALUE_PREFIX))
            .last()
            .map(str::trim)
            .filter(|value| !value.is_empty() && *value != "nil")
            .map(str::to_string);
        Ok(value)
    }

    /// 关闭 stdin，等待宿主退出，超时则强制结束
    async fn shutdown(&mut self) -> Result<(), HostError> {
        drop(self.stdin.take());

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.child.wait()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(HostError::CloseFailed(e.to_string())),
            Err(_) => {
                let _ = self.child.kill().await;
                Err(HostError::CloseFailed("console did not exit".to_string()))
            }
        }
    }
}

fn execution_failed(command: &str, err: std::io::Error) -> HostError {
    HostError::ExecutionFailed {
        command: command.to_string(),
        reason: err.to_string(),
    }
}

fn session_ended(command: &str) -> HostError {
    HostError::ExecutionFailed {
        command: command.to_string(),
        reason: "console session ended".to_string(),
    }
}

struct DocumentState {
    locked: bool,
    session: Arc<AsyncMutex<ConsoleSession>>,
}

/// 控制台宿主
pub struct ConsoleHost {
    program: String,
    args: Vec<String>,
    next_id: AtomicU64,
    active: Mutex<Option<u64>>,
    documents: Mutex<HashMap<u64, DocumentState>>,
}

impl ConsoleHost {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            next_id: AtomicU64::new(1),
            active: Mutex::new(None),
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// 放在图纸路径之前的宿主参数（accoreconsole 需要 `/i`）
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    fn with_state<T>(
        &self,
        doc: &DocumentHandle,
        f: impl FnOnce(&mut DocumentState) -> T,
    ) -> Result<T, HostError> {
        let mut documents = self.documents.lock();
        let state = documents
            .get_mut(&doc.id)
            .ok_or_else(|| HostError::ExecutionFailed {
                command: String::new(),
                reason: format!("document not open: {}", doc.path.display()),
            })?;
        Ok(f(state))
    }

    fn session(&self, doc: &DocumentHandle) -> Result<Arc<AsyncMutex<ConsoleSession>>, HostError> {
        self.with_state(doc, |state| Arc::clone(&state.session))
    }
}

#[async_trait]
impl DocumentHost for ConsoleHost {
    async fn open(&self, path: &Path) -> Result<DocumentHandle, HostError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| HostError::OpenFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if !metadata.is_file() {
            return Err(HostError::OpenFailed {
                path: path.to_path_buf(),
                reason: "not a file".to_string(),
            });
        }

        let session = ConsoleSession::spawn(&self.program, &self.args, path).await?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.documents.lock().insert(
            id,
            DocumentState {
                locked: false,
                session: Arc::new(AsyncMutex::new(session)),
            },
        );
        debug!("宿主会话已启动 [{}] #{}", path.display(), id);
        Ok(DocumentHandle::new(id, path))
    }

    async fn activate(&self, doc: &DocumentHandle) -> Result<(), HostError> {
        if !self.documents.lock().contains_key(&doc.id) {
            return Err(HostError::ActivationFailed);
        }
        *self.active.lock() = Some(doc.id);
        Ok(())
    }

    async fn is_active(&self, doc: &DocumentHandle) -> Result<bool, HostError> {
        Ok(*self.active.lock() == Some(doc.id))
    }

    async fn lock(&self, doc: &DocumentHandle) -> Result<(), HostError> {
        let already_locked = self.with_state(doc, |state| std::mem::replace(&mut state.locked, true))?;
        if already_locked {
            return Err(HostError::LockFailed(format!(
                "already locked: {}",
                doc.path.display()
            )));
        }
        Ok(())
    }

    async fn unlock(&self, doc: &DocumentHandle) -> Result<(), HostError> {
        self.with_state(doc, |state| state.locked = false)
    }

    async fn send_command(&self, doc: &DocumentHandle, command: &str) -> Result<(), HostError> {
        let session = self.session(doc)?;
        let output = session.lock().await.run(command).await?;
        debug!("宿主输出 [{}] {:?}", doc.path.display(), output.last());
        Ok(())
    }

    async fn symbol(&self, doc: &DocumentHandle, name: &str) -> Result<Option<String>, HostError> {
        let session = self.session(doc)?;
        let value = session.lock().await.read_symbol(name).await?;
        Ok(value)
    }

    async fn save(&self, doc: &DocumentHandle) -> Result<(), HostError> {
        let session = self.session(doc)?;
        let result = session.lock().await.run(SAVE_COMMAND).await;
        result.map(|_| ()).map_err(|e| match e {
            HostError::ExecutionFailed { reason, .. } => HostError::SaveFailed(reason),
            other => other,
        })
    }

    async fn close(&self, doc: &DocumentHandle) -> Result<(), HostError> {
        let removed = self.documents.lock().remove(&doc.id);
        let Some(state) = removed else {
            return Err(HostError::CloseFailed(format!(
                "document not open: {}",
                doc.path.display()
            )));
        };
        {
            let mut active = self.active.lock();
            if *active == Some(doc.id) {
                *active = None;
            }
        }

        let mut session = state.session.lock().await;
        session.shutdown().await
    }

    fn reports_completion(&self) -> bool {
        true
    }
}
