//! # Drawing Batch
//!
//! 对一批图纸依次执行同一个脚本/命令，记录每张图纸的结果并保存
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有宿主资源，只暴露能力
//! - `DocumentHost` - 文档宿主能力（打开、激活、加锁、执行、保存、关闭）
//! - `ConsoleHost` - 通过无界面控制台程序实现的宿主
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `BufferedLogger` - 缓冲写运行日志能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一张图纸"的完整处理流程
//! - `DrawingCtx` - 上下文封装（队列下标 + 路径）
//! - `DrawingFlow` - 流程编排（打开 → 执行 → 保存 → 关闭）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 顺序处理队列，进度、取消、结果
//! - `orchestrator/app` - 一次运行的资源和收尾
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, ProcessingConfig};
pub use error::{AppError, HostError, OperationError, SetupError};
pub use infrastructure::{ConsoleHost, DocumentHandle, DocumentHost};
pub use models::{BatchJob, BatchQueue, DrawingResult};
pub use orchestrator::{App, BatchEvent, BatchProcessor, BatchReport, CancelToken, RunOutcome, RunSummary};
pub use services::BufferedLogger;
pub use workflow::{classify, DocumentOperation, DrawingCtx, DrawingFlow, OutcomeClass};
