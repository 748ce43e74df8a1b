//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 管理运行生命周期（检查、日志文件、事件通道、收尾）
//! - 持有文档宿主
//! - 输出全局统计和报告
//!
//! ### `batch_processor` - 批量图纸处理器
//! - 顺序遍历队列（`BatchQueue`）
//! - 检查取消、推送进度、记录结果
//!
//! ### `reporter` - 控制台界面层
//! - 消费事件，维护列表和进度
//!
//! ## 层次关系
//!
//! ```text
//! app (一次运行)
//!     ↓
//! batch_processor (处理 BatchQueue)
//!     ↓
//! workflow::DrawingFlow (处理单张图纸)
//!     ↓
//! infrastructure (文档宿主)
//! ```

pub mod app;
pub mod batch_processor;
pub mod events;
pub mod reporter;

pub use app::{App, BatchReport};
pub use batch_processor::{BatchProcessor, RunSummary};
pub use events::{BatchEvent, CancelToken, RunOutcome};
pub use reporter::{ProgressView, RowView};
