//! 基础设施层：持有宿主资源，只暴露能力

pub mod console_host;
pub mod document_host;

pub use console_host::ConsoleHost;
pub use document_host::{DocumentHandle, DocumentHost};
