//! 工具模块
//!
//! 包含错误类型、版本比较、日志系统等通用工具。

pub mod error;
pub mod logger;
pub mod version;

// 重导出常用类型
pub use error::{error_code, status_code, Result, UpdateError};
pub use logger::{LogGuard, Logger, LoggerConfig, LoggerConfigBuilder, RotationStrategy};
pub use version::{compare_versions, is_newer};
