//! API 模块
//!
//! 对外提供的 SDK 接口。
//!
//! # 模块概览
//!
//! - `sdk`: [`Updater`] 主接口，提供请求提交、更新检查、内核更新和自动更新设置
//!
//! # 示例
//!
//! ```rust,no_run
//! use chips_updater::api::Updater;
//! use chips_updater::UpdaterConfig;
//!
//! let config = UpdaterConfig::builder()
//!     .main_actions_interval(30)
//!     .log_level("debug")
//!     .build();
//!
//! // 缺少清单、目录和处理器等组件时构建失败
//! assert!(Updater::builder(config).build().is_err());
//! ```

pub mod sdk;

// 重导出主要类型
pub use sdk::{CheckTime, CoreCheck, ModulesCheck, Updater, UpdaterBuilder};
