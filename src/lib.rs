//! # Chips Updater - 薯片应用更新器
//!
//! 薯片生态中负责应用（模块）安装、更新、卸载和内核更新的调度组件，提供以下功能：
//!
//! - **依赖解析**: 按依赖关系展开请求，保证依赖先于使用者处理
//! - **两级调度**: 主动作队列逐个展开为子动作批次，子动作逐个交给外部处理器
//! - **进度跟踪**: 每个模块的处理进度、失败状态和可更新状态
//! - **更新检查**: 模块目录和内核发布的定期检查与自动更新
//! - **事件通知**: 处理状态通过事件总线发布
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chips_updater::{Updater, UpdaterConfig};
//! use chips_updater::module::{ManifestCatalog, MemoryInventory};
//! # use chips_updater::module::{CoreInstaller, Processor, ReleaseSource, Restarter};
//!
//! # async fn run(
//! #     processor: Arc<dyn Processor>,
//! #     installer: Arc<dyn CoreInstaller>,
//! #     restarter: Arc<dyn Restarter>,
//! #     releases: Arc<dyn ReleaseSource>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let config = UpdaterConfig::from_file("/etc/chips/updater.yaml").await?;
//! let inventory = MemoryInventory::from_file("/etc/chips/installed.yaml").await?;
//! let catalog = ManifestCatalog::load(&config.paths.catalog_file).await?;
//!
//! let updater = Updater::builder(config)
//!     .inventory(Arc::new(inventory))
//!     .catalog(Arc::new(catalog))
//!     .processor(processor)
//!     .core_installer(installer)
//!     .restarter(restarter)
//!     .release_source(releases)
//!     .build()?;
//!
//! updater.configure().await?;
//! updater.submit_install("audio").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## 模块结构
//!
//! - `api` - 对外 SDK 接口
//! - `core` - 配置和持久化设置
//! - `event` - 处理状态事件和事件总线
//! - `module` - 模块元数据、依赖解析、进度跟踪和外部协作方接口
//! - `scheduler` - 动作队列、批次规划和周期轮询器
//! - `utils` - 错误类型、日志和版本比较

#![warn(rustdoc::missing_crate_level_docs)]

pub mod api;
pub mod core;
pub mod event;
pub mod module;
pub mod scheduler;
pub mod utils;

// 重导出常用类型，方便使用
pub use api::sdk::{CheckTime, CoreCheck, ModulesCheck, Updater, UpdaterBuilder};

pub use event::{event_types, Event, EventBus};

pub use module::{
    Catalog, CoreInstaller, Inventory, ModuleInfos, ModuleUpdateStatus, ProcessCode,
    ProcessStatus, Processor, ReleaseSource, Restarter, StatusReporter, StatusStore,
};

pub use scheduler::{ActionExtra, ActionKind, BatchPlanner, UpdateScheduler};

pub use utils::{error_code, status_code, Result, UpdateError};
pub use utils::logger::{LogGuard, Logger, LoggerConfig, LoggerConfigBuilder, RotationStrategy};

pub use core::config::{LogConfig, UpdaterConfig, UpdaterConfigBuilder};
pub use core::settings::{CoreUpdate, SettingsStore, UpdateSettings};

/// 库版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
