//! 核心模块
//!
//! 包含更新器配置和持久化设置。

pub mod config;
pub mod settings;

pub use config::{
    CorePackageConfig, LogConfig, PathsConfig, SchedulerConfig, UpdaterConfig,
    UpdaterConfigBuilder,
};
pub use settings::{
    CoreUpdate, FileSettingsStore, MemorySettingsStore, SettingsStore, UpdateSettings,
};
