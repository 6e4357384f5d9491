//! 更新器配置
//!
//! 定义更新器的配置结构和加载逻辑。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::{Result, UpdateError};

/// 调度器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 主动作轮询周期（秒）
    #[serde(default = "default_main_actions_interval")]
    pub main_actions_interval_secs: u64,

    /// 子动作轮询周期（秒）
    #[serde(default = "default_sub_actions_interval")]
    pub sub_actions_interval_secs: u64,

    /// 内核更新成功后重启前的延迟（秒）
    #[serde(default = "default_restart_delay")]
    pub restart_delay_secs: u64,
}

fn default_main_actions_interval() -> u64 {
    60
}

fn default_sub_actions_interval() -> u64 {
    10
}

fn default_restart_delay() -> u64 {
    10
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            main_actions_interval_secs: default_main_actions_interval(),
            sub_actions_interval_secs: default_sub_actions_interval(),
            restart_delay_secs: default_restart_delay(),
        }
    }
}

impl SchedulerConfig {
    pub fn main_interval(&self) -> Duration {
        Duration::from_secs(self.main_actions_interval_secs)
    }

    pub fn sub_interval(&self) -> Duration {
        Duration::from_secs(self.sub_actions_interval_secs)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否输出到文件
    #[serde(default)]
    pub file_output: bool,

    /// 日志文件目录
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// 是否输出 JSON 格式
    #[serde(default)]
    pub json_format: bool,

    /// 日志轮转策略
    #[serde(default = "default_rotation")]
    pub rotation: String,

    /// 保留日志文件数
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

fn default_max_files() -> usize {
    7
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: false,
            log_dir: None,
            json_format: false,
            rotation: default_rotation(),
            max_files: default_max_files(),
        }
    }
}

/// 路径配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// 模块安装目录，处理状态写入 `<install_dir>/<module>/process.log`
    #[serde(default = "default_install_dir")]
    pub install_dir: PathBuf,

    /// 更新设置文件
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,

    /// 模块目录清单（modules.json）
    #[serde(default = "default_catalog_file")]
    pub catalog_file: PathBuf,
}

fn default_install_dir() -> PathBuf {
    PathBuf::from("/opt/chips/modules")
}

fn default_settings_file() -> PathBuf {
    PathBuf::from("/etc/chips/updater.json")
}

fn default_catalog_file() -> PathBuf {
    PathBuf::from("/etc/chips/modules.json")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            install_dir: default_install_dir(),
            settings_file: default_settings_file(),
            catalog_file: default_catalog_file(),
        }
    }
}

/// 内核包配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorePackageConfig {
    /// 当前运行的内核版本
    #[serde(default = "default_current_version")]
    pub current_version: String,

    /// 发布资源中内核包文件名前缀（`<prefix>*.zip`）
    #[serde(default = "default_package_prefix")]
    pub package_prefix: String,
}

fn default_current_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_package_prefix() -> String {
    "cleep_".to_string()
}

impl Default for CorePackageConfig {
    fn default() -> Self {
        Self {
            current_version: default_current_version(),
            package_prefix: default_package_prefix(),
        }
    }
}

/// 更新器配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// 配置文件路径
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// 调度器配置
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LogConfig,

    /// 路径配置
    #[serde(default)]
    pub paths: PathsConfig,

    /// 内核包配置
    #[serde(default)]
    pub core: CorePackageConfig,
}

impl UpdaterConfig {
    /// 创建配置构建器
    pub fn builder() -> UpdaterConfigBuilder {
        UpdaterConfigBuilder::new()
    }

    /// 从文件加载配置（按扩展名选择 JSON 或 YAML）
    pub async fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            UpdateError::ConfigLoadFailed(format!("{}: {}", path.display(), e))
        })?;

        let mut config: UpdaterConfig = if path.extension().map(|e| e == "json").unwrap_or(false) {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        config.config_path = Some(path);
        config.validate()?;
        Ok(config)
    }

    /// 校验配置值
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.main_actions_interval_secs == 0 {
            return Err(UpdateError::InvalidConfigValue {
                key: "scheduler.main_actions_interval_secs".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if self.scheduler.sub_actions_interval_secs == 0 {
            return Err(UpdateError::InvalidConfigValue {
                key: "scheduler.sub_actions_interval_secs".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if self.core.package_prefix.is_empty() {
            return Err(UpdateError::InvalidConfigValue {
                key: "core.package_prefix".to_string(),
                reason: "不能为空".to_string(),
            });
        }
        Ok(())
    }

    /// 合并另一个配置（用于覆盖）
    pub fn merge(&mut self, other: UpdaterConfig) {
        // 只覆盖非默认值的配置
        if other.scheduler.main_actions_interval_secs != default_main_actions_interval() {
            self.scheduler.main_actions_interval_secs = other.scheduler.main_actions_interval_secs;
        }
        if other.scheduler.sub_actions_interval_secs != default_sub_actions_interval() {
            self.scheduler.sub_actions_interval_secs = other.scheduler.sub_actions_interval_secs;
        }
        if other.scheduler.restart_delay_secs != default_restart_delay() {
            self.scheduler.restart_delay_secs = other.scheduler.restart_delay_secs;
        }
        if other.logging.level != default_log_level() {
            self.logging.level = other.logging.level;
        }
        if other.logging.file_output {
            self.logging.file_output = true;
            self.logging.log_dir = other.logging.log_dir;
        }
        if other.paths.install_dir != default_install_dir() {
            self.paths.install_dir = other.paths.install_dir;
        }
        if other.paths.settings_file != default_settings_file() {
            self.paths.settings_file = other.paths.settings_file;
        }
        if other.paths.catalog_file != default_catalog_file() {
            self.paths.catalog_file = other.paths.catalog_file;
        }
    }
}

/// 配置构建器
#[derive(Debug, Default)]
pub struct UpdaterConfigBuilder {
    config: UpdaterConfig,
}

impl UpdaterConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            config: UpdaterConfig::default(),
        }
    }

    /// 设置主动作轮询周期
    pub fn main_actions_interval(mut self, secs: u64) -> Self {
        self.config.scheduler.main_actions_interval_secs = secs;
        self
    }

    /// 设置子动作轮询周期
    pub fn sub_actions_interval(mut self, secs: u64) -> Self {
        self.config.scheduler.sub_actions_interval_secs = secs;
        self
    }

    /// 设置重启延迟
    pub fn restart_delay(mut self, secs: u64) -> Self {
        self.config.scheduler.restart_delay_secs = secs;
        self
    }

    /// 设置日志级别
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// 启用文件日志
    pub fn file_logging(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.config.logging.file_output = true;
        self.config.logging.log_dir = Some(log_dir.into());
        self
    }

    /// 启用 JSON 格式日志
    pub fn json_logging(mut self) -> Self {
        self.config.logging.json_format = true;
        self
    }

    /// 设置模块安装目录
    pub fn install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.paths.install_dir = dir.into();
        self
    }

    /// 设置更新设置文件
    pub fn settings_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.paths.settings_file = path.into();
        self
    }

    /// 设置模块目录清单文件
    pub fn catalog_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.paths.catalog_file = path.into();
        self
    }

    /// 设置当前内核版本
    pub fn current_version(mut self, version: impl Into<String>) -> Self {
        self.config.core.current_version = version.into();
        self
    }

    /// 设置内核包前缀
    pub fn package_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.core.package_prefix = prefix.into();
        self
    }

    /// 构建配置
    pub fn build(self) -> UpdaterConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = UpdaterConfig::default();
        assert_eq!(config.scheduler.main_actions_interval_secs, 60);
        assert_eq!(config.scheduler.sub_actions_interval_secs, 10);
        assert_eq!(config.scheduler.restart_delay(), Duration::from_secs(10));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.core.package_prefix, "cleep_");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = UpdaterConfig::builder()
            .main_actions_interval(30)
            .log_level("debug")
            .install_dir("/tmp/modules")
            .current_version("0.0.20")
            .build();

        assert_eq!(config.scheduler.main_interval(), Duration::from_secs(30));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.paths.install_dir, PathBuf::from("/tmp/modules"));
        assert_eq!(config.core.current_version, "0.0.20");
    }

    #[test]
    fn test_config_merge() {
        let mut base = UpdaterConfig::default();
        let override_config = UpdaterConfig::builder()
            .sub_actions_interval(2)
            .log_level("debug")
            .file_logging("/var/log/updater")
            .build();

        base.merge(override_config);

        assert_eq!(base.scheduler.sub_actions_interval_secs, 2);
        assert_eq!(base.scheduler.main_actions_interval_secs, 60);
        assert_eq!(base.logging.level, "debug");
        assert!(base.logging.file_output);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = UpdaterConfig::builder().sub_actions_interval(0).build();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, UpdateError::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "scheduler:\n  main_actions_interval_secs: 5\n";
        let config: UpdaterConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.scheduler.main_actions_interval_secs, 5);
        assert_eq!(config.scheduler.sub_actions_interval_secs, 10);
        assert_eq!(config.logging.rotation, "daily");
    }
}
