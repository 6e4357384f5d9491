//! 更新设置持久化
//!
//! 保存自动更新开关、待安装的内核更新以及最近一次检查的时间戳。

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::utils::Result;

/// 待安装的内核更新
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreUpdate {
    /// 最新版本
    pub version: Option<String>,
    /// 更新日志
    pub changelog: Option<String>,
    /// 安装包地址
    pub package_url: Option<String>,
    /// 校验文件地址
    pub checksum_url: Option<String>,
}

impl CoreUpdate {
    /// 是否有可安装的内核更新
    pub fn is_available(&self) -> bool {
        self.version.is_some()
    }
}

/// 更新设置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSettings {
    /// 是否自动更新内核
    #[serde(default)]
    pub core_update_enabled: bool,

    /// 是否自动更新模块
    #[serde(default)]
    pub modules_update_enabled: bool,

    /// 待安装的内核更新
    #[serde(default)]
    pub core_update: CoreUpdate,

    /// 最近一次内核更新检查（Unix 时间戳，秒）
    #[serde(default)]
    pub core_last_check: Option<i64>,

    /// 是否至少有一个模块可更新
    #[serde(default)]
    pub modules_update: bool,

    /// 最近一次模块更新检查（Unix 时间戳，秒）
    #[serde(default)]
    pub modules_last_check: Option<i64>,
}

/// 设置存储接口
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// 读取设置
    async fn load(&self) -> Result<UpdateSettings>;

    /// 写入设置
    async fn save(&self, settings: &UpdateSettings) -> Result<()>;
}

/// JSON 文件设置存储
///
/// 文件不存在时返回默认设置。
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    /// 创建文件存储
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 文件路径
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load(&self) -> Result<UpdateSettings> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "设置文件不存在，使用默认设置");
                Ok(UpdateSettings::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, settings: &UpdateSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        tokio::fs::write(&self.path, content).await?;
        debug!(path = %self.path.display(), "设置已保存");
        Ok(())
    }
}

/// 内存设置存储
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: RwLock<UpdateSettings>,
}

impl MemorySettingsStore {
    /// 以给定设置创建
    pub fn new(settings: UpdateSettings) -> Self {
        Self {
            settings: RwLock::new(settings),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<UpdateSettings> {
        Ok(self.settings.read().await.clone())
    }

    async fn save(&self, settings: &UpdateSettings) -> Result<()> {
        *self.settings.write().await = settings.clone();
        Ok(())
    }
}
