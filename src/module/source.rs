//! 模块信息来源
//!
//! 定义已安装模块清单（Inventory）、可用模块目录（Catalog）和
//! 内核发布源（ReleaseSource）的接口，并提供基于文件的简单实现：
//!
//! - [`MemoryInventory`] - 内存清单，可从 YAML 文件加载
//! - [`ManifestCatalog`] - `modules.json` 形式的目录清单

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::metadata::{InstalledModule, ModuleInfos};
use crate::utils::{Result, UpdateError};

/// 模块信息查询接口
#[async_trait]
pub trait ModuleInfoSource: Send + Sync {
    /// 查询模块信息，模块未知时返回 `LookupFailure`
    async fn module_infos(&self, module: &str) -> Result<ModuleInfos>;
}

/// 已安装模块清单
#[async_trait]
pub trait Inventory: ModuleInfoSource {
    /// 获取已安装模块快照
    async fn installed_modules(&self) -> Result<HashMap<String, InstalledModule>>;
}

/// 可用模块目录
#[async_trait]
pub trait Catalog: ModuleInfoSource {
    /// 刷新目录，内容有变化时返回 true
    async fn refresh(&self) -> Result<bool>;
}

/// 发布资源文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub url: String,
}

/// 内核发布信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub version: String,
    #[serde(default)]
    pub changelog: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// 内核发布源
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// 获取最新发布，没有任何发布时返回 None
    async fn latest_release(&self) -> Result<Option<Release>>;
}

// ============================================================================
// 内存清单
// ============================================================================

/// 内存中的已安装模块清单
///
/// YAML 文件格式为模块名到模块信息的映射：
///
/// ```yaml
/// audio:
///   version: 1.0.0
///   deps: [system]
/// system:
///   version: 2.0.0
///   loadedby: [audio]
/// ```
#[derive(Debug, Default)]
pub struct MemoryInventory {
    modules: RwLock<HashMap<String, ModuleInfos>>,
}

impl MemoryInventory {
    /// 创建空清单
    pub fn new() -> Self {
        Self::default()
    }

    /// 从模块映射创建
    pub fn with_modules(modules: HashMap<String, ModuleInfos>) -> Self {
        Self {
            modules: RwLock::new(modules),
        }
    }

    /// 从 YAML 文件加载
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let modules: HashMap<String, ModuleInfos> = serde_yaml::from_str(&content)?;
        debug!(count = modules.len(), "已加载模块清单");
        Ok(Self::with_modules(modules))
    }

    /// 添加或替换已安装模块
    pub async fn insert(&self, module: impl Into<String>, infos: ModuleInfos) {
        self.modules.write().await.insert(module.into(), infos);
    }

    /// 移除已安装模块
    pub async fn remove(&self, module: &str) -> Option<ModuleInfos> {
        self.modules.write().await.remove(module)
    }
}

#[async_trait]
impl ModuleInfoSource for MemoryInventory {
    async fn module_infos(&self, module: &str) -> Result<ModuleInfos> {
        self.modules
            .read()
            .await
            .get(module)
            .cloned()
            .ok_or_else(|| UpdateError::lookup(module, "模块未安装"))
    }
}

#[async_trait]
impl Inventory for MemoryInventory {
    async fn installed_modules(&self) -> Result<HashMap<String, InstalledModule>> {
        Ok(self
            .modules
            .read()
            .await
            .iter()
            .map(|(name, infos)| (name.clone(), InstalledModule::new(infos.version.clone())))
            .collect())
    }
}

// ============================================================================
// 目录清单
// ============================================================================

/// 目录清单内容（modules.json）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogManifest {
    /// 清单更新时间戳
    #[serde(default)]
    pub update: i64,
    /// 可用模块
    #[serde(default)]
    pub list: HashMap<String, ModuleInfos>,
}

/// 基于 `modules.json` 文件的模块目录
///
/// `refresh` 重新读取文件，更新时间戳变化时替换内容。
#[derive(Debug)]
pub struct ManifestCatalog {
    path: Option<PathBuf>,
    manifest: RwLock<CatalogManifest>,
}

impl ManifestCatalog {
    /// 从文件加载
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let manifest = Self::read_manifest(&path).await?;
        Ok(Self {
            path: Some(path),
            manifest: RwLock::new(manifest),
        })
    }

    /// 从内存清单创建（刷新永远返回未变化）
    pub fn from_manifest(manifest: CatalogManifest) -> Self {
        Self {
            path: None,
            manifest: RwLock::new(manifest),
        }
    }

    /// 当前清单快照
    pub async fn manifest(&self) -> CatalogManifest {
        self.manifest.read().await.clone()
    }

    async fn read_manifest(path: &Path) -> Result<CatalogManifest> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl ModuleInfoSource for ManifestCatalog {
    async fn module_infos(&self, module: &str) -> Result<ModuleInfos> {
        self.manifest
            .read()
            .await
            .list
            .get(module)
            .cloned()
            .ok_or_else(|| UpdateError::lookup(module, "目录中不存在该模块"))
    }
}

#[async_trait]
impl Catalog for ManifestCatalog {
    async fn refresh(&self) -> Result<bool> {
        let Some(ref path) = self.path else {
            return Ok(false);
        };

        let fresh = Self::read_manifest(path)
            .await
            .map_err(|e| UpdateError::RefreshFailure(format!("{}: {}", path.display(), e)))?;

        let mut manifest = self.manifest.write().await;
        if fresh.update == manifest.update {
            debug!(update = fresh.update, "模块目录未变化");
            return Ok(false);
        }

        info!(old = manifest.update, new = fresh.update, "模块目录已更新");
        *manifest = fresh;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_json(update: i64, version: &str) -> String {
        format!(
            r#"{{"update": {}, "list": {{"audio": {{"version": "{}", "deps": ["system"]}}}}}}"#,
            update, version
        )
    }

    #[tokio::test]
    async fn test_memory_inventory() {
        let inventory = MemoryInventory::new();
        inventory.insert("audio", ModuleInfos::new("1.0.0")).await;

        let installed = inventory.installed_modules().await.unwrap();
        assert_eq!(installed["audio"].version, "1.0.0");
        assert!(installed["audio"].installed);

        assert!(inventory.module_infos("audio").await.is_ok());
        let err = inventory.module_infos("video").await.unwrap_err();
        assert!(matches!(err, UpdateError::LookupFailure { .. }));
    }

    #[tokio::test]
    async fn test_memory_inventory_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.yaml");
        tokio::fs::write(
            &path,
            "audio:\n  version: 1.0.0\n  deps: [system]\nsystem:\n  version: 2.0.0\n  loadedby: [audio]\n",
        )
        .await
        .unwrap();

        let inventory = MemoryInventory::from_file(&path).await.unwrap();
        let system = inventory.module_infos("system").await.unwrap();
        assert_eq!(system.loadedby, vec!["audio".to_string()]);
    }

    #[tokio::test]
    async fn test_catalog_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modules.json");
        tokio::fs::write(&path, manifest_json(1, "1.0.0")).await.unwrap();

        let catalog = ManifestCatalog::load(&path).await.unwrap();
        assert_eq!(catalog.module_infos("audio").await.unwrap().version, "1.0.0");
        assert!(!catalog.refresh().await.unwrap());

        tokio::fs::write(&path, manifest_json(2, "1.1.0")).await.unwrap();
        assert!(catalog.refresh().await.unwrap());
        assert_eq!(catalog.module_infos("audio").await.unwrap().version, "1.1.0");
    }

    #[tokio::test]
    async fn test_catalog_refresh_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("modules.json");
        tokio::fs::write(&path, manifest_json(1, "1.0.0")).await.unwrap();
        let catalog = ManifestCatalog::load(&path).await.unwrap();

        tokio::fs::remove_file(&path).await.unwrap();
        let err = catalog.refresh().await.unwrap_err();
        assert!(matches!(err, UpdateError::RefreshFailure(_)));
        // 刷新失败不影响已有内容
        assert!(catalog.module_infos("audio").await.is_ok());
    }

    #[tokio::test]
    async fn test_in_memory_catalog_never_changes() {
        let catalog = ManifestCatalog::from_manifest(CatalogManifest::default());
        assert!(!catalog.refresh().await.unwrap());
        assert!(catalog.module_infos("audio").await.is_err());
    }
}
