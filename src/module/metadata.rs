//! 模块元数据定义
//!
//! 定义模块信息（清单与目录共用的结构）、已安装模块记录以及
//! 对外暴露的模块更新状态。

use serde::{Deserialize, Serialize};

/// 模块信息
///
/// 清单（已安装模块）与目录（可用模块）共用同一结构，
/// 可选字段均有默认值。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfos {
    /// 模块版本
    pub version: String,

    /// 依赖的模块列表
    #[serde(default)]
    pub deps: Vec<String>,

    /// 依赖本模块的模块列表
    #[serde(default)]
    pub loadedby: Vec<String>,

    /// 更新日志
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,

    /// 安装包地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<String>,

    /// 校验文件地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl ModuleInfos {
    /// 创建只有版本号的模块信息
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Default::default()
        }
    }

    /// 设置依赖列表
    pub fn with_deps<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deps = deps.into_iter().map(Into::into).collect();
        self
    }

    /// 设置被依赖列表
    pub fn with_loadedby<I, S>(mut self, loadedby: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.loadedby = loadedby.into_iter().map(Into::into).collect();
        self
    }

    /// 设置更新日志
    pub fn with_changelog(mut self, changelog: impl Into<String>) -> Self {
        self.changelog = Some(changelog.into());
        self
    }
}

/// 已安装模块记录（清单快照中的一项）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledModule {
    /// 是否已安装
    #[serde(default = "default_installed")]
    pub installed: bool,
    /// 已安装版本
    pub version: String,
}

fn default_installed() -> bool {
    true
}

impl InstalledModule {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            installed: true,
            version: version.into(),
        }
    }
}

/// 进行中操作的进度信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProgress {
    /// 进度 [0, 100]
    pub progress: u8,
    /// 是否失败（失败时进度强制为 100）
    pub failed: bool,
    /// 目标版本
    pub version: Option<String>,
    /// 目标版本的更新日志
    pub changelog: Option<String>,
}

/// 模块更新状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleUpdateStatus {
    /// 是否有可用更新
    pub updatable: bool,
    /// 是否正在处理
    pub processing: bool,
    /// 模块名称
    pub name: String,
    /// 已安装版本（未安装时为 None）
    pub installed_version: Option<String>,
    /// 进度信息
    pub update: UpdateProgress,
}

impl ModuleUpdateStatus {
    /// 创建新的状态记录
    pub fn new(
        name: impl Into<String>,
        installed_version: Option<String>,
        target_version: Option<String>,
    ) -> Self {
        Self {
            updatable: false,
            processing: false,
            name: name.into(),
            installed_version,
            update: UpdateProgress {
                version: target_version,
                ..Default::default()
            },
        }
    }

    /// 是否已安装
    pub fn is_installed(&self) -> bool {
        self.installed_version.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_infos_defaults() {
        let infos: ModuleInfos = serde_json::from_str(r#"{"version": "1.0.0"}"#).unwrap();
        assert_eq!(infos.version, "1.0.0");
        assert!(infos.deps.is_empty());
        assert!(infos.loadedby.is_empty());
        assert!(infos.changelog.is_none());
    }

    #[test]
    fn test_module_infos_builder() {
        let infos = ModuleInfos::new("2.1.0")
            .with_deps(["audio", "network"])
            .with_loadedby(["player"])
            .with_changelog("fix crash");

        assert_eq!(infos.deps, vec!["audio".to_string(), "network".to_string()]);
        assert_eq!(infos.loadedby, vec!["player".to_string()]);
        assert_eq!(infos.changelog.as_deref(), Some("fix crash"));
    }

    #[test]
    fn test_installed_module_yaml() {
        let module: InstalledModule = serde_yaml::from_str("version: 1.2.3\n").unwrap();
        assert!(module.installed);
        assert_eq!(module.version, "1.2.3");
    }

    #[test]
    fn test_status_new() {
        let status = ModuleUpdateStatus::new("audio", None, Some("1.0.0".to_string()));
        assert!(!status.is_installed());
        assert!(!status.processing);
        assert_eq!(status.update.progress, 0);
        assert_eq!(status.update.version.as_deref(), Some("1.0.0"));
    }
}
