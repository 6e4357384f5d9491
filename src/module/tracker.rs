//! 处理进度跟踪
//!
//! 每个已知模块一条 [`ModuleUpdateStatus`] 记录，以及当前正在处理的模块指针。
//! 进度可以作用于当前模块或指定模块，范围 [0, 100]，失败时强制为 100。

use std::collections::HashMap;

use tracing::{debug, warn};

use super::metadata::{InstalledModule, ModuleUpdateStatus};
use crate::scheduler::action::ActionKind;

/// 进度跟踪器
#[derive(Debug, Default)]
pub struct ProcessTracker {
    statuses: HashMap<String, ModuleUpdateStatus>,
    current: Option<String>,
}

impl ProcessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用清单快照初始化（已有记录保留进度信息，只刷新已安装版本）
    pub fn load_installed(&mut self, installed: &HashMap<String, InstalledModule>) {
        for (name, module) in installed.iter().filter(|(_, m)| m.installed) {
            self.statuses
                .entry(name.clone())
                .and_modify(|status| status.installed_version = Some(module.version.clone()))
                .or_insert_with(|| {
                    ModuleUpdateStatus::new(name.clone(), Some(module.version.clone()), None)
                });
        }
        debug!(count = self.statuses.len(), "已载入模块状态");
    }

    /// 模块不存在记录时创建
    pub fn begin_if_absent(
        &mut self,
        module: &str,
        installed_version: Option<String>,
        target_version: Option<String>,
    ) {
        if !self.statuses.contains_key(module) {
            self.statuses.insert(
                module.to_string(),
                ModuleUpdateStatus::new(module, installed_version, target_version),
            );
        }
    }

    /// 开始处理模块：标记处理中，进度归零，清除失败标记
    pub fn begin_operation(&mut self, module: &str) {
        self.end_operation();
        self.begin_if_absent(module, None, None);
        if let Some(status) = self.statuses.get_mut(module) {
            status.processing = true;
            status.update.progress = 0;
            status.update.failed = false;
        }
        self.current = Some(module.to_string());
    }

    /// 结束当前处理
    pub fn end_operation(&mut self) {
        if let Some(module) = self.current.take() {
            if let Some(status) = self.statuses.get_mut(&module) {
                status.processing = false;
            }
        }
    }

    /// 当前处理的模块
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// 更新当前模块的进度
    ///
    /// - `progress` 直接设置进度
    /// - `increment` 在当前进度上增加
    /// - `failed` 设置失败标记，为 true 时进度强制为 100
    pub fn set_progress(&mut self, progress: Option<u8>, increment: Option<u8>, failed: Option<bool>) {
        let Some(module) = self.current.clone() else {
            warn!("没有正在处理的模块，忽略进度更新");
            return;
        };
        self.set_progress_for(&module, progress, increment, failed);
    }

    /// 更新指定模块的进度，规则同 [`set_progress`](Self::set_progress)
    pub fn set_progress_for(
        &mut self,
        module: &str,
        progress: Option<u8>,
        increment: Option<u8>,
        failed: Option<bool>,
    ) {
        let Some(status) = self.statuses.get_mut(module) else {
            warn!(module = %module, "模块没有状态记录，忽略进度更新");
            return;
        };

        if let Some(value) = progress {
            status.update.progress = value.min(100);
        }
        if let Some(step) = increment {
            status.update.progress = status.update.progress.saturating_add(step).min(100);
        }
        if let Some(failed) = failed {
            status.update.failed = failed;
        }
        if status.update.failed {
            status.update.progress = 100;
        }
    }

    /// 没有正在处理的模块或当前模块已失败
    pub fn is_current_failed(&self) -> bool {
        self.current
            .as_deref()
            .map(|module| self.is_failed(module))
            .unwrap_or(true)
    }

    /// 模块没有状态记录或已失败
    pub fn is_failed(&self, module: &str) -> bool {
        self.statuses
            .get(module)
            .map(|status| status.update.failed)
            .unwrap_or(true)
    }

    /// 记录一个成功完成的步骤，保持已安装版本同步
    pub fn record_done(&mut self, module: &str, kind: ActionKind, version: &str) {
        self.begin_if_absent(module, None, None);
        if let Some(status) = self.statuses.get_mut(module) {
            match kind {
                ActionKind::Install | ActionKind::Update => {
                    status.installed_version = Some(version.to_string());
                    status.updatable = false;
                }
                ActionKind::Uninstall => {
                    status.installed_version = None;
                    status.updatable = false;
                }
            }
        }
    }

    /// 标记模块可更新
    pub fn mark_updatable(&mut self, module: &str, version: &str, changelog: Option<String>) {
        if let Some(status) = self.statuses.get_mut(module) {
            status.updatable = true;
            status.update.version = Some(version.to_string());
            status.update.changelog = changelog;
        }
    }

    pub fn get(&self, module: &str) -> Option<&ModuleUpdateStatus> {
        self.statuses.get(module)
    }

    /// 模块是否已安装
    pub fn is_installed(&self, module: &str) -> bool {
        self.statuses
            .get(module)
            .map(ModuleUpdateStatus::is_installed)
            .unwrap_or(false)
    }

    /// 已安装模块名及版本
    pub fn installed_versions(&self) -> Vec<(String, String)> {
        self.statuses
            .values()
            .filter_map(|s| s.installed_version.clone().map(|v| (s.name.clone(), v)))
            .collect()
    }

    /// 可更新的模块名
    pub fn updatable_modules(&self) -> Vec<String> {
        let mut modules: Vec<String> = self
            .statuses
            .values()
            .filter(|s| s.updatable)
            .map(|s| s.name.clone())
            .collect();
        modules.sort();
        modules
    }

    /// 状态快照
    pub fn snapshot(&self) -> HashMap<String, ModuleUpdateStatus> {
        self.statuses.clone()
    }
}
