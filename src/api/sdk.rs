//! 更新器 SDK
//!
//! 提供 [`Updater`] 结构体作为更新器的主接口，是外部使用本 crate 的入口点。
//!
//! # 功能概述
//!
//! - 安装、更新、卸载请求的校验与提交
//! - 模块与内核的更新检查
//! - 内核更新及完成后的平台重启
//! - 自动更新开关与每日检查
//!
//! # 使用示例
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chips_updater::api::Updater;
//! # use chips_updater::module::{Processor, CoreInstaller, Restarter, ReleaseSource};
//! use chips_updater::module::{ManifestCatalog, MemoryInventory};
//! use chips_updater::UpdaterConfig;
//!
//! # async fn run(
//! #     processor: Arc<dyn Processor>,
//! #     installer: Arc<dyn CoreInstaller>,
//! #     restarter: Arc<dyn Restarter>,
//! #     releases: Arc<dyn ReleaseSource>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let config = UpdaterConfig::default();
//! let catalog = ManifestCatalog::load(&config.paths.catalog_file).await?;
//!
//! let updater = Updater::builder(config)
//!     .inventory(Arc::new(MemoryInventory::new()))
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

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, instrument, warn};

use crate::core::config::UpdaterConfig;
use crate::core::settings::{CoreUpdate, FileSettingsStore, SettingsStore, UpdateSettings};
use crate::event::{event_types, Event, EventBus};
use crate::module::metadata::ModuleUpdateStatus;
use crate::module::processor::{
    status_channel, CoreInstaller, FileStatusStore, ProcessCode, ProcessStatus, Processor,
    Restarter, StatusStore, CORE_MODULE_NAME,
};
use crate::module::source::{Catalog, Inventory, Release, ReleaseSource};
use crate::scheduler::{ActionExtra, ActionKind, BatchPlanner, UpdateScheduler};
use crate::utils::{is_newer, Result, UpdateError};

// ============================================================================
// 检查结果
// ============================================================================

/// 每日检查时间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckTime {
    pub hour: u32,
    pub minute: u32,
}

impl CheckTime {
    /// 在一天中随机选择检查时间
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            hour: rng.gen_range(0..24),
            minute: rng.gen_range(0..60),
        }
    }

    pub fn matches(&self, hour: u32, minute: u32) -> bool {
        self.hour == hour && self.minute == minute
    }
}

/// 模块更新检查结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulesCheck {
    /// 是否至少有一个模块可更新
    pub modules_update: bool,
    /// 模块目录是否有变化
    pub catalog_updated: bool,
    /// 检查时间（Unix 时间戳，秒）
    pub last_check: i64,
}

/// 内核更新检查结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreCheck {
    pub core_update: CoreUpdate,
    pub last_check: i64,
}

// ============================================================================
// 设置访问
// ============================================================================

/// 串行化的设置读改写
#[derive(Clone)]
struct SettingsHandle {
    store: Arc<dyn SettingsStore>,
    lock: Arc<Mutex<()>>,
}

impl SettingsHandle {
    fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self {
            store,
            lock: Arc::new(Mutex::new(())),
        }
    }

    async fn load(&self) -> Result<UpdateSettings> {
        let _guard = self.lock.lock().await;
        self.store.load().await
    }

    async fn update<F>(&self, apply: F) -> Result<UpdateSettings>
    where
        F: FnOnce(&mut UpdateSettings),
    {
        let _guard = self.lock.lock().await;
        let mut settings = self.store.load().await?;
        apply(&mut settings);
        self.store.save(&settings).await?;
        Ok(settings)
    }
}

// ============================================================================
// 更新器
// ============================================================================

/// 更新器主接口
pub struct Updater {
    config: UpdaterConfig,
    scheduler: UpdateScheduler,
    inventory: Arc<dyn Inventory>,
    catalog: Arc<dyn Catalog>,
    releases: Arc<dyn ReleaseSource>,
    core_installer: Arc<dyn CoreInstaller>,
    restarter: Arc<dyn Restarter>,
    status_store: Arc<dyn StatusStore>,
    settings: SettingsHandle,
    event_bus: EventBus,
    check_time: CheckTime,
}

impl Updater {
    /// 创建构建器
    pub fn builder(config: UpdaterConfig) -> UpdaterBuilder {
        UpdaterBuilder::new(config)
    }

    /// 初始化模块状态并恢复自动更新设置
    ///
    /// 从清单加载已安装模块；开启了模块自动更新时启动主轮询器并提交可更新模块。
    #[instrument(skip(self))]
    pub async fn configure(&self) -> Result<()> {
        let installed = self.inventory.installed_modules().await?;
        self.scheduler
            .tracker()
            .write()
            .await
            .load_installed(&installed);
        info!(installed = installed.len(), "已加载已安装模块");

        let settings = self.settings.load().await?;
        if settings.modules_update_enabled {
            self.scheduler.set_modules_auto_update(true).await;
            self.update_modules().await;
        }
        Ok(())
    }

    // ========================================================================
    // 请求提交
    // ========================================================================

    /// 提交模块安装
    ///
    /// 返回 false 表示已有相同的待处理请求。
    pub async fn submit_install(&self, module: &str) -> Result<bool> {
        let module = require_module(module)?;
        if self.is_installed(module).await {
            return Err(UpdateError::InvalidParameter(format!(
                "模块 '{}' 已安装",
                module
            )));
        }
        Ok(self.scheduler.submit(ActionKind::Install, module, None).await)
    }

    /// 提交模块更新
    pub async fn submit_update(&self, module: &str) -> Result<bool> {
        let module = require_module(module)?;
        self.require_installed(module).await?;
        Ok(self.scheduler.submit(ActionKind::Update, module, None).await)
    }

    /// 提交模块卸载
    ///
    /// `force` 为 true 时处理器忽略卸载过程中的错误。
    pub async fn submit_uninstall(&self, module: &str, force: bool) -> Result<bool> {
        let module = require_module(module)?;
        self.require_installed(module).await?;
        Ok(self
            .scheduler
            .submit(ActionKind::Uninstall, module, Some(ActionExtra { force }))
            .await)
    }

    /// 为所有可更新模块提交更新，返回新提交的模块
    pub async fn update_modules(&self) -> Vec<String> {
        let updatable = self.scheduler.tracker().read().await.updatable_modules();
        let mut submitted = Vec::new();
        for module in updatable {
            if self.scheduler.submit(ActionKind::Update, &module, None).await {
                submitted.push(module);
            }
        }
        if !submitted.is_empty() {
            info!(modules = ?submitted, "已提交模块更新");
        }
        submitted
    }

    /// 所有模块的状态
    pub async fn get_statuses(&self) -> HashMap<String, ModuleUpdateStatus> {
        self.scheduler.statuses().await
    }

    /// 设置自动更新开关
    pub async fn set_automatic_update(
        &self,
        core_update_enabled: bool,
        modules_update_enabled: bool,
    ) -> Result<UpdateSettings> {
        let settings = self
            .settings
            .update(|s| {
                s.core_update_enabled = core_update_enabled;
                s.modules_update_enabled = modules_update_enabled;
            })
            .await?;
        self.scheduler
            .set_modules_auto_update(modules_update_enabled)
            .await;
        info!(core_update_enabled, modules_update_enabled, "自动更新设置已保存");
        Ok(settings)
    }

    // ========================================================================
    // 更新检查
    // ========================================================================

    /// 检查模块更新
    ///
    /// 目录有变化时，把目录版本更新的已安装模块标记为可更新。
    #[instrument(skip(self))]
    pub async fn check_modules_updates(&self) -> Result<ModulesCheck> {
        let catalog_updated = self.catalog.refresh().await.map_err(|e| match e {
            UpdateError::RefreshFailure(_) => e,
            other => UpdateError::RefreshFailure(other.to_string()),
        })?;

        let mut modules_update = false;
        if catalog_updated {
            let installed = self.scheduler.tracker().read().await.installed_versions();
            for (module, version) in installed {
                let infos = match self.catalog.module_infos(&module).await {
                    Ok(infos) => infos,
                    Err(e) => {
                        debug!(module = %module, error = %e, "目录中没有该模块");
                        continue;
                    }
                };
                if is_newer(&version, &infos.version) {
                    info!(
                        module = %module,
                        installed = %version,
                        available = %infos.version,
                        "发现模块新版本"
                    );
                    self.scheduler.tracker().write().await.mark_updatable(
                        &module,
                        &infos.version,
                        infos.changelog.clone(),
                    );
                    modules_update = true;
                }
            }
        }

        let last_check = chrono::Utc::now().timestamp();
        self.settings
            .update(|s| {
                s.modules_update = modules_update;
                s.modules_last_check = Some(last_check);
            })
            .await?;

        Ok(ModulesCheck {
            modules_update,
            catalog_updated,
            last_check,
        })
    }

    /// 检查内核更新
    ///
    /// 只有找到安装包和对应的校验文件时才记录新版本。
    #[instrument(skip(self))]
    pub async fn check_core_updates(&self) -> Result<CoreCheck> {
        let latest = self.releases.latest_release().await.map_err(|e| {
            error!(error = %e, "获取内核发布信息失败");
            UpdateError::RefreshFailure(format!("内核发布信息: {}", e))
        })?;

        let current = &self.config.core.current_version;
        let core_update = match latest {
            None => {
                warn!("没有找到任何内核发布");
                CoreUpdate::default()
            }
            Some(release) if is_newer(current, &release.version) => {
                info!(installed = %current, latest = %release.version, "发现内核新版本");
                core_update_from_release(&release, &self.config.core.package_prefix)
            }
            Some(release) => {
                info!(installed = %current, latest = %release.version, "内核已是最新版本");
                CoreUpdate::default()
            }
        };

        let last_check = chrono::Utc::now().timestamp();
        self.settings
            .update(|s| {
                s.core_update = core_update.clone();
                s.core_last_check = Some(last_check);
            })
            .await?;

        Ok(CoreCheck {
            core_update,
            last_check,
        })
    }

    // ========================================================================
    // 内核更新
    // ========================================================================

    /// 安装待处理的内核更新
    ///
    /// 安装在后台进行，期间占用处理器槽位。成功后按配置的延迟请求平台重启。
    #[instrument(skip(self))]
    pub async fn update_core(&self) -> Result<()> {
        let settings = self.settings.load().await?;
        if !settings.core_update.is_available() {
            return Err(UpdateError::InvalidParameter(
                "没有可安装的内核更新，请先检查更新".to_string(),
            ));
        }

        if !self.scheduler.processor_slot().try_occupy() {
            return Err(UpdateError::process(CORE_MODULE_NAME, "另一个处理正在进行"));
        }

        let update = settings.core_update;
        info!(
            version = ?update.version,
            package_url = ?update.package_url,
            "开始内核更新"
        );

        let (reporter, receiver) = status_channel(None);
        let fallback = reporter.clone();
        let installer = self.core_installer.clone();
        let completion = CoreCompletion {
            scheduler: self.scheduler.clone(),
            event_bus: self.event_bus.clone(),
            status_store: self.status_store.clone(),
            settings: self.settings.clone(),
            restarter: self.restarter.clone(),
            restart_delay: self.config.scheduler.restart_delay(),
        };

        tokio::spawn(async move {
            let call = async {
                if let Err(e) = installer.install(&update, reporter).await {
                    error!(error = %e, "内核安装器启动失败");
                    fallback.report(
                        ProcessStatus::new(None, ProcessCode::Error).with_stderr(e.to_string()),
                    );
                }
                drop(fallback);
            };
            tokio::join!(call, completion.consume(receiver));
        });

        Ok(())
    }

    // ========================================================================
    // 定时检查
    // ========================================================================

    /// 时间通知
    ///
    /// 到达每日检查时间时检查更新，并按设置优先更新内核，否则更新模块。
    /// 返回是否执行了检查。
    pub async fn on_time(&self, hour: u32, minute: u32) -> bool {
        if !self.check_time.matches(hour, minute) {
            return false;
        }
        info!(hour, minute, "到达每日更新检查时间");

        if let Err(e) = self.check_core_updates().await {
            warn!(error = %e, "内核更新检查失败");
        }
        if let Err(e) = self.check_modules_updates().await {
            warn!(error = %e, "模块更新检查失败");
        }

        let settings = match self.settings.load().await {
            Ok(settings) => settings,
            Err(e) => {
                error!(error = %e, "读取设置失败");
                return true;
            }
        };

        if settings.core_update_enabled {
            if let Err(e) = self.update_core().await {
                debug!(error = %e, "未执行内核更新");
            }
        } else if settings.modules_update_enabled {
            self.update_modules().await;
        }
        true
    }

    // ========================================================================
    // 状态查询
    // ========================================================================

    /// 是否需要重启以加载已处理的模块
    pub fn need_restart(&self) -> bool {
        self.scheduler.need_restart()
    }

    /// 当前设置
    pub async fn settings(&self) -> Result<UpdateSettings> {
        self.settings.load().await
    }

    pub fn check_time(&self) -> CheckTime {
        self.check_time
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &UpdateScheduler {
        &self.scheduler
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// 停止调度器
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
    }

    async fn is_installed(&self, module: &str) -> bool {
        self.scheduler.tracker().read().await.is_installed(module)
    }

    async fn require_installed(&self, module: &str) -> Result<()> {
        if self.is_installed(module).await {
            Ok(())
        } else {
            Err(UpdateError::InvalidParameter(format!(
                "模块 '{}' 未安装",
                module
            )))
        }
    }
}

fn require_module(module: &str) -> Result<&str> {
    let module = module.trim();
    if module.is_empty() {
        return Err(UpdateError::MissingParameter("module".to_string()));
    }
    Ok(module)
}

/// 从发布信息中找出安装包和校验文件
fn core_update_from_release(release: &Release, prefix: &str) -> CoreUpdate {
    let package = release
        .assets
        .iter()
        .find(|a| a.name.starts_with(prefix) && a.name.ends_with(".zip"));

    let checksum = package.and_then(|package| {
        let stem = package.name.trim_end_matches(".zip");
        let checksum_name = format!("{}.sha256", stem);
        release.assets.iter().find(|a| a.name == checksum_name)
    });

    match (package, checksum) {
        (Some(package), Some(checksum)) => CoreUpdate {
            version: Some(release.version.clone()),
            changelog: release.changelog.clone(),
            package_url: Some(package.url.clone()),
            checksum_url: Some(checksum.url.clone()),
        },
        _ => {
            warn!(
                version = %release.version,
                package_found = package.is_some(),
                "内核有新版本，但缺少安装包或校验文件"
            );
            CoreUpdate::default()
        }
    }
}

/// 内核更新状态处理
struct CoreCompletion {
    scheduler: UpdateScheduler,
    event_bus: EventBus,
    status_store: Arc<dyn StatusStore>,
    settings: SettingsHandle,
    restarter: Arc<dyn Restarter>,
    restart_delay: Duration,
}

impl CoreCompletion {
    async fn consume(&self, mut receiver: mpsc::UnboundedReceiver<ProcessStatus>) {
        while let Some(status) = receiver.recv().await {
            let terminal = status.is_terminal();
            self.handle(status).await;
            if terminal {
                return;
            }
        }

        warn!("内核安装器未上报终止状态即结束");
        self.handle(
            ProcessStatus::new(None, ProcessCode::Error)
                .with_stderr("installer ended without a terminal status"),
        )
        .await;
    }

    async fn handle(&self, status: ProcessStatus) {
        debug!(status = ?status.status, "内核更新状态");
        self.event_bus
            .publish(Event::from_updater(
                event_types::CORE_UPDATE,
                json!({ "status": status.status }),
            ))
            .await;

        if !status.is_terminal() {
            return;
        }

        if let Err(e) = self.status_store.store(CORE_MODULE_NAME, &status).await {
            warn!(error = %e, "内核处理状态保存失败");
        }
        if let Err(e) = self
            .settings
            .update(|s| s.core_update = CoreUpdate::default())
            .await
        {
            warn!(error = %e, "清除内核更新信息失败");
        }
        self.scheduler.processor_slot().release();

        if status.status == ProcessCode::Done {
            info!(delay = ?self.restart_delay, "内核更新完成，请求重启");
            if let Err(e) = self.restarter.restart(self.restart_delay).await {
                error!(error = %e, "请求重启失败");
            }
        } else {
            error!(status = ?status.status, stderr = ?status.stderr, "内核更新失败");
        }
    }
}

// ============================================================================
// 构建器
// ============================================================================

/// 更新器构建器
///
/// 清单、目录、处理器、内核安装器、重启器和发布源必须提供；
/// 设置存储和状态存储默认使用配置中的文件路径。
pub struct UpdaterBuilder {
    config: UpdaterConfig,
    inventory: Option<Arc<dyn Inventory>>,
    catalog: Option<Arc<dyn Catalog>>,
    processor: Option<Arc<dyn Processor>>,
    core_installer: Option<Arc<dyn CoreInstaller>>,
    restarter: Option<Arc<dyn Restarter>>,
    releases: Option<Arc<dyn ReleaseSource>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    status_store: Option<Arc<dyn StatusStore>>,
    event_bus: Option<EventBus>,
    check_time: Option<CheckTime>,
}

impl UpdaterBuilder {
    pub fn new(config: UpdaterConfig) -> Self {
        Self {
            config,
            inventory: None,
            catalog: None,
            processor: None,
            core_installer: None,
            restarter: None,
            releases: None,
            settings_store: None,
            status_store: None,
            event_bus: None,
            check_time: None,
        }
    }

    pub fn inventory(mut self, inventory: Arc<dyn Inventory>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn processor(mut self, processor: Arc<dyn Processor>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn core_installer(mut self, installer: Arc<dyn CoreInstaller>) -> Self {
        self.core_installer = Some(installer);
        self
    }

    pub fn restarter(mut self, restarter: Arc<dyn Restarter>) -> Self {
        self.restarter = Some(restarter);
        self
    }

    pub fn release_source(mut self, releases: Arc<dyn ReleaseSource>) -> Self {
        self.releases = Some(releases);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn status_store(mut self, store: Arc<dyn StatusStore>) -> Self {
        self.status_store = Some(store);
        self
    }

    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// 固定每日检查时间（默认随机）
    pub fn check_time(mut self, hour: u32, minute: u32) -> Self {
        self.check_time = Some(CheckTime { hour, minute });
        self
    }

    /// 构建更新器
    ///
    /// 配置无效或缺少必要组件时返回错误。
    pub fn build(self) -> Result<Updater> {
        self.config.validate()?;

        let inventory = required(self.inventory, "inventory")?;
        let catalog = required(self.catalog, "catalog")?;
        let processor = required(self.processor, "processor")?;
        let core_installer = required(self.core_installer, "core_installer")?;
        let restarter = required(self.restarter, "restarter")?;
        let releases = required(self.releases, "release_source")?;

        let settings_store = self.settings_store.unwrap_or_else(|| {
            Arc::new(FileSettingsStore::new(self.config.paths.settings_file.clone()))
                as Arc<dyn SettingsStore>
        });
        let status_store = self.status_store.unwrap_or_else(|| {
            Arc::new(FileStatusStore::new(self.config.paths.install_dir.clone()))
                as Arc<dyn StatusStore>
        });
        let event_bus = self.event_bus.unwrap_or_default();
        let check_time = self.check_time.unwrap_or_else(CheckTime::random);

        let scheduler = UpdateScheduler::new(
            &self.config.scheduler,
            BatchPlanner::new(inventory.clone(), catalog.clone()),
            processor,
            status_store.clone(),
            event_bus.clone(),
        );

        info!(
            version = crate::VERSION,
            core_version = %self.config.core.current_version,
            check_hour = check_time.hour,
            check_minute = check_time.minute,
            "更新器初始化完成"
        );

        Ok(Updater {
            config: self.config,
            scheduler,
            inventory,
            catalog,
            releases,
            core_installer,
            restarter,
            status_store,
            settings: SettingsHandle::new(settings_store),
            event_bus,
            check_time,
        })
    }
}

fn required<T>(component: Option<T>, name: &str) -> Result<T> {
    component.ok_or_else(|| UpdateError::InitFailed(format!("缺少组件: {}", name)))
}

// ============================================================================
// 单元测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::MemorySettingsStore;
    use crate::module::metadata::ModuleInfos;
    use crate::module::processor::StatusReporter;
    use crate::module::source::{CatalogManifest, ManifestCatalog, MemoryInventory, ReleaseAsset};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoopProcessor;

    #[async_trait]
    impl Processor for NoopProcessor {
        async fn install_module(&self, _: &str, _: &ModuleInfos, r: StatusReporter) -> Result<()> {
            r.report_code(ProcessCode::Done);
            Ok(())
        }
        async fn update_module(&self, _: &str, _: &ModuleInfos, r: StatusReporter) -> Result<()> {
            r.report_code(ProcessCode::Done);
            Ok(())
        }
        async fn uninstall_module(
            &self,
            _: &str,
            _: &ModuleInfos,
            _: bool,
            r: StatusReporter,
        ) -> Result<()> {
            r.report_code(ProcessCode::Done);
            Ok(())
        }
    }

    struct DoneInstaller;

    #[async_trait]
    impl CoreInstaller for DoneInstaller {
        async fn install(&self, _: &CoreUpdate, r: StatusReporter) -> Result<()> {
            r.report_code(ProcessCode::Processing);
            r.report_code(ProcessCode::Done);
            Ok(())
        }
    }

    #[derive(Default)]
    struct CountingRestarter {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Restarter for CountingRestarter {
        async fn restart(&self, _: Duration) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FixedRelease(Option<Release>);

    #[async_trait]
    impl ReleaseSource for FixedRelease {
        async fn latest_release(&self) -> Result<Option<Release>> {
            Ok(self.0.clone())
        }
    }

    struct NullStore;

    #[async_trait]
    impl StatusStore for NullStore {
        async fn store(&self, _: &str, _: &ProcessStatus) -> Result<()> {
            Ok(())
        }
    }

    fn release(version: &str, assets: &[&str]) -> Release {
        Release {
            version: version.to_string(),
            changelog: Some("fixes".to_string()),
            assets: assets
                .iter()
                .map(|name| ReleaseAsset {
                    name: name.to_string(),
                    url: format!("https://example.org/{}", name),
                })
                .collect(),
        }
    }

    fn updater(release: Option<Release>, restarter: Arc<CountingRestarter>) -> Updater {
        let config = UpdaterConfig::builder().current_version("1.0.0").build();
        Updater::builder(config)
            .inventory(Arc::new(MemoryInventory::with_modules(
                [("audio".to_string(), ModuleInfos::new("1.0.0"))].into(),
            )))
            .catalog(Arc::new(ManifestCatalog::from_manifest(CatalogManifest::default())))
            .processor(Arc::new(NoopProcessor))
            .core_installer(Arc::new(DoneInstaller))
            .restarter(restarter)
            .release_source(Arc::new(FixedRelease(release)))
            .settings_store(Arc::new(MemorySettingsStore::default()))
            .status_store(Arc::new(NullStore))
            .check_time(3, 15)
            .build()
            .unwrap()
    }

    #[test]
    fn test_random_check_time_in_range() {
        for _ in 0..50 {
            let time = CheckTime::random();
            assert!(time.hour < 24);
            assert!(time.minute < 60);
        }
    }

    #[test]
    fn test_core_update_requires_both_assets() {
        let full = release("1.1.0", &["cleep_1.1.0.zip", "cleep_1.1.0.sha256", "notes.txt"]);
        let update = core_update_from_release(&full, "cleep_");
        assert_eq!(update.version.as_deref(), Some("1.1.0"));
        assert_eq!(
            update.checksum_url.as_deref(),
            Some("https://example.org/cleep_1.1.0.sha256")
        );

        let missing = release("1.1.0", &["cleep_1.1.0.zip"]);
        assert!(!core_update_from_release(&missing, "cleep_").is_available());
    }

    #[test]
    fn test_build_requires_components() {
        let result = Updater::builder(UpdaterConfig::default()).build();
        assert!(matches!(result, Err(UpdateError::InitFailed(_))));
    }

    #[tokio::test]
    async fn test_submit_validation() {
        let updater = updater(None, Arc::default());
        updater.configure().await.unwrap();

        assert!(matches!(
            updater.submit_install("  ").await,
            Err(UpdateError::MissingParameter(_))
        ));
        assert!(matches!(
            updater.submit_install("audio").await,
            Err(UpdateError::InvalidParameter(_))
        ));
        assert!(matches!(
            updater.submit_update("video").await,
            Err(UpdateError::InvalidParameter(_))
        ));
        assert!(matches!(
            updater.submit_uninstall("video", false).await,
            Err(UpdateError::InvalidParameter(_))
        ));

        assert!(updater.submit_uninstall("audio", true).await.unwrap());
        assert!(!updater.submit_uninstall("audio", true).await.unwrap());
        updater.shutdown().await;
    }

    #[tokio::test]
    async fn test_check_core_updates() {
        let updater = updater(
            Some(release("1.2.0", &["cleep_1.2.0.zip", "cleep_1.2.0.sha256"])),
            Arc::default(),
        );

        let check = updater.check_core_updates().await.unwrap();
        assert_eq!(check.core_update.version.as_deref(), Some("1.2.0"));
        let settings = updater.settings().await.unwrap();
        assert_eq!(settings.core_update, check.core_update);
        assert_eq!(settings.core_last_check, Some(check.last_check));
    }

    #[tokio::test]
    async fn test_update_core_without_pending_update() {
        let updater = updater(Some(release("0.9.0", &[])), Arc::default());
        updater.check_core_updates().await.unwrap();

        let err = updater.update_core().await.unwrap_err();
        assert!(matches!(err, UpdateError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_update_core_restarts_on_success() {
        let restarter = Arc::new(CountingRestarter::default());
        let updater = updater(
            Some(release("1.2.0", &["cleep_1.2.0.zip", "cleep_1.2.0.sha256"])),
            restarter.clone(),
        );
        updater.check_core_updates().await.unwrap();
        updater.update_core().await.unwrap();

        for _ in 0..100 {
            if restarter.calls.load(Ordering::SeqCst) > 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(restarter.calls.load(Ordering::SeqCst), 1);
        assert!(!updater.scheduler().processor_slot().is_occupied());
        assert!(!updater.settings().await.unwrap().core_update.is_available());
    }

    #[tokio::test]
    async fn test_on_time_ignores_other_times() {
        let updater = updater(None, Arc::default());
        assert!(!updater.on_time(4, 15).await);
        assert!(updater.on_time(3, 15).await);
        assert!(updater.settings().await.unwrap().core_last_check.is_some());
    }
}
