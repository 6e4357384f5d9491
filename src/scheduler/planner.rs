//! 批次规划
//!
//! 把一个主动作展开成按顺序执行的子动作批次。规划失败时不返回任何子动作，
//! 调用方总是拿到完整的批次或一个错误。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use super::action::{ActionExtra, ActionKind, SubAction};
use crate::module::dependency::{DependencyResolver, UninstallPruner};
use crate::module::metadata::ModuleInfos;
use crate::module::source::{Catalog, Inventory};
use crate::utils::{is_newer, Result, UpdateError};

/// 批次规划器
#[derive(Clone)]
pub struct BatchPlanner {
    inventory: Arc<dyn Inventory>,
    catalog: Arc<dyn Catalog>,
}

impl BatchPlanner {
    pub fn new(inventory: Arc<dyn Inventory>, catalog: Arc<dyn Catalog>) -> Self {
        Self { inventory, catalog }
    }

    /// 目录中的模块版本，模块未知时为 None
    pub async fn catalog_version(&self, module: &str) -> Option<String> {
        self.catalog.module_infos(module).await.ok().map(|infos| infos.version)
    }

    /// 按动作类型规划
    pub async fn plan(
        &self,
        kind: ActionKind,
        module: &str,
        extra: Option<ActionExtra>,
        installed: &HashSet<String>,
    ) -> Result<Vec<SubAction>> {
        match kind {
            ActionKind::Install => self.plan_install(module, installed).await,
            ActionKind::Update => self.plan_update(module).await,
            ActionKind::Uninstall => self.plan_uninstall(module, extra).await,
        }
    }

    /// 安装：按目录解析依赖，未安装的安装，已安装且目录版本更新的更新
    #[instrument(skip(self, installed))]
    pub async fn plan_install(
        &self,
        module: &str,
        installed: &HashSet<String>,
    ) -> Result<Vec<SubAction>> {
        let mut catalog_infos = HashMap::new();
        let order = DependencyResolver::new(self.catalog.as_ref())
            .resolve(module, &mut catalog_infos)
            .await?;
        debug!(dependencies = ?order, "安装依赖解析完成");

        let mut batch = Vec::new();
        for name in order {
            let infos = take_infos(&mut catalog_infos, &name)?;
            if !installed.contains(&name) {
                batch.push(SubAction::new(ActionKind::Install, name, module, infos, None));
                continue;
            }

            let current = self.inventory.module_infos(&name).await?;
            if is_newer(&current.version, &infos.version) {
                batch.push(SubAction::new(ActionKind::Update, name, module, infos, None));
            }
        }

        info!(steps = batch.len(), "安装批次规划完成");
        Ok(batch)
    }

    /// 卸载：按清单解析依赖，剔除仍被其他模块使用的依赖
    #[instrument(skip(self))]
    pub async fn plan_uninstall(
        &self,
        module: &str,
        extra: Option<ActionExtra>,
    ) -> Result<Vec<SubAction>> {
        let mut inventory_infos = HashMap::new();
        let order = DependencyResolver::new(self.inventory.as_ref())
            .resolve(module, &mut inventory_infos)
            .await?;
        debug!(dependencies = ?order, "卸载依赖解析完成");

        let survivors = UninstallPruner::prune(&order, &inventory_infos);
        info!(modules = ?survivors, "卸载批次规划完成");

        survivors
            .into_iter()
            .map(|name| {
                let infos = take_infos(&mut inventory_infos, &name)?;
                Ok(SubAction::new(ActionKind::Uninstall, name, module, infos, extra))
            })
            .collect()
    }

    /// 更新：对比新旧依赖树，先强制卸载不再需要的依赖，再安装新依赖，最后更新已有模块
    #[instrument(skip(self))]
    pub async fn plan_update(&self, module: &str) -> Result<Vec<SubAction>> {
        let mut old_infos = HashMap::new();
        let old = DependencyResolver::new(self.inventory.as_ref())
            .resolve(module, &mut old_infos)
            .await?;
        let mut new_infos = HashMap::new();
        let new = DependencyResolver::new(self.catalog.as_ref())
            .resolve(module, &mut new_infos)
            .await?;
        debug!(old = ?old, new = ?new, "更新依赖解析完成");

        let old_set: HashSet<&str> = old.iter().map(String::as_str).collect();
        let new_set: HashSet<&str> = new.iter().map(String::as_str).collect();

        let to_uninstall: Vec<&String> = old.iter().filter(|m| !new_set.contains(m.as_str())).collect();
        let to_install: Vec<&String> = new.iter().filter(|m| !old_set.contains(m.as_str())).collect();
        let mut to_update = Vec::new();
        for name in new.iter().filter(|m| old_set.contains(m.as_str())) {
            let installed = lookup(&old_infos, name)?;
            let available = lookup(&new_infos, name)?;
            if is_newer(&installed.version, &available.version) {
                to_update.push(name);
            }
        }
        info!(
            uninstall = ?to_uninstall,
            install = ?to_install,
            update = ?to_update,
            "更新批次规划完成"
        );

        let mut batch = Vec::with_capacity(to_uninstall.len() + to_install.len() + to_update.len());
        for name in to_uninstall {
            batch.push(SubAction::new(
                ActionKind::Uninstall,
                name.clone(),
                module,
                lookup(&old_infos, name)?.clone(),
                Some(ActionExtra::forced()),
            ));
        }
        for name in to_install {
            batch.push(SubAction::new(
                ActionKind::Install,
                name.clone(),
                module,
                lookup(&new_infos, name)?.clone(),
                None,
            ));
        }
        for name in to_update {
            batch.push(SubAction::new(
                ActionKind::Update,
                name.clone(),
                module,
                lookup(&new_infos, name)?.clone(),
                None,
            ));
        }

        Ok(batch)
    }
}

fn lookup<'a>(infos: &'a HashMap<String, ModuleInfos>, module: &str) -> Result<&'a ModuleInfos> {
    infos
        .get(module)
        .ok_or_else(|| UpdateError::Internal(format!("依赖解析结果缺少模块信息: {}", module)))
}

fn take_infos(infos: &mut HashMap<String, ModuleInfos>, module: &str) -> Result<ModuleInfos> {
    infos
        .remove(module)
        .ok_or_else(|| UpdateError::Internal(format!("依赖解析结果缺少模块信息: {}", module)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::source::{CatalogManifest, ManifestCatalog, MemoryInventory};

    fn catalog(entries: Vec<(&str, ModuleInfos)>) -> Arc<ManifestCatalog> {
        let list = entries.into_iter().map(|(n, i)| (n.to_string(), i)).collect();
        Arc::new(ManifestCatalog::from_manifest(CatalogManifest { update: 1, list }))
    }

    fn inventory(entries: Vec<(&str, ModuleInfos)>) -> Arc<MemoryInventory> {
        Arc::new(MemoryInventory::with_modules(
            entries.into_iter().map(|(n, i)| (n.to_string(), i)).collect(),
        ))
    }

    fn steps(batch: &[SubAction]) -> Vec<(ActionKind, &str)> {
        batch.iter().map(|s| (s.kind, s.module.as_str())).collect()
    }

    #[tokio::test]
    async fn test_plan_install_mixed() {
        let planner = BatchPlanner::new(
            inventory(vec![("z", ModuleInfos::new("1.0.0"))]),
            catalog(vec![
                ("x", ModuleInfos::new("1.0.0").with_deps(["y", "z"])),
                ("y", ModuleInfos::new("1.0.0")),
                ("z", ModuleInfos::new("1.1.0")),
            ]),
        );
        let installed: HashSet<String> = ["z".to_string()].into_iter().collect();

        let batch = planner.plan_install("x", &installed).await.unwrap();
        assert_eq!(
            steps(&batch),
            vec![
                (ActionKind::Install, "y"),
                (ActionKind::Update, "z"),
                (ActionKind::Install, "x"),
            ]
        );
        assert!(batch.iter().all(|s| s.main_module == "x"));
        assert_eq!(batch[1].module_infos.version, "1.1.0");
    }

    #[tokio::test]
    async fn test_plan_install_skips_up_to_date() {
        let planner = BatchPlanner::new(
            inventory(vec![("y", ModuleInfos::new("2.0.0"))]),
            catalog(vec![
                ("x", ModuleInfos::new("1.0.0").with_deps(["y"])),
                ("y", ModuleInfos::new("2.0.0")),
            ]),
        );
        let installed: HashSet<String> = ["y".to_string()].into_iter().collect();

        let batch = planner.plan_install("x", &installed).await.unwrap();
        assert_eq!(steps(&batch), vec![(ActionKind::Install, "x")]);
    }

    #[tokio::test]
    async fn test_plan_install_unknown_module() {
        let planner = BatchPlanner::new(inventory(vec![]), catalog(vec![]));
        let err = planner.plan_install("x", &HashSet::new()).await.unwrap_err();
        assert!(matches!(err, UpdateError::LookupFailure { .. }));
    }

    #[tokio::test]
    async fn test_plan_uninstall_keeps_shared_dependency() {
        let planner = BatchPlanner::new(
            inventory(vec![
                ("x", ModuleInfos::new("1.0.0").with_deps(["y"])),
                ("y", ModuleInfos::new("1.0.0").with_loadedby(["x", "w"])),
                ("w", ModuleInfos::new("1.0.0").with_deps(["y"])),
            ]),
            catalog(vec![]),
        );

        let batch = planner
            .plan_uninstall("x", Some(ActionExtra { force: false }))
            .await
            .unwrap();
        assert_eq!(steps(&batch), vec![(ActionKind::Uninstall, "x")]);
        assert_eq!(batch[0].extra, Some(ActionExtra { force: false }));
    }

    #[tokio::test]
    async fn test_plan_uninstall_removes_private_dependency() {
        let planner = BatchPlanner::new(
            inventory(vec![
                ("x", ModuleInfos::new("1.0.0").with_deps(["y"])),
                ("y", ModuleInfos::new("1.0.0").with_loadedby(["x"])),
            ]),
            catalog(vec![]),
        );

        let batch = planner.plan_uninstall("x", None).await.unwrap();
        assert_eq!(
            steps(&batch),
            vec![(ActionKind::Uninstall, "y"), (ActionKind::Uninstall, "x")]
        );
    }

    #[tokio::test]
    async fn test_plan_update_dependency_swap() {
        let planner = BatchPlanner::new(
            inventory(vec![
                ("x", ModuleInfos::new("1.0.0").with_deps(["y", "z"])),
                ("y", ModuleInfos::new("1.0.0")),
                ("z", ModuleInfos::new("1.0.0")),
            ]),
            catalog(vec![
                ("x", ModuleInfos::new("1.0.0").with_deps(["y", "q"])),
                ("y", ModuleInfos::new("1.0.0")),
                ("q", ModuleInfos::new("1.0.0")),
            ]),
        );

        let batch = planner.plan_update("x").await.unwrap();
        assert_eq!(
            steps(&batch),
            vec![(ActionKind::Uninstall, "z"), (ActionKind::Install, "q")]
        );
        assert!(batch[0].force());
    }

    #[tokio::test]
    async fn test_plan_update_includes_newer_versions() {
        let planner = BatchPlanner::new(
            inventory(vec![
                ("x", ModuleInfos::new("1.0.0").with_deps(["y"])),
                ("y", ModuleInfos::new("1.0.0")),
            ]),
            catalog(vec![
                ("x", ModuleInfos::new("1.2.0").with_deps(["y"])),
                ("y", ModuleInfos::new("1.0.1")),
            ]),
        );

        let batch = planner
            .plan(ActionKind::Update, "x", None, &HashSet::new())
            .await
            .unwrap();
        assert_eq!(
            steps(&batch),
            vec![(ActionKind::Update, "y"), (ActionKind::Update, "x")]
        );
    }
}
