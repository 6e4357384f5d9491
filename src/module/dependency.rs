//! 模块依赖管理
//!
//! 本模块提供依赖解析器和卸载裁剪器。
//!
//! # 主要组件
//!
//! - [`DependencyResolver`] - 深度优先遍历模块声明的依赖，输出叶子优先的模块序列
//! - [`UninstallPruner`] - 从卸载候选集中剔除仍被集合外模块依赖的模块
//!
//! # 示例
//!
//! ```rust
//! use std::collections::HashMap;
//! use chips_updater::module::dependency::DependencyResolver;
//! use chips_updater::module::metadata::ModuleInfos;
//! use chips_updater::module::source::{CatalogManifest, ManifestCatalog};
//!
//! # futures::executor::block_on(async {
//! let mut list = HashMap::new();
//! list.insert("player".to_string(), ModuleInfos::new("1.0.0").with_deps(["audio"]));
//! list.insert("audio".to_string(), ModuleInfos::new("1.0.0"));
//! let catalog = ManifestCatalog::from_manifest(CatalogManifest { update: 1, list });
//!
//! let mut infos = HashMap::new();
//! let order = DependencyResolver::new(&catalog)
//!     .resolve("player", &mut infos)
//!     .await
//!     .unwrap();
//!
//! assert_eq!(order, vec!["audio".to_string(), "player".to_string()]);
//! assert_eq!(infos.len(), 2);
//! # });
//! ```

use std::collections::{HashMap, HashSet};

use tracing::{trace, warn};

use super::metadata::ModuleInfos;
use super::source::ModuleInfoSource;
use crate::utils::Result;

/// 遍历栈帧
struct Frame {
    name: String,
    deps: Vec<String>,
    next: usize,
}

/// 依赖解析器
///
/// 后序深度优先遍历：依赖先于依赖方输出。每个模块在进入时标记为已访问，
/// 因此菱形依赖只输出一次，循环依赖也能终止。
pub struct DependencyResolver<'a, S: ModuleInfoSource + ?Sized> {
    source: &'a S,
}

impl<'a, S: ModuleInfoSource + ?Sized> DependencyResolver<'a, S> {
    /// 创建新的依赖解析器
    pub fn new(source: &'a S) -> Self {
        Self { source }
    }

    /// 解析模块的所有依赖
    ///
    /// 返回叶子优先的模块列表，最后一项为 `module` 本身。
    /// 查询到的模块信息写入 `infos`；`infos` 中已有的条目不会再次查询。
    ///
    /// # 错误
    ///
    /// 任意一次查询失败都会中止解析并返回该错误。
    pub async fn resolve(
        &self,
        module: &str,
        infos: &mut HashMap<String, ModuleInfos>,
    ) -> Result<Vec<String>> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut resolved = Vec::new();

        visited.insert(module.to_string());
        let deps = self.deps_of(module, infos).await?;
        let mut stack = vec![Frame {
            name: module.to_string(),
            deps,
            next: 0,
        }];

        loop {
            let candidate = match stack.last_mut() {
                None => break,
                Some(frame) if frame.next < frame.deps.len() => {
                    let dep = frame.deps[frame.next].clone();
                    frame.next += 1;
                    if dep == frame.name {
                        trace!(module = %dep, "跳过自身依赖");
                        continue;
                    }
                    Some(dep)
                }
                Some(_) => None,
            };

            match candidate {
                Some(dep) => {
                    if !visited.insert(dep.clone()) {
                        continue;
                    }
                    let deps = self.deps_of(&dep, infos).await?;
                    stack.push(Frame {
                        name: dep,
                        deps,
                        next: 0,
                    });
                }
                None => {
                    if let Some(done) = stack.pop() {
                        resolved.push(done.name);
                    }
                }
            }
        }

        Ok(resolved)
    }

    async fn deps_of(
        &self,
        module: &str,
        infos: &mut HashMap<String, ModuleInfos>,
    ) -> Result<Vec<String>> {
        if let Some(existing) = infos.get(module) {
            return Ok(existing.deps.clone());
        }
        let fetched = self.source.module_infos(module).await?;
        let deps = fetched.deps.clone();
        infos.insert(module.to_string(), fetched);
        Ok(deps)
    }
}

/// 卸载裁剪器
pub struct UninstallPruner;

impl UninstallPruner {
    /// 剔除仍被候选集外模块加载的候选
    ///
    /// 没有模块信息的候选视为被外部加载（可能是孤儿模块），不会被卸载。
    /// 结果保持候选的相对顺序。
    pub fn prune(candidates: &[String], infos: &HashMap<String, ModuleInfos>) -> Vec<String> {
        let candidate_set: HashSet<&str> = candidates.iter().map(String::as_str).collect();

        candidates
            .iter()
            .filter(|candidate| match infos.get(candidate.as_str()) {
                None => {
                    warn!(module = %candidate, "缺少模块信息，可能是孤儿模块，跳过卸载");
                    false
                }
                Some(module_infos) => {
                    let kept = module_infos
                        .loadedby
                        .iter()
                        .all(|loader| candidate_set.contains(loader.as_str()));
                    if !kept {
                        trace!(module = %candidate, loadedby = ?module_infos.loadedby, "仍被其他模块加载，保留");
                    }
                    kept
                }
            })
            .cloned()
            .collect()
    }
}
