//! 动作定义
//!
//! 主动作（用户级请求）和子动作（展开后的单模块步骤）。

use serde::{Deserialize, Serialize};

use crate::module::metadata::ModuleInfos;

/// 动作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// 安装
    Install,
    /// 更新
    Update,
    /// 卸载
    Uninstall,
}

impl ActionKind {
    /// 动作名称
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Install => "install",
            ActionKind::Update => "update",
            ActionKind::Uninstall => "uninstall",
        }
    }

    /// 该动作对应的状态事件类型
    pub fn event_type(&self) -> &'static str {
        match self {
            ActionKind::Install => "update.module.install",
            ActionKind::Update => "update.module.update",
            ActionKind::Uninstall => "update.module.uninstall",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "install" => Ok(ActionKind::Install),
            "update" => Ok(ActionKind::Update),
            "uninstall" => Ok(ActionKind::Uninstall),
            other => Err(format!("未知的动作类型: {}", other)),
        }
    }
}

/// 动作附加参数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionExtra {
    /// 强制卸载（忽略卸载脚本错误）
    #[serde(default)]
    pub force: bool,
}

impl ActionExtra {
    pub fn forced() -> Self {
        Self { force: true }
    }
}

/// 主动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MainAction {
    pub kind: ActionKind,
    pub module: String,
    pub extra: Option<ActionExtra>,
    /// 已被主轮询器取出并展开
    pub processing: bool,
}

impl MainAction {
    pub fn new(kind: ActionKind, module: impl Into<String>, extra: Option<ActionExtra>) -> Self {
        Self {
            kind,
            module: module.into(),
            extra,
            processing: false,
        }
    }

    /// 是否与给定的 (kind, module) 相同
    pub fn same_key(&self, kind: ActionKind, module: &str) -> bool {
        self.kind == kind && self.module == module
    }
}

/// 子动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubAction {
    pub kind: ActionKind,
    /// 本步骤处理的模块
    pub module: String,
    /// 所属主动作的目标模块
    pub main_module: String,
    pub module_infos: ModuleInfos,
    pub extra: Option<ActionExtra>,
    /// 完成本步骤前增加的进度
    pub progress_step: u8,
}

impl SubAction {
    pub fn new(
        kind: ActionKind,
        module: impl Into<String>,
        main_module: impl Into<String>,
        module_infos: ModuleInfos,
        extra: Option<ActionExtra>,
    ) -> Self {
        Self {
            kind,
            module: module.into(),
            main_module: main_module.into(),
            module_infos,
            extra,
            progress_step: 0,
        }
    }

    /// 是否强制执行
    pub fn force(&self) -> bool {
        self.extra.map(|e| e.force).unwrap_or(false)
    }
}

/// 计算批次中每一步的进度步长：`floor(100 / n)`，空批次为 0
pub fn progress_step(batch_size: usize) -> u8 {
    if batch_size == 0 {
        0
    } else {
        // 100 / n <= 100
        (100 / batch_size) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_step() {
        assert_eq!(progress_step(0), 0);
        assert_eq!(progress_step(1), 100);
        assert_eq!(progress_step(3), 33);
        assert_eq!(progress_step(7), 14);
        assert_eq!(progress_step(101), 0);
    }

    #[test]
    fn test_progress_step_sum_bounds() {
        for n in 1..=120usize {
            let step = progress_step(n) as usize;
            let sum = step * n;
            assert!(sum <= 100);
            assert_eq!(sum, n * (100 / n));
        }
    }

    #[test]
    fn test_action_kind_parse() {
        assert_eq!("Install".parse::<ActionKind>().unwrap(), ActionKind::Install);
        assert_eq!("uninstall".parse::<ActionKind>().unwrap(), ActionKind::Uninstall);
        assert!("remove".parse::<ActionKind>().is_err());
        assert_eq!(ActionKind::Update.event_type(), "update.module.update");
    }

    #[test]
    fn test_same_key() {
        let action = MainAction::new(ActionKind::Install, "audio", None);
        assert!(action.same_key(ActionKind::Install, "audio"));
        assert!(!action.same_key(ActionKind::Update, "audio"));
        assert!(!action.same_key(ActionKind::Install, "video"));
    }

    #[test]
    fn test_sub_action_force() {
        let sub = SubAction::new(
            ActionKind::Uninstall,
            "audio",
            "player",
            ModuleInfos::new("1.0.0"),
            Some(ActionExtra::forced()),
        );
        assert!(sub.force());
        assert_eq!(sub.progress_step, 0);
    }
}
