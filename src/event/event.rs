//! 状态事件
//!
//! 更新器对外发送的事件类型及其数据结构。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 事件发送方
pub const UPDATER_SENDER: &str = "updater";

/// 事件类型常量
pub mod event_types {
    /// 模块安装状态
    pub const MODULE_INSTALL: &str = "update.module.install";
    /// 模块更新状态
    pub const MODULE_UPDATE: &str = "update.module.update";
    /// 模块卸载状态
    pub const MODULE_UNINSTALL: &str = "update.module.uninstall";
    /// 内核更新状态（只携带状态码）
    pub const CORE_UPDATE: &str = "update.cleep.update";
}

/// 事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// 事件唯一标识
    pub event_id: String,

    /// 事件类型（格式: category.name，如 update.module.install）
    pub event_type: String,

    /// 发送方
    pub sender: String,

    /// 事件数据
    #[serde(default)]
    pub data: Value,

    /// 事件时间戳
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// 创建新事件
    pub fn new(event_type: impl Into<String>, sender: impl Into<String>, data: Value) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            event_type: event_type.into(),
            sender: sender.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    /// 由更新器发送的事件
    pub fn from_updater(event_type: impl Into<String>, data: Value) -> Self {
        Self::new(event_type, UPDATER_SENDER, data)
    }
}
