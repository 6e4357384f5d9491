//! 事件总线
//!
//! 进程内的发布订阅。回调在发布方任务中按订阅顺序同步调用，
//! 单个回调 panic 不影响其他订阅者。
//!
//! # 使用示例
//!
//! ```rust
//! use std::sync::Arc;
//! use chips_updater::event::{Event, EventBus};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let bus = EventBus::new();
//! bus.subscribe("update.module.*", Arc::new(|event: Event| println!("{}", event.event_type)))
//!     .await;
//!
//! let delivered = bus
//!     .publish(Event::from_updater("update.module.install", serde_json::Value::Null))
//!     .await;
//! assert_eq!(delivered, 1);
//! # });
//! ```

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use super::event::Event;

/// 事件回调函数类型
pub type EventCallback = Arc<dyn Fn(Event) + Send + Sync>;

#[derive(Clone)]
struct SubscriptionEntry {
    subscription_id: String,
    pattern: String,
    callback: EventCallback,
}

impl SubscriptionEntry {
    /// 匹配模式（支持 * 和 `prefix.*` 通配符）
    fn matches_pattern(pattern: &str, value: &str) -> bool {
        if pattern == "*" {
            return true;
        }

        if let Some(prefix) = pattern.strip_suffix(".*") {
            return value.len() > prefix.len() + 1
                && value.starts_with(prefix)
                && value.as_bytes()[prefix.len()] == b'.';
        }

        pattern == value
    }
}

/// 事件总线
#[derive(Clone, Default)]
pub struct EventBus {
    subscriptions: Arc<RwLock<Vec<SubscriptionEntry>>>,
}

impl EventBus {
    /// 创建新的事件总线
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅事件，返回订阅 ID
    pub async fn subscribe(&self, pattern: impl Into<String>, callback: EventCallback) -> String {
        let entry = SubscriptionEntry {
            subscription_id: Uuid::new_v4().to_string(),
            pattern: pattern.into(),
            callback,
        };
        let subscription_id = entry.subscription_id.clone();

        info!(
            subscription_id = %subscription_id,
            pattern = %entry.pattern,
            "事件订阅成功"
        );
        self.subscriptions.write().await.push(entry);

        subscription_id
    }

    /// 发布事件，返回匹配的订阅者数量
    pub async fn publish(&self, event: Event) -> usize {
        trace!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            "发布事件"
        );

        let matching: Vec<SubscriptionEntry> = self
            .subscriptions
            .read()
            .await
            .iter()
            .filter(|s| SubscriptionEntry::matches_pattern(&s.pattern, &event.event_type))
            .cloned()
            .collect();

        if matching.is_empty() {
            debug!(event_type = %event.event_type, "没有匹配的订阅者");
            return 0;
        }

        for sub in &matching {
            let callback = sub.callback.clone();
            let event = event.clone();
            let outcome =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || callback(event)));
            if outcome.is_err() {
                warn!(subscription_id = %sub.subscription_id, "事件回调 panic");
            }
        }

        matching.len()
    }
}
