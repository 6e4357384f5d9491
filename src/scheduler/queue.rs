//! 动作队列
//!
//! - [`MainActionQueue`] - 按 (kind, module) 去重的主动作 FIFO
//! - [`SubActionQueue`] - 子动作 FIFO，每次取出一个分发
//!
//! 两个队列本身不加锁，由调度器各自包在 `tokio::sync::Mutex` 中。

use std::collections::VecDeque;

use super::action::{ActionExtra, ActionKind, MainAction, SubAction};

/// 主动作队列
#[derive(Debug, Default)]
pub struct MainActionQueue {
    items: VecDeque<MainAction>,
}

impl MainActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 入队，已有相同 (kind, module) 的请求时返回 false
    pub fn push(&mut self, kind: ActionKind, module: &str, extra: Option<ActionExtra>) -> bool {
        if self.contains(kind, module) {
            return false;
        }
        self.items.push_back(MainAction::new(kind, module, extra));
        true
    }

    /// 是否已有相同请求
    pub fn contains(&self, kind: ActionKind, module: &str) -> bool {
        self.items.iter().any(|a| a.same_key(kind, module))
    }

    /// 最早的请求
    pub fn front(&self) -> Option<&MainAction> {
        self.items.front()
    }

    pub fn front_mut(&mut self) -> Option<&mut MainAction> {
        self.items.front_mut()
    }

    pub fn pop_front(&mut self) -> Option<MainAction> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 队列内容快照
    pub fn snapshot(&self) -> Vec<MainAction> {
        self.items.iter().cloned().collect()
    }
}

/// 子动作队列
#[derive(Debug, Default)]
pub struct SubActionQueue {
    items: VecDeque<SubAction>,
}

impl SubActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个完整批次
    pub fn extend(&mut self, batch: impl IntoIterator<Item = SubAction>) {
        self.items.extend(batch);
    }

    pub fn pop_front(&mut self) -> Option<SubAction> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 为所有排队中的子动作设置进度步长
    pub fn assign_progress_step(&mut self, step: u8) {
        for item in self.items.iter_mut() {
            item.progress_step = step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::metadata::ModuleInfos;

    fn sub(module: &str) -> SubAction {
        SubAction::new(ActionKind::Install, module, "main", ModuleInfos::new("1.0.0"), None)
    }

    #[test]
    fn test_main_queue_dedup() {
        let mut queue = MainActionQueue::new();
        assert!(queue.push(ActionKind::Install, "audio", None));
        assert!(!queue.push(ActionKind::Install, "audio", None));
        assert!(queue.push(ActionKind::Uninstall, "audio", Some(ActionExtra::forced())));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_main_queue_fifo() {
        let mut queue = MainActionQueue::new();
        queue.push(ActionKind::Install, "a", None);
        queue.push(ActionKind::Install, "b", None);

        assert_eq!(queue.front().unwrap().module, "a");
        queue.front_mut().unwrap().processing = true;
        assert!(queue.pop_front().unwrap().processing);
        assert_eq!(queue.front().unwrap().module, "b");

        // 出队后同一请求可以再次入队
        assert!(queue.push(ActionKind::Install, "a", None));
    }

    #[test]
    fn test_sub_queue_steps() {
        let mut queue = SubActionQueue::new();
        queue.extend(vec![sub("y"), sub("z"), sub("x")]);
        queue.assign_progress_step(33);

        let first = queue.pop_front().unwrap();
        assert_eq!(first.module, "y");
        assert_eq!(first.progress_step, 33);
        assert_eq!(queue.len(), 2);
    }
}
