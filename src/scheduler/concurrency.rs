//! 处理器占用标记
//!
//! 整个设备同一时刻只允许一个处理器运行。

use std::sync::atomic::{AtomicBool, Ordering};

/// 单飞处理器槽位
#[derive(Debug, Default)]
pub struct ProcessorSlot {
    occupied: AtomicBool,
}

impl ProcessorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试占用，已被占用时返回 false
    pub fn try_occupy(&self) -> bool {
        self.occupied
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// 释放槽位
    pub fn release(&self) {
        self.occupied.store(false, Ordering::Release);
    }

    pub fn is_occupied(&self) -> bool {
        self.occupied.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_single_occupant() {
        let slot = ProcessorSlot::new();
        assert!(!slot.is_occupied());
        assert!(slot.try_occupy());
        assert!(!slot.try_occupy());
        assert!(slot.is_occupied());

        slot.release();
        assert!(slot.try_occupy());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_occupy() {
        let slot = Arc::new(ProcessorSlot::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let slot = slot.clone();
                tokio::spawn(async move { slot.try_occupy() })
            })
            .collect();

        let winners = futures::future::join_all(handles)
            .await
            .into_iter()
            .filter(|r| matches!(r, Ok(true)))
            .count();
        assert_eq!(winners, 1);
    }
}
