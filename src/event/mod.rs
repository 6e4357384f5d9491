//! 事件系统
//!
//! 处理状态事件及其进程内分发。

pub mod event;
pub mod event_bus;

pub use event::{event_types, Event, UPDATER_SENDER};
pub use event_bus::{EventBus, EventCallback};
