//! 动作调度
//!
//! 主动作队列、子动作队列、批次规划、周期轮询器和处理器槽位。

pub mod action;
pub mod concurrency;
pub mod planner;
pub mod queue;
pub mod scheduler;
pub mod task;

pub use action::{progress_step, ActionExtra, ActionKind, MainAction, SubAction};
pub use concurrency::ProcessorSlot;
pub use planner::BatchPlanner;
pub use queue::{MainActionQueue, SubActionQueue};
pub use scheduler::UpdateScheduler;
pub use task::PeriodicTask;
