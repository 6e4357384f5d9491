//! 更新调度器
//!
//! 两级队列加两个周期轮询器：
//!
//! - 主轮询器（默认 60 秒）取出最早的主动作，展开成子动作批次
//! - 子轮询器（默认 10 秒，只在批次进行中运行）每次分发一个子动作给处理器
//!
//! 同一时刻最多一个处理器在运行；批次中任意一步失败后，剩余子动作被丢弃不再分发。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use serde_json::Value;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, error, info, trace, warn};

use super::action::{progress_step, ActionExtra, ActionKind, MainAction, SubAction};
use super::concurrency::ProcessorSlot;
use super::planner::BatchPlanner;
use super::queue::{MainActionQueue, SubActionQueue};
use super::task::PeriodicTask;
use crate::core::config::SchedulerConfig;
use crate::event::{Event, EventBus};
use crate::module::metadata::ModuleUpdateStatus;
use crate::module::processor::{
    status_channel, ProcessCode, ProcessStatus, Processor, StatusStore,
};
use crate::module::tracker::ProcessTracker;

/// 调度器共享状态
struct SchedulerInner {
    main_queue: Mutex<MainActionQueue>,
    sub_queue: Mutex<SubActionQueue>,
    tracker: RwLock<ProcessTracker>,
    slot: ProcessorSlot,
    planner: BatchPlanner,
    processor: Arc<dyn Processor>,
    status_store: Arc<dyn StatusStore>,
    event_bus: EventBus,
    modules_auto_update: AtomicBool,
    need_restart: AtomicBool,
    main_task: PeriodicTask,
    sub_task: PeriodicTask,
}

/// 更新调度器
#[derive(Clone)]
pub struct UpdateScheduler {
    inner: Arc<SchedulerInner>,
}

impl UpdateScheduler {
    /// 创建调度器（轮询器不会自动启动）
    pub fn new(
        config: &SchedulerConfig,
        planner: BatchPlanner,
        processor: Arc<dyn Processor>,
        status_store: Arc<dyn StatusStore>,
        event_bus: EventBus,
    ) -> Self {
        let main_period = config.main_interval();
        let sub_period = config.sub_interval();

        let inner = Arc::new_cyclic(|weak: &Weak<SchedulerInner>| {
            let main_weak = weak.clone();
            let sub_weak = weak.clone();

            SchedulerInner {
                main_queue: Mutex::new(MainActionQueue::new()),
                sub_queue: Mutex::new(SubActionQueue::new()),
                tracker: RwLock::new(ProcessTracker::new()),
                slot: ProcessorSlot::new(),
                planner,
                processor,
                status_store,
                event_bus,
                modules_auto_update: AtomicBool::new(false),
                need_restart: AtomicBool::new(false),
                main_task: PeriodicTask::new("main_actions", main_period, move || {
                    let weak = main_weak.clone();
                    async move {
                        if let Some(inner) = weak.upgrade() {
                            inner.main_tick().await;
                        }
                    }
                }),
                sub_task: PeriodicTask::new("sub_actions", sub_period, move || {
                    let weak = sub_weak.clone();
                    async move {
                        if let Some(inner) = weak.upgrade() {
                            inner.sub_tick().await;
                        }
                    }
                }),
            }
        });

        Self { inner }
    }

    /// 提交主动作
    ///
    /// 已有相同 (kind, module) 的待处理请求时返回 false。
    /// 接受请求后确保主轮询器在运行。
    pub async fn submit(&self, kind: ActionKind, module: &str, extra: Option<ActionExtra>) -> bool {
        let accepted = {
            let mut queue = self.inner.main_queue.lock().await;
            let accepted = queue.push(kind, module, extra);
            debug!(
                module = %module,
                kind = %kind,
                accepted,
                queue_len = queue.len(),
                "提交主动作"
            );
            accepted
        };

        if accepted {
            self.inner.main_task.start().await;
        }
        accepted
    }

    /// 设置模块自动更新
    ///
    /// 开启时启动主轮询器；关闭后主轮询器在队列清空时自行停止。
    pub async fn set_modules_auto_update(&self, enabled: bool) {
        self.inner
            .modules_auto_update
            .store(enabled, Ordering::SeqCst);
        if enabled {
            self.inner.main_task.start().await;
        }
    }

    pub fn modules_auto_update(&self) -> bool {
        self.inner.modules_auto_update.load(Ordering::SeqCst)
    }

    /// 执行一次主轮询（通常由主轮询器调用）
    pub async fn run_main_tick(&self) {
        self.inner.main_tick().await;
    }

    /// 执行一次子轮询（通常由子轮询器调用）
    pub async fn run_sub_tick(&self) {
        self.inner.sub_tick().await;
    }

    /// 停止所有轮询器
    pub async fn shutdown(&self) {
        self.inner.sub_task.stop().await;
        self.inner.main_task.stop().await;
        info!("调度器已停止");
    }

    pub async fn is_main_running(&self) -> bool {
        self.inner.main_task.is_running().await
    }

    pub async fn is_sub_running(&self) -> bool {
        self.inner.sub_task.is_running().await
    }

    /// 模块状态快照
    pub async fn statuses(&self) -> HashMap<String, ModuleUpdateStatus> {
        self.inner.tracker.read().await.snapshot()
    }

    /// 进度跟踪器
    pub fn tracker(&self) -> &RwLock<ProcessTracker> {
        &self.inner.tracker
    }

    /// 待处理的主动作
    pub async fn pending_actions(&self) -> Vec<MainAction> {
        self.inner.main_queue.lock().await.snapshot()
    }

    /// 排队中的子动作数量
    pub async fn pending_sub_actions(&self) -> usize {
        self.inner.sub_queue.lock().await.len()
    }

    /// 处理器槽位
    pub fn processor_slot(&self) -> &ProcessorSlot {
        &self.inner.slot
    }

    /// 是否有模块步骤成功完成，需要重启
    pub fn need_restart(&self) -> bool {
        self.inner.need_restart.load(Ordering::SeqCst)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.event_bus
    }
}

impl SchedulerInner {
    async fn main_tick(&self) {
        let mut main_queue = self.main_queue.lock().await;

        {
            let sub_queue = self.sub_queue.lock().await;
            if !sub_queue.is_empty() || self.slot.is_occupied() {
                trace!(
                    queue_len = sub_queue.len(),
                    processor_busy = self.slot.is_occupied(),
                    "批次进行中，推迟主动作"
                );
                return;
            }
        }

        if main_queue.front().map(|a| a.processing).unwrap_or(false) {
            if let Some(done) = main_queue.pop_front() {
                info!(module = %done.module, kind = %done.kind, "主动作处理结束");
            }
            self.tracker.write().await.end_operation();
        }

        let Some(head) = main_queue.front_mut() else {
            debug!("没有待处理的主动作");
            self.sub_task.stop().await;
            if !self.modules_auto_update.load(Ordering::SeqCst) {
                self.main_task.stop().await;
            }
            return;
        };

        head.processing = true;
        let (kind, module, extra) = (head.kind, head.module.clone(), head.extra);
        info!(module = %module, kind = %kind, "开始处理主动作");

        let target_version = self
            .planner
            .catalog_version(&module)
            .await
            .unwrap_or_else(|| "0.0.0".to_string());
        let installed: HashSet<String> = {
            let mut tracker = self.tracker.write().await;
            tracker.begin_if_absent(&module, None, Some(target_version));
            tracker.begin_operation(&module);
            tracker
                .installed_versions()
                .into_iter()
                .map(|(name, _)| name)
                .collect()
        };

        match self.planner.plan(kind, &module, extra, &installed).await {
            Ok(batch) => {
                let step = progress_step(batch.len());
                info!(
                    module = %module,
                    steps = batch.len(),
                    progress_step = step,
                    "子动作批次已入队"
                );
                {
                    let mut sub_queue = self.sub_queue.lock().await;
                    sub_queue.extend(batch);
                    sub_queue.assign_progress_step(step);
                }
                self.tracker
                    .write()
                    .await
                    .set_progress_for(&module, Some(0), None, None);
                self.sub_task.start().await;
            }
            Err(e) => {
                error!(
                    module = %module,
                    kind = %kind,
                    error = %e,
                    error_code = e.error_code(),
                    "主动作规划失败"
                );
                self.tracker
                    .write()
                    .await
                    .set_progress_for(&module, None, None, Some(true));
            }
        }
    }

    async fn sub_tick(self: &Arc<Self>) {
        // 出队前占用槽位，主循环在分发完成前看不到空闲的批次
        if !self.slot.try_occupy() {
            trace!("处理器运行中，推迟子动作");
            return;
        }

        let Some(action) = self.sub_queue.lock().await.pop_front() else {
            self.slot.release();
            return;
        };

        {
            let mut tracker = self.tracker.write().await;
            if tracker.is_failed(&action.main_module) {
                debug!(
                    module = %action.module,
                    main_module = %action.main_module,
                    "批次已失败，丢弃子动作"
                );
                self.slot.release();
                return;
            }
            tracker.set_progress_for(&action.main_module, None, Some(action.progress_step), None);
        }

        info!(
            module = %action.module,
            main_module = %action.main_module,
            kind = %action.kind,
            progress_step = action.progress_step,
            "分发子动作"
        );
        self.dispatch(action);
    }

    fn dispatch(self: &Arc<Self>, action: SubAction) {
        let (reporter, receiver) = status_channel(Some(action.module.clone()));
        let fallback = reporter.clone();
        let processor = self.processor.clone();
        let inner = self.clone();

        tokio::spawn(async move {
            let call = async {
                let result = match action.kind {
                    ActionKind::Install => {
                        processor
                            .install_module(&action.module, &action.module_infos, reporter)
                            .await
                    }
                    ActionKind::Update => {
                        processor
                            .update_module(&action.module, &action.module_infos, reporter)
                            .await
                    }
                    ActionKind::Uninstall => {
                        processor
                            .uninstall_module(
                                &action.module,
                                &action.module_infos,
                                action.force(),
                                reporter,
                            )
                            .await
                    }
                };
                if let Err(e) = result {
                    error!(module = %action.module, error = %e, "处理器启动失败");
                    fallback.report(
                        ProcessStatus::for_module(action.module.clone(), ProcessCode::Error)
                            .with_stderr(e.to_string()),
                    );
                }
                drop(fallback);
            };

            tokio::join!(call, inner.consume_statuses(&action, receiver));
        });
    }

    async fn consume_statuses(
        &self,
        action: &SubAction,
        mut receiver: mpsc::UnboundedReceiver<ProcessStatus>,
    ) {
        while let Some(status) = receiver.recv().await {
            let terminal = status.is_terminal();
            self.handle_status(action, status).await;
            if terminal {
                return;
            }
        }

        warn!(module = %action.module, "处理器未上报终止状态即结束");
        let status = ProcessStatus::for_module(action.module.clone(), ProcessCode::Error)
            .with_stderr("processor ended without a terminal status");
        self.handle_status(action, status).await;
    }

    async fn handle_status(&self, action: &SubAction, status: ProcessStatus) {
        debug!(
            module = %action.module,
            kind = %action.kind,
            status = ?status.status,
            "处理状态"
        );

        let data = serde_json::to_value(&status).unwrap_or(Value::Null);
        self.event_bus
            .publish(Event::from_updater(action.kind.event_type(), data))
            .await;

        let module = status.module.as_deref().unwrap_or(&action.module);
        if let Err(e) = self.status_store.store(module, &status).await {
            warn!(module = %module, error = %e, "处理状态保存失败");
        }

        match status.status {
            ProcessCode::Done => {
                self.need_restart.store(true, Ordering::SeqCst);
                self.tracker.write().await.record_done(
                    &action.module,
                    action.kind,
                    &action.module_infos.version,
                );
                info!(module = %action.module, kind = %action.kind, "子动作完成");
            }
            ProcessCode::Error | ProcessCode::Canceled => {
                self.tracker
                    .write()
                    .await
                    .set_progress_for(&action.main_module, None, None, Some(true));
                error!(
                    module = %action.module,
                    main_module = %action.main_module,
                    kind = %action.kind,
                    stderr = ?status.stderr,
                    "子动作失败，批次剩余步骤将被跳过"
                );
            }
            _ => {}
        }

        if status.is_terminal() {
            self.slot.release();
        }
    }
}
