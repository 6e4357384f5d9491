//! 周期任务
//!
//! 可取消的周期性 tokio 任务。同一任务的两次 tick 不会重叠：
//! 一次 tick 执行完毕后才会等待下一次。停止不会中断正在执行的 tick。

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

type TickFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

struct TaskState {
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    _handle: JoinHandle<()>,
}

/// 周期任务
pub struct PeriodicTask {
    name: &'static str,
    period: Duration,
    tick: TickFn,
    state: Mutex<Option<TaskState>>,
}

impl PeriodicTask {
    /// 创建周期任务（不会立即启动）
    pub fn new<F, Fut>(name: &'static str, period: Duration, tick: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name,
            period,
            tick: Arc::new(move || tick().boxed()),
            state: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 启动任务，已在运行时返回 false
    ///
    /// 第一次 tick 在一个周期之后执行。
    pub async fn start(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return false;
        }

        let running = Arc::new(AtomicBool::new(true));
        let shutdown = Arc::new(Notify::new());
        let handle = tokio::spawn(Self::run(
            self.name,
            self.period,
            self.tick.clone(),
            running.clone(),
            shutdown.clone(),
        ));

        *state = Some(TaskState {
            running,
            shutdown,
            _handle: handle,
        });
        debug!(task = self.name, period = ?self.period, "周期任务已启动");
        true
    }

    /// 停止任务，未运行时返回 false
    ///
    /// 可以在任务自己的 tick 中调用。
    pub async fn stop(&self) -> bool {
        let Some(state) = self.state.lock().await.take() else {
            return false;
        };
        state.running.store(false, Ordering::SeqCst);
        state.shutdown.notify_one();
        debug!(task = self.name, "周期任务已停止");
        true
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.is_some()
    }

    async fn run(
        name: &'static str,
        period: Duration,
        tick: TickFn,
        running: Arc<AtomicBool>,
        shutdown: Arc<Notify>,
    ) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = ticker.tick() => {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    trace!(task = name, "tick");
                    (tick)().await;
                }
                _ = shutdown.notified() => break,
            }
        }

        trace!(task = name, "周期任务循环退出");
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        if let Some(state) = self.state.get_mut().take() {
            state.running.store(false, Ordering::SeqCst);
            state.shutdown.notify_one();
        }
    }
}

impl std::fmt::Debug for PeriodicTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicTask")
            .field("name", &self.name)
            .field("period", &self.period)
            .finish()
    }
}
