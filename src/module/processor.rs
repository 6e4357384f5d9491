//! 外部处理器接口
//!
//! 真正执行下载、校验和文件系统修改的处理器不在本 crate 内实现，
//! 这里只定义接口以及处理状态的上报通道：
//!
//! - [`Processor`] - 模块安装/更新/卸载
//! - [`CoreInstaller`] - 内核更新
//! - [`Restarter`] - 平台重启
//! - [`StatusStore`] - 处理状态持久化，[`FileStatusStore`] 写入 `<install_dir>/<module>/process.log`
//!
//! 每次分发都会创建一个新的状态通道，处理器通过 [`StatusReporter`] 上报状态，
//! 终止状态（`Done` 及之后）表示本次处理结束。

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error};

use super::metadata::ModuleInfos;
use crate::core::settings::CoreUpdate;
use crate::utils::Result;

/// 处理状态文件名
pub const PROCESS_STATUS_FILENAME: &str = "process.log";

/// 内核处理状态记录使用的模块名
pub const CORE_MODULE_NAME: &str = "cleep";

/// 处理状态码
///
/// 按顺序比较，`>= Done` 为终止状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessCode {
    Idle,
    Processing,
    Done,
    Error,
    Canceled,
}

impl ProcessCode {
    /// 是否为终止状态
    pub fn is_terminal(&self) -> bool {
        *self >= ProcessCode::Done
    }
}

/// 处理状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStatus {
    /// 模块名（内核更新时为空）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub status: ProcessCode,
    #[serde(default)]
    pub stdout: Vec<String>,
    #[serde(default)]
    pub stderr: Vec<String>,
}

impl ProcessStatus {
    pub fn new(module: Option<String>, status: ProcessCode) -> Self {
        Self {
            module,
            status,
            stdout: vec![],
            stderr: vec![],
        }
    }

    /// 模块处理状态
    pub fn for_module(module: impl Into<String>, status: ProcessCode) -> Self {
        Self::new(Some(module.into()), status)
    }

    /// 附加错误输出
    pub fn with_stderr(mut self, line: impl Into<String>) -> Self {
        self.stderr.push(line.into());
        self
    }

    /// 是否为终止状态
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// 状态上报器
///
/// 接收端被丢弃后上报静默失败。
#[derive(Debug, Clone)]
pub struct StatusReporter {
    module: Option<String>,
    sender: mpsc::UnboundedSender<ProcessStatus>,
}

impl StatusReporter {
    /// 本次处理的模块
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// 上报状态
    pub fn report(&self, status: ProcessStatus) {
        if self.sender.send(status).is_err() {
            debug!(module = ?self.module, "状态接收端已关闭");
        }
    }

    /// 以本次处理的模块名上报状态码
    pub fn report_code(&self, code: ProcessCode) {
        self.report(ProcessStatus::new(self.module.clone(), code));
    }
}

/// 创建一次分发使用的状态通道
pub fn status_channel(
    module: Option<String>,
) -> (StatusReporter, mpsc::UnboundedReceiver<ProcessStatus>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (StatusReporter { module, sender }, receiver)
}

/// 模块处理器
#[async_trait]
pub trait Processor: Send + Sync {
    /// 安装模块
    async fn install_module(
        &self,
        module: &str,
        infos: &ModuleInfos,
        reporter: StatusReporter,
    ) -> Result<()>;

    /// 更新模块
    async fn update_module(
        &self,
        module: &str,
        infos: &ModuleInfos,
        reporter: StatusReporter,
    ) -> Result<()>;

    /// 卸载模块
    async fn uninstall_module(
        &self,
        module: &str,
        infos: &ModuleInfos,
        force: bool,
        reporter: StatusReporter,
    ) -> Result<()>;
}

/// 内核安装器
#[async_trait]
pub trait CoreInstaller: Send + Sync {
    /// 下载并安装内核更新
    async fn install(&self, update: &CoreUpdate, reporter: StatusReporter) -> Result<()>;
}

/// 平台重启
#[async_trait]
pub trait Restarter: Send + Sync {
    /// 延迟后重启
    async fn restart(&self, delay: Duration) -> Result<()>;
}

/// 处理状态存储
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// 保存模块最近一次处理状态
    async fn store(&self, module: &str, status: &ProcessStatus) -> Result<()>;
}

/// 文件处理状态存储
#[derive(Debug, Clone)]
pub struct FileStatusStore {
    install_dir: PathBuf,
}

impl FileStatusStore {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
        }
    }

    /// 模块处理状态文件路径
    pub fn status_path(&self, module: &str) -> PathBuf {
        self.install_dir.join(module).join(PROCESS_STATUS_FILENAME)
    }

    async fn write(&self, path: &Path, status: &ProcessStatus) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, serde_json::to_vec(status)?).await?;
        Ok(())
    }
}

#[async_trait]
impl StatusStore for FileStatusStore {
    async fn store(&self, module: &str, status: &ProcessStatus) -> Result<()> {
        let path = self.status_path(module);
        self.write(&path, status).await.map_err(|e| {
            error!(module, path = %path.display(), error = %e, "保存处理状态失败");
            e
        })
    }
}
