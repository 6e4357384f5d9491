//! 模块相关组件
//!
//! 包含模块元数据、依赖解析、进度跟踪、信息来源和外部处理器接口。

pub mod dependency;
pub mod metadata;
pub mod processor;
pub mod source;
pub mod tracker;

pub use dependency::{DependencyResolver, UninstallPruner};
pub use metadata::{InstalledModule, ModuleInfos, ModuleUpdateStatus, UpdateProgress};
pub use processor::{
    status_channel, CoreInstaller, FileStatusStore, ProcessCode, ProcessStatus, Processor,
    Restarter, StatusReporter, StatusStore,
};
pub use source::{
    Catalog, CatalogManifest, Inventory, ManifestCatalog, MemoryInventory, ModuleInfoSource,
    Release, ReleaseAsset, ReleaseSource,
};
pub use tracker::ProcessTracker;
