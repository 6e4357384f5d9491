//! 更新器错误类型定义
//!
//! 本模块定义了更新器中使用的所有错误类型。

use thiserror::Error;

/// 更新器核心错误类型
#[derive(Error, Debug)]
pub enum UpdateError {
    // ==================== 参数错误 ====================

    /// 缺少必要参数
    #[error("缺少参数: {0}")]
    MissingParameter(String),

    /// 参数无效（不满足前置条件）
    #[error("参数无效: {0}")]
    InvalidParameter(String),

    // ==================== 外部协作方错误 ====================

    /// 模块信息查询失败（来源不可达或条目不存在）
    #[error("模块信息查询失败: '{module}' - {reason}")]
    LookupFailure {
        module: String,
        reason: String,
    },

    /// 模块目录刷新失败
    #[error("模块目录刷新失败: {0}")]
    RefreshFailure(String),

    /// 外部处理器返回错误
    #[error("处理失败: '{module}' - {reason}")]
    ProcessFailure {
        module: String,
        reason: String,
    },

    // ==================== 配置错误 ====================

    /// 配置加载失败
    #[error("配置加载失败: {0}")]
    ConfigLoadFailed(String),

    /// 配置值无效
    #[error("配置值无效: '{key}' - {reason}")]
    InvalidConfigValue {
        key: String,
        reason: String,
    },

    // ==================== IO 和序列化错误 ====================

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML 序列化/反序列化错误
    #[error("YAML 错误: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ==================== 通用错误 ====================

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// 初始化失败
    #[error("初始化失败: {0}")]
    InitFailed(String),

    /// 其他错误
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// 更新器操作结果类型别名
pub type Result<T> = std::result::Result<T, UpdateError>;

impl UpdateError {
    /// 构造模块信息查询失败错误
    pub fn lookup(module: impl Into<String>, reason: impl Into<String>) -> Self {
        UpdateError::LookupFailure {
            module: module.into(),
            reason: reason.into(),
        }
    }

    /// 构造处理失败错误
    pub fn process(module: impl Into<String>, reason: impl Into<String>) -> Self {
        UpdateError::ProcessFailure {
            module: module.into(),
            reason: reason.into(),
        }
    }

    /// 获取错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            UpdateError::MissingParameter(_) => error_code::PARAM_MISSING,
            UpdateError::InvalidParameter(_) => error_code::PARAM_INVALID,
            UpdateError::LookupFailure { .. } => error_code::SOURCE_LOOKUP_FAILED,
            UpdateError::RefreshFailure(_) => error_code::SOURCE_REFRESH_FAILED,
            UpdateError::ProcessFailure { .. } => error_code::PROCESS_FAILED,
            UpdateError::ConfigLoadFailed(_) => error_code::CONFIG_LOAD_FAILED,
            UpdateError::InvalidConfigValue { .. } => error_code::CONFIG_INVALID_VALUE,
            _ => "UNKNOWN",
        }
    }

    /// 获取 HTTP 风格的状态码
    pub fn status_code(&self) -> u16 {
        match self {
            UpdateError::MissingParameter(_) => status_code::BAD_REQUEST,
            UpdateError::InvalidParameter(_) => status_code::BAD_REQUEST,
            UpdateError::LookupFailure { .. } => status_code::NOT_FOUND,
            UpdateError::RefreshFailure(_) => status_code::SERVICE_UNAVAILABLE,
            _ => status_code::INTERNAL_ERROR,
        }
    }

    /// 是否为调用方参数错误（提交时同步拒绝）
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            UpdateError::MissingParameter(_) | UpdateError::InvalidParameter(_)
        )
    }
}

/// 状态码常量
pub mod status_code {
    /// 成功
    pub const OK: u16 = 200;

    /// 已接受（异步处理中）
    pub const ACCEPTED: u16 = 202;

    /// 请求参数错误
    pub const BAD_REQUEST: u16 = 400;

    /// 未找到
    pub const NOT_FOUND: u16 = 404;

    /// 内部错误
    pub const INTERNAL_ERROR: u16 = 500;

    /// 服务不可用
    pub const SERVICE_UNAVAILABLE: u16 = 503;
}

/// 错误码常量
pub mod error_code {
    // 参数错误 (PARAM-xxx)
    pub const PARAM_MISSING: &str = "PARAM-001";
    pub const PARAM_INVALID: &str = "PARAM-002";

    // 外部来源错误 (SOURCE-xxx)
    pub const SOURCE_LOOKUP_FAILED: &str = "SOURCE-001";
    pub const SOURCE_REFRESH_FAILED: &str = "SOURCE-002";

    // 处理器错误 (PROCESS-xxx)
    pub const PROCESS_FAILED: &str = "PROCESS-001";

    // 配置错误 (CONFIG-xxx)
    pub const CONFIG_LOAD_FAILED: &str = "CONFIG-001";
    pub const CONFIG_INVALID_VALUE: &str = "CONFIG-002";
}
