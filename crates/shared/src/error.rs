//! 统一错误处理模块
//!
//! 定义订单管道中所有共享的错误类型，使用 thiserror 提供良好的错误信息。
//! 调用方依据错误"种类"（而非文本）决定是否提交偏移量、是否重试。

use thiserror::Error;

/// 订单系统错误类型
#[derive(Debug, Error)]
pub enum OrderError {
    // ==================== 输入错误（永久性） ====================
    /// 报文无法按严格模式解码：非法 JSON、未知字段或对象之后的多余内容
    #[error("无效的 JSON: {0}")]
    InvalidJson(String),

    /// 报文结构合法但违反业务约束
    #[error("订单校验失败: {0}")]
    InvalidOrder(String),

    // ==================== 存储错误（瞬时性） ====================
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    /// 仓储内部某一阶段失败，只暴露阶段名，底层错误通过 source() 获取
    #[error("仓储操作失败: stage={stage}")]
    Repository {
        stage: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("缺少必填字段: {0}")]
    MissingField(&'static str),

    // ==================== 基础设施错误 ====================
    #[error("Kafka 错误: {0}")]
    Kafka(String),

    #[error("缓存错误: {0}")]
    Cache(String),

    #[error("处理超时: {0}")]
    Timeout(String),

    /// 关闭信号触发的正常退出，不属于故障
    #[error("已取消")]
    Cancelled,

    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, OrderError>;

impl OrderError {
    /// 为仓储阶段包装 sqlx 错误，供 `map_err` 使用
    pub fn stage(stage: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Repository { stage, source }
    }

    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidJson(_) => "INVALID_JSON",
            Self::InvalidOrder(_) => "INVALID_ORDER",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Repository { .. } => "REPOSITORY_ERROR",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::Kafka(_) => "KAFKA_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Cancelled => "CANCELLED",
            Self::Io(_) => "IO_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为永久性错误：重试也不会成功，消费者应提交偏移量跳过该消息
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::InvalidJson(_) | Self::InvalidOrder(_))
    }

    /// 是否为可重试错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Repository { .. }
                | Self::MissingField(_)
                | Self::Kafka(_)
                | Self::Timeout(_)
        )
    }

    /// 是否由关闭信号引起
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<serde_json::Error> for OrderError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson(err.to_string())
    }
}
