//! 应用状态定义

use std::sync::Arc;
use std::time::Duration;

use crate::service::OrderReadService;

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn OrderReadService>,
    /// 单个请求读取订单的时限，与缓存或数据库的实际耗时无关
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(service: Arc<dyn OrderReadService>, request_timeout: Duration) -> Self {
        Self {
            service,
            request_timeout,
        }
    }
}
