//! 请求处理器

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::debug;

use order_shared::models::Order;

use super::error::ApiError;
use super::state::AppState;

/// 客户订单列表的默认条数
pub const DEFAULT_LIMIT: i64 = 20;
/// 客户订单列表的最大条数
pub const MAX_LIMIT: i64 = 100;

/// 分页参数，保留原始字符串以便对非法值回退默认值而不是拒绝请求
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl PageQuery {
    /// 缺省或无法解析时为 20，其余钳制到 [1, 100]
    pub fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(|v| v.clamp(1, MAX_LIMIT))
            .unwrap_or(DEFAULT_LIMIT)
    }

    /// 缺省、无法解析或为负时为 0
    pub fn offset(&self) -> i64 {
        self.offset
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v >= 0)
            .unwrap_or(0)
    }
}

/// GET /ping
pub async fn ping() -> &'static str {
    "pong"
}

/// GET /order/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_uid): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order = tokio::time::timeout(state.request_timeout, state.service.get_order(&order_uid))
        .await
        .map_err(|_| ApiError::Timeout)??;

    match order {
        Some(order) => Ok(Json(order)),
        None => {
            debug!(order_uid = %order_uid, "订单不存在");
            Err(ApiError::OrderNotFound)
        }
    }
}

/// GET /customer/{id}/orders
pub async fn customer_orders(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let (limit, offset) = (page.limit(), page.offset());

    let orders = tokio::time::timeout(
        state.request_timeout,
        state.service.orders_by_customer(&customer_id, limit, offset),
    )
    .await
    .map_err(|_| ApiError::Timeout)??;

    Ok(Json(orders))
}

/// 未匹配的路由
pub async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}
