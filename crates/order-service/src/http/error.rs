//! HTTP 错误类型
//!
//! 响应体统一为 `{"error": "..."}`，系统级错误只返回通用提示，细节只进日志。

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use order_shared::error::OrderError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("order not found")]
    OrderNotFound,

    #[error("route not found")]
    RouteNotFound,

    #[error("request timed out")]
    Timeout,

    #[error(transparent)]
    Service(#[from] OrderError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::OrderNotFound | Self::RouteNotFound => StatusCode::NOT_FOUND,
            Self::Timeout | Self::Service(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::RouteNotFound => "ROUTE_NOT_FOUND",
            Self::Timeout => "TIMEOUT",
            Self::Service(e) => e.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Timeout => {
                tracing::error!("读取订单超时");
                "internal server error".to_string()
            }
            Self::Service(e) => {
                tracing::error!(error = %e, code = e.code(), "读取订单失败");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (self.status_code(), Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::OrderNotFound, StatusCode::NOT_FOUND, "ORDER_NOT_FOUND"),
            (ApiError::RouteNotFound, StatusCode::NOT_FOUND, "ROUTE_NOT_FOUND"),
            (ApiError::Timeout, StatusCode::INTERNAL_SERVER_ERROR, "TIMEOUT"),
            (
                ApiError::Service(OrderError::Database(sqlx::Error::PoolTimedOut)),
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
            ),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.status_code(), status);
            assert_eq!(err.error_code(), code);
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_messages_are_english() {
        assert_eq!(ApiError::OrderNotFound.to_string(), "order not found");
        assert_eq!(ApiError::RouteNotFound.to_string(), "route not found");
        assert_eq!(ApiError::Timeout.to_string(), "request timed out");
    }
}
