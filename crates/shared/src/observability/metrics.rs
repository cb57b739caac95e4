//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Metrics 资源守卫
pub struct MetricsHandle {
    server_handle: tokio::task::JoinHandle<()>,
}

impl MetricsHandle {
    pub fn shutdown(self) {
        self.server_handle.abort();
    }
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 与 `/health`。
pub async fn init(service_name: &str, port: u16) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_metrics(service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle { server_handle })
}

fn describe_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "cache_operations_total",
        "Order cache operations by kind (hit, miss, evicted, expired)"
    );
    metrics::describe_gauge!("cache_size", "Current number of entries in the order cache");

    metrics::describe_counter!(
        "kafka_messages_consumed_total",
        "Messages fetched from Kafka"
    );
    metrics::describe_counter!(
        "kafka_messages_processed_total",
        "Messages processed and committed"
    );
    metrics::describe_counter!(
        "kafka_messages_failed_total",
        "Messages whose processing failed"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "指标服务已监听");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "指标服务异常退出");
        }
    });

    Ok(server_handle)
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录一次缓存操作（hit / miss / evicted / expired）
#[inline]
pub fn record_cache_operation(op: &'static str) {
    metrics::counter!("cache_operations_total", "op" => op).increment(1);
}

/// 更新缓存条目数
#[inline]
pub fn set_cache_size(size: usize) {
    metrics::gauge!("cache_size").set(size as f64);
}

/// 记录从 Kafka 拉取到的消息
#[inline]
pub fn record_kafka_consumed(topic: &str) {
    metrics::counter!("kafka_messages_consumed_total", "topic" => topic.to_string()).increment(1);
}

/// 记录处理完成并提交的消息
#[inline]
pub fn record_kafka_processed(topic: &str) {
    metrics::counter!("kafka_messages_processed_total", "topic" => topic.to_string()).increment(1);
}

/// 记录处理失败的消息
#[inline]
pub fn record_kafka_failed(topic: &str) {
    metrics::counter!("kafka_messages_failed_total", "topic" => topic.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_do_not_panic() {
        // 即使没有初始化 recorder，这些函数也不应该 panic
        record_http_request("GET", "/order/{id}", 200, 0.1);
        record_cache_operation("hit");
        set_cache_size(3);
        record_kafka_consumed("orders");
        record_kafka_processed("orders");
        record_kafka_failed("orders");
    }
}
