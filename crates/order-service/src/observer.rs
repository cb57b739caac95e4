//! 指标观察者
//!
//! 缓存与消费者只向注入的观察者报告事件，不直接触碰全局指标注册表；
//! 测试中可以注入记录型观察者断言事件序列。

use order_shared::observability::metrics;

/// 缓存事件观察者
pub trait CacheObserver: Send + Sync {
    fn on_hit(&self) {}
    fn on_miss(&self) {}
    fn on_evicted(&self) {}
    fn on_expired(&self) {}
    fn on_size(&self, _size: usize) {}
}

/// 消费者事件观察者
pub trait ConsumerObserver: Send + Sync {
    fn on_consumed(&self, _topic: &str) {}
    fn on_processed(&self, _topic: &str) {}
    fn on_failed(&self, _topic: &str) {}
}

/// 写入 Prometheus 指标的观察者
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObserver;

impl CacheObserver for MetricsObserver {
    fn on_hit(&self) {
        metrics::record_cache_operation("hit");
    }

    fn on_miss(&self) {
        metrics::record_cache_operation("miss");
    }

    fn on_evicted(&self) {
        metrics::record_cache_operation("evicted");
    }

    fn on_expired(&self) {
        metrics::record_cache_operation("expired");
    }

    fn on_size(&self, size: usize) {
        metrics::set_cache_size(size);
    }
}

impl ConsumerObserver for MetricsObserver {
    fn on_consumed(&self, topic: &str) {
        metrics::record_kafka_consumed(topic);
    }

    fn on_processed(&self, topic: &str) {
        metrics::record_kafka_processed(topic);
    }

    fn on_failed(&self, topic: &str) {
        metrics::record_kafka_failed(topic);
    }
}

/// 丢弃所有事件
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl CacheObserver for NoopObserver {}

impl ConsumerObserver for NoopObserver {}
