//! 订单服务
//!
//! 从 Kafka 摄取订单事件，持久化到 PostgreSQL，并通过带 TTL 的 LRU 缓存提供快速读取。
//!
//! ## 模块结构
//!
//! - `cache`: LRU + TTL 内存缓存
//! - `repository`: 订单聚合的事务性仓储
//! - `service`: 编排层（读穿透查询与摄取）
//! - `consumer`: Kafka 拉取 → 处理 → 提交循环
//! - `observer`: 缓存与消费者的指标观察者
//! - `http`: 只读 HTTP 接口

pub mod cache;
pub mod consumer;
pub mod http;
pub mod observer;
pub mod repository;
pub mod service;

pub use cache::{LruTtlCache, OrderCache};
pub use consumer::{ConsumerSettings, OrderConsumer};
pub use observer::{CacheObserver, ConsumerObserver, MetricsObserver, NoopObserver};
pub use order_shared::error::{OrderError, Result};
pub use repository::{OrderRepository, OrderRepositoryTrait};
pub use service::{OrderIngestor, OrderReadService, OrderService};
