//! 服务层
//!
//! 编排缓存、仓储与校验器：读穿透查询与“解码 → 校验 → 持久化 → 写缓存”的摄取流程。
//!
//! ## 模块结构
//!
//! - `order_service`: 订单编排服务及其对外暴露的读、摄取两个能力接口

pub mod order_service;

pub use order_service::{OrderIngestor, OrderReadService, OrderService};
