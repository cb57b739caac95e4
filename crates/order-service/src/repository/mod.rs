//! 数据库仓储层
//!
//! 订单聚合（订单、配送、支付、商品）的持久化与读取。
//!
//! - 保存在单个事务内完成，任何一步失败整体回滚
//! - 错误只携带阶段名，驱动细节留在 `source()` 中
//! - 定义 trait 接口以支持 mock 测试

mod order_repo;
mod traits;

pub use order_repo::{DEFAULT_PAGE_SIZE, OrderRepository};
pub use traits::*;
