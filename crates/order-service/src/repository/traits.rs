//! 仓储 Trait 定义
//!
//! 服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;

use order_shared::error::Result;
use order_shared::models::Order;

/// 订单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    /// 幂等保存整个订单聚合；商品列表整体替换
    async fn save(&self, order: &Order) -> Result<()>;

    /// 不存在时返回 `None`，不视为错误
    async fn get_by_uid(&self, order_uid: &str) -> Result<Option<Order>>;

    /// 按创建时间倒序分页；`limit` 非正时取默认页大小，`offset` 为负时按 0 处理
    async fn list_by_customer(
        &self,
        customer_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>>;

    /// 最近创建的 `n` 个完整订单，`n` 非正时返回空
    async fn last_n(&self, n: i64) -> Result<Vec<Order>>;
}
