//! 订单编排服务
//!
//! 缓存是尽力而为的优化层：缓存写入失败只记录告警，不向调用方传播。
//! 摄取时解码与校验错误是永久性的，持久化错误是瞬时性的，
//! 消费者据此决定是否提交偏移量。

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, error, info, instrument, warn};

use order_shared::error::Result;
use order_shared::models::Order;
use order_shared::validate::{OrderValidator, decode_order};

use crate::cache::OrderCache;
use crate::repository::OrderRepositoryTrait;

/// 读接口，供 HTTP 层使用
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderReadService: Send + Sync {
    /// 订单不存在时返回 `None`
    async fn get_order(&self, order_uid: &str) -> Result<Option<Order>>;

    async fn orders_by_customer(
        &self,
        customer_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>>;
}

/// 摄取接口，供消费者使用
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderIngestor: Send + Sync {
    /// 处理一条原始消息
    ///
    /// 返回 `InvalidJson` / `InvalidOrder` 表示消息本身有问题，重试无意义；
    /// 其他错误表示可以稍后重试。
    async fn ingest(&self, raw: &[u8]) -> Result<()>;
}

/// 订单编排服务
pub struct OrderService<R, C>
where
    R: OrderRepositoryTrait,
    C: OrderCache,
{
    repo: Arc<R>,
    cache: Arc<C>,
    validator: Arc<dyn OrderValidator>,
}

impl<R, C> OrderService<R, C>
where
    R: OrderRepositoryTrait,
    C: OrderCache,
{
    pub fn new(repo: Arc<R>, cache: Arc<C>, validator: Arc<dyn OrderValidator>) -> Self {
        Self {
            repo,
            cache,
            validator,
        }
    }

    /// 读穿透查询：先查缓存，未命中再查库并回填
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_uid: &str) -> Result<Option<Order>> {
        if let Some(order) = self.cache.get(order_uid) {
            debug!("缓存命中");
            return Ok(Some(order));
        }

        let start = Instant::now();
        let order = self.repo.get_by_uid(order_uid).await.inspect_err(|e| {
            error!(error = %e, "查询订单失败");
        })?;

        if let Some(order) = &order {
            self.cache_best_effort(order);
        }

        debug!(
            found = order.is_some(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "缓存未命中，已从数据库读取"
        );
        Ok(order)
    }

    /// 客户订单分页，直接透传到仓储
    #[instrument(skip(self))]
    pub async fn orders_by_customer(
        &self,
        customer_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>> {
        self.repo.list_by_customer(customer_id, limit, offset).await
    }

    /// 解码 → 校验 → 持久化 → 写缓存
    #[instrument(skip(self, raw), fields(bytes = raw.len(), order_uid = tracing::field::Empty))]
    pub async fn ingest(&self, raw: &[u8]) -> Result<()> {
        let order = decode_order(raw).inspect_err(|e| {
            warn!(error = %e, "消息解码失败");
        })?;
        tracing::Span::current().record("order_uid", order.order_uid.as_str());

        self.validator.validate(&order).inspect_err(|e| {
            warn!(error = %e, "订单校验失败");
        })?;

        self.repo.save(&order).await.inspect_err(|e| {
            error!(error = %e, "订单保存失败");
        })?;

        self.cache_best_effort(&order);

        info!(items = order.items.len(), "订单已入库");
        Ok(())
    }

    /// 用最近的 `n` 个订单预热缓存，`n` 非正时跳过
    #[instrument(skip(self))]
    pub async fn warm_up_cache(&self, n: i64) -> Result<()> {
        if n <= 0 {
            info!("跳过缓存预热");
            return Ok(());
        }

        let start = Instant::now();
        let orders = self.repo.last_n(n).await.inspect_err(|e| {
            error!(error = %e, "读取最近订单失败");
        })?;

        if let Err(e) = self.cache.warm_up(&orders) {
            warn!(error = %e, "缓存预热中断");
        }

        info!(
            count = orders.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "缓存预热完成"
        );
        Ok(())
    }

    fn cache_best_effort(&self, order: &Order) {
        if let Err(e) = self.cache.set(order) {
            warn!(order_uid = %order.order_uid, error = %e, "写入缓存失败");
        }
    }
}

#[async_trait]
impl<R, C> OrderReadService for OrderService<R, C>
where
    R: OrderRepositoryTrait,
    C: OrderCache,
{
    async fn get_order(&self, order_uid: &str) -> Result<Option<Order>> {
        self.get_order(order_uid).await
    }

    async fn orders_by_customer(
        &self,
        customer_id: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>> {
        self.orders_by_customer(customer_id, limit, offset).await
    }
}

#[async_trait]
impl<R, C> OrderIngestor for OrderService<R, C>
where
    R: OrderRepositoryTrait,
    C: OrderCache,
{
    async fn ingest(&self, raw: &[u8]) -> Result<()> {
        self.ingest(raw).await
    }
}
