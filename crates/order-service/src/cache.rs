//! 订单内存缓存（LRU + TTL）
//!
//! - 容量固定，超出时淘汰最久未使用的条目
//! - TTL 为空时退化为纯 LRU；命中会以当前时间重新计算过期时刻（滑动过期）
//! - 插入新键前从 LRU 端惰性清理已过期条目，不做后台扫描
//! - 读写都复制订单，调用方修改拿到的副本不会影响缓存内容
//!
//! 所有操作持有同一把锁，锁内只做 O(1) 的链表与索引操作。

use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use order_shared::config::CacheConfig;
use order_shared::error::{OrderError, Result};
use order_shared::models::Order;

use crate::observer::CacheObserver;

/// 订单缓存能力
#[cfg_attr(test, mockall::automock)]
pub trait OrderCache: Send + Sync {
    /// 命中时返回订单副本
    fn get(&self, order_uid: &str) -> Option<Order>;

    /// 写入或更新订单，`order_uid` 为空时报错
    fn set(&self, order: &Order) -> Result<()>;

    /// 依次写入一批订单，遇到第一个错误即中止
    fn warm_up(&self, orders: &[Order]) -> Result<()>;
}

struct Entry {
    order: Order,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }
}

/// 带 TTL 的 LRU 缓存
pub struct LruTtlCache {
    inner: Mutex<LruCache<String, Entry>>,
    capacity: usize,
    ttl: Option<Duration>,
    observer: Arc<dyn CacheObserver>,
}

impl LruTtlCache {
    /// `capacity` 为 0 时按 1 处理；`ttl` 为 `None` 或零时不过期
    pub fn new(capacity: usize, ttl: Option<Duration>, observer: Arc<dyn CacheObserver>) -> Self {
        Self {
            inner: Mutex::new(LruCache::unbounded()),
            capacity: capacity.max(1),
            ttl: ttl.filter(|ttl| !ttl.is_zero()),
            observer,
        }
    }

    pub fn from_config(config: &CacheConfig, observer: Arc<dyn CacheObserver>) -> Self {
        Self::new(config.capacity(), config.ttl(), observer)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expiry_from(&self, now: Instant) -> Option<Instant> {
        self.ttl.map(|ttl| now + ttl)
    }

    /// 从 LRU 端移除已过期条目，遇到第一个未过期条目即停止
    fn prune_expired(&self, inner: &mut LruCache<String, Entry>, now: Instant) {
        if self.ttl.is_none() {
            return;
        }
        while inner
            .peek_lru()
            .is_some_and(|(_, entry)| entry.is_expired(now))
        {
            inner.pop_lru();
            self.observer.on_expired();
            self.observer.on_size(inner.len());
        }
    }
}

impl OrderCache for LruTtlCache {
    fn get(&self, order_uid: &str) -> Option<Order> {
        if order_uid.is_empty() {
            self.observer.on_miss();
            return None;
        }

        let now = Instant::now();
        let mut inner = self.inner.lock();

        match inner.peek(order_uid).map(|entry| entry.is_expired(now)) {
            None => {
                self.observer.on_miss();
                None
            }
            Some(true) => {
                inner.pop(order_uid);
                self.observer.on_expired();
                self.observer.on_size(inner.len());
                None
            }
            Some(false) => {
                let expires_at = self.expiry_from(now);
                let entry = inner.get_mut(order_uid)?;
                if expires_at.is_some() {
                    entry.expires_at = expires_at;
                }
                self.observer.on_hit();
                Some(entry.order.clone())
            }
        }
    }

    fn set(&self, order: &Order) -> Result<()> {
        if order.order_uid.is_empty() {
            return Err(OrderError::Cache("order_uid 为空，拒绝写入缓存".to_string()));
        }

        let now = Instant::now();
        let expires_at = self.expiry_from(now);
        let mut inner = self.inner.lock();

        // 已存在：替换内容、刷新 TTL 并提升到最近使用，不触发淘汰
        if let Some(entry) = inner.get_mut(order.order_uid.as_str()) {
            entry.order = order.clone();
            entry.expires_at = expires_at;
            return Ok(());
        }

        self.prune_expired(&mut inner, now);

        inner.push(
            order.order_uid.clone(),
            Entry {
                order: order.clone(),
                expires_at,
            },
        );
        self.observer.on_size(inner.len());

        if inner.len() > self.capacity {
            inner.pop_lru();
            self.observer.on_evicted();
            self.observer.on_size(inner.len());
        }

        Ok(())
    }

    fn warm_up(&self, orders: &[Order]) -> Result<()> {
        for order in orders {
            self.set(order)?;
        }
        Ok(())
    }
}
