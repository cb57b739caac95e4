//! 订单领域模型
//!
//! `Order` 是聚合根，按 `order_uid` 唯一标识，包含一条配送信息、一条支付信息
//! 与若干商品。JSON 字段名与上游报文保持一致；解码时拒绝未知字段。
//!
//! 各层需要保留订单时都持有自己的副本（`Clone`），不会跨层原地修改。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 订单聚合根
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, FromRow)]
#[serde(deny_unknown_fields, default)]
pub struct Order {
    pub order_uid: String,
    pub track_number: String,
    /// 下单渠道
    pub entry: String,
    #[sqlx(skip)]
    pub delivery: Delivery,
    #[sqlx(skip)]
    pub payment: Payment,
    #[sqlx(skip)]
    pub items: Vec<Item>,
    pub locale: String,
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    #[serde(rename = "shardkey")]
    #[sqlx(rename = "shardkey")]
    pub shard_key: String,
    pub sm_id: i64,
    /// RFC 3339 时间戳
    pub date_created: DateTime<Utc>,
    pub oof_shard: String,
}

/// 配送信息（与订单 1:1）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, FromRow)]
#[serde(deny_unknown_fields, default)]
pub struct Delivery {
    pub name: String,
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    pub email: String,
}

/// 支付信息（与订单 1:1，`transaction` 通常等于 `order_uid`）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, FromRow)]
#[serde(deny_unknown_fields, default)]
pub struct Payment {
    pub transaction: String,
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    pub amount: i64,
    /// Unix 秒
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i64,
    pub goods_total: i64,
    pub custom_fee: i64,
}

/// 订单商品（与订单 1:N，每次保存整体替换）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, FromRow)]
#[serde(deny_unknown_fields, default)]
pub struct Item {
    pub chrt_id: i64,
    pub track_number: String,
    pub price: i64,
    pub rid: String,
    pub name: String,
    /// 折扣百分比
    pub sale: i64,
    pub size: String,
    pub total_price: i64,
    pub nm_id: i64,
    pub brand: String,
    pub status: i64,
}
