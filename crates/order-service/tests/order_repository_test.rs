//! OrderRepository 集成测试
//!
//! 使用真实 PostgreSQL 验证事务性写入、回读与分页语义。
//!
//! ## 运行方式
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo test -p order-service --test order_repository_test -- --ignored
//! ```

use chrono::{Duration, SubsecRound, Utc};
use order_service::{OrderError, OrderRepository};
use order_shared::database::Database;
use order_shared::models::{Delivery, Order, Payment};
use order_shared::test_utils::{
    sample_item, sample_order, sample_orders_for_customer, test_database_config,
};
use sqlx::PgPool;

// ==================== 辅助函数 ====================

async fn setup() -> (PgPool, OrderRepository) {
    let db = Database::connect(&test_database_config())
        .await
        .expect("连接测试数据库失败");
    sqlx::migrate!("../../migrations")
        .run(db.pool())
        .await
        .expect("执行迁移失败");

    let pool = db.pool().clone();
    (pool.clone(), OrderRepository::new(pool))
}

/// 每个测试使用独立的标识，避免并行测试互相干扰
fn unique(prefix: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{prefix}-{nanos}")
}

async fn count(pool: &PgPool, table: &str, order_uid: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE order_uid = $1"))
        .bind(order_uid)
        .fetch_one(pool)
        .await
        .expect("计数失败")
}

// ==================== 写入与回读 ====================

#[tokio::test]
#[ignore]
async fn test_save_then_get_returns_identical_order() {
    let (_pool, repo) = setup().await;
    let mut order = sample_order(&unique("order"), &unique("customer"));
    order.items.push(sample_item(2, "Lipstick"));
    order.items.push(sample_item(3, "Powder"));

    repo.save(&order).await.unwrap();

    let loaded = repo.get_by_uid(&order.order_uid).await.unwrap().unwrap();
    assert_eq!(loaded, order);
    let names: Vec<_> = loaded.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Mascaras", "Lipstick", "Powder"]);
}

#[tokio::test]
#[ignore]
async fn test_resave_overwrites_and_replaces_items() {
    let (pool, repo) = setup().await;
    let mut order = sample_order(&unique("order"), &unique("customer"));
    order.items.push(sample_item(2, "Lipstick"));
    repo.save(&order).await.unwrap();

    order.track_number = "WBILMUPDATED".to_string();
    order.delivery.city = "Tel Aviv".to_string();
    order.payment.amount = 42;
    order.items = vec![sample_item(7, "Replacement")];
    repo.save(&order).await.unwrap();

    let loaded = repo.get_by_uid(&order.order_uid).await.unwrap().unwrap();
    assert_eq!(loaded, order);
    assert_eq!(count(&pool, "orders", &order.order_uid).await, 1);
    assert_eq!(count(&pool, "payments", &order.order_uid).await, 1);
    assert_eq!(count(&pool, "items", &order.order_uid).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_get_missing_order_is_none() {
    let (_pool, repo) = setup().await;
    assert!(repo.get_by_uid(&unique("absent")).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_missing_related_rows_yield_zero_values() {
    let (pool, repo) = setup().await;
    let order_uid = unique("bare");
    let customer_id = unique("customer");

    sqlx::query("INSERT INTO customers (id) VALUES ($1)")
        .bind(&customer_id)
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO orders (order_uid, track_number, entry, customer_id, date_created) \
         VALUES ($1, 'TRACK', 'WBIL', $2, NOW())",
    )
    .bind(&order_uid)
    .bind(&customer_id)
    .execute(&pool)
    .await
    .unwrap();

    let loaded = repo.get_by_uid(&order_uid).await.unwrap().unwrap();
    assert_eq!(loaded.delivery, Delivery::default());
    assert_eq!(loaded.payment, Payment::default());
    assert!(loaded.items.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_save_requires_uid_and_customer() {
    let (pool, repo) = setup().await;
    let order_uid = unique("no-customer");
    let order = sample_order(&order_uid, "");

    let err = repo.save(&order).await.unwrap_err();
    assert!(matches!(err, OrderError::MissingField("customer_id")));
    assert_eq!(count(&pool, "orders", &order_uid).await, 0);

    let err = repo.save(&sample_order("", "someone")).await.unwrap_err();
    assert!(matches!(err, OrderError::MissingField("order_uid")));
}

#[tokio::test]
#[ignore]
async fn test_failed_save_rolls_back() {
    let (pool, repo) = setup().await;
    let mut order = sample_order(&unique("rollback"), &unique("customer"));
    // NUL 字节会被 PostgreSQL 的 TEXT 拒绝，使商品写入阶段失败
    order.items[0].name = "bad\0name".to_string();

    let err = repo.save(&order).await.unwrap_err();
    assert!(matches!(err, OrderError::Repository { stage: "insert items", .. }));
    assert_eq!(count(&pool, "orders", &order.order_uid).await, 0);
    assert_eq!(count(&pool, "payments", &order.order_uid).await, 0);
}

// ==================== 分页 ====================

#[tokio::test]
#[ignore]
async fn test_list_by_customer_newest_first_with_paging() {
    let (_pool, repo) = setup().await;
    let customer = unique("pager");
    let prefix = unique("page");
    let orders = sample_orders_for_customer(&prefix, &customer, 5);
    for order in &orders {
        repo.save(order).await.unwrap();
    }

    let uids = |list: Vec<Order>| list.into_iter().map(|o| o.order_uid).collect::<Vec<_>>();

    let all = uids(repo.list_by_customer(&customer, 10, 0).await.unwrap());
    let expected: Vec<_> = orders.iter().rev().map(|o| o.order_uid.clone()).collect();
    assert_eq!(all, expected);

    let page = uids(repo.list_by_customer(&customer, 2, 1).await.unwrap());
    assert_eq!(page, expected[1..3].to_vec());

    // 非正 limit 取默认页大小，负 offset 视为 0
    let defaulted = uids(repo.list_by_customer(&customer, 0, -5).await.unwrap());
    assert_eq!(defaulted, expected);

    let other = repo.list_by_customer(&unique("stranger"), 10, 0).await.unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_same_timestamp_breaks_ties_by_uid_desc() {
    let (_pool, repo) = setup().await;
    let customer = unique("ties");
    let prefix = unique("tie");
    for suffix in ["a", "c", "b"] {
        let order = sample_order(&format!("{prefix}-{suffix}"), &customer);
        repo.save(&order).await.unwrap();
    }

    let listed: Vec<_> = repo
        .list_by_customer(&customer, 10, 0)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.order_uid)
        .collect();
    assert_eq!(
        listed,
        vec![
            format!("{prefix}-c"),
            format!("{prefix}-b"),
            format!("{prefix}-a")
        ]
    );
}

#[tokio::test]
#[ignore]
async fn test_last_n_returns_newest_orders_hydrated() {
    let (_pool, repo) = setup().await;
    let customer = unique("recent");
    // 远期且逐次运行递增的时间，保证本次写入的订单是库中最新的
    let base = (Utc::now() + Duration::days(100 * 365)).trunc_subsecs(6);

    let mut saved = Vec::new();
    for i in 0..3 {
        let mut order = sample_order(&unique(&format!("recent{i}")), &customer);
        order.date_created = base + Duration::microseconds(i);
        repo.save(&order).await.unwrap();
        saved.push(order);
    }

    let latest = repo.last_n(2).await.unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[0], saved[2]);
    assert_eq!(latest[1], saved[1]);

    assert!(repo.last_n(0).await.unwrap().is_empty());
}
