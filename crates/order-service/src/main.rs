//! 订单服务
//!
//! 消费 Kafka 订单事件写入 PostgreSQL，并通过 HTTP 提供带缓存的只读查询。

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use order_service::{
    ConsumerSettings, LruTtlCache, MetricsObserver, OrderConsumer, OrderRepository, OrderService,
    http::{AppState, build_router},
};
use order_shared::config::AppConfig;
use order_shared::database::Database;
use order_shared::kafka::KafkaMessageReader;
use order_shared::observability;
use order_shared::validate::DefaultOrderValidator;

const SERVICE_NAME: &str = "order-service";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载配置（只在启动时读取一次）
    let config = AppConfig::load(SERVICE_NAME).context("加载配置失败")?;

    // 2. 日志与指标
    let _guard = observability::init(&config.service_name, &config.observability).await?;

    info!(
        environment = %config.environment,
        topic = %config.kafka.topic,
        "Starting order-service..."
    );

    // 3. 数据库与迁移
    let db = Database::connect(&config.database)
        .await
        .context("连接数据库失败")?;
    sqlx::migrate!("../../migrations")
        .run(db.pool())
        .await
        .context("执行数据库迁移失败")?;
    info!("Database ready");

    // 4. 组装缓存、仓储与编排服务
    let observer = Arc::new(MetricsObserver);
    let cache = Arc::new(LruTtlCache::from_config(&config.cache, observer.clone()));
    let repo = Arc::new(OrderRepository::new(db.pool().clone()));
    let service = Arc::new(OrderService::new(
        repo,
        cache,
        Arc::new(DefaultOrderValidator::new()),
    ));

    if let Err(e) = service.warm_up_cache(config.cache.warm_up).await {
        warn!(error = %e, "缓存预热失败，以冷缓存启动");
    }

    // 5. 消费者
    let reader = Arc::new(KafkaMessageReader::new(&config.kafka)?);
    let consumer = Arc::new(OrderConsumer::new(
        reader,
        service.clone(),
        observer,
        ConsumerSettings::from_config(&config.kafka),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut consumer_task = tokio::spawn({
        let consumer = consumer.clone();
        let shutdown = shutdown_rx.clone();
        async move { consumer.run(shutdown).await }
    });

    // 6. HTTP 服务
    let app = build_router(AppState::new(
        service.clone(),
        config.server.handler_timeout(),
    ));
    let listener = TcpListener::bind(config.server_addr())
        .await
        .with_context(|| format!("监听 {} 失败", config.server_addr()))?;
    info!("Listening on {}", config.server_addr());

    let mut server_task = tokio::spawn({
        let mut shutdown = shutdown_rx.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.wait_for(|stop| *stop).await;
                })
                .await
        }
    });

    // 7. 等待关闭信号或后台任务意外退出
    let mut consumer_done = false;
    let mut server_done = false;
    tokio::select! {
        _ = shutdown_signal() => info!("收到关闭信号，开始优雅关闭"),
        result = &mut consumer_task => {
            consumer_done = true;
            report_consumer_exit(result);
        }
        result = &mut server_task => {
            server_done = true;
            match result {
                Ok(Ok(())) => warn!("HTTP 服务提前退出"),
                Ok(Err(e)) => error!(error = %e, "HTTP 服务异常退出"),
                Err(e) => error!(error = %e, "HTTP 服务任务异常"),
            }
        }
    }

    let _ = shutdown_tx.send(true);

    // 8. 给在途请求有限的排空时间
    if !server_done {
        match tokio::time::timeout(config.server.graceful_timeout(), &mut server_task).await {
            Ok(_) => info!("HTTP 服务已停止"),
            Err(_) => {
                warn!("HTTP 服务排空超时，强制关闭");
                server_task.abort();
            }
        }
    }

    if !consumer_done {
        match tokio::time::timeout(config.kafka.process_timeout(), &mut consumer_task).await {
            Ok(result) => report_consumer_exit(result),
            Err(_) => {
                warn!("消费者未在时限内退出");
                consumer_task.abort();
            }
        }
    }

    if let Err(e) = consumer.close() {
        warn!(error = %e, "关闭消费者失败");
    }
    db.close().await;

    info!("order-service shutdown complete");
    Ok(())
}

fn report_consumer_exit(result: std::result::Result<order_service::Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Err(e)) if e.is_cancelled() => info!("消费者已停止"),
        Ok(Ok(())) => info!("消费者已退出"),
        Ok(Err(e)) => error!(error = %e, "消费者异常退出"),
        Err(e) => error!(error = %e, "消费者任务异常"),
    }
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
