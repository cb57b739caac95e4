//! Kafka 消费循环
//!
//! 逐条执行 拉取 → 处理 → 提交：
//! - 处理成功：提交偏移量
//! - 解码或校验失败：同样提交，坏消息被永久跳过
//! - 其他错误：不提交，将消费位置回退到该消息，短暂抖动休眠后重新处理同一条消息
//!
//! 同一分区后续消息的提交会覆盖更早的偏移量，因此瞬时失败的消息在成功或
//! 被判定为永久失败之前，循环不会越过它。回退失败时直接在内存中重试。
//!
//! 拉取失败按指数退避（等抖动）重试，成功拉取后退避时间复位。
//! 关闭信号会打断拉取与退避休眠，但不会打断正在处理的消息，
//! 后者由单条消息的处理超时约束。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tracing::{Instrument, debug, error, info, info_span, warn};

use order_shared::config::KafkaConfig;
use order_shared::error::{OrderError, Result};
use order_shared::kafka::{ConsumerMessage, MessageReader};

use crate::observer::ConsumerObserver;
use crate::service::OrderIngestor;

/// 处理失败后两次拉取之间休眠的上限
const FAILURE_PAUSE_CEILING: Duration = Duration::from_millis(500);

/// 消费循环的时间参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerSettings {
    /// 单条消息的处理超时
    pub process_timeout: Duration,
    /// 拉取失败的初始退避
    pub retry_initial: Duration,
    /// 拉取失败的最大退避
    pub retry_max: Duration,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self::from_config(&KafkaConfig::default())
    }
}

impl ConsumerSettings {
    pub fn from_config(config: &KafkaConfig) -> Self {
        Self {
            process_timeout: config.process_timeout(),
            retry_initial: config.retry_initial(),
            retry_max: config.retry_max(),
        }
    }

    fn failure_pause(&self) -> Duration {
        self.retry_initial.min(FAILURE_PAUSE_CEILING)
    }
}

/// 订单消费者
///
/// 对读取器与摄取器都是泛型的，测试中可以用脚本化实现替换 Kafka 与编排服务。
pub struct OrderConsumer<R, I>
where
    R: MessageReader,
    I: OrderIngestor,
{
    reader: Arc<R>,
    ingestor: Arc<I>,
    observer: Arc<dyn ConsumerObserver>,
    settings: ConsumerSettings,
    closed: AtomicBool,
}

impl<R, I> OrderConsumer<R, I>
where
    R: MessageReader,
    I: OrderIngestor,
{
    pub fn new(
        reader: Arc<R>,
        ingestor: Arc<I>,
        observer: Arc<dyn ConsumerObserver>,
        settings: ConsumerSettings,
    ) -> Self {
        Self {
            reader,
            ingestor,
            observer,
            settings,
            closed: AtomicBool::new(false),
        }
    }

    /// 运行消费循环直到收到关闭信号
    ///
    /// 正常关闭时返回 `Err(OrderError::Cancelled)`，调用方据此区分关闭与故障。
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let source = self.reader.describe();
        let mut backoff = self.settings.retry_initial;

        info!(source = %source, "订单消费者已启动");

        // 回退失败时留在内存中等待重试的消息
        let mut pending: Option<ConsumerMessage> = None;

        loop {
            let msg = match pending.take() {
                Some(msg) => msg,
                None => {
                    let fetched = tokio::select! {
                        biased;

                        _ = shutdown_requested(&mut shutdown) => {
                            info!(source = %source, "收到关闭信号，消费循环退出");
                            return Err(OrderError::Cancelled);
                        }

                        fetched = self.reader.fetch() => fetched,
                    };

                    match fetched {
                        Ok(msg) => {
                            backoff = self.settings.retry_initial;
                            msg
                        }
                        Err(e) => {
                            let delay = equal_jitter(backoff);
                            warn!(
                                error = %e,
                                backoff_ms = delay.as_millis() as u64,
                                "拉取消息失败，退避后重试"
                            );
                            if !self.pause(&mut shutdown, delay).await {
                                info!(source = %source, "退避期间收到关闭信号，消费循环退出");
                                return Err(OrderError::Cancelled);
                            }
                            backoff = next_backoff(backoff, self.settings.retry_max);
                            continue;
                        }
                    }
                }
            };

            let span = info_span!(
                "consume",
                topic = %msg.topic,
                partition = msg.partition,
                offset = msg.offset,
            );
            let retry_later = self.handle(&msg).instrument(span).await;

            if retry_later {
                if let Err(e) = self.reader.rewind(&msg).await {
                    warn!(
                        error = %e,
                        offset = msg.offset,
                        "回退消费位置失败，在内存中重试该消息"
                    );
                    pending = Some(msg);
                }

                let delay = equal_jitter(self.settings.failure_pause());
                if !self.pause(&mut shutdown, delay).await {
                    info!(source = %source, "收到关闭信号，消费循环退出");
                    return Err(OrderError::Cancelled);
                }
            }
        }
    }

    /// 处理单条消息并决定是否提交，返回 `true` 表示未提交、需要重新处理
    async fn handle(&self, msg: &ConsumerMessage) -> bool {
        self.observer.on_consumed(&msg.topic);

        match self.process(msg).await {
            Ok(()) => {
                self.observer.on_processed(&msg.topic);
                self.commit(msg).await;
                false
            }
            Err(e) if e.is_permanent() => {
                self.observer.on_failed(&msg.topic);
                warn!(error = %e, code = e.code(), "无效消息，提交偏移量并跳过");
                self.commit(msg).await;
                false
            }
            Err(e) => {
                self.observer.on_failed(&msg.topic);
                error!(error = %e, code = e.code(), "处理消息失败，不提交偏移量");
                true
            }
        }
    }

    async fn process(&self, msg: &ConsumerMessage) -> Result<()> {
        match tokio::time::timeout(
            self.settings.process_timeout,
            self.ingestor.ingest(&msg.payload),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(OrderError::Timeout(format!(
                "消息处理超过 {}ms",
                self.settings.process_timeout.as_millis()
            ))),
        }
    }

    async fn commit(&self, msg: &ConsumerMessage) {
        match self.reader.commit(msg).await {
            Ok(()) => debug!("偏移量已提交"),
            // 未提交的偏移量会在之后被重新投递，不中断循环
            Err(e) => warn!(error = %e, "提交偏移量失败"),
        }
    }

    /// 可被关闭信号打断的休眠，被打断时返回 `false`
    async fn pause(&self, shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
        tokio::select! {
            biased;

            _ = shutdown_requested(shutdown) => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// 关闭底层读取器，多次或并发调用只生效一次
    pub fn close(&self) -> Result<()> {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }
        info!(source = %self.reader.describe(), "关闭订单消费者");
        self.reader.close()
    }
}

/// 关闭信号变为 `true` 或发送端被丢弃时完成
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// 等抖动：一半固定，另一半在 `[0, d/2]` 内均匀随机
pub fn equal_jitter(delay: Duration) -> Duration {
    let half = delay / 2;
    let spread = delay.saturating_sub(half);
    if spread.is_zero() {
        return delay;
    }
    let extra = rand::rng().random_range(0..=spread.as_nanos() as u64);
    half + Duration::from_nanos(extra)
}

/// 退避时间翻倍，不超过上限
pub fn next_backoff(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}
