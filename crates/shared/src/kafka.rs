//! Kafka 基础设施封装
//!
//! 将 rdkafka 的底层 API 封装为 `MessageReader` 抽象：逐条拉取、手动提交、
//! 回退到未提交的消息、只关闭一次。消费循环只依赖该 trait，便于在测试中替换为脚本化实现。

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::{Offset, TopicPartitionList};
use tracing::{debug, info};

use crate::config::KafkaConfig;
use crate::error::OrderError;

/// 回退消费位置的等待上限
const SEEK_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// ConsumerMessage
// ---------------------------------------------------------------------------

/// 消费到的 Kafka 消息的统一表示
///
/// 将 rdkafka 的 `BorrowedMessage`（带生命周期约束）转换为拥有所有权的结构体，
/// 使消息可以安全地跨 await 点传递给异步处理函数。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

impl ConsumerMessage {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            payload,
        }
    }

    /// 从 rdkafka 的借用消息构造，只保留定位信息与负载
    fn from_borrowed(msg: &BorrowedMessage<'_>) -> Self {
        Self::new(
            msg.topic(),
            msg.partition(),
            msg.offset(),
            msg.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        )
    }
}

// ---------------------------------------------------------------------------
// MessageReader
// ---------------------------------------------------------------------------

/// 消息读取能力
///
/// `fetch` 必须是取消安全的：消费循环会在关闭信号与 `fetch` 之间 `select!`。
#[async_trait]
pub trait MessageReader: Send + Sync {
    /// 拉取下一条消息，不自动提交
    async fn fetch(&self) -> Result<ConsumerMessage, OrderError>;

    /// 提交该消息的偏移量，使消费组越过它
    async fn commit(&self, msg: &ConsumerMessage) -> Result<(), OrderError>;

    /// 将该消息所在分区的消费位置回退到它本身，下一次 `fetch` 重新返回这条消息
    ///
    /// 之后的提交会覆盖分区内更早的偏移量，瞬时失败的消息必须先回退再继续拉取。
    async fn rewind(&self, msg: &ConsumerMessage) -> Result<(), OrderError>;

    /// 释放底层连接
    fn close(&self) -> Result<(), OrderError>;

    /// 用于日志与指标标签的描述（通常是 topic）
    fn describe(&self) -> String;
}

/// 基于 `StreamConsumer` 的读取器
pub struct KafkaMessageReader {
    consumer: StreamConsumer,
    topic: String,
}

impl KafkaMessageReader {
    /// 创建消费者并订阅配置中的 topic
    ///
    /// 关闭自动提交，偏移量只在处理结论明确后由消费循环手动提交。
    pub fn new(config: &KafkaConfig) -> Result<Self, OrderError> {
        let brokers = config.broker_list();
        if brokers.is_empty() {
            return Err(OrderError::Kafka("broker 列表为空".to_string()));
        }

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", brokers.join(","))
            .set("group.id", &config.consumer_group)
            .set("auto.offset.reset", config.auto_offset_reset())
            .set("enable.auto.commit", "false")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| OrderError::Kafka(format!("创建消费者失败: {e}")))?;

        consumer
            .subscribe(&[config.topic.as_str()])
            .map_err(|e| OrderError::Kafka(format!("订阅 topic 失败: {e}")))?;

        info!(
            brokers = %config.brokers,
            topic = %config.topic,
            group_id = %config.consumer_group,
            start_offset = %config.start_offset,
            "Kafka 消费者已初始化"
        );

        Ok(Self {
            consumer,
            topic: config.topic.clone(),
        })
    }
}

#[async_trait]
impl MessageReader for KafkaMessageReader {
    async fn fetch(&self) -> Result<ConsumerMessage, OrderError> {
        let borrowed = self
            .consumer
            .recv()
            .await
            .map_err(|e| OrderError::Kafka(format!("拉取消息失败: {e}")))?;
        let msg = ConsumerMessage::from_borrowed(&borrowed);

        debug!(
            topic = %msg.topic,
            partition = msg.partition,
            offset = msg.offset,
            "收到 Kafka 消息"
        );
        Ok(msg)
    }

    async fn commit(&self, msg: &ConsumerMessage) -> Result<(), OrderError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(&msg.topic, msg.partition, Offset::Offset(msg.offset + 1))
            .map_err(|e| OrderError::Kafka(format!("构造提交位置失败: {e}")))?;

        self.consumer
            .commit(&tpl, CommitMode::Async)
            .map_err(|e| OrderError::Kafka(format!("提交偏移量失败: {e}")))
    }

    async fn rewind(&self, msg: &ConsumerMessage) -> Result<(), OrderError> {
        self.consumer
            .seek(
                &msg.topic,
                msg.partition,
                Offset::Offset(msg.offset),
                SEEK_TIMEOUT,
            )
            .map_err(|e| OrderError::Kafka(format!("回退消费位置失败: {e}")))?;

        debug!(
            topic = %msg.topic,
            partition = msg.partition,
            offset = msg.offset,
            "消费位置已回退"
        );
        Ok(())
    }

    fn close(&self) -> Result<(), OrderError> {
        self.consumer.unsubscribe();
        info!(topic = %self.topic, "Kafka 消费者已退订");
        Ok(())
    }

    fn describe(&self) -> String {
        self.topic.clone()
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
