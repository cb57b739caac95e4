//! 共享库
//!
//! 包含订单服务与离线校验工具共用的领域模型、校验器、配置、错误处理、
//! 数据库连接、Kafka 读取器与可观测性等基础设施代码。

pub mod config;
pub mod database;
pub mod error;
pub mod kafka;
pub mod models;
pub mod observability;
pub mod test_utils;
pub mod validate;
