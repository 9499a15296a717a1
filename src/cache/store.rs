use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// 连接失败、连接断开或 IO 错误
    #[error("store unavailable: {0}")]
    Unavailable(redis::RedisError),

    /// 存储拒绝了命令，重试也不会成功
    #[error("store rejected the request: {0}")]
    Rejected(redis::RedisError),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    /// 单个键的命令失败，批量中的其他键不受影响
    #[error("command on {key} failed: {reason}")]
    Command { key: String, reason: String },
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_timeout()
        {
            StoreError::Unavailable(err)
        } else {
            StoreError::Rejected(err)
        }
    }
}

impl StoreError {
    /// 是否属于暂时性故障（连接或超时）
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

/// 在 `timeout` 内完成一次存储调用，超时视为失败
pub async fn bounded<T>(
    timeout: Duration,
    fut: impl Future<Output = StoreResult<T>>,
) -> StoreResult<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(timeout)),
    }
}

/// 压缩阶段对桶执行的写命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketCommand {
    /// 只保留列表前 `len` 个元素
    Trim { key: String, len: usize },
    /// 在绝对时间 `at` 让桶过期
    ExpireAt { key: String, at: DateTime<Utc> },
    Delete { key: String },
}

/// 以键分组的消息列表存储
///
/// 每个桶是一个列表，新写入的元素在最前面。
/// 多键操作必须作为一次批量请求发出。
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// 把 `payload` 插入桶列表头部，并把桶的过期时间设为 `expires_at`
    async fn push(&self, key: &str, payload: String, expires_at: DateTime<Utc>)
    -> StoreResult<()>;

    /// 批量读取多个桶的完整列表
    ///
    /// 外层错误表示整个批次失败；内层错误只影响对应的键。
    async fn range_all(&self, keys: &[String]) -> StoreResult<Vec<StoreResult<Vec<String>>>>;

    /// 在一次往返中执行一组写命令
    async fn execute(&self, commands: &[BucketCommand]) -> StoreResult<()>;
}
