use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{
    Client as RedisClient, Value,
    aio::{ConnectionLike, MultiplexedConnection},
};

use super::store::{self, BucketCommand, BucketStore, StoreError, StoreResult};

/// 基于 Redis 列表的桶存储
///
/// 启动时建立一条多路复用连接，之后每次调用复用它的克隆。
/// 每个调用都是一个 pipeline；调用超时由索引统一控制。
#[derive(Clone)]
pub struct RedisBucketStore {
    conn: MultiplexedConnection,
}

impl RedisBucketStore {
    pub async fn connect(client: &RedisClient, timeout: Duration) -> StoreResult<Self> {
        let conn = store::bounded(timeout, async {
            client
                .get_multiplexed_async_connection()
                .await
                .map_err(StoreError::from)
        })
        .await?;
        tracing::info!("Connected to redis");
        Ok(Self { conn })
    }
}

/// 把 pipeline 的逐条回复拆成每个键的结果
///
/// 某个键的服务端错误（如 WRONGTYPE）只影响该键。
pub fn split_replies(
    keys: &[String],
    replies: Vec<Value>,
) -> StoreResult<Vec<StoreResult<Vec<String>>>> {
    if replies.len() != keys.len() {
        return Err(StoreError::Command {
            key: keys.join(","),
            reason: format!("expected {} replies, got {}", keys.len(), replies.len()),
        });
    }

    let lists = keys
        .iter()
        .zip(replies)
        .map(|(key, reply)| match reply {
            Value::ServerError(err) => Err(StoreError::Command {
                key: key.clone(),
                reason: format!("{:?}", err),
            }),
            reply => redis::from_redis_value::<Vec<String>>(&reply).map_err(|e| {
                StoreError::Command {
                    key: key.clone(),
                    reason: e.to_string(),
                }
            }),
        })
        .collect();
    Ok(lists)
}

#[async_trait]
impl BucketStore for RedisBucketStore {
    async fn push(
        &self,
        key: &str,
        payload: String,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic()
            .lpush(key, payload)
            .ignore()
            .cmd("PEXPIREAT")
            .arg(key)
            .arg(expires_at.timestamp_millis())
            .ignore();

        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn range_all(&self, keys: &[String]) -> StoreResult<Vec<StoreResult<Vec<String>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.lrange(key, 0, -1);
        }

        // 直接取原始回复，避免一个键的错误让整个批次失败
        let replies = conn.req_packed_commands(&pipe, 0, keys.len()).await?;
        split_replies(keys, replies)
    }

    async fn execute(&self, commands: &[BucketCommand]) -> StoreResult<()> {
        if commands.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        for command in commands {
            match command {
                BucketCommand::Trim { key, len } if *len > 0 => {
                    pipe.ltrim(key, 0, *len as isize - 1).ignore();
                }
                BucketCommand::Trim { key, .. } | BucketCommand::Delete { key } => {
                    pipe.del(key).ignore();
                }
                BucketCommand::ExpireAt { key, at } => {
                    pipe.cmd("PEXPIREAT").arg(key).arg(at.timestamp_millis()).ignore();
                }
            }
        }

        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }
}
