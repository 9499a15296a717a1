//! 邻近消息索引
//!
//! 写入：坐标 -> 桶键 -> 推入桶列表头部。
//! 读取：坐标 -> 9 个桶键 -> 一次批量读取 -> 过滤并安排压缩 -> 合并。

pub mod codec;
pub mod compaction;
mod error;
pub mod merge;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Semaphore;

use crate::cache::{BucketCommand, BucketStore, keys, store::bounded};
use crate::geo::{self, GeoHasher};
use crate::models::{Message, NewMessage};

pub use error::{IndexError, Result};

/// 索引的固定参数
#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub key_prefix: String,
    pub ttl: Duration,
    /// 每个桶每次查询最多检查的消息数
    pub limit_per_bucket: usize,
    pub precision: usize,
    pub decimals: u32,
    pub max_concurrent_compactions: usize,
    /// 每次存储调用的超时
    pub store_timeout: StdDuration,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            key_prefix: keys::DEFAULT_KEY_PREFIX.to_string(),
            ttl: Duration::minutes(5),
            limit_per_bucket: 10,
            precision: 8,
            decimals: 4,
            max_concurrent_compactions: 32,
            store_timeout: StdDuration::from_secs(2),
        }
    }
}

pub struct ProximityIndex {
    store: Arc<dyn BucketStore>,
    hasher: GeoHasher,
    settings: IndexSettings,
    compaction_permits: Arc<Semaphore>,
}

impl ProximityIndex {
    pub fn new(store: Arc<dyn BucketStore>, settings: IndexSettings) -> Self {
        Self {
            store,
            hasher: GeoHasher::new(settings.precision, settings.decimals),
            compaction_permits: Arc::new(Semaphore::new(settings.max_concurrent_compactions)),
            settings,
        }
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    pub async fn insert(&self, new: NewMessage) -> Result<Message> {
        self.insert_at(new, Utc::now()).await
    }

    /// 以 `now` 为插入时间写入一条消息
    pub async fn insert_at(&self, new: NewMessage, now: DateTime<Utc>) -> Result<Message> {
        if new.message.trim().is_empty() {
            return Err(IndexError::Validation("message must not be empty".into()));
        }
        geo::validate_coordinate(new.latitude, new.longitude)?;

        let message = Message::stamp(new, now, self.settings.ttl);
        let hash = self
            .hasher
            .bucket_key_for(message.latitude, message.longitude)?;
        tracing::debug!(
            "Storing message at {}, {} in bucket {}",
            message.latitude,
            message.longitude,
            hash
        );

        let payload = codec::encode(&message)?;
        let key = keys::bucket_key(&self.settings.key_prefix, &hash);
        bounded(
            self.settings.store_timeout,
            self.store.push(&key, payload, message.expires_at),
        )
        .await?;

        Ok(message)
    }

    pub async fn nearby(&self, latitude: f64, longitude: f64) -> Result<Vec<Message>> {
        self.nearby_at(latitude, longitude, Utc::now()).await
    }

    /// 查询 `now` 时刻坐标附近的存活消息，按过期时间降序
    pub async fn nearby_at(
        &self,
        latitude: f64,
        longitude: f64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Message>> {
        geo::validate_coordinate(latitude, longitude)?;

        let hood = self.hasher.neighborhood(latitude, longitude)?;
        tracing::debug!("Neighborhood of {} => {:?}", hood.center(), hood.keys());

        let keys: Vec<String> = hood
            .keys()
            .iter()
            .map(|hash| keys::bucket_key(&self.settings.key_prefix, hash))
            .collect();
        let fetched = bounded(self.settings.store_timeout, self.store.range_all(&keys)).await?;

        let mut lists = Vec::with_capacity(keys.len());
        let mut commands = Vec::new();
        for (key, raw) in keys.iter().zip(fetched) {
            let raw = match raw {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!("Skipping bucket {}: {}", key, e);
                    continue;
                }
            };

            let mut plan =
                compaction::plan_bucket(key, &raw, self.settings.limit_per_bucket, now);
            if !merge::is_sorted_desc(&plan.live) {
                plan.live.sort_by(|a, b| b.expires_at.cmp(&a.expires_at));
            }
            lists.push(plan.live);
            commands.extend(plan.commands);
        }

        self.schedule_compaction(commands);
        Ok(merge::merge_all(lists))
    }

    /// 在后台执行压缩命令，调用方不等待结果
    fn schedule_compaction(&self, commands: Vec<BucketCommand>) {
        if commands.is_empty() {
            return;
        }

        // 没有空闲名额时放弃本次压缩，下次读取会再次尝试
        let permit = match Arc::clone(&self.compaction_permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!(
                    "Compaction capacity exhausted, skipping {} commands",
                    commands.len()
                );
                return;
            }
        };

        let store = Arc::clone(&self.store);
        let timeout = self.settings.store_timeout;
        tokio::spawn(async move {
            let _permit = permit;
            match bounded(timeout, store.execute(&commands)).await {
                Ok(()) => tracing::debug!("Compacted {} bucket commands", commands.len()),
                Err(e) => tracing::warn!("Bucket compaction failed: {}", e),
            }
        });
    }
}
