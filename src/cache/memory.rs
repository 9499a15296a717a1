use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::store::{BucketCommand, BucketStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct Bucket {
    items: VecDeque<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl Bucket {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// 某个桶在某一时刻的内容
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSnapshot {
    pub items: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// 进程内的桶存储，列表与过期语义与 Redis 一致
///
/// 用于测试和无 Redis 时的本地运行，支持注入故障。
#[derive(Debug, Default)]
pub struct MemoryBucketStore {
    buckets: Mutex<HashMap<String, Bucket>>,
    failing_keys: Mutex<HashSet<String>>,
    unavailable: AtomicBool,
    fetch_batches: AtomicUsize,
    write_batches: AtomicUsize,
}

impl MemoryBucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟整个存储不可用
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// 让某个键的读取单独失败
    pub fn fail_key(&self, key: impl Into<String>) {
        self.failing_keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into());
    }

    pub fn snapshot(&self, key: &str) -> Option<BucketSnapshot> {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let bucket = Self::live_bucket(&mut buckets, key, Utc::now())?;
        Some(BucketSnapshot {
            items: bucket.items.iter().cloned().collect(),
            expires_at: bucket.expires_at,
        })
    }

    /// 已执行的批量读取次数
    pub fn fetch_batches(&self) -> usize {
        self.fetch_batches.load(Ordering::SeqCst)
    }

    /// 已执行的批量写命令次数（不含 push）
    pub fn write_batches(&self) -> usize {
        self.write_batches.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(redis::RedisError::from((
                redis::ErrorKind::IoError,
                "memory store marked unavailable",
            ))));
        }
        Ok(())
    }

    // 过期的桶在访问时被移除
    fn live_bucket<'a>(
        buckets: &'a mut HashMap<String, Bucket>,
        key: &str,
        now: DateTime<Utc>,
    ) -> Option<&'a mut Bucket> {
        if buckets.get(key).is_some_and(|b| b.is_expired(now)) {
            buckets.remove(key);
        }
        buckets.get_mut(key)
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    async fn push(
        &self,
        key: &str,
        payload: String,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.check_available()?;
        let now = Utc::now();
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        if buckets.get(key).is_some_and(|b| b.is_expired(now)) {
            buckets.remove(key);
        }
        let bucket = buckets.entry(key.to_string()).or_default();
        bucket.items.push_front(payload);
        bucket.expires_at = Some(expires_at);
        if bucket.is_expired(now) {
            buckets.remove(key);
        }
        Ok(())
    }

    async fn range_all(&self, keys: &[String]) -> StoreResult<Vec<StoreResult<Vec<String>>>> {
        self.check_available()?;
        self.fetch_batches.fetch_add(1, Ordering::SeqCst);

        let now = Utc::now();
        let failing = self
            .failing_keys
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());

        let lists = keys
            .iter()
            .map(|key| {
                if failing.contains(key) {
                    return Err(StoreError::Command {
                        key: key.clone(),
                        reason: "injected failure".into(),
                    });
                }
                Ok(Self::live_bucket(&mut buckets, key, now)
                    .map(|b| b.items.iter().cloned().collect())
                    .unwrap_or_default())
            })
            .collect();
        Ok(lists)
    }

    async fn execute(&self, commands: &[BucketCommand]) -> StoreResult<()> {
        self.check_available()?;
        self.write_batches.fetch_add(1, Ordering::SeqCst);

        let now = Utc::now();
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        for command in commands {
            match command {
                BucketCommand::Trim { key, len } => {
                    if let Some(bucket) = Self::live_bucket(&mut buckets, key, now) {
                        bucket.items.truncate(*len);
                        if bucket.items.is_empty() {
                            buckets.remove(key);
                        }
                    }
                }
                BucketCommand::ExpireAt { key, at } => {
                    if let Some(bucket) = Self::live_bucket(&mut buckets, key, now) {
                        bucket.expires_at = Some(*at);
                        if bucket.is_expired(now) {
                            buckets.remove(key);
                        }
                    }
                }
                BucketCommand::Delete { key } => {
                    buckets.remove(key);
                }
            }
        }
        Ok(())
    }
}
