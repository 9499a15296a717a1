use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// 已存储的位置消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub latitude: f64,
    pub longitude: f64,
    pub message: String,
    pub inserted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// 客户端提交的消息，客户端带来的时间字段会被忽略
#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
    pub latitude: f64,
    pub longitude: f64,
    pub message: String,
}

impl Message {
    /// 以 `now` 为插入时间生成消息，过期时间为 `now + ttl`
    pub fn stamp(new: NewMessage, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            latitude: new.latitude,
            longitude: new.longitude,
            message: new.message,
            inserted_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
