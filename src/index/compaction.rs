//! 过期过滤与惰性压缩
//!
//! 读取时对每个桶只检查前 `limit` 条消息，保留未过期的部分；
//! 若桶尾部存在过期或超出上限的消息，则生成裁剪命令，
//! 全部过期时删除整个桶。

use chrono::{DateTime, Utc};

use crate::cache::BucketCommand;
use crate::models::Message;

use super::codec;

/// 单个桶的过滤结果
#[derive(Debug, Default)]
pub struct BucketPlan {
    /// 未过期的消息，保持列表中的顺序
    pub live: Vec<Message>,
    /// 需要在后台执行的压缩命令
    pub commands: Vec<BucketCommand>,
}

pub fn plan_bucket(key: &str, raw: &[String], limit: usize, now: DateTime<Utc>) -> BucketPlan {
    let mut live = Vec::new();
    // 最后一条存活消息之后的位置
    let mut retain = 0;

    for (pos, payload) in raw.iter().take(limit).enumerate() {
        let Some(message) = codec::decode(payload) else {
            continue;
        };
        if message.is_live(now) {
            live.push(message);
            retain = pos + 1;
        }
    }

    let commands = if raw.is_empty() {
        Vec::new()
    } else if live.is_empty() {
        vec![BucketCommand::Delete {
            key: key.to_string(),
        }]
    } else if retain < raw.len() {
        let horizon = live
            .iter()
            .map(|m| m.expires_at)
            .max()
            .unwrap_or(now);
        vec![
            BucketCommand::Trim {
                key: key.to_string(),
                len: retain,
            },
            BucketCommand::ExpireAt {
                key: key.to_string(),
                at: horizon,
            },
        ]
    } else {
        Vec::new()
    };

    BucketPlan { live, commands }
}
