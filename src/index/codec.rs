//! 消息与存储格式之间的转换

use crate::models::Message;

use super::error::Result;

pub fn encode(message: &Message) -> Result<String> {
    Ok(serde_json::to_string(message)?)
}

/// 解析存储中的消息，格式错误时返回 `None`
pub fn decode(payload: &str) -> Option<Message> {
    match serde_json::from_str(payload) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::warn!("Skipping malformed stored message: {}", e);
            None
        }
    }
}
