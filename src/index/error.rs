use thiserror::Error;

use crate::cache::StoreError;

#[derive(Debug, Error)]
pub enum IndexError {
    /// 请求内容不合法，未访问存储
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("invalid bucket key: {0}")]
    InvalidBucket(#[from] geohash::GeohashError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IndexError>;
