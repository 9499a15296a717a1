use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::keys::DEFAULT_KEY_PREFIX;
use crate::index::IndexSettings;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub redis_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub allowed_origin: String,
    pub message_ttl_secs: u64,
    pub message_limit_per_geohash: usize,
    pub geohash_precision: usize,
    pub coordinate_decimals: u32,
    pub redis_key_prefix: String,
    pub store_timeout_ms: u64,
    pub max_concurrent_compactions: usize,
}

/// 读取可选的环境变量，缺失或无法解析时使用默认值
fn var_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {}={:?}, using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(Config {
            redis_url: env::var("REDIS_URL")?,
            server_host: var_or("SERVER_HOST", "0.0.0.0".to_string()),
            server_port: var_or("SERVER_PORT", 8443),
            allowed_origin: var_or("ALLOWED_ORIGIN", "http://localhost:3000".to_string()),
            message_ttl_secs: var_or("MESSAGE_TTL_SECS", 300),
            message_limit_per_geohash: var_or("MESSAGE_LIMIT_PER_GEOHASH", 10),
            geohash_precision: var_or("GEOHASH_PRECISION", 8),
            coordinate_decimals: var_or("COORDINATE_DECIMALS", 4),
            redis_key_prefix: var_or("REDIS_KEY_PREFIX", DEFAULT_KEY_PREFIX.to_string()),
            store_timeout_ms: var_or("STORE_TIMEOUT_MS", 2000),
            max_concurrent_compactions: var_or("MAX_CONCURRENT_COMPACTIONS", 32),
        })
    }

    pub fn message_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.message_ttl_secs.max(1) as i64)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            key_prefix: self.redis_key_prefix.clone(),
            ttl: self.message_ttl(),
            limit_per_bucket: self.message_limit_per_geohash.max(1),
            precision: self.geohash_precision.clamp(1, 12),
            decimals: self.coordinate_decimals,
            max_concurrent_compactions: self.max_concurrent_compactions.max(1),
            store_timeout: self.store_timeout(),
        }
    }
}
