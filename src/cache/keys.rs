/// 默认的桶键前缀
pub const DEFAULT_KEY_PREFIX: &str = "GEOTALK:";

/// 生成桶在存储中的键
pub fn bucket_key(prefix: &str, geohash: &str) -> String {
    format!("{}{}", prefix, geohash)
}
