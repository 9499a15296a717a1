//! 坐标到空间桶的映射
//!
//! 坐标先按固定小数位四舍五入，再编码为固定精度的 geohash，
//! 使几乎相同的坐标落入同一个桶。查询时使用本桶加周围 8 个邻居。

use geohash::{Coord, Neighbors};

use crate::index::IndexError;

/// 一次查询涉及的桶数量：本桶 + 8 个邻居
pub const NEIGHBORHOOD_SIZE: usize = 9;

/// 查询使用的 9 个桶键，第一个为查询坐标所在的桶
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighborhood {
    keys: [String; NEIGHBORHOOD_SIZE],
}

impl Neighborhood {
    fn new(center: String, n: Neighbors) -> Self {
        Self {
            keys: [center, n.n, n.ne, n.e, n.se, n.s, n.sw, n.w, n.nw],
        }
    }

    pub fn center(&self) -> &str {
        &self.keys[0]
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GeoHasher {
    precision: usize,
    decimals: u32,
}

impl GeoHasher {
    pub fn new(precision: usize, decimals: u32) -> Self {
        Self {
            precision,
            decimals,
        }
    }

    /// 计算坐标所在的桶键
    pub fn bucket_key_for(&self, latitude: f64, longitude: f64) -> Result<String, IndexError> {
        let coord = Coord {
            x: round_coordinate(longitude, self.decimals),
            y: round_coordinate(latitude, self.decimals),
        };
        Ok(geohash::encode(coord, self.precision)?)
    }

    /// 桶键的 8 个相邻桶，键格式错误时返回错误
    pub fn neighbor_keys(&self, bucket_key: &str) -> Result<Neighbors, IndexError> {
        Ok(geohash::neighbors(bucket_key)?)
    }

    pub fn neighborhood(&self, latitude: f64, longitude: f64) -> Result<Neighborhood, IndexError> {
        let center = self.bucket_key_for(latitude, longitude)?;
        let neighbors = self.neighbor_keys(&center)?;
        Ok(Neighborhood::new(center, neighbors))
    }
}

/// 四舍五入到指定的小数位
pub fn round_coordinate(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

pub fn validate_coordinate(latitude: f64, longitude: f64) -> Result<(), IndexError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(IndexError::Validation(format!(
            "latitude out of range: {latitude}"
        )));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(IndexError::Validation(format!(
            "longitude out of range: {longitude}"
        )));
    }
    Ok(())
}
