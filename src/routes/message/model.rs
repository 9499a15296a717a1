use serde::Deserialize;

use crate::error::AppError;

/// 查询附近消息的参数，原样保留字符串以便区分缺失和格式错误
#[derive(Debug, Default, Deserialize)]
pub struct LocationQuery {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
}

impl LocationQuery {
    pub fn parse(&self) -> Result<(f64, f64), AppError> {
        let (Some(lat), Some(lon)) = (self.latitude.as_deref(), self.longitude.as_deref()) else {
            return Err(AppError::InvalidRequest(
                "Missing latitude or longitude".into(),
            ));
        };
        if lat.trim().is_empty() || lon.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "Missing latitude or longitude".into(),
            ));
        }

        match (lat.trim().parse::<f64>(), lon.trim().parse::<f64>()) {
            (Ok(lat), Ok(lon)) => Ok((lat, lon)),
            _ => Err(AppError::InvalidRequest(
                "Invalid latitude or longitude".into(),
            )),
        }
    }
}
