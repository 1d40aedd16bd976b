pub mod analytics;
pub mod batch;
pub mod events;
pub mod health;
pub mod liquidation;
pub mod metrics;
pub mod monitor;
pub mod positions;
pub mod risk_metrics;
pub mod ws;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Envelope for every successful JSON API response.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// `?limit=&offset=` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    /// Apply defaults and bounds. Out-of-range values are 422.
    pub fn resolve(&self, default_limit: i64, max_limit: i64) -> Result<(i64, i64), AppError> {
        let limit = self.limit.unwrap_or(default_limit);
        if !(1..=max_limit).contains(&limit) {
            return Err(AppError::Unprocessable(format!(
                "limit must be between 1 and {max_limit}"
            )));
        }
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::Unprocessable("offset must be >= 0".into()));
        }
        Ok((limit, offset))
    }
}
