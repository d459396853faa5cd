pub mod analytics;
pub mod forecasting;
pub mod marketing;
pub mod nutrition;
pub mod optimization;

pub use analytics::AnalyticsSlice;
pub use forecasting::ForecastingSlice;
pub use marketing::MarketingSlice;
pub use nutrition::NutritionSlice;
pub use optimization::OptimizationSlice;

use crate::api::ApiResult;
use crate::cache::FetchCache;
use crate::cache::RequestKey;
use crate::http::HttpClient;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Inclusive date window filter shared by several slices. Dates are ISO
/// `YYYY-MM-DD` strings, the format the backend accepts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    pub total: Option<u64>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            total: None,
        }
    }
}

pub(crate) fn param(name: &str, value: impl ToString) -> (String, String) {
    (name.to_string(), value.to_string())
}

/// GET through the request cache: a fresh entry is served without a network
/// call, concurrent identical requests are deduplicated, and `force` skips
/// the entry short-circuit (refresh path).
pub(crate) async fn cached_get(
    client: &Arc<HttpClient>,
    cache: &FetchCache,
    path: &str,
    params: Vec<(String, String)>,
    force: bool,
) -> ApiResult<Value> {
    let key = RequestKey::new(path, params);
    let client = Arc::clone(client);
    let fetch_key = key.clone();
    let fetch = move || async move {
        ApiResult::from_response(client.get(fetch_key.path(), fetch_key.params()).await)
    };
    if force {
        cache.refresh(&key, fetch).await
    } else {
        cache.get_or_fetch(&key, fetch).await
    }
}
