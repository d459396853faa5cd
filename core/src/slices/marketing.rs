use crate::cache::FetchCache;
use crate::http::HttpClient;
use crate::mock;
use crate::slice::Resource;
use crate::slice::ResourceOptions;
use crate::slice::SliceState;
use crate::slice::SliceStatus;
use crate::slices::DateRange;
use crate::slices::Pagination;
use crate::slices::cached_get;
use crate::slices::param;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;
use std::sync::Mutex;

const CAMPAIGNS_PATH: &str = "/api/marketing/campaign-metrics";
const CONVERSIONS_PATH: &str = "/api/marketing/conversions";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignMetric {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_name: Option<String>,
    pub channel: String,
    pub budget: f64,
    pub spend: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub ctr: f64,
    pub cpc: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionDatum {
    pub campaign_id: u64,
    pub date: String,
    pub conversions: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignQuery {
    pub channel: Option<String>,
    pub min_roi: Option<f64>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl CampaignQuery {
    fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(channel) = &self.channel {
            params.push(param("channel", channel));
        }
        if let Some(min_roi) = self.min_roi {
            params.push(param("min_roi", min_roi));
        }
        if let Some(limit) = self.limit {
            params.push(param("limit", limit));
        }
        if let Some(offset) = self.offset {
            params.push(param("offset", offset));
        }
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ConversionQuery {
    fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(start_date) = &self.start_date {
            params.push(param("start_date", start_date));
        }
        if let Some(end_date) = &self.end_date {
            params.push(param("end_date", end_date));
        }
        if let Some(limit) = self.limit {
            params.push(param("limit", limit));
        }
        if let Some(offset) = self.offset {
            params.push(param("offset", offset));
        }
        params
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketingFilters {
    pub channel: Option<String>,
    pub min_roi: Option<f64>,
    pub date_range: DateRange,
    pub pagination: Pagination,
}

/// Campaign performance and conversion series. Both lists clear before a
/// refresh refetch so a consumer never renders old and new rows mixed, and
/// both fall back to demo data when the backend route is absent.
pub struct MarketingSlice {
    client: Arc<HttpClient>,
    cache: FetchCache,
    campaigns: Resource<Vec<CampaignMetric>>,
    conversions: Resource<Vec<ConversionDatum>>,
    selected_campaign: Mutex<Option<CampaignMetric>>,
    filters: Mutex<MarketingFilters>,
}

impl MarketingSlice {
    pub fn new(client: Arc<HttpClient>, cache: FetchCache) -> Self {
        Self {
            client,
            cache,
            campaigns: Resource::new(
                ResourceOptions::default()
                    .with_clear_on_refresh()
                    .with_not_found_fallback(mock::marketing_campaigns),
            ),
            conversions: Resource::new(
                ResourceOptions::default()
                    .with_clear_on_refresh()
                    .with_not_found_fallback(mock::marketing_conversions),
            ),
            selected_campaign: Mutex::new(None),
            filters: Mutex::new(MarketingFilters::default()),
        }
    }

    pub async fn fetch_campaigns(&self, query: &CampaignQuery) {
        self.load_campaigns(query, false).await;
    }

    pub async fn fetch_conversions(&self, query: &ConversionQuery) {
        self.load_conversions(query, false).await;
    }

    /// Refetches both lists concurrently with the current filters applied.
    pub async fn refresh(&self) {
        let (campaign_query, conversion_query) = self.queries_from_filters();
        tokio::join!(
            self.load_campaigns(&campaign_query, true),
            self.load_conversions(&conversion_query, true),
        );
    }

    fn queries_from_filters(&self) -> (CampaignQuery, ConversionQuery) {
        let filters = self.filters.lock().expect("marketing filters lock");
        let campaign_query = CampaignQuery {
            channel: filters.channel.clone(),
            min_roi: filters.min_roi,
            limit: Some(filters.pagination.limit),
            offset: Some(filters.pagination.offset),
        };
        let conversion_query = ConversionQuery {
            start_date: filters.date_range.start.clone(),
            end_date: filters.date_range.end.clone(),
            limit: Some(filters.pagination.limit),
            offset: Some(filters.pagination.offset),
        };
        (campaign_query, conversion_query)
    }

    async fn load_campaigns(&self, query: &CampaignQuery, force: bool) {
        let params = query.params();
        let future = async {
            cached_get(&self.client, &self.cache, CAMPAIGNS_PATH, params, force)
                .await
                .decode()
        };
        if force {
            self.campaigns.refresh_with(future).await;
        } else {
            self.campaigns.fetch_with(future).await;
        }
    }

    async fn load_conversions(&self, query: &ConversionQuery, force: bool) {
        let params = query.params();
        let future = async {
            cached_get(&self.client, &self.cache, CONVERSIONS_PATH, params, force)
                .await
                .decode()
        };
        if force {
            self.conversions.refresh_with(future).await;
        } else {
            self.conversions.fetch_with(future).await;
        }
    }

    pub fn campaigns(&self) -> SliceState<Vec<CampaignMetric>> {
        self.campaigns.snapshot()
    }

    pub fn conversions(&self) -> SliceState<Vec<ConversionDatum>> {
        self.conversions.snapshot()
    }

    pub fn status(&self) -> SliceStatus {
        SliceStatus::merge([self.campaigns.status(), self.conversions.status()])
    }

    pub fn set_campaigns(&self, campaigns: Vec<CampaignMetric>) {
        self.campaigns.set(campaigns);
    }

    pub fn set_conversions(&self, conversions: Vec<ConversionDatum>) {
        self.conversions.set(conversions);
    }

    pub fn selected_campaign(&self) -> Option<CampaignMetric> {
        self.selected_campaign
            .lock()
            .expect("selected campaign lock")
            .clone()
    }

    pub fn set_selected_campaign(&self, campaign: Option<CampaignMetric>) {
        *self
            .selected_campaign
            .lock()
            .expect("selected campaign lock") = campaign;
    }

    pub fn dismiss_errors(&self) {
        self.campaigns.dismiss_error();
        self.conversions.dismiss_error();
    }

    pub fn filters(&self) -> MarketingFilters {
        self.filters.lock().expect("marketing filters lock").clone()
    }

    pub fn set_channel_filter(&self, channel: Option<String>) {
        self.filters.lock().expect("marketing filters lock").channel = channel;
    }

    pub fn set_min_roi(&self, min_roi: Option<f64>) {
        self.filters.lock().expect("marketing filters lock").min_roi = min_roi;
    }

    pub fn set_date_range(&self, start: Option<String>, end: Option<String>) {
        self.filters.lock().expect("marketing filters lock").date_range = DateRange { start, end };
    }

    pub fn set_pagination(&self, limit: u32, offset: u32, total: Option<u64>) {
        let mut filters = self.filters.lock().expect("marketing filters lock");
        filters.pagination = Pagination {
            limit,
            offset,
            total: total.or(filters.pagination.total),
        };
    }

    pub fn reset_filters(&self) {
        *self.filters.lock().expect("marketing filters lock") = MarketingFilters::default();
    }
}
