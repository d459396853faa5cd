//! Built-in demo datasets substituted when a backend route answers 404, so
//! the dashboard stays populated in environments where a collection does not
//! exist yet.

use crate::slices::analytics::AnalyticsAggregate;
use crate::slices::analytics::AnalyticsPrediction;
use crate::slices::analytics::DailySales;
use crate::slices::analytics::LiveMetrics;
use crate::slices::analytics::PredictionPoint;
use crate::slices::marketing::CampaignMetric;
use crate::slices::marketing::ConversionDatum;
use crate::slices::optimization::EfficiencyArea;
use crate::slices::optimization::ImpactLevel;
use crate::slices::optimization::OptimizationMetrics;
use crate::slices::optimization::Recommendation;
use crate::slices::optimization::RecommendationKind;
use crate::slices::optimization::RecommendationStatus;
use chrono::Duration;
use chrono::Utc;
use serde_json::json;

fn iso_date(offset_days: i64) -> String {
    (Utc::now().date_naive() + Duration::days(offset_days))
        .format("%Y-%m-%d")
        .to_string()
}

pub fn analytics_aggregate() -> AnalyticsAggregate {
    AnalyticsAggregate {
        total_sales: 245_000.5,
        avg_order_value: 189.75,
        orders_count: 1290,
        revenue_growth_pct: Some(8.4),
        by_day: (0..7)
            .map(|idx| DailySales {
                date: iso_date(idx - 6),
                sales: 25_000.0 + idx as f64 * 1200.0,
            })
            .collect(),
    }
}

pub fn analytics_predictions() -> AnalyticsPrediction {
    let values = [26_000.0, 26_800.0, 27_450.0, 28_120.0, 28_900.0];
    AnalyticsPrediction {
        forecast: values
            .iter()
            .enumerate()
            .map(|(idx, value)| PredictionPoint {
                date: iso_date(idx as i64 + 1),
                predicted_sales: *value,
            })
            .collect(),
        confidence: 0.84,
    }
}

pub fn analytics_live_metrics() -> LiveMetrics {
    let mut metrics = LiveMetrics::new();
    metrics.insert("revenue_last_24h".to_string(), json!(48_000));
    metrics.insert("orders_last_24h".to_string(), json!(320));
    metrics.insert("avg_order_value".to_string(), json!(150));
    metrics
}

pub fn marketing_campaigns() -> Vec<CampaignMetric> {
    vec![
        CampaignMetric {
            id: 1,
            campaign_name: Some("Awareness Boost".to_string()),
            channel: "Social".to_string(),
            budget: 25_000.0,
            spend: 18_000.0,
            impressions: 120_000,
            clicks: 8500,
            ctr: 0.07,
            cpc: 2.11,
            roi: Some(3.4),
            start_date: None,
            end_date: None,
        },
        CampaignMetric {
            id: 2,
            campaign_name: Some("Search Intent".to_string()),
            channel: "Search".to_string(),
            budget: 18_000.0,
            spend: 15_000.0,
            impressions: 98_000,
            clicks: 10_400,
            ctr: 0.106,
            cpc: 1.44,
            roi: Some(4.1),
            start_date: None,
            end_date: None,
        },
    ]
}

pub fn marketing_conversions() -> Vec<ConversionDatum> {
    vec![
        ConversionDatum {
            campaign_id: 1,
            date: iso_date(0),
            conversions: 320,
            revenue: 68_000.0,
        },
        ConversionDatum {
            campaign_id: 2,
            date: iso_date(0),
            conversions: 410,
            revenue: 82_000.0,
        },
    ]
}

pub fn optimization_metrics() -> OptimizationMetrics {
    OptimizationMetrics {
        current_efficiency: 0.64,
        target_efficiency: 0.82,
        improvement_potential: 0.18,
        areas: vec![
            EfficiencyArea {
                category: "Pricing".to_string(),
                current: 0.58,
                target: 0.8,
                improvement: 0.22,
            },
            EfficiencyArea {
                category: "Inventory".to_string(),
                current: 0.62,
                target: 0.78,
                improvement: 0.16,
            },
            EfficiencyArea {
                category: "Logistics".to_string(),
                current: 0.67,
                target: 0.85,
                improvement: 0.18,
            },
        ],
    }
}

pub fn optimization_recommendations() -> Vec<Recommendation> {
    let created_at = Utc::now().to_rfc3339();
    vec![
        Recommendation {
            id: "rec-1".to_string(),
            kind: RecommendationKind::Pricing,
            title: "Adjust premium bundle pricing".to_string(),
            description: "Increase bundle price by 6% to align with competitor median pricing."
                .to_string(),
            impact: ImpactLevel::High,
            estimated_value: 42_000.0,
            confidence: 0.82,
            status: RecommendationStatus::Pending,
            created_at: created_at.clone(),
        },
        Recommendation {
            id: "rec-2".to_string(),
            kind: RecommendationKind::Inventory,
            title: "Reallocate stock to NA warehouse".to_string(),
            description: "Shift 15% of slow-moving EU inventory to NA to meet demand surge."
                .to_string(),
            impact: ImpactLevel::Medium,
            estimated_value: 18_000.0,
            confidence: 0.76,
            status: RecommendationStatus::Pending,
            created_at,
        },
    ]
}
