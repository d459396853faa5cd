use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use pulseboard_core::config::ClientConfig;
use pulseboard_core::dashboard::Dashboard;
use pulseboard_core::dashboard::SliceName;
use serde_json::json;
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "pulseboard",
    about = "Fetch analytics dashboard data slices and print their state"
)]
pub struct Cli {
    /// Backend base URL; overrides PULSEBOARD_API_BASE.
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Refresh every slice concurrently and print the merged outcome.
    Overview,
    /// Fetch the sales aggregate, forecast, and live metrics.
    Analytics {
        /// Forecast horizon in days.
        #[arg(long, value_name = "DAYS")]
        horizon: Option<u32>,
        /// Live metrics window, e.g. 24h or 7d.
        #[arg(long, value_name = "WINDOW")]
        window: Option<String>,
    },
    /// Fetch campaign metrics and conversions.
    Marketing {
        #[arg(long, value_name = "CHANNEL")]
        channel: Option<String>,
        #[arg(long = "min-roi", value_name = "ROI")]
        min_roi: Option<f64>,
    },
    /// Fetch recommendations and efficiency metrics; optionally apply or
    /// reject one recommendation first.
    Optimization {
        #[arg(long, value_name = "ID")]
        apply: Option<String>,
        #[arg(long, value_name = "ID")]
        reject: Option<String>,
    },
    /// Fetch per-product forecasts and the horizon metrics.
    Forecasting {
        #[arg(long = "product", value_name = "ID")]
        products: Vec<String>,
        #[arg(long, value_name = "DAYS")]
        horizon: Option<u32>,
    },
    /// Fetch nutrition insights, product data, and trends.
    Nutrition {
        #[arg(long, value_name = "CATEGORY")]
        category: Option<String>,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let mut config = ClientConfig::from_env();
    if let Some(base_url) = cli.base_url {
        config = config.with_base_url(base_url);
    }
    info!(base_url = %config.base_url, "connecting to backend");
    let dashboard = Dashboard::new(config)?;

    match cli.command {
        Command::Overview => {
            let summary = dashboard.refresh_all().await;
            let statuses: serde_json::Map<String, serde_json::Value> = SliceName::ALL
                .iter()
                .map(|slice| {
                    let status = dashboard.status(*slice);
                    (slice.to_string(), json!(status))
                })
                .collect();
            print_json(&json!({
                "summary": summary,
                "slices": statuses,
                "cache": dashboard.cache().stats(),
            }))?;
        }
        Command::Analytics { horizon, window } => {
            let analytics = &dashboard.analytics;
            tokio::join!(
                analytics.fetch_aggregate(),
                analytics.fetch_predictions(horizon),
                analytics.fetch_live_metrics(window.as_deref()),
            );
            print_json(&json!({
                "aggregate": analytics.aggregate(),
                "predictions": analytics.predictions(),
                "live_metrics": analytics.live_metrics(),
            }))?;
        }
        Command::Marketing { channel, min_roi } => {
            let marketing = &dashboard.marketing;
            marketing.set_channel_filter(channel);
            marketing.set_min_roi(min_roi);
            marketing.refresh().await;
            print_json(&json!({
                "campaigns": marketing.campaigns(),
                "conversions": marketing.conversions(),
            }))?;
        }
        Command::Optimization { apply, reject } => {
            let optimization = &dashboard.optimization;
            tokio::join!(
                optimization.fetch_recommendations(),
                optimization.fetch_metrics(),
            );
            if let Some(id) = apply {
                optimization.apply_recommendation(&id).await;
            }
            if let Some(id) = reject {
                optimization.reject_recommendation(&id).await;
            }
            print_json(&json!({
                "recommendations": optimization.recommendations(),
                "metrics": optimization.metrics(),
                "active_optimizations": optimization.active_optimizations(),
            }))?;
        }
        Command::Forecasting { products, horizon } => {
            let forecasting = &dashboard.forecasting;
            if let Some(days) = horizon {
                forecasting.set_horizon(days);
            }
            forecasting.set_selected_product_ids(products);
            forecasting.refresh().await;
            print_json(&json!({
                "forecasts": forecasting.forecasts(),
                "metrics": forecasting.metrics(),
            }))?;
        }
        Command::Nutrition { category } => {
            let nutrition = &dashboard.nutrition;
            nutrition.set_category_filter(category);
            nutrition.refresh().await;
            print_json(&json!({
                "insights": nutrition.insights(),
                "product_data": nutrition.product_data(),
                "trends": nutrition.trends(),
            }))?;
        }
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
