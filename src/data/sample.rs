//! Synthetic media-performance sample.
//!
//! Each channel has a simple funnel profile:
//!
//! ```text
//! impressions = spend / cpm * 1000
//! clicks      = impressions * ctr
//! conversions = clicks * cvr
//! form_fills  = conversions * form_fill_rate
//! sales       = conversions * order_value
//! ```
//!
//! with multiplicative Gaussian noise at every stage. The seed fully determines
//! the output.

use chrono::{Duration, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Column, Dataset, Metric, PerformanceRecord};
use crate::error::AppError;

/// Funnel parameters for one synthetic channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelProfile {
    pub name: &'static str,
    pub daily_spend: f64,
    /// Cost per thousand impressions.
    pub cpm: f64,
    /// Click-through rate (fraction).
    pub ctr: f64,
    /// Conversions per click.
    pub cvr: f64,
    /// Form fills per conversion.
    pub form_fill_rate: f64,
    pub order_value: f64,
}

pub const DEFAULT_PROFILES: [ChannelProfile; 5] = [
    ChannelProfile {
        name: "Search",
        daily_spend: 1200.0,
        cpm: 30.0,
        ctr: 0.035,
        cvr: 0.06,
        form_fill_rate: 0.40,
        order_value: 120.0,
    },
    ChannelProfile {
        name: "Social",
        daily_spend: 900.0,
        cpm: 9.0,
        ctr: 0.012,
        cvr: 0.025,
        form_fill_rate: 0.30,
        order_value: 80.0,
    },
    ChannelProfile {
        name: "Display",
        daily_spend: 600.0,
        cpm: 4.0,
        ctr: 0.004,
        cvr: 0.02,
        form_fill_rate: 0.20,
        order_value: 95.0,
    },
    ChannelProfile {
        name: "Email",
        daily_spend: 150.0,
        cpm: 2.0,
        ctr: 0.025,
        cvr: 0.04,
        form_fill_rate: 0.50,
        order_value: 70.0,
    },
    ChannelProfile {
        name: "Video",
        daily_spend: 700.0,
        cpm: 14.0,
        ctr: 0.006,
        cvr: 0.015,
        form_fill_rate: 0.25,
        order_value: 110.0,
    },
];

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub seed: u64,
    pub days: usize,
    pub start: NaiveDate,
    /// Standard deviation of the multiplicative noise at each funnel stage.
    pub noise: f64,
    pub profiles: Vec<ChannelProfile>,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            days: 30,
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            noise: 0.15,
            profiles: DEFAULT_PROFILES.to_vec(),
        }
    }
}

/// Generate one record per channel per day.
pub fn generate_sample(config: &SampleConfig) -> Result<Dataset, AppError> {
    if config.days == 0 {
        return Err(AppError::new(2, "Sample days must be > 0."));
    }
    if config.profiles.is_empty() {
        return Err(AppError::new(2, "Sample needs at least one channel profile."));
    }
    if !(config.noise.is_finite() && config.noise >= 0.0) {
        return Err(AppError::new(2, "Sample noise must be finite and >= 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, config.noise)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let mut records = Vec::with_capacity(config.days * config.profiles.len());
    for day in 0..config.days {
        let date = config.start + Duration::days(day as i64);
        for p in &config.profiles {
            let mut jitter = || (1.0 + normal.sample(&mut rng)).max(0.1);

            let spend = (p.daily_spend * jitter()).round();
            let impressions = (spend / p.cpm * 1000.0 * jitter()).round();
            let clicks = (impressions * p.ctr * jitter()).round();
            let conversions = (clicks * p.cvr * jitter()).round();
            let form_fills = (conversions * p.form_fill_rate * jitter()).round();
            let sales = (conversions * p.order_value * jitter() * 100.0).round() / 100.0;
            let ctr = if impressions > 0.0 {
                clicks / impressions * 100.0
            } else {
                0.0
            };

            records.push(
                PerformanceRecord::new(p.name)
                    .with_date(date)
                    .with(Metric::Spend, spend)
                    .with(Metric::Impressions, impressions)
                    .with(Metric::Clicks, clicks)
                    .with(Metric::Conversions, conversions)
                    .with(Metric::FormFills, form_fills)
                    .with(Metric::Ctr, ctr)
                    .with(Metric::Sales, sales),
            );
        }
    }

    let mut columns = vec![Column::Channel, Column::Date];
    columns.extend(Metric::ALL.into_iter().map(Column::Metric));
    Ok(Dataset::new(columns, records))
}
