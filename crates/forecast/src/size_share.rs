//! Style-level forecasting decomposed into per-size demand shares.
//!
//! Footwear sells as one style spread over a size run. Forecasting each size
//! independently wastes the pooled signal, so the model works top-down: the
//! style total gets the full quantile forecaster, and each size gets a small
//! share regressor predicting its fraction of the total. Shares are clipped,
//! defaulted, and renormalized to sum to 1 per day before being multiplied
//! back into the style quantiles.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use stocksense_core::{DecisionError, SalesRecord};

use crate::features::FeatureWindow;
use crate::forecaster::{DemandForecaster, ForecasterConfig};
use crate::regression::{LinearRegressor, TrainParams};

/// A size needs at least this many observations to get its own share model.
const MIN_SHARE_ROWS: usize = 10;

/// One day of sales for one size of a style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeSalesRecord {
    pub date: NaiveDate,
    pub size: String,
    pub demand: f64,
}

impl SizeSalesRecord {
    #[must_use]
    pub fn new(date: NaiveDate, size: impl Into<String>, demand: f64) -> Self {
        Self {
            date,
            size: size.into(),
            demand,
        }
    }
}

/// Parallel p10/p50/p90 series, one value per forecast day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantileSeries {
    pub p10: Vec<f64>,
    pub p50: Vec<f64>,
    pub p90: Vec<f64>,
}

impl QuantileSeries {
    #[must_use]
    pub fn len(&self) -> usize {
        self.p50.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.p50.is_empty()
    }
}

/// Style forecast broken down by size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeForecast {
    pub dates: Vec<NaiveDate>,
    /// Style-level totals straight from the quantile forecaster.
    pub total: QuantileSeries,
    /// Per-size daily share of the style total; each day's shares sum to 1.
    pub shares: BTreeMap<String, Vec<f64>>,
    /// Per-size quantile demand (share * style total).
    pub size_demand: BTreeMap<String, QuantileSeries>,
}

impl SizeForecast {
    #[must_use]
    pub fn sizes(&self) -> Vec<&str> {
        self.shares.keys().map(String::as_str).collect()
    }

    /// Mean share of the style total attributed to each size over the
    /// horizon. Used downstream to decide where a size-curve remainder goes.
    #[must_use]
    pub fn mean_shares(&self) -> BTreeMap<String, f64> {
        self.shares
            .iter()
            .map(|(size, series)| {
                let mean = if series.is_empty() {
                    0.0
                } else {
                    series.iter().sum::<f64>() / series.len() as f64
                };
                (size.clone(), mean)
            })
            .collect()
    }
}

/// Top-down size-level forecaster: style quantiles times learned shares.
#[derive(Debug, Clone)]
pub struct SizeShareForecaster {
    style_forecaster: DemandForecaster,
    share_models: BTreeMap<String, Option<LinearRegressor>>,
    share_params: TrainParams,
    totals: Vec<f64>,
    last_date: Option<NaiveDate>,
}

impl SizeShareForecaster {
    #[must_use]
    pub fn new(config: ForecasterConfig) -> Self {
        let share_params = config.train.clone();
        Self {
            style_forecaster: DemandForecaster::new(config),
            share_models: BTreeMap::new(),
            share_params,
            totals: Vec::new(),
            last_date: None,
        }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ForecasterConfig::default())
    }

    /// Trains the style forecaster on aggregated totals and one share model
    /// per size with enough observations. Sparse sizes stay in the size set
    /// but fall back to an equal-share default at forecast time.
    ///
    /// # Errors
    /// `DecisionError::EmptyHistory` on an empty slice, or
    /// `DecisionError::InsufficientData` when the aggregated style series is
    /// too short for the quantile forecaster.
    pub fn train(&mut self, records: &[SizeSalesRecord]) -> Result<(), DecisionError> {
        if records.is_empty() {
            return Err(DecisionError::EmptyHistory);
        }

        // Aggregate to one style total per date; BTreeMap gives date order.
        let mut totals_by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        let mut by_size: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        for record in records {
            *totals_by_date.entry(record.date).or_insert(0.0) += record.demand;
            *by_size
                .entry(record.size.clone())
                .or_default()
                .entry(record.date)
                .or_insert(0.0) += record.demand;
        }

        let style_series: Vec<SalesRecord> = totals_by_date
            .iter()
            .map(|(&date, &total)| SalesRecord::new(date, total))
            .collect();
        self.style_forecaster.train(&style_series)?;

        let dates: Vec<NaiveDate> = totals_by_date.keys().copied().collect();
        let totals: Vec<f64> = totals_by_date.values().copied().collect();

        // Feature fold mirrors the style forecaster's training pass: the
        // share on day i is predicted from totals observed before day i.
        let mut window = FeatureWindow::new(vec![totals[0]]);
        let mut feature_rows = Vec::with_capacity(dates.len() - 1);
        for i in 1..dates.len() {
            feature_rows.push(window.features_for(dates[i]));
            window.push(totals[i]);
        }

        self.share_models.clear();
        for (size, daily) in &by_size {
            let mut rows = Vec::new();
            let mut shares = Vec::new();
            for (i, date) in dates.iter().enumerate().skip(1) {
                let Some(&demand) = daily.get(date) else {
                    continue;
                };
                let share = (demand / totals[i].max(0.01)).clamp(0.0, 1.0);
                rows.push(feature_rows[i - 1].clone());
                shares.push(share);
            }
            let model = if rows.len() >= MIN_SHARE_ROWS {
                Some(LinearRegressor::fit(&rows, &shares, &self.share_params))
            } else {
                None
            };
            self.share_models.insert(size.clone(), model);
        }

        self.totals = totals;
        self.last_date = dates.last().copied();
        Ok(())
    }

    /// Forecasts the style total and splits each day across sizes.
    ///
    /// Modeled sizes get their regressor's clipped share; unmodeled sizes get
    /// an equal 1/n default. Each day's shares are renormalized to sum to 1,
    /// so the size quantiles always reconstruct the style quantiles exactly.
    ///
    /// # Errors
    /// `DecisionError::NotTrained` when called before `train()`.
    pub fn forecast(&self, horizon_days: usize) -> Result<SizeForecast, DecisionError> {
        let last_date = self.last_date.ok_or(DecisionError::NotTrained)?;
        let style = self.style_forecaster.forecast(horizon_days)?;

        let n_sizes = self.share_models.len();
        let default_share = if n_sizes > 0 { 1.0 / n_sizes as f64 } else { 0.0 };

        // Share features come from the observed totals only; the share model
        // never consumes its own predictions.
        let window = FeatureWindow::new(self.totals.clone());

        let mut dates = Vec::with_capacity(horizon_days);
        let mut total = QuantileSeries::default();
        let mut shares: BTreeMap<String, Vec<f64>> = self
            .share_models
            .keys()
            .map(|size| (size.clone(), Vec::with_capacity(horizon_days)))
            .collect();

        for (day, row) in style.rows().iter().enumerate() {
            let date = last_date + Duration::days(day as i64 + 1);
            let features = window.features_for(date);

            let mut raw: Vec<(String, f64)> = self
                .share_models
                .iter()
                .map(|(size, model)| {
                    let share = match model {
                        Some(m) => m.predict(&features).clamp(0.0, 1.0),
                        None => default_share,
                    };
                    (size.clone(), share)
                })
                .collect();

            let sum: f64 = raw.iter().map(|(_, s)| s).sum();
            if sum > 0.0 {
                for (_, share) in &mut raw {
                    *share /= sum;
                }
            } else {
                for (_, share) in &mut raw {
                    *share = default_share;
                }
            }

            dates.push(date);
            total.p10.push(row.p10);
            total.p50.push(row.p50);
            total.p90.push(row.p90);
            for (size, share) in raw {
                if let Some(series) = shares.get_mut(&size) {
                    series.push(share);
                }
            }
        }

        let size_demand = shares
            .iter()
            .map(|(size, series)| {
                let mut q = QuantileSeries::default();
                for (i, &share) in series.iter().enumerate() {
                    q.p10.push(total.p10[i] * share);
                    q.p50.push(total.p50[i] * share);
                    q.p90.push(total.p90[i] * share);
                }
                (size.clone(), q)
            })
            .collect();

        Ok(SizeForecast {
            dates,
            total,
            shares,
            size_demand,
        })
    }
}
