//! Probabilistic daily demand forecaster.
//!
//! Trains one independent pinball-loss regressor per target quantile on
//! calendar + autoregressive features, then forecasts iteratively: after
//! predicting day t the median (p50) prediction is appended to the feature
//! buffer as a proxy observation before predicting day t+1. The compounding
//! dependence this creates (a low early forecast biases later steps) is
//! required behavior, exercised by the multi-day-horizon tests.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use stocksense_core::{DecisionError, Forecast, ForecastRow, SalesRecord};

use crate::features::FeatureWindow;
use crate::regression::{QuantileRegressor, TrainParams};

/// Normal-distribution interquantile span between p10 and p90 (2 * 1.28).
const INTERQUANTILE_SPAN: f64 = 2.56;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecasterConfig {
    /// Target quantiles; each gets its own independently trained model.
    /// The forecast row shape (p10/p50/p90) and the spread-to-std conversion
    /// are fixed to `[0.1, 0.5, 0.9]`; `train` rejects any other set.
    pub quantiles: Vec<f64>,
    pub train: TrainParams,
    /// Minimum historical observations required to train.
    pub min_observations: usize,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            quantiles: vec![0.1, 0.5, 0.9],
            train: TrainParams::default(),
            min_observations: 30,
        }
    }
}

/// Quantile-regression demand forecaster for a single item.
#[derive(Debug, Clone)]
pub struct DemandForecaster {
    config: ForecasterConfig,
    /// Trained models keyed by quantile percent (10, 50, 90).
    models: BTreeMap<u32, QuantileRegressor>,
    history: Vec<f64>,
    last_date: Option<NaiveDate>,
}

impl DemandForecaster {
    #[must_use]
    pub fn new(config: ForecasterConfig) -> Self {
        Self {
            config,
            models: BTreeMap::new(),
            history: Vec::new(),
            last_date: None,
        }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ForecasterConfig::default())
    }

    #[must_use]
    pub fn is_trained(&self) -> bool {
        !self.models.is_empty() && self.models.len() == self.config.quantiles.len()
    }

    /// Trains one model per configured quantile on the historical series.
    ///
    /// The series must be ordered by date and deduplicated (owned by the
    /// ingestion boundary).
    ///
    /// # Errors
    /// `DecisionError::InsufficientData` below the configured minimum;
    /// `DecisionError::UnsupportedQuantiles` when the configured set is not
    /// exactly {0.1, 0.5, 0.9}.
    pub fn train(&mut self, records: &[SalesRecord]) -> Result<(), DecisionError> {
        if records.len() < self.config.min_observations {
            return Err(DecisionError::InsufficientData {
                required: self.config.min_observations,
                actual: records.len(),
            });
        }

        // The row shape and the std derivation assume these three quantiles,
        // so any other set must fail here rather than forecast garbage.
        let mut keys: Vec<u32> = self.config.quantiles.iter().map(|&q| quantile_key(q)).collect();
        keys.sort_unstable();
        if keys != [10, 50, 90] {
            return Err(DecisionError::UnsupportedQuantiles(
                self.config.quantiles.clone(),
            ));
        }

        // Fold over the series: features for day i are computed from days
        // 0..i, then day i's demand is pushed into the buffer.
        let mut window = FeatureWindow::new(vec![records[0].demand]);
        let mut rows = Vec::with_capacity(records.len() - 1);
        let mut targets = Vec::with_capacity(records.len() - 1);
        for record in &records[1..] {
            rows.push(window.features_for(record.date));
            targets.push(record.demand);
            window.push(record.demand);
        }

        self.models.clear();
        for &quantile in &self.config.quantiles {
            let model = QuantileRegressor::fit(quantile, &rows, &targets, &self.config.train);
            self.models.insert(quantile_key(quantile), model);
        }

        self.history = records.iter().map(|r| r.demand).collect();
        self.last_date = Some(records[records.len() - 1].date);
        Ok(())
    }

    /// Produces one `ForecastRow` per day for the requested horizon.
    ///
    /// Quantile predictions are floored at 0 and sorted so p10 <= p50 <= p90
    /// holds even when the independently trained models cross. `mean` and
    /// `std` are derived from the quantile spread, not separately fitted.
    ///
    /// # Errors
    /// `DecisionError::NotTrained` when called before `train()`.
    pub fn forecast(&self, horizon_days: usize) -> Result<Forecast, DecisionError> {
        let last_date = self.last_date.ok_or(DecisionError::NotTrained)?;
        if !self.is_trained() {
            return Err(DecisionError::NotTrained);
        }

        let mut window = FeatureWindow::new(self.history.clone());
        let mut rows = Vec::with_capacity(horizon_days);

        for day in 1..=horizon_days {
            let date = last_date + Duration::days(day as i64);
            let features = window.features_for(date);

            let mut quantile_preds = [0.0_f64; 3];
            for (slot, key) in quantile_preds.iter_mut().zip([10_u32, 50, 90]) {
                if let Some(model) = self.models.get(&key) {
                    *slot = model.predict(&features).max(0.0);
                }
            }
            quantile_preds.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let [p10, p50, p90] = quantile_preds;

            let spread = p90 - p10;
            let std = if spread > 0.0 {
                spread / INTERQUANTILE_SPAN
            } else {
                p50 * 0.2
            };

            rows.push(ForecastRow {
                date,
                p10,
                p50,
                p90,
                mean: p50,
                std,
            });

            // The median becomes a proxy observation for the next step.
            window.push(p50);
        }

        Ok(Forecast::new(rows))
    }
}

fn quantile_key(quantile: f64) -> u32 {
    (quantile * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + Duration::days(n)
    }

    /// ~100 units/day with a weekly rhythm and deterministic jitter.
    fn synthetic_history(days: usize) -> Vec<SalesRecord> {
        (0..days)
            .map(|i| {
                let weekly = f64::from((i % 7) as u32) * 3.0;
                let jitter = ((i * 37 + 13) % 20) as f64 - 10.0;
                SalesRecord::new(date(i as i64), 100.0 + weekly + jitter)
            })
            .collect()
    }

    // ============================================================
    // Training Errors
    // ============================================================

    #[test]
    fn train_rejects_short_history() {
        let mut forecaster = DemandForecaster::with_defaults();
        let err = forecaster.train(&synthetic_history(10)).unwrap_err();
        assert!(matches!(
            err,
            DecisionError::InsufficientData {
                required: 30,
                actual: 10
            }
        ));
    }

    #[test]
    fn train_rejects_a_non_default_quantile_set() {
        // The row shape only has slots for p10/p50/p90; any other set must
        // fail at train time instead of leaving slots zeroed in the output.
        let mut forecaster = DemandForecaster::new(ForecasterConfig {
            quantiles: vec![0.05, 0.5, 0.95],
            ..ForecasterConfig::default()
        });
        let err = forecaster.train(&synthetic_history(90)).unwrap_err();
        assert!(matches!(err, DecisionError::UnsupportedQuantiles(_)));
        assert!(!forecaster.is_trained());
    }

    #[test]
    fn forecast_before_training_fails() {
        let forecaster = DemandForecaster::with_defaults();
        assert!(matches!(
            forecaster.forecast(7).unwrap_err(),
            DecisionError::NotTrained
        ));
    }

    // ============================================================
    // Forecast Shape and Invariants
    // ============================================================

    #[test]
    fn forecast_covers_exactly_the_horizon_with_consecutive_dates() {
        let mut forecaster = DemandForecaster::with_defaults();
        forecaster.train(&synthetic_history(90)).unwrap();

        let forecast = forecaster.forecast(14).unwrap();
        assert_eq!(forecast.len(), 14);
        assert_eq!(forecast.rows()[0].date, date(90));
        for pair in forecast.rows().windows(2) {
            assert_eq!(pair[1].date - pair[0].date, Duration::days(1));
        }
    }

    #[test]
    fn forecast_rows_are_monotone_and_non_negative() {
        let mut forecaster = DemandForecaster::with_defaults();
        forecaster.train(&synthetic_history(120)).unwrap();

        let forecast = forecaster.forecast(30).unwrap();
        for row in forecast.rows() {
            assert!(row.p10 >= 0.0);
            assert!(row.p10 <= row.p50, "p10 {} > p50 {}", row.p10, row.p50);
            assert!(row.p50 <= row.p90, "p50 {} > p90 {}", row.p50, row.p90);
            assert!(row.std >= 0.0);
        }
    }

    #[test]
    fn mean_is_the_median_approximation() {
        let mut forecaster = DemandForecaster::with_defaults();
        forecaster.train(&synthetic_history(90)).unwrap();

        let forecast = forecaster.forecast(5).unwrap();
        for row in forecast.rows() {
            assert!((row.mean - row.p50).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn forecast_lands_near_the_historical_level() {
        let mut forecaster = DemandForecaster::with_defaults();
        forecaster.train(&synthetic_history(180)).unwrap();

        let forecast = forecaster.forecast(7).unwrap();
        for row in forecast.rows() {
            assert!(
                row.p50 > 50.0 && row.p50 < 200.0,
                "p50 {} implausible for a ~100/day series",
                row.p50
            );
        }
    }

    // ============================================================
    // Iterative Self-Referential Loop
    // ============================================================

    #[test]
    fn longer_horizon_extends_the_shorter_one() {
        // The fold is deterministic: day k of a 14-day forecast must equal
        // day k of a 7-day forecast, because both were produced by the same
        // proxy-observation sequence.
        let mut forecaster = DemandForecaster::with_defaults();
        forecaster.train(&synthetic_history(90)).unwrap();

        let short = forecaster.forecast(7).unwrap();
        let long = forecaster.forecast(14).unwrap();
        for (a, b) in short.rows().iter().zip(long.rows()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn proxy_observations_feed_later_steps() {
        // Over a long horizon the forecast must keep producing finite,
        // non-degenerate rows even though every lag past the history edge is
        // one of its own predictions.
        let mut forecaster = DemandForecaster::with_defaults();
        forecaster.train(&synthetic_history(120)).unwrap();

        let forecast = forecaster.forecast(45).unwrap();
        let last = &forecast.rows()[44];
        assert!(last.p50.is_finite());
        assert!(last.p50 >= 0.0);
    }
}
