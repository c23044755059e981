//! Calendar and autoregressive feature engineering for demand series.
//!
//! The forecaster predicts one day at a time: to predict day t+1, lag and
//! rolling features must reflect days up to t. `FeatureWindow` owns the
//! trailing demand buffer and produces the fixed-order feature vector for a
//! date, so the iterative forecast loop is an explicit fold (push a proxy
//! observation, recompute) rather than incidental mutation of a shared table.

use chrono::{Datelike, NaiveDate};

use stocksense_core::stats;

/// Feature vector layout (fixed order, shared by training and prediction):
/// day-of-week, week-of-year, month, day-of-month, weekend flag,
/// lags 1/7/14/30, rolling mean/std over 7/14/30, and a short-vs-long trend
/// signal (rolling_mean_7 - rolling_mean_14).
pub const FEATURE_COUNT: usize = 16;

/// Trailing demand buffer plus the feature computation over it.
#[derive(Debug, Clone)]
pub struct FeatureWindow {
    history: Vec<f64>,
}

impl FeatureWindow {
    #[must_use]
    pub fn new(history: Vec<f64>) -> Self {
        Self { history }
    }

    /// Appends one observation (real or proxy) to the buffer.
    pub fn push(&mut self, demand: f64) {
        self.history.push(demand);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Value `lag` observations back. Short histories fall back to the most
    /// recent observation, and an empty buffer yields 0.
    fn lag(&self, lag: usize) -> f64 {
        let n = self.history.len();
        if n >= lag && lag >= 1 {
            self.history[n - lag]
        } else {
            self.history.last().copied().unwrap_or(0.0)
        }
    }

    fn tail(&self, window: usize) -> &[f64] {
        let n = self.history.len();
        &self.history[n.saturating_sub(window)..]
    }

    fn rolling_mean(&self, window: usize) -> f64 {
        stats::mean(self.tail(window))
    }

    fn rolling_std(&self, window: usize) -> f64 {
        stats::std_dev(self.tail(window))
    }

    /// Feature vector for predicting demand on `date` given the buffer state.
    #[must_use]
    pub fn features_for(&self, date: NaiveDate) -> Vec<f64> {
        let day_of_week = f64::from(date.weekday().num_days_from_monday());
        let is_weekend = if date.weekday().num_days_from_monday() >= 5 {
            1.0
        } else {
            0.0
        };

        vec![
            day_of_week,
            f64::from(date.iso_week().week()),
            f64::from(date.month()),
            f64::from(date.day()),
            is_weekend,
            self.lag(1),
            self.lag(7),
            self.lag(14),
            self.lag(30),
            self.rolling_mean(7),
            self.rolling_std(7),
            self.rolling_mean(14),
            self.rolling_std(14),
            self.rolling_mean(30),
            self.rolling_std(30),
            self.rolling_mean(7) - self.rolling_mean(14),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn feature_vector_has_declared_length() {
        let window = FeatureWindow::new(vec![10.0; 40]);
        let features = window.features_for(date(2025, 3, 15));
        assert_eq!(features.len(), FEATURE_COUNT);
    }

    #[test]
    fn calendar_features_for_a_saturday() {
        let window = FeatureWindow::new(vec![5.0; 10]);
        // 2025-03-15 is a Saturday.
        let features = window.features_for(date(2025, 3, 15));
        assert_eq!(features[0], 5.0); // day of week, Monday = 0
        assert_eq!(features[2], 3.0); // month
        assert_eq!(features[3], 15.0); // day of month
        assert_eq!(features[4], 1.0); // weekend flag
    }

    #[test]
    fn weekday_is_not_flagged_as_weekend() {
        let window = FeatureWindow::new(vec![5.0; 10]);
        // 2025-03-12 is a Wednesday.
        let features = window.features_for(date(2025, 3, 12));
        assert_eq!(features[4], 0.0);
    }

    #[test]
    fn lags_read_backwards_from_the_end() {
        let history: Vec<f64> = (1..=40).map(f64::from).collect();
        let window = FeatureWindow::new(history);
        let features = window.features_for(date(2025, 1, 1));
        assert_eq!(features[5], 40.0); // lag 1
        assert_eq!(features[6], 34.0); // lag 7
        assert_eq!(features[8], 11.0); // lag 30
    }

    #[test]
    fn short_history_falls_back_to_last_value() {
        let window = FeatureWindow::new(vec![3.0, 8.0]);
        let features = window.features_for(date(2025, 1, 1));
        assert_eq!(features[6], 8.0); // lag 7 unavailable
        assert_eq!(features[8], 8.0); // lag 30 unavailable
    }

    #[test]
    fn push_shifts_the_lag_structure() {
        let mut window = FeatureWindow::new(vec![1.0, 2.0, 3.0]);
        window.push(99.0);
        let features = window.features_for(date(2025, 1, 1));
        assert_eq!(features[5], 99.0);
    }

    #[test]
    fn trend_signal_is_short_minus_long_mean() {
        // Recent surge: last 7 values are 20, the 7 before are 10.
        let mut history = vec![10.0; 7];
        history.extend(vec![20.0; 7]);
        let window = FeatureWindow::new(history);
        let features = window.features_for(date(2025, 1, 1));
        assert!((features[15] - (20.0 - 15.0)).abs() < 1e-12);
    }
}
