//! Linear regressors trained by full-batch gradient descent.
//!
//! `QuantileRegressor` minimizes pinball (quantile) loss — the asymmetric
//! objective that lets the same feature set produce calibrated low/median/high
//! forecasts instead of a single point estimate:
//!
//! ```text
//! L_q(r) = q * r        if r >= 0     (under-prediction, r = y - y_hat)
//!        = (q - 1) * r  otherwise     (over-prediction)
//! ```
//!
//! `LinearRegressor` minimizes squared loss with the same descent loop and is
//! used for the footwear size-share models. Both z-score features and target
//! before fitting; training is fully deterministic (no sampling).

use serde::{Deserialize, Serialize};

use stocksense_core::stats;

const EPSILON: f64 = 1e-9;

/// Per-column z-scoring fitted on the training matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Standardizer {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl Standardizer {
    fn fit(rows: &[Vec<f64>]) -> Self {
        let n_features = rows.first().map_or(0, Vec::len);
        let mut means = vec![0.0; n_features];
        let mut stds = vec![0.0; n_features];
        for j in 0..n_features {
            let column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            means[j] = stats::mean(&column);
            stds[j] = stats::std_dev(&column);
        }
        Self { means, stds }
    }

    /// Constant columns map to 0 rather than dividing by a zero spread.
    fn transform(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(v, (m, s))| if *s > EPSILON { (v - m) / s } else { 0.0 })
            .collect()
    }
}

/// Gradient-descent hyperparameters shared by both regressors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainParams {
    pub epochs: usize,
    pub learning_rate: f64,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            epochs: 400,
            learning_rate: 0.05,
        }
    }
}

/// Linear model trained on pinball loss for one target quantile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantileRegressor {
    quantile: f64,
    weights: Vec<f64>,
    bias: f64,
    x_scale: Standardizer,
    y_mean: f64,
    y_std: f64,
}

impl QuantileRegressor {
    /// Fits one quantile model on a feature matrix and target vector.
    ///
    /// # Panics
    /// Panics if `rows` and `targets` have different lengths (programming
    /// error in the caller's matrix construction).
    #[must_use]
    pub fn fit(quantile: f64, rows: &[Vec<f64>], targets: &[f64], params: &TrainParams) -> Self {
        assert_eq!(rows.len(), targets.len(), "feature/target length mismatch");

        let x_scale = Standardizer::fit(rows);
        let y_mean = stats::mean(targets);
        let y_std = {
            let s = stats::std_dev(targets);
            if s > EPSILON {
                s
            } else {
                1.0
            }
        };

        let scaled: Vec<Vec<f64>> = rows.iter().map(|r| x_scale.transform(r)).collect();
        let y_scaled: Vec<f64> = targets.iter().map(|y| (y - y_mean) / y_std).collect();

        let n_features = scaled.first().map_or(0, Vec::len);
        let mut weights = vec![0.0; n_features];
        let mut bias = 0.0;

        let n = scaled.len().max(1) as f64;
        for epoch in 0..params.epochs {
            let lr = params.learning_rate / (1.0 + 0.01 * epoch as f64);
            let mut grad_w = vec![0.0; n_features];
            let mut grad_b = 0.0;
            for (x, y) in scaled.iter().zip(&y_scaled) {
                let pred = dot(&weights, x) + bias;
                let residual = y - pred;
                // Subgradient of pinball loss w.r.t. the prediction.
                let g = if residual > 0.0 {
                    -quantile
                } else if residual < 0.0 {
                    1.0 - quantile
                } else {
                    0.0
                };
                for (gw, xj) in grad_w.iter_mut().zip(x) {
                    *gw += g * xj;
                }
                grad_b += g;
            }
            for (w, gw) in weights.iter_mut().zip(&grad_w) {
                *w -= lr * gw / n;
            }
            bias -= lr * grad_b / n;
        }

        Self {
            quantile,
            weights,
            bias,
            x_scale,
            y_mean,
            y_std,
        }
    }

    #[must_use]
    pub fn quantile(&self) -> f64 {
        self.quantile
    }

    #[must_use]
    pub fn predict(&self, x: &[f64]) -> f64 {
        let z = self.x_scale.transform(x);
        (dot(&self.weights, &z) + self.bias) * self.y_std + self.y_mean
    }
}

/// Linear model trained on squared loss; used for size-share regression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    weights: Vec<f64>,
    bias: f64,
    x_scale: Standardizer,
    y_mean: f64,
    y_std: f64,
}

impl LinearRegressor {
    /// Fits by full-batch gradient descent on squared loss.
    ///
    /// # Panics
    /// Panics if `rows` and `targets` have different lengths.
    #[must_use]
    pub fn fit(rows: &[Vec<f64>], targets: &[f64], params: &TrainParams) -> Self {
        assert_eq!(rows.len(), targets.len(), "feature/target length mismatch");

        let x_scale = Standardizer::fit(rows);
        let y_mean = stats::mean(targets);
        let y_std = {
            let s = stats::std_dev(targets);
            if s > EPSILON {
                s
            } else {
                1.0
            }
        };

        let scaled: Vec<Vec<f64>> = rows.iter().map(|r| x_scale.transform(r)).collect();
        let y_scaled: Vec<f64> = targets.iter().map(|y| (y - y_mean) / y_std).collect();

        let n_features = scaled.first().map_or(0, Vec::len);
        let mut weights = vec![0.0; n_features];
        let mut bias = 0.0;

        let n = scaled.len().max(1) as f64;
        for epoch in 0..params.epochs {
            let lr = params.learning_rate / (1.0 + 0.01 * epoch as f64);
            let mut grad_w = vec![0.0; n_features];
            let mut grad_b = 0.0;
            for (x, y) in scaled.iter().zip(&y_scaled) {
                let pred = dot(&weights, x) + bias;
                let g = 2.0 * (pred - y);
                for (gw, xj) in grad_w.iter_mut().zip(x) {
                    *gw += g * xj;
                }
                grad_b += g;
            }
            for (w, gw) in weights.iter_mut().zip(&grad_w) {
                *w -= lr * gw / n;
            }
            bias -= lr * grad_b / n;
        }

        Self {
            weights,
            bias,
            x_scale,
            y_mean,
            y_std,
        }
    }

    #[must_use]
    pub fn predict(&self, x: &[f64]) -> f64 {
        let z = self.x_scale.transform(x);
        (dot(&self.weights, &z) + self.bias) * self.y_std + self.y_mean
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
