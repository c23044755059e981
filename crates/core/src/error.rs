//! Error taxonomy for the decision pipeline.
//!
//! Infeasible optimization is deliberately *not* an error: the optimizer
//! returns a zero-quantity sentinel (`OptimizationResult::infeasible`) because
//! "no good answer" is a valid business outcome callers must display.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecisionError {
    /// Too few historical observations to train a forecaster.
    #[error("insufficient history: need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Forecast requested before `train()` completed.
    #[error("forecaster has not been trained; call train() first")]
    NotTrained,

    /// Lead time reaches past the end of the available forecast.
    #[error("lead time of {lead_time_days} days exceeds forecast horizon of {horizon_days} days")]
    LeadTimeExceedsHorizon {
        lead_time_days: usize,
        horizon_days: usize,
    },

    /// Day index past the end of a forecast.
    #[error("day index {index} out of range for forecast of length {len}")]
    DayOutOfRange { index: usize, len: usize },

    /// A quantile configuration the forecaster cannot serve.
    #[error("unsupported quantile set {0:?}; the forecaster serves exactly 0.1, 0.5, 0.9")]
    UnsupportedQuantiles(Vec<f64>),

    /// An empty demand series where at least one observation is required.
    #[error("historical demand series is empty")]
    EmptyHistory,

    /// A size curve references a size the forecast knows nothing about.
    #[error("size {0:?} not present in the size forecast")]
    UnknownSize(String),
}
