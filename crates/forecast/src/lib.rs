pub mod features;
pub mod forecaster;
pub mod regression;
pub mod size_share;

pub use features::{FeatureWindow, FEATURE_COUNT};
pub use forecaster::{DemandForecaster, ForecasterConfig};
pub use regression::{LinearRegressor, QuantileRegressor};
pub use size_share::{QuantileSeries, SizeForecast, SizeSalesRecord, SizeShareForecaster};
