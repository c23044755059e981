pub mod error;
pub mod stats;
pub mod types;

pub use error::DecisionError;
pub use stats::{mean, percentile, std_dev};
pub use types::{
    AllocationPlan, CandidateEvaluation, CostBreakdown, DemandStatistics, Forecast, ForecastRow,
    ItemAllocation, ItemEconomics, OptimizationResult, OrderConstraints, ReorderRiskMetrics,
    RiskCategory, SalesRecord, SimulationBatch, SizeCurve, StockoutStatistics,
};
