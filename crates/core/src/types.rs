//! Shared data model for the reorder decision pipeline.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DecisionError;
use crate::stats;

/// One day of historical sales for an item, already deduplicated by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub demand: f64,
    pub revenue: Option<f64>,
}

impl SalesRecord {
    #[must_use]
    pub fn new(date: NaiveDate, demand: f64) -> Self {
        Self {
            date,
            demand,
            revenue: None,
        }
    }
}

/// Per-item economic configuration, owned by the catalog and read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemEconomics {
    /// Cost per unit purchased.
    pub unit_cost: f64,
    /// Selling price per unit. Expected (not enforced) to exceed `unit_cost`.
    pub selling_price: f64,
    /// Monthly holding cost as a fraction of cash locked.
    pub holding_cost_rate: f64,
    /// Fraction of excess inventory written off as obsolete.
    pub markdown_rate: f64,
    /// Fixed penalty per stockout event (customer churn impact).
    pub churn_penalty: f64,
    /// Days between placing and receiving a reorder.
    pub lead_time_days: usize,
    pub min_order_quantity: f64,
    pub order_multiple: f64,
    pub max_order_quantity: f64,
}

impl ItemEconomics {
    /// Margin per unit sold. Understock losses are priced at margin, not full
    /// revenue: the unit cost of an unsold unit was never actually spent.
    #[must_use]
    pub fn margin_per_unit(&self) -> f64 {
        self.selling_price - self.unit_cost
    }
}

/// Order-quantity constraints for the optimizer grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConstraints {
    pub min_order_quantity: f64,
    pub max_order_quantity: f64,
    pub order_multiple: f64,
    /// Cash cap: candidates whose cost exceeds this are discarded.
    pub available_cash: Option<f64>,
}

impl Default for OrderConstraints {
    fn default() -> Self {
        Self {
            min_order_quantity: 0.0,
            max_order_quantity: 10_000.0,
            order_multiple: 1.0,
            available_cash: None,
        }
    }
}

impl OrderConstraints {
    #[must_use]
    pub fn from_economics(economics: &ItemEconomics) -> Self {
        Self {
            min_order_quantity: economics.min_order_quantity,
            max_order_quantity: economics.max_order_quantity,
            order_multiple: economics.order_multiple,
            available_cash: None,
        }
    }

    #[must_use]
    pub fn with_available_cash(mut self, cash: f64) -> Self {
        self.available_cash = Some(cash);
        self
    }
}

/// Probabilistic demand forecast for one future day.
///
/// Invariant: `p10 <= p50 <= p90`, all non-negative. `mean` and `std` are
/// derived approximations from the quantile spread, not separately fitted
/// moments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
    pub mean: f64,
    pub std: f64,
}

/// An ordered sequence of forecast rows covering exactly one horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    rows: Vec<ForecastRow>,
}

impl Forecast {
    #[must_use]
    pub fn new(rows: Vec<ForecastRow>) -> Self {
        Self { rows }
    }

    #[must_use]
    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Average forecast daily demand over the first `lead_time_days` rows.
    #[must_use]
    pub fn mean_daily_demand(&self, lead_time_days: usize) -> f64 {
        let window: Vec<f64> = self
            .rows
            .iter()
            .take(lead_time_days)
            .map(|r| r.mean)
            .collect();
        stats::mean(&window)
    }

    /// Distribution parameters for one forecast day.
    ///
    /// # Errors
    /// `DecisionError::DayOutOfRange` when `index` is past the horizon.
    pub fn distribution_at(&self, index: usize) -> Result<&ForecastRow, DecisionError> {
        self.rows.get(index).ok_or(DecisionError::DayOutOfRange {
            index,
            len: self.rows.len(),
        })
    }
}

/// Discrete stockout-risk category with fixed probability thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    pub const LOW_THRESHOLD: f64 = 0.05;
    pub const MEDIUM_THRESHOLD: f64 = 0.20;

    /// LOW below 5%, MEDIUM below 20%, HIGH otherwise.
    #[must_use]
    pub fn from_probability(stockout_probability: f64) -> Self {
        if stockout_probability < Self::LOW_THRESHOLD {
            Self::Low
        } else if stockout_probability < Self::MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::High
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Output of one Monte Carlo depletion run: N independent trial outcomes.
///
/// `ending_inventory` is signed; negative values represent unmet demand.
/// `stockout_day` is the 1-indexed first day a trial's inventory went
/// negative, `None` when it never did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationBatch {
    pub ending_inventory: Vec<f64>,
    pub stockout_day: Vec<Option<u32>>,
    pub cumulative_demand: Vec<f64>,
    pub stockout_probability: f64,
}

/// Summary statistics of cumulative lead-time demand across trials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandStatistics {
    pub mean: f64,
    pub std: f64,
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Stockout timing statistics across trials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockoutStatistics {
    pub stockout_probability: f64,
    /// Mean stockout day over trials that stocked out; `None` when none did.
    pub expected_stockout_day: Option<f64>,
    pub median_stockout_day: Option<f64>,
}

impl SimulationBatch {
    #[must_use]
    pub fn n_trials(&self) -> usize {
        self.ending_inventory.len()
    }

    #[must_use]
    pub fn demand_statistics(&self) -> DemandStatistics {
        DemandStatistics {
            mean: stats::mean(&self.cumulative_demand),
            std: stats::std_dev(&self.cumulative_demand),
            p10: stats::percentile(&self.cumulative_demand, 0.10),
            p50: stats::percentile(&self.cumulative_demand, 0.50),
            p90: stats::percentile(&self.cumulative_demand, 0.90),
            p95: stats::percentile(&self.cumulative_demand, 0.95),
            p99: stats::percentile(&self.cumulative_demand, 0.99),
        }
    }

    #[must_use]
    pub fn stockout_statistics(&self) -> StockoutStatistics {
        let days: Vec<f64> = self
            .stockout_day
            .iter()
            .flatten()
            .map(|&d| f64::from(d))
            .collect();
        if days.is_empty() {
            StockoutStatistics {
                stockout_probability: self.stockout_probability,
                expected_stockout_day: None,
                median_stockout_day: None,
            }
        } else {
            StockoutStatistics {
                stockout_probability: self.stockout_probability,
                expected_stockout_day: Some(stats::mean(&days)),
                median_stockout_day: Some(stats::percentile(&days, 0.50)),
            }
        }
    }
}

/// Monetary breakdown of expected over/understock outcomes for one candidate
/// reorder quantity. Recomputed per candidate, never persisted on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub expected_overstock_cost: f64,
    pub expected_understock_cost: f64,
    pub total_expected_loss: f64,
    pub expected_ending_inventory: f64,
    pub expected_unmet_demand: f64,
    pub stockout_probability: f64,
}

/// Risk metrics recomputed after a candidate reorder is applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRiskMetrics {
    pub stockout_probability: f64,
    pub risk_category: RiskCategory,
    pub expected_ending_inventory: f64,
    pub expected_days_of_cover: f64,
    pub reorder_quantity: f64,
}

/// One evaluated grid candidate. Informational (audit/debug), not
/// authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateEvaluation {
    pub quantity: f64,
    /// Expected loss including any risk-ceiling penalty.
    pub total_loss: f64,
    pub overstock_cost: f64,
    pub understock_cost: f64,
    pub stockout_probability: f64,
    pub risk_category: RiskCategory,
    pub expected_ending_inventory: f64,
    pub cash_locked: f64,
}

/// Result of a reorder optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub optimal_quantity: f64,
    pub optimal_loss: f64,
    /// `None` only for the infeasible sentinel.
    pub risk_metrics: Option<ReorderRiskMetrics>,
    pub cash_locked: f64,
    pub all_evaluations: Vec<CandidateEvaluation>,
}

impl OptimizationResult {
    /// Sentinel for "no feasible order quantity exists". Callers must check
    /// `is_infeasible()` before acting on the quantity.
    #[must_use]
    pub fn infeasible() -> Self {
        Self {
            optimal_quantity: 0.0,
            optimal_loss: f64::INFINITY,
            risk_metrics: None,
            cash_locked: 0.0,
            all_evaluations: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_infeasible(&self) -> bool {
        self.risk_metrics.is_none() && self.optimal_loss.is_infinite()
    }
}

/// Funded quantity and cash for one item in an allocation plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemAllocation {
    pub item_id: String,
    pub quantity: f64,
    pub cash: f64,
    pub loss_avoided: f64,
}

/// Greedy capital allocation across items under a shared cash budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub allocations: Vec<ItemAllocation>,
    pub total_cash_used: f64,
    pub remaining_cash: f64,
    /// Item ids in funding order (descending efficiency, funded items only).
    pub ranking: Vec<String>,
}

/// A footwear style's per-size order-quantity vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeCurve {
    quantities: BTreeMap<String, u32>,
}

impl SizeCurve {
    #[must_use]
    pub fn new(quantities: BTreeMap<String, u32>) -> Self {
        Self { quantities }
    }

    #[must_use]
    pub fn quantity(&self, size: &str) -> u32 {
        self.quantities.get(size).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.quantities.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &u32)> {
        self.quantities.iter()
    }

    pub fn sizes(&self) -> impl Iterator<Item = &String> {
        self.quantities.keys()
    }

    #[must_use]
    pub fn quantities(&self) -> &BTreeMap<String, u32> {
        &self.quantities
    }
}
