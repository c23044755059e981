//! Grid-search reorder optimization for a single item.
//!
//! The objective is expected economic loss, not service level: every feasible
//! quantity is simulated, priced, and the cheapest wins. The risk ceiling is
//! soft: candidates above the maximum stockout probability stay in the grid
//! but carry a 10x loss penalty, so a high-risk quantity can still win when
//! every alternative is catastrophically worse.

use serde::{Deserialize, Serialize};

use stocksense_core::{
    CandidateEvaluation, DecisionError, Forecast, OptimizationResult, OrderConstraints,
};
use stocksense_economics::CostModel;
use stocksense_simulation::{DemandSimulator, RiskEstimator};

const RISK_PENALTY_FACTOR: f64 = 10.0;

/// Optimal-vs-naive decision comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaiveComparison {
    pub naive_quantity: f64,
    pub naive_loss: f64,
    pub optimal_quantity: f64,
    pub optimal_loss: f64,
    pub loss_reduction: f64,
    /// Percent of the naive loss avoided; 0 when the naive loss is 0.
    pub loss_reduction_pct: f64,
    /// Purchase cash difference; negative when the optimal order is larger.
    pub cash_saved: f64,
    pub naive_stockout_probability: f64,
    pub optimal_stockout_probability: f64,
}

#[derive(Debug, Clone)]
pub struct ReorderOptimizer {
    cost_model: CostModel,
    risk_estimator: RiskEstimator,
    max_stockout_probability: f64,
    step_size: f64,
}

impl ReorderOptimizer {
    #[must_use]
    pub fn new(cost_model: CostModel) -> Self {
        Self {
            cost_model,
            risk_estimator: RiskEstimator::new(),
            max_stockout_probability: 0.20,
            step_size: 10.0,
        }
    }

    #[must_use]
    pub fn with_max_stockout_probability(mut self, p: f64) -> Self {
        self.max_stockout_probability = p;
        self
    }

    #[must_use]
    pub fn with_step_size(mut self, step: f64) -> Self {
        self.step_size = step;
        self
    }

    #[must_use]
    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    /// Builds the candidate quantity grid: steps from the MOQ, each rounded
    /// to the nearest order multiple, deduplicated and sorted. A cash cap
    /// shrinks the effective maximum to what the cash can buy.
    #[must_use]
    pub fn find_feasible_order_quantities(&self, constraints: &OrderConstraints) -> Vec<f64> {
        let unit_cost = self.cost_model.economics().unit_cost;
        let mut max_quantity = constraints.max_order_quantity;
        if let Some(cash) = constraints.available_cash {
            if unit_cost > 0.0 {
                max_quantity = max_quantity.min(cash / unit_cost);
            }
        }

        let multiple = constraints.order_multiple.max(1.0);
        let mut quantities = Vec::new();
        let mut q = constraints.min_order_quantity;
        while q <= max_quantity {
            let rounded = (q / multiple).round() * multiple;
            if rounded >= constraints.min_order_quantity && rounded <= max_quantity {
                quantities.push(rounded);
            }
            q += self.step_size;
        }

        quantities.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        quantities.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
        quantities
    }

    /// Finds the loss-minimizing feasible reorder quantity.
    ///
    /// The scan uses strict `<` in ascending grid order, so ties go to the
    /// smallest quantity. An empty grid yields the infeasible sentinel
    /// (quantity 0, infinite loss) rather than an error.
    ///
    /// # Errors
    /// Propagates simulation errors (`DecisionError::LeadTimeExceedsHorizon`).
    pub fn optimize_reorder(
        &self,
        simulator: &mut DemandSimulator,
        forecast: &Forecast,
        current_inventory: f64,
        constraints: &OrderConstraints,
        holding_period_months: f64,
    ) -> Result<OptimizationResult, DecisionError> {
        let quantities = self.find_feasible_order_quantities(constraints);
        if quantities.is_empty() {
            return Ok(OptimizationResult::infeasible());
        }

        let lead_time_days = self.cost_model.economics().lead_time_days;
        let mut evaluations = Vec::with_capacity(quantities.len());
        let mut best: Option<(usize, f64)> = None;
        let mut best_risk = None;

        for (i, &quantity) in quantities.iter().enumerate() {
            let breakdown = self.cost_model.expected_economic_loss(
                simulator,
                forecast,
                current_inventory,
                quantity,
                holding_period_months,
            )?;
            let risk = self.risk_estimator.estimate_risk_after_reorder(
                simulator,
                forecast,
                current_inventory,
                lead_time_days,
                quantity,
            )?;

            let mut total_loss = breakdown.total_expected_loss;
            if risk.stockout_probability > self.max_stockout_probability {
                total_loss += breakdown.total_expected_loss * RISK_PENALTY_FACTOR;
            }

            evaluations.push(CandidateEvaluation {
                quantity,
                total_loss,
                overstock_cost: breakdown.expected_overstock_cost,
                understock_cost: breakdown.expected_understock_cost,
                stockout_probability: risk.stockout_probability,
                risk_category: risk.risk_category,
                expected_ending_inventory: breakdown.expected_ending_inventory,
                cash_locked: self.cost_model.cash_locked(quantity),
            });

            if best.map_or(true, |(_, loss)| total_loss < loss) {
                best = Some((i, total_loss));
                best_risk = Some(risk);
            }
        }

        let (best_index, optimal_loss) =
            best.unwrap_or((0, f64::INFINITY));
        let optimal_quantity = quantities[best_index];

        Ok(OptimizationResult {
            optimal_quantity,
            optimal_loss,
            risk_metrics: best_risk,
            cash_locked: self.cost_model.cash_locked(optimal_quantity),
            all_evaluations: evaluations,
        })
    }

    /// Quantifies what the optimizer saves over a gut-feel order quantity.
    ///
    /// # Errors
    /// Propagates simulation errors from evaluating the naive quantity.
    pub fn compare_with_naive(
        &self,
        simulator: &mut DemandSimulator,
        forecast: &Forecast,
        current_inventory: f64,
        naive_quantity: f64,
        optimal: &OptimizationResult,
        holding_period_months: f64,
    ) -> Result<NaiveComparison, DecisionError> {
        let lead_time_days = self.cost_model.economics().lead_time_days;
        let naive_breakdown = self.cost_model.expected_economic_loss(
            simulator,
            forecast,
            current_inventory,
            naive_quantity,
            holding_period_months,
        )?;
        let naive_risk = self.risk_estimator.estimate_risk_after_reorder(
            simulator,
            forecast,
            current_inventory,
            lead_time_days,
            naive_quantity,
        )?;

        let naive_loss = naive_breakdown.total_expected_loss;
        let loss_reduction = naive_loss - optimal.optimal_loss;
        let loss_reduction_pct = if naive_loss > 0.0 {
            loss_reduction / naive_loss * 100.0
        } else {
            0.0
        };

        Ok(NaiveComparison {
            naive_quantity,
            naive_loss,
            optimal_quantity: optimal.optimal_quantity,
            optimal_loss: optimal.optimal_loss,
            loss_reduction,
            loss_reduction_pct,
            cash_saved: self.cost_model.cash_locked(naive_quantity - optimal.optimal_quantity),
            naive_stockout_probability: naive_risk.stockout_probability,
            optimal_stockout_probability: optimal
                .risk_metrics
                .as_ref()
                .map_or(0.0, |m| m.stockout_probability),
        })
    }
}
