//! Style-level reorder optimization over factory-valid size curves.
//!
//! Footwear factories take orders as size curves: a total quantity split over
//! the size run, with every size a multiple of the pack size. The optimizer
//! generates candidate curves from the forecast's size shares, simulates each
//! at size level, prices outcomes through the footwear cost model, and ranks
//! by expected value protected per unit of cash committed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stocksense_core::{DecisionError, RiskCategory, SizeCurve};
use stocksense_economics::{FootwearCostModel, SizeCostSummary, StyleCosts};
use stocksense_forecast::SizeForecast;
use stocksense_simulation::{SizeDemandSimulator, StyleSimulation};

/// Fully priced evaluation of one candidate curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveEvaluation {
    pub curve: SizeCurve,
    pub simulation: StyleSimulation,
    pub costs: StyleCosts,
    pub total_cash: f64,
    /// Revenue the curve protects: (expected demand - expected unmet) * price.
    pub protected_revenue: f64,
    /// (protected revenue - expected loss) per unit of cash committed.
    pub return_per_cash: f64,
}

#[derive(Debug, Clone)]
pub struct SizeCurveOptimizer {
    cost_model: FootwearCostModel,
    selling_price: f64,
}

impl SizeCurveOptimizer {
    #[must_use]
    pub fn new(cost_model: FootwearCostModel, selling_price: f64) -> Self {
        Self {
            cost_model,
            selling_price,
        }
    }

    /// Generates factory-valid curves for totals stepped in order-multiple
    /// increments from the (aligned) minimum.
    ///
    /// Shares are renormalized over their positive part, so a distribution
    /// whose shares do not sum to 1 still allocates exactly the declared
    /// total; a distribution with no positive share yields no curves.
    /// Per-size quantities are `floor(total * share / multiple) * multiple`,
    /// which leaves a remainder that is itself a non-negative multiple of the
    /// pack size; it lands on the largest-share size, so every curve's
    /// quantities are multiple-aligned and sum exactly to its total.
    #[must_use]
    pub fn generate_valid_size_curves(
        &self,
        size_distribution: &BTreeMap<String, f64>,
        min_order_total: u32,
        order_multiple: u32,
        max_order_total: Option<u32>,
    ) -> Vec<SizeCurve> {
        let share_sum: f64 = size_distribution.values().map(|s| s.max(0.0)).sum();
        if size_distribution.is_empty() || share_sum <= 0.0 {
            return Vec::new();
        }
        let multiple = order_multiple.max(1);
        let min_aligned = min_order_total.div_ceil(multiple) * multiple;
        let max_total = max_order_total.unwrap_or(min_order_total.saturating_mul(10));

        let largest_share_size = size_distribution
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(size, _)| size.clone());

        let mut curves = Vec::new();
        let mut total = min_aligned;
        while total <= max_total {
            let mut quantities = BTreeMap::new();
            let mut allocated = 0_u32;
            for (size, &share) in size_distribution {
                let raw = (f64::from(total) * share.max(0.0) / share_sum) as u32;
                let qty = raw / multiple * multiple;
                allocated += qty;
                quantities.insert(size.clone(), qty);
            }

            let remainder = total.saturating_sub(allocated);
            if remainder > 0 {
                if let Some(size) = &largest_share_size {
                    if let Some(qty) = quantities.get_mut(size) {
                        *qty += remainder;
                    }
                }
            }

            curves.push(SizeCurve::new(quantities));
            total += multiple;
        }
        curves
    }

    /// Simulates and prices one candidate curve.
    ///
    /// # Errors
    /// Propagates `DecisionError::LeadTimeExceedsHorizon` and
    /// `DecisionError::UnknownSize` from the size simulator.
    pub fn evaluate_size_curve(
        &self,
        simulator: &mut SizeDemandSimulator,
        curve: &SizeCurve,
        forecast: &SizeForecast,
        current_inventory: &BTreeMap<String, f64>,
        lead_time_days: usize,
    ) -> Result<CurveEvaluation, DecisionError> {
        let simulation = simulator.simulate_curve(forecast, current_inventory, curve, lead_time_days)?;

        let unit_cost = self.cost_model.unit_cost();
        let mut size_costs = BTreeMap::new();
        let mut protected_revenue = 0.0;

        for (size, outcome) in &simulation.sizes {
            let quantity = f64::from(curve.quantity(size));
            let cash_locked = quantity * unit_cost;

            let expected_overstock_cost = self.cost_model.size_overstock_cost(
                size,
                outcome.expected_ending_inventory,
                1.0,
            );
            let expected_understock_cost = self.cost_model.size_understock_cost(
                size,
                outcome.expected_unmet_demand,
                outcome.stockout_probability > 0.0,
            );

            let expected_demand: f64 = forecast
                .size_demand
                .get(size)
                .map_or(0.0, |q| q.p50.iter().sum());
            protected_revenue +=
                (expected_demand - outcome.expected_unmet_demand).max(0.0) * self.selling_price;

            size_costs.insert(
                size.clone(),
                SizeCostSummary {
                    expected_overstock_cost,
                    expected_understock_cost,
                    cash_locked,
                    risk_category: RiskCategory::from_probability(outcome.stockout_probability),
                },
            );
        }

        let costs = self.cost_model.style_costs(&size_costs);
        let total_cash = costs.total_cash_locked;
        let return_per_cash =
            (protected_revenue - costs.total_expected_loss) / total_cash.max(1.0);

        Ok(CurveEvaluation {
            curve: curve.clone(),
            simulation,
            costs,
            total_cash,
            protected_revenue,
            return_per_cash,
        })
    }

    /// Finds the best affordable curve for a style, or `None` when no
    /// candidate fits the cash cap.
    ///
    /// # Errors
    /// Propagates simulation errors from candidate evaluation.
    pub fn optimize_style_reorder(
        &self,
        simulator: &mut SizeDemandSimulator,
        forecast: &SizeForecast,
        current_inventory: &BTreeMap<String, f64>,
        candidate_curves: &[SizeCurve],
        lead_time_days: usize,
        available_cash: Option<f64>,
    ) -> Result<Option<CurveEvaluation>, DecisionError> {
        let mut best: Option<CurveEvaluation> = None;
        for curve in candidate_curves {
            let evaluation = self.evaluate_size_curve(
                simulator,
                curve,
                forecast,
                current_inventory,
                lead_time_days,
            )?;
            if let Some(cash) = available_cash {
                if evaluation.total_cash > cash {
                    continue;
                }
            }
            let better = best
                .as_ref()
                .map_or(true, |b| evaluation.return_per_cash > b.return_per_cash);
            if better {
                best = Some(evaluation);
            }
        }
        Ok(best)
    }
}
