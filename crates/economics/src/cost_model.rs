//! Economic loss model for a single item's reorder decision.
//!
//! Over- and understock costs are deliberately asymmetric. Overstock prices
//! the cash locked in excess units plus holding and obsolescence; understock
//! prices lost margin (not lost revenue, since the unit cost of an unsold
//! unit was never spent) plus a one-time churn penalty per stockout event.

use stocksense_core::{CostBreakdown, DecisionError, Forecast, ItemEconomics};
use stocksense_simulation::DemandSimulator;

/// Per-item cost model; cheap to clone, holds no simulation state.
#[derive(Debug, Clone)]
pub struct CostModel {
    economics: ItemEconomics,
}

impl CostModel {
    #[must_use]
    pub fn new(economics: ItemEconomics) -> Self {
        Self { economics }
    }

    #[must_use]
    pub fn economics(&self) -> &ItemEconomics {
        &self.economics
    }

    /// Cost of holding `excess_units` above demand for the holding period:
    /// cash locked + holding cost + markdown write-off. Zero at or below 0.
    #[must_use]
    pub fn overstock_cost(&self, excess_units: f64, holding_period_months: f64) -> f64 {
        if excess_units <= 0.0 {
            return 0.0;
        }
        let cash_locked = excess_units * self.economics.unit_cost;
        let holding_cost = cash_locked * self.economics.holding_cost_rate * holding_period_months;
        let obsolete_units = excess_units * self.economics.markdown_rate;
        let markdown_cost = obsolete_units * self.economics.unit_cost;
        cash_locked + holding_cost + markdown_cost
    }

    /// Cost of `unmet_demand` units going unsold: lost margin plus the churn
    /// penalty when a stockout event occurred. Zero at or below 0.
    #[must_use]
    pub fn understock_cost(&self, unmet_demand: f64, stockout_occurred: bool) -> f64 {
        if unmet_demand <= 0.0 {
            return 0.0;
        }
        let lost_margin = unmet_demand * self.economics.margin_per_unit();
        let churn_cost = if stockout_occurred {
            self.economics.churn_penalty
        } else {
            0.0
        };
        lost_margin + churn_cost
    }

    /// Purchase cash locked by a reorder of `quantity` units.
    #[must_use]
    pub fn cash_locked(&self, quantity: f64) -> f64 {
        quantity * self.economics.unit_cost
    }

    /// Expected economic loss of reordering `reorder_quantity` units.
    ///
    /// Runs one depletion batch, applies the reorder to each trial's signed
    /// ending inventory, and classifies every trial strictly: positive ending
    /// is an overstock trial (understock cost 0), otherwise an understock
    /// trial (overstock cost 0). The expectations are trial averages.
    ///
    /// # Errors
    /// Propagates `DecisionError::LeadTimeExceedsHorizon` from the simulator.
    pub fn expected_economic_loss(
        &self,
        simulator: &mut DemandSimulator,
        forecast: &Forecast,
        current_inventory: f64,
        reorder_quantity: f64,
        holding_period_months: f64,
    ) -> Result<CostBreakdown, DecisionError> {
        let lead_time_days = self.economics.lead_time_days;
        let batch = simulator.simulate_depletion(forecast, current_inventory, lead_time_days)?;

        let n = batch.n_trials().max(1) as f64;
        let mut overstock_sum = 0.0;
        let mut understock_sum = 0.0;
        let mut ending_sum = 0.0;
        let mut unmet_sum = 0.0;
        let mut stockouts = 0_usize;

        for ending in &batch.ending_inventory {
            let after_reorder = ending + reorder_quantity;
            ending_sum += after_reorder;
            if after_reorder > 0.0 {
                overstock_sum += self.overstock_cost(after_reorder, holding_period_months);
            } else {
                let unmet = -after_reorder;
                let stockout_occurred = after_reorder < 0.0;
                understock_sum += self.understock_cost(unmet, stockout_occurred);
                unmet_sum += unmet;
                if stockout_occurred {
                    stockouts += 1;
                }
            }
        }

        let expected_overstock_cost = overstock_sum / n;
        let expected_understock_cost = understock_sum / n;
        Ok(CostBreakdown {
            expected_overstock_cost,
            expected_understock_cost,
            total_expected_loss: expected_overstock_cost + expected_understock_cost,
            expected_ending_inventory: ending_sum / n,
            expected_unmet_demand: unmet_sum / n,
            stockout_probability: stockouts as f64 / n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stocksense_core::ForecastRow;
    use stocksense_simulation::SimulatorConfig;

    fn economics() -> ItemEconomics {
        ItemEconomics {
            unit_cost: 100.0,
            selling_price: 150.0,
            holding_cost_rate: 0.02,
            markdown_rate: 0.1,
            churn_penalty: 500.0,
            lead_time_days: 14,
            min_order_quantity: 0.0,
            order_multiple: 1.0,
            max_order_quantity: 10_000.0,
        }
    }

    fn flat_forecast(days: u32, mean: f64, std: f64) -> Forecast {
        Forecast::new(
            (1..=days)
                .map(|d| ForecastRow {
                    date: NaiveDate::from_ymd_opt(2025, 6, d).unwrap(),
                    p10: (mean - 1.28 * std).max(0.0),
                    p50: mean,
                    p90: mean + 1.28 * std,
                    mean,
                    std,
                })
                .collect(),
        )
    }

    fn simulator(seed: u64) -> DemandSimulator {
        DemandSimulator::new(
            SimulatorConfig::default()
                .with_n_simulations(1_000)
                .with_seed(seed),
        )
    }

    // ============================================================
    // Point Cost Formulas
    // ============================================================

    #[test]
    fn overstock_cost_components() {
        let model = CostModel::new(economics());
        // 10 excess units: 1000 cash + 1000*0.02*1 holding + 1*100 markdown.
        let cost = model.overstock_cost(10.0, 1.0);
        assert!((cost - (1_000.0 + 20.0 + 100.0)).abs() < 1e-9);
    }

    #[test]
    fn overstock_cost_scales_with_holding_period() {
        let model = CostModel::new(economics());
        let one_month = model.overstock_cost(10.0, 1.0);
        let three_months = model.overstock_cost(10.0, 3.0);
        assert!((three_months - one_month - 40.0).abs() < 1e-9);
    }

    #[test]
    fn no_excess_means_no_overstock_cost() {
        let model = CostModel::new(economics());
        assert_eq!(model.overstock_cost(0.0, 1.0), 0.0);
        assert_eq!(model.overstock_cost(-5.0, 1.0), 0.0);
    }

    #[test]
    fn understock_cost_is_margin_plus_churn() {
        let model = CostModel::new(economics());
        // 10 unmet units at 50 margin each, plus the churn penalty.
        assert!((model.understock_cost(10.0, true) - (500.0 + 500.0)).abs() < 1e-9);
        assert!((model.understock_cost(10.0, false) - 500.0).abs() < 1e-9);
        assert_eq!(model.understock_cost(0.0, true), 0.0);
    }

    #[test]
    fn cash_locked_is_quantity_times_unit_cost() {
        let model = CostModel::new(economics());
        assert!((model.cash_locked(120.0) - 12_000.0).abs() < 1e-9);
    }

    // ============================================================
    // Expected Loss
    // ============================================================

    #[test]
    fn massive_reorder_is_pure_overstock() {
        let model = CostModel::new(economics());
        let forecast = flat_forecast(14, 10.0, 2.0);
        // ~140 demand, 100 on hand, 10000 reordered: every trial overstocks.
        let breakdown = model
            .expected_economic_loss(&mut simulator(1), &forecast, 100.0, 10_000.0, 1.0)
            .unwrap();
        assert_eq!(breakdown.expected_understock_cost, 0.0);
        assert_eq!(breakdown.stockout_probability, 0.0);
        assert!(breakdown.expected_overstock_cost > 0.0);
        assert!(breakdown.expected_unmet_demand < f64::EPSILON);
        assert!(breakdown.expected_ending_inventory > 9_000.0);
    }

    #[test]
    fn no_reorder_against_heavy_demand_is_pure_understock() {
        let model = CostModel::new(economics());
        let forecast = flat_forecast(14, 10.0, 2.0);
        let breakdown = model
            .expected_economic_loss(&mut simulator(2), &forecast, 20.0, 0.0, 1.0)
            .unwrap();
        assert_eq!(breakdown.expected_overstock_cost, 0.0);
        assert!(breakdown.stockout_probability > 0.99);
        assert!(breakdown.expected_unmet_demand > 100.0);
        assert!(breakdown.expected_ending_inventory < 0.0);
    }

    #[test]
    fn total_loss_is_the_sum_of_both_sides() {
        let model = CostModel::new(economics());
        let forecast = flat_forecast(14, 10.0, 3.0);
        let breakdown = model
            .expected_economic_loss(&mut simulator(3), &forecast, 100.0, 50.0, 1.0)
            .unwrap();
        assert!(
            (breakdown.total_expected_loss
                - breakdown.expected_overstock_cost
                - breakdown.expected_understock_cost)
                .abs()
                < 1e-9
        );
    }

    #[test]
    fn a_reasonable_reorder_beats_the_extremes() {
        let model = CostModel::new(economics());
        let forecast = flat_forecast(14, 10.0, 2.0);

        let none = model
            .expected_economic_loss(&mut simulator(4), &forecast, 50.0, 0.0, 1.0)
            .unwrap();
        let balanced = model
            .expected_economic_loss(&mut simulator(4), &forecast, 50.0, 100.0, 1.0)
            .unwrap();
        let glut = model
            .expected_economic_loss(&mut simulator(4), &forecast, 50.0, 5_000.0, 1.0)
            .unwrap();

        assert!(balanced.total_expected_loss < none.total_expected_loss);
        assert!(balanced.total_expected_loss < glut.total_expected_loss);
    }
}
