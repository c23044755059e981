//! Size-aware cost model for footwear styles.
//!
//! Costs are not symmetric across a size run. Excess stock in fringe sizes
//! (6, 7, 11) is worse than in core sizes because a broken size run drags the
//! whole style into markdown, while a stockout in the core sizes (8, 9) loses
//! more revenue than one in a fringe size. Both effects are captured as
//! per-size multipliers on the base cost formulas.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use stocksense_core::RiskCategory;

/// Per-size cost inputs for the style-level rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeCostSummary {
    pub expected_overstock_cost: f64,
    pub expected_understock_cost: f64,
    pub cash_locked: f64,
    pub risk_category: RiskCategory,
}

/// Style-level cost aggregation across the size run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleCosts {
    pub total_overstock_cost: f64,
    pub total_understock_cost: f64,
    pub total_expected_loss: f64,
    pub total_cash_locked: f64,
    /// Cash locked in sizes whose stockout risk is HIGH.
    pub cash_at_risk: f64,
}

#[derive(Debug, Clone)]
pub struct FootwearCostModel {
    base_unit_cost: f64,
    base_selling_price: f64,
    holding_cost_rate: f64,
    markdown_rate: f64,
    churn_penalty: f64,
}

impl FootwearCostModel {
    /// Footwear defaults: 2% monthly holding, 50% markdown on unsold sizes.
    #[must_use]
    pub fn new(base_unit_cost: f64, base_selling_price: f64) -> Self {
        Self {
            base_unit_cost,
            base_selling_price,
            holding_cost_rate: 0.02,
            markdown_rate: 0.5,
            churn_penalty: 0.0,
        }
    }

    #[must_use]
    pub fn with_holding_cost_rate(mut self, rate: f64) -> Self {
        self.holding_cost_rate = rate;
        self
    }

    #[must_use]
    pub fn with_markdown_rate(mut self, rate: f64) -> Self {
        self.markdown_rate = rate;
        self
    }

    #[must_use]
    pub fn with_churn_penalty(mut self, penalty: f64) -> Self {
        self.churn_penalty = penalty;
        self
    }

    #[must_use]
    pub fn unit_cost(&self) -> f64 {
        self.base_unit_cost
    }

    fn overstock_multiplier(size: &str) -> f64 {
        match size {
            "6" | "11" => 1.3,
            "7" => 1.2,
            "10" => 1.1,
            _ => 1.0,
        }
    }

    fn understock_multiplier(size: &str) -> f64 {
        match size {
            "8" | "9" => 1.5,
            "10" => 1.2,
            "7" | "11" => 0.9,
            "6" => 0.8,
            _ => 1.0,
        }
    }

    /// Overstock cost for one size: (cash locked + holding + markdown) scaled
    /// by the size's overstock multiplier. Zero at or below 0 excess.
    #[must_use]
    pub fn size_overstock_cost(
        &self,
        size: &str,
        excess_units: f64,
        holding_period_months: f64,
    ) -> f64 {
        if excess_units <= 0.0 {
            return 0.0;
        }
        let cash_locked = excess_units * self.base_unit_cost;
        let holding_cost = cash_locked * self.holding_cost_rate * holding_period_months;
        let markdown_cost = excess_units * self.base_unit_cost * self.markdown_rate;
        (cash_locked + holding_cost + markdown_cost) * Self::overstock_multiplier(size)
    }

    /// Understock cost for one size: (lost margin + churn) scaled by the
    /// size's understock multiplier. Zero at or below 0 unmet demand.
    #[must_use]
    pub fn size_understock_cost(
        &self,
        size: &str,
        unmet_demand: f64,
        stockout_occurred: bool,
    ) -> f64 {
        if unmet_demand <= 0.0 {
            return 0.0;
        }
        let margin_per_unit = self.base_selling_price - self.base_unit_cost;
        let lost_margin = unmet_demand * margin_per_unit;
        let churn_cost = if stockout_occurred {
            self.churn_penalty
        } else {
            0.0
        };
        (lost_margin + churn_cost) * Self::understock_multiplier(size)
    }

    /// Rolls per-size cost summaries up to the style level.
    #[must_use]
    pub fn style_costs(&self, size_costs: &BTreeMap<String, SizeCostSummary>) -> StyleCosts {
        let total_overstock_cost: f64 = size_costs
            .values()
            .map(|c| c.expected_overstock_cost)
            .sum();
        let total_understock_cost: f64 = size_costs
            .values()
            .map(|c| c.expected_understock_cost)
            .sum();
        let total_cash_locked: f64 = size_costs.values().map(|c| c.cash_locked).sum();
        let cash_at_risk: f64 = size_costs
            .values()
            .filter(|c| c.risk_category == RiskCategory::High)
            .map(|c| c.cash_locked)
            .sum();

        StyleCosts {
            total_overstock_cost,
            total_understock_cost,
            total_expected_loss: total_overstock_cost + total_understock_cost,
            total_cash_locked,
            cash_at_risk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> FootwearCostModel {
        FootwearCostModel::new(100.0, 160.0)
    }

    // ============================================================
    // Size Multipliers
    // ============================================================

    #[test]
    fn fringe_sizes_pay_more_for_overstock() {
        let m = model();
        let core = m.size_overstock_cost("8", 10.0, 1.0);
        let fringe = m.size_overstock_cost("6", 10.0, 1.0);
        assert!((fringe - core * 1.3).abs() < 1e-9);
    }

    #[test]
    fn core_sizes_pay_more_for_understock() {
        let m = model();
        let fringe = m.size_understock_cost("6", 10.0, false);
        let core = m.size_understock_cost("8", 10.0, false);
        // Multiplier ratio 1.5 / 0.8.
        assert!((core / fringe - 1.5 / 0.8).abs() < 1e-9);
    }

    #[test]
    fn unknown_sizes_get_the_neutral_multiplier() {
        let m = model();
        let base_overstock = 10.0 * 100.0 * (1.0 + 0.02 + 0.5);
        assert!((m.size_overstock_cost("12", 10.0, 1.0) - base_overstock).abs() < 1e-9);
        let base_understock = 10.0 * 60.0;
        assert!((m.size_understock_cost("12", 10.0, false) - base_understock).abs() < 1e-9);
    }

    // ============================================================
    // Cost Formulas
    // ============================================================

    #[test]
    fn overstock_includes_the_style_markdown() {
        let m = model();
        // Size 8 (neutral): 1000 cash + 20 holding + 500 markdown.
        assert!((m.size_overstock_cost("8", 10.0, 1.0) - 1_520.0).abs() < 1e-9);
    }

    #[test]
    fn churn_applies_only_on_a_stockout_event() {
        let m = FootwearCostModel::new(100.0, 160.0).with_churn_penalty(400.0);
        let without = m.size_understock_cost("8", 10.0, false);
        let with = m.size_understock_cost("8", 10.0, true);
        assert!((with - without - 400.0 * 1.5).abs() < 1e-9);
    }

    #[test]
    fn zero_quantities_cost_nothing() {
        let m = model();
        assert_eq!(m.size_overstock_cost("6", 0.0, 1.0), 0.0);
        assert_eq!(m.size_understock_cost("9", -1.0, true), 0.0);
    }

    // ============================================================
    // Style Rollup
    // ============================================================

    #[test]
    fn style_costs_sum_sizes_and_flag_high_risk_cash() {
        let m = model();
        let summaries = BTreeMap::from([
            (
                "8".to_string(),
                SizeCostSummary {
                    expected_overstock_cost: 100.0,
                    expected_understock_cost: 50.0,
                    cash_locked: 4_000.0,
                    risk_category: RiskCategory::Low,
                },
            ),
            (
                "9".to_string(),
                SizeCostSummary {
                    expected_overstock_cost: 30.0,
                    expected_understock_cost: 300.0,
                    cash_locked: 6_000.0,
                    risk_category: RiskCategory::High,
                },
            ),
        ]);

        let style = m.style_costs(&summaries);
        assert!((style.total_overstock_cost - 130.0).abs() < 1e-9);
        assert!((style.total_understock_cost - 350.0).abs() < 1e-9);
        assert!((style.total_expected_loss - 480.0).abs() < 1e-9);
        assert!((style.total_cash_locked - 10_000.0).abs() < 1e-9);
        assert!((style.cash_at_risk - 6_000.0).abs() < 1e-9);
    }
}
