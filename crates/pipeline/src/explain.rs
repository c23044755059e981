//! Plain-text explanations of computed decisions.
//!
//! The explainer renders numbers the pipeline already produced; it never
//! recomputes or embellishes. Currency formatting follows Indian retail
//! convention: amounts at or above one lakh (100,000) render as "₹x.y lakh",
//! at or above a thousand as "₹x.yK".

use std::fmt::Write as _;

use stocksense_core::{AllocationPlan, OptimizationResult};
use stocksense_optimizer::NaiveComparison;

const LAKH: f64 = 100_000.0;

#[derive(Debug, Clone)]
pub struct DecisionExplainer {
    currency_symbol: String,
}

impl Default for DecisionExplainer {
    fn default() -> Self {
        Self {
            currency_symbol: "₹".to_string(),
        }
    }
}

impl DecisionExplainer {
    #[must_use]
    pub fn new(currency_symbol: impl Into<String>) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
        }
    }

    #[must_use]
    pub fn format_currency(&self, amount: f64) -> String {
        let sym = &self.currency_symbol;
        if amount.abs() >= LAKH {
            format!("{sym}{:.1} lakh", amount / LAKH)
        } else if amount.abs() >= 1_000.0 {
            format!("{sym}{:.1}K", amount / 1_000.0)
        } else {
            format!("{sym}{amount:.0}")
        }
    }

    /// Renders a reorder decision, including the naive comparison when one
    /// was computed.
    #[must_use]
    pub fn explain_reorder(
        &self,
        result: &OptimizationResult,
        comparison: Option<&NaiveComparison>,
    ) -> String {
        if result.is_infeasible() {
            return "No feasible order quantity under the given constraints; \
                    no order recommended."
                .to_string();
        }

        let mut out = String::new();
        let _ = writeln!(
            out,
            "Recommended order: {:.0} units",
            result.optimal_quantity
        );
        let _ = writeln!(
            out,
            "Cash locked: {}",
            self.format_currency(result.cash_locked)
        );
        if let Some(metrics) = &result.risk_metrics {
            let _ = writeln!(
                out,
                "Stockout risk: {:.1}% ({})",
                metrics.stockout_probability * 100.0,
                metrics.risk_category
            );
            let _ = writeln!(
                out,
                "Expected ending inventory: {:.0} units",
                metrics.expected_ending_inventory
            );
        }
        let _ = writeln!(
            out,
            "Expected economic loss: {}",
            self.format_currency(result.optimal_loss)
        );

        if let Some(c) = comparison {
            if c.cash_saved > 0.0 {
                let _ = writeln!(
                    out,
                    "Ordering {:.0} units instead of {:.0} frees {}",
                    c.optimal_quantity,
                    c.naive_quantity,
                    self.format_currency(c.cash_saved)
                );
            } else if c.cash_saved < 0.0 {
                let _ = writeln!(
                    out,
                    "Requires {} more cash than the naive order of {:.0} units",
                    self.format_currency(c.cash_saved.abs()),
                    c.naive_quantity
                );
            }
            if c.loss_reduction > 0.0 {
                let _ = writeln!(
                    out,
                    "Reduces expected loss by {} ({:.1}%)",
                    self.format_currency(c.loss_reduction),
                    c.loss_reduction_pct
                );
            }
            if c.optimal_stockout_probability < c.naive_stockout_probability {
                let _ = writeln!(
                    out,
                    "Reduces stockout risk from {:.1}% to {:.1}%",
                    c.naive_stockout_probability * 100.0,
                    c.optimal_stockout_probability * 100.0
                );
            }
        }

        out.trim_end().to_string()
    }

    /// Renders a capital allocation plan in funding order.
    #[must_use]
    pub fn explain_allocation(&self, plan: &AllocationPlan, total_available_cash: f64) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Total available cash: {}",
            self.format_currency(total_available_cash)
        );
        let _ = writeln!(
            out,
            "Total cash allocated: {}",
            self.format_currency(plan.total_cash_used)
        );
        let _ = writeln!(
            out,
            "Remaining cash: {}",
            self.format_currency(plan.remaining_cash)
        );
        let _ = writeln!(out, "Allocation by item (in priority order):");

        for allocation in plan.allocations.iter().filter(|a| a.quantity > 0.0) {
            let _ = writeln!(
                out,
                "  - {}: {:.0} units ({})",
                allocation.item_id,
                allocation.quantity,
                self.format_currency(allocation.cash)
            );
            if allocation.loss_avoided > 0.0 {
                let _ = writeln!(
                    out,
                    "    loss avoided: {}",
                    self.format_currency(allocation.loss_avoided)
                );
            }
        }

        out.trim_end().to_string()
    }
}
