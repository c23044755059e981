//! Greedy capital allocation across items under a shared cash budget.
//!
//! Each item is scored by loss avoided per unit of incremental cash (its
//! unconstrained optimum versus a baseline order), then the budget is walked
//! in descending efficiency order: fund the full incremental cost if it fits,
//! fall back to the baseline cost, otherwise allocate nothing. Ranking is
//! fixed before the walk starts, so an earlier item exhausting the budget
//! never reorders later items.

use serde::{Deserialize, Serialize};

use stocksense_core::{
    AllocationPlan, DecisionError, Forecast, ItemAllocation, ItemEconomics, OrderConstraints,
};
use stocksense_economics::CostModel;
use stocksense_simulation::{DemandSimulator, SimulatorConfig};

use crate::reorder::ReorderOptimizer;

/// Everything the allocator needs to evaluate one item.
#[derive(Debug, Clone)]
pub struct AllocationItem {
    pub item_id: String,
    pub forecast: Forecast,
    pub current_inventory: f64,
    pub economics: ItemEconomics,
    /// Order the buyer would place anyway; efficiency is measured against it.
    pub baseline_quantity: f64,
}

/// Efficiency metrics for one item, computed before any budget is spent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemEfficiency {
    pub item_id: String,
    pub baseline_quantity: f64,
    pub optimal_quantity: f64,
    pub baseline_loss: f64,
    pub optimal_loss: f64,
    pub loss_avoided: f64,
    pub baseline_cash: f64,
    pub optimal_cash: f64,
    pub incremental_cash: f64,
    /// Loss avoided per unit of incremental cash; 0 when the optimal order
    /// needs no extra cash.
    pub efficiency: f64,
    pub stockout_probability: f64,
}

/// An item dropped from the allocation because its evaluation failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationFailure {
    pub item_id: String,
    pub reason: String,
}

/// Full allocation output: the funded plan plus the evidence behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub plan: AllocationPlan,
    /// All successfully evaluated items in descending efficiency order.
    pub rankings: Vec<ItemEfficiency>,
    pub failures: Vec<AllocationFailure>,
}

#[derive(Debug, Clone)]
pub struct CapitalAllocator {
    simulator_config: SimulatorConfig,
}

impl CapitalAllocator {
    #[must_use]
    pub fn new(simulator_config: SimulatorConfig) -> Self {
        Self { simulator_config }
    }

    /// Scores one item: unconstrained optimum, baseline loss, and the
    /// loss-avoided-per-cash efficiency ratio. Returns `Ok(None)` when the
    /// item has no feasible order quantity even without a cash cap.
    ///
    /// # Errors
    /// Propagates simulation errors (`DecisionError::LeadTimeExceedsHorizon`).
    pub fn evaluate_item(
        &self,
        item: &AllocationItem,
        holding_period_months: f64,
    ) -> Result<Option<ItemEfficiency>, DecisionError> {
        let cost_model = CostModel::new(item.economics.clone());
        let optimizer = ReorderOptimizer::new(cost_model.clone());
        let mut simulator = DemandSimulator::new(self.simulator_config.clone());

        // No cash cap here: the budget is applied by the greedy walk, not per
        // item.
        let constraints = OrderConstraints::from_economics(&item.economics);
        let optimal = optimizer.optimize_reorder(
            &mut simulator,
            &item.forecast,
            item.current_inventory,
            &constraints,
            holding_period_months,
        )?;
        if optimal.is_infeasible() {
            return Ok(None);
        }

        let baseline = cost_model.expected_economic_loss(
            &mut simulator,
            &item.forecast,
            item.current_inventory,
            item.baseline_quantity,
            holding_period_months,
        )?;

        let baseline_loss = baseline.total_expected_loss;
        let loss_avoided = baseline_loss - optimal.optimal_loss;
        let baseline_cash = cost_model.cash_locked(item.baseline_quantity);
        let optimal_cash = optimal.cash_locked;
        let incremental_cash = optimal_cash - baseline_cash;
        let efficiency = if incremental_cash > 0.0 {
            loss_avoided / incremental_cash
        } else {
            0.0
        };

        Ok(Some(ItemEfficiency {
            item_id: item.item_id.clone(),
            baseline_quantity: item.baseline_quantity,
            optimal_quantity: optimal.optimal_quantity,
            baseline_loss,
            optimal_loss: optimal.optimal_loss,
            loss_avoided,
            baseline_cash,
            optimal_cash,
            incremental_cash,
            efficiency,
            stockout_probability: optimal
                .risk_metrics
                .as_ref()
                .map_or(0.0, |m| m.stockout_probability),
        }))
    }

    /// Allocates `total_available_cash` across `items`.
    ///
    /// Items that fail to evaluate are collected into `failures` and the rest
    /// proceed; one bad item never poisons the batch.
    #[must_use]
    pub fn allocate(
        &self,
        items: &[AllocationItem],
        total_available_cash: f64,
        holding_period_months: f64,
    ) -> AllocationOutcome {
        let mut rankings = Vec::with_capacity(items.len());
        let mut failures = Vec::new();

        for item in items {
            match self.evaluate_item(item, holding_period_months) {
                Ok(Some(efficiency)) => rankings.push(efficiency),
                Ok(None) => failures.push(AllocationFailure {
                    item_id: item.item_id.clone(),
                    reason: "no feasible order quantity".to_string(),
                }),
                Err(err) => failures.push(AllocationFailure {
                    item_id: item.item_id.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        // Rank completely before spending: the walk must not reorder.
        rankings.sort_by(|a, b| {
            b.efficiency
                .partial_cmp(&a.efficiency)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut allocations = Vec::with_capacity(rankings.len());
        let mut total_cash_used = 0.0;
        let mut ranking = Vec::new();

        for entry in &rankings {
            if total_cash_used + entry.incremental_cash <= total_available_cash {
                allocations.push(ItemAllocation {
                    item_id: entry.item_id.clone(),
                    quantity: entry.optimal_quantity,
                    cash: entry.optimal_cash,
                    loss_avoided: entry.loss_avoided,
                });
                total_cash_used += entry.incremental_cash;
                ranking.push(entry.item_id.clone());
            } else if total_cash_used + entry.baseline_cash <= total_available_cash {
                allocations.push(ItemAllocation {
                    item_id: entry.item_id.clone(),
                    quantity: entry.baseline_quantity,
                    cash: entry.baseline_cash,
                    loss_avoided: 0.0,
                });
                total_cash_used += entry.baseline_cash;
                ranking.push(entry.item_id.clone());
            } else {
                allocations.push(ItemAllocation {
                    item_id: entry.item_id.clone(),
                    quantity: 0.0,
                    cash: 0.0,
                    loss_avoided: 0.0,
                });
            }
        }

        AllocationOutcome {
            plan: AllocationPlan {
                allocations,
                total_cash_used,
                remaining_cash: total_available_cash - total_cash_used,
                ranking,
            },
            rankings,
            failures,
        }
    }
}
