//! Stockout risk assessment on top of the depletion simulator.

use serde::{Deserialize, Serialize};

use stocksense_core::{DecisionError, Forecast, ReorderRiskMetrics, RiskCategory};

use crate::simulator::DemandSimulator;

/// Risk picture for current inventory with no reorder applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub stockout_probability: f64,
    pub risk_category: RiskCategory,
    /// Days the current stock covers at mean forecast demand; infinite when
    /// the forecast is flat zero.
    pub expected_days_of_cover: f64,
    pub demand_p50: f64,
    pub demand_p90: f64,
    pub demand_p95: f64,
    pub current_inventory: f64,
    pub lead_time_days: usize,
}

/// Translates simulation batches into risk metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskEstimator;

impl RiskEstimator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Assesses stockout risk over the lead time with no reorder.
    ///
    /// # Errors
    /// Propagates `DecisionError::LeadTimeExceedsHorizon` from the simulator.
    pub fn estimate_stockout_risk(
        &self,
        simulator: &mut DemandSimulator,
        forecast: &Forecast,
        current_inventory: f64,
        lead_time_days: usize,
    ) -> Result<RiskAssessment, DecisionError> {
        let batch = simulator.simulate_depletion(forecast, current_inventory, lead_time_days)?;
        let demand = batch.demand_statistics();

        Ok(RiskAssessment {
            stockout_probability: batch.stockout_probability,
            risk_category: RiskCategory::from_probability(batch.stockout_probability),
            expected_days_of_cover: days_of_cover(
                current_inventory,
                forecast.mean_daily_demand(lead_time_days),
            ),
            demand_p50: demand.p50,
            demand_p90: demand.p90,
            demand_p95: demand.p95,
            current_inventory,
            lead_time_days,
        })
    }

    /// Risk metrics with a candidate reorder arriving at the end of the lead
    /// time: the quantity is added to each trial's signed ending inventory
    /// before the metrics are recomputed.
    ///
    /// # Errors
    /// Propagates `DecisionError::LeadTimeExceedsHorizon` from the simulator.
    pub fn estimate_risk_after_reorder(
        &self,
        simulator: &mut DemandSimulator,
        forecast: &Forecast,
        current_inventory: f64,
        lead_time_days: usize,
        reorder_quantity: f64,
    ) -> Result<ReorderRiskMetrics, DecisionError> {
        let batch = simulator.simulate_depletion(forecast, current_inventory, lead_time_days)?;

        let adjusted: Vec<f64> = batch
            .ending_inventory
            .iter()
            .map(|e| e + reorder_quantity)
            .collect();
        let n = adjusted.len().max(1) as f64;
        let stockouts = adjusted.iter().filter(|&&e| e < 0.0).count();
        let stockout_probability = stockouts as f64 / n;
        let expected_ending_inventory = adjusted.iter().sum::<f64>() / n;

        Ok(ReorderRiskMetrics {
            stockout_probability,
            risk_category: RiskCategory::from_probability(stockout_probability),
            expected_ending_inventory,
            expected_days_of_cover: days_of_cover(
                current_inventory + reorder_quantity,
                forecast.mean_daily_demand(lead_time_days),
            ),
            reorder_quantity,
        })
    }
}

fn days_of_cover(inventory: f64, mean_daily_demand: f64) -> f64 {
    if mean_daily_demand > 0.0 {
        inventory / mean_daily_demand
    } else {
        f64::INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::SimulatorConfig;
    use chrono::NaiveDate;
    use stocksense_core::ForecastRow;

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
    // Baseline Risk
    // ============================================================

    #[test]
    fn ample_stock_is_low_risk() {
        let forecast = flat_forecast(14, 10.0, 2.0);
        let assessment = RiskEstimator::new()
            .estimate_stockout_risk(&mut simulator(1), &forecast, 1_000.0, 14)
            .unwrap();
        assert_eq!(assessment.risk_category, RiskCategory::Low);
        assert!(assessment.stockout_probability < 0.05);
        // 1000 units at 10/day.
        assert!((assessment.expected_days_of_cover - 100.0).abs() < 1e-9);
    }

    #[test]
    fn starved_stock_is_high_risk() {
        let forecast = flat_forecast(14, 10.0, 2.0);
        let assessment = RiskEstimator::new()
            .estimate_stockout_risk(&mut simulator(2), &forecast, 50.0, 14)
            .unwrap();
        assert_eq!(assessment.risk_category, RiskCategory::High);
        assert!(assessment.stockout_probability > 0.9);
    }

    #[test]
    fn zero_demand_means_infinite_cover() {
        let forecast = flat_forecast(14, 0.0, 0.0);
        let assessment = RiskEstimator::new()
            .estimate_stockout_risk(&mut simulator(3), &forecast, 10.0, 14)
            .unwrap();
        assert!(assessment.expected_days_of_cover.is_infinite());
        assert_eq!(assessment.stockout_probability, 0.0);
    }

    #[test]
    fn demand_percentiles_are_ordered() {
        let forecast = flat_forecast(14, 10.0, 3.0);
        let assessment = RiskEstimator::new()
            .estimate_stockout_risk(&mut simulator(4), &forecast, 200.0, 14)
            .unwrap();
        assert!(assessment.demand_p50 <= assessment.demand_p90);
        assert!(assessment.demand_p90 <= assessment.demand_p95);
    }

    // ============================================================
    // Risk After Reorder
    // ============================================================

    #[test]
    fn reorder_reduces_stockout_probability() {
        let forecast = flat_forecast(14, 10.0, 2.0);
        let estimator = RiskEstimator::new();

        let before = estimator
            .estimate_stockout_risk(&mut simulator(5), &forecast, 100.0, 14)
            .unwrap();
        let after = estimator
            .estimate_risk_after_reorder(&mut simulator(5), &forecast, 100.0, 14, 100.0)
            .unwrap();

        assert!(after.stockout_probability < before.stockout_probability);
        assert!((after.reorder_quantity - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn large_reorder_clears_the_risk() {
        let forecast = flat_forecast(14, 10.0, 2.0);
        let metrics = RiskEstimator::new()
            .estimate_risk_after_reorder(&mut simulator(6), &forecast, 50.0, 14, 500.0)
            .unwrap();
        assert_eq!(metrics.stockout_probability, 0.0);
        assert_eq!(metrics.risk_category, RiskCategory::Low);
        // ~140 demand against 550 available.
        assert!(metrics.expected_ending_inventory > 380.0);
        assert!((metrics.expected_days_of_cover - 55.0).abs() < 1e-9);
    }
}
