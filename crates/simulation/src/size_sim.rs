//! Size-level depletion for footwear styles.
//!
//! Each size of a style is depleted independently over the full forecast
//! horizon: current stock drains until the reorder curve arrives at the end
//! of the lead time, then draining continues to the horizon. A style stocks
//! out when any size does, so per-size probabilities combine as
//! 1 - prod(1 - p) under the independence assumption.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use stocksense_core::{stats, DecisionError, RiskCategory, SizeCurve};
use stocksense_forecast::SizeForecast;

use crate::simulator::SimulatorConfig;

/// Coefficient of variation applied around each day's p50 size demand.
const SIZE_DEMAND_CV: f64 = 0.2;

/// Trial-averaged outcome for one size under a candidate curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeOutcome {
    /// Fraction of trials whose signed ending inventory went negative.
    pub stockout_probability: f64,
    pub expected_ending_inventory: f64,
    pub expected_unmet_demand: f64,
    pub ending_p10: f64,
    pub ending_p90: f64,
}

/// Style-level aggregation of per-size outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleSimulation {
    pub sizes: BTreeMap<String, SizeOutcome>,
    /// Probability at least one size stocks out, assuming independence.
    pub style_stockout_probability: f64,
    pub avg_size_stockout_probability: f64,
    pub high_risk_size_count: usize,
}

/// Monte Carlo depletion engine for a style's size run.
#[derive(Debug, Clone)]
pub struct SizeDemandSimulator {
    config: SimulatorConfig,
    rng: ChaCha8Rng,
}

impl SizeDemandSimulator {
    #[must_use]
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self { config, rng }
    }

    /// Simulates depletion for every size in `curve` over the forecast
    /// horizon, with the curve's quantities arriving after `lead_time_days`.
    ///
    /// # Errors
    /// `DecisionError::LeadTimeExceedsHorizon` when the forecast is shorter
    /// than the lead time, `DecisionError::UnknownSize` when the curve names
    /// a size the forecast has no demand series for.
    pub fn simulate_curve(
        &mut self,
        forecast: &SizeForecast,
        current_inventory: &BTreeMap<String, f64>,
        curve: &SizeCurve,
        lead_time_days: usize,
    ) -> Result<StyleSimulation, DecisionError> {
        let horizon_days = forecast.dates.len();
        if lead_time_days > horizon_days {
            return Err(DecisionError::LeadTimeExceedsHorizon {
                lead_time_days,
                horizon_days,
            });
        }

        let mut sizes = BTreeMap::new();
        for (size, &reorder_qty) in curve.iter() {
            let series = forecast
                .size_demand
                .get(size)
                .ok_or_else(|| DecisionError::UnknownSize(size.clone()))?;
            let starting = current_inventory.get(size).copied().unwrap_or(0.0);
            let outcome = self.simulate_size(
                &series.p50,
                starting,
                f64::from(reorder_qty),
                lead_time_days,
            );
            sizes.insert(size.clone(), outcome);
        }

        let probs: Vec<f64> = sizes.values().map(|o| o.stockout_probability).collect();
        let style_stockout_probability =
            1.0 - probs.iter().map(|p| 1.0 - p).product::<f64>();
        let high_risk_size_count = sizes
            .values()
            .filter(|o| RiskCategory::from_probability(o.stockout_probability) == RiskCategory::High)
            .count();

        Ok(StyleSimulation {
            sizes,
            style_stockout_probability,
            avg_size_stockout_probability: stats::mean(&probs),
            high_risk_size_count,
        })
    }

    fn simulate_size(
        &mut self,
        p50_demand: &[f64],
        current_inventory: f64,
        reorder_quantity: f64,
        lead_time_days: usize,
    ) -> SizeOutcome {
        let n = self.config.n_simulations;
        let mut endings = Vec::with_capacity(n);
        let mut unmet = Vec::with_capacity(n);

        for _ in 0..n {
            let mut inventory = current_inventory;
            for (day, &p50) in p50_demand.iter().enumerate() {
                if day == lead_time_days {
                    inventory += reorder_quantity;
                }
                inventory -= self.sample_demand(p50);
            }
            if lead_time_days == p50_demand.len() {
                inventory += reorder_quantity;
            }
            endings.push(inventory);
            unmet.push((-inventory).max(0.0));
        }

        let stockouts = endings.iter().filter(|&&e| e < 0.0).count();
        SizeOutcome {
            stockout_probability: stockouts as f64 / n.max(1) as f64,
            expected_ending_inventory: stats::mean(&endings),
            expected_unmet_demand: stats::mean(&unmet),
            ending_p10: stats::percentile(&endings, 0.10),
            ending_p90: stats::percentile(&endings, 0.90),
        }
    }

    fn sample_demand(&mut self, p50: f64) -> f64 {
        let std = p50 * SIZE_DEMAND_CV;
        if std <= 0.0 {
            return p50.max(0.0);
        }
        match Normal::new(p50, std) {
            Ok(dist) => dist.sample(&mut self.rng).max(0.0),
            Err(_) => p50.max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use stocksense_forecast::QuantileSeries;

    fn flat_series(days: usize, level: f64) -> QuantileSeries {
        QuantileSeries {
            p10: vec![level * 0.7; days],
            p50: vec![level; days],
            p90: vec![level * 1.3; days],
        }
    }

    fn style_forecast(days: usize, per_size: &[(&str, f64)]) -> SizeForecast {
        let dates: Vec<NaiveDate> = (0..days)
            .map(|i| {
                NaiveDate::from_ymd_opt(2025, 6, 1).unwrap() + chrono::Duration::days(i as i64)
            })
            .collect();
        let total_level: f64 = per_size.iter().map(|(_, l)| l).sum();
        let size_demand: BTreeMap<String, QuantileSeries> = per_size
            .iter()
            .map(|&(size, level)| (size.to_string(), flat_series(days, level)))
            .collect();
        let shares: BTreeMap<String, Vec<f64>> = per_size
            .iter()
            .map(|&(size, level)| (size.to_string(), vec![level / total_level; days]))
            .collect();
        SizeForecast {
            dates,
            total: flat_series(days, total_level),
            shares,
            size_demand,
        }
    }

    fn curve(entries: &[(&str, u32)]) -> SizeCurve {
        SizeCurve::new(
            entries
                .iter()
                .map(|&(s, q)| (s.to_string(), q))
                .collect(),
        )
    }

    fn simulator(seed: u64) -> SizeDemandSimulator {
        SizeDemandSimulator::new(
            SimulatorConfig::default()
                .with_n_simulations(500)
                .with_seed(seed),
        )
    }

    // ============================================================
    // Error Paths
    // ============================================================

    #[test]
    fn unknown_size_in_the_curve_is_rejected() {
        let forecast = style_forecast(14, &[("8", 10.0)]);
        let inventory = BTreeMap::from([("8".to_string(), 100.0)]);
        let err = simulator(1)
            .simulate_curve(&forecast, &inventory, &curve(&[("8", 50), ("13", 20)]), 7)
            .unwrap_err();
        assert!(matches!(err, DecisionError::UnknownSize(s) if s == "13"));
    }

    #[test]
    fn lead_time_beyond_horizon_is_rejected() {
        let forecast = style_forecast(7, &[("8", 10.0)]);
        let err = simulator(2)
            .simulate_curve(&forecast, &BTreeMap::new(), &curve(&[("8", 50)]), 14)
            .unwrap_err();
        assert!(matches!(err, DecisionError::LeadTimeExceedsHorizon { .. }));
    }

    // ============================================================
    // Per-Size Outcomes
    // ============================================================

    #[test]
    fn well_stocked_size_never_stocks_out() {
        // 10/day over 14 days is ~140 demand; 100 on hand + 200 reorder.
        let forecast = style_forecast(14, &[("8", 10.0)]);
        let inventory = BTreeMap::from([("8".to_string(), 100.0)]);
        let result = simulator(3)
            .simulate_curve(&forecast, &inventory, &curve(&[("8", 200)]), 7)
            .unwrap();

        let outcome = &result.sizes["8"];
        assert_eq!(outcome.stockout_probability, 0.0);
        assert!(outcome.expected_unmet_demand < f64::EPSILON);
        assert!(outcome.expected_ending_inventory > 100.0);
        assert!(outcome.ending_p10 <= outcome.ending_p90);
    }

    #[test]
    fn starved_size_stocks_out_with_unmet_demand() {
        let forecast = style_forecast(14, &[("9", 20.0)]);
        let inventory = BTreeMap::from([("9".to_string(), 10.0)]);
        let result = simulator(4)
            .simulate_curve(&forecast, &inventory, &curve(&[("9", 10)]), 7)
            .unwrap();

        let outcome = &result.sizes["9"];
        assert!(outcome.stockout_probability > 0.99);
        // ~280 demand against 20 available.
        assert!(outcome.expected_unmet_demand > 200.0);
        assert!(outcome.expected_ending_inventory < 0.0);
    }

    #[test]
    fn missing_inventory_entry_defaults_to_zero_stock() {
        let forecast = style_forecast(14, &[("8", 10.0)]);
        let result = simulator(5)
            .simulate_curve(&forecast, &BTreeMap::new(), &curve(&[("8", 20)]), 7)
            .unwrap();
        assert!(result.sizes["8"].stockout_probability > 0.99);
    }

    // ============================================================
    // Style Aggregation
    // ============================================================

    #[test]
    fn style_stockout_combines_independent_sizes() {
        // One safe size and one certain stockout: the style risk is driven
        // entirely by the starved size.
        let forecast = style_forecast(14, &[("8", 10.0), ("9", 20.0)]);
        let inventory = BTreeMap::from([
            ("8".to_string(), 500.0),
            ("9".to_string(), 5.0),
        ]);
        let result = simulator(6)
            .simulate_curve(&forecast, &inventory, &curve(&[("8", 100), ("9", 10)]), 7)
            .unwrap();

        let p8 = result.sizes["8"].stockout_probability;
        let p9 = result.sizes["9"].stockout_probability;
        let expected = 1.0 - (1.0 - p8) * (1.0 - p9);
        assert!((result.style_stockout_probability - expected).abs() < 1e-12);
        assert!(result.style_stockout_probability > 0.99);
        assert_eq!(result.high_risk_size_count, 1);
    }

    #[test]
    fn reproducible_under_a_fixed_seed() {
        let forecast = style_forecast(14, &[("8", 10.0), ("9", 15.0)]);
        let inventory = BTreeMap::from([("8".to_string(), 120.0), ("9".to_string(), 150.0)]);
        let reorder = curve(&[("8", 60), ("9", 90)]);

        let a = simulator(42)
            .simulate_curve(&forecast, &inventory, &reorder, 7)
            .unwrap();
        let b = simulator(42)
            .simulate_curve(&forecast, &inventory, &reorder, 7)
            .unwrap();
        for (size, outcome) in &a.sizes {
            let other = &b.sizes[size];
            assert!((outcome.expected_ending_inventory - other.expected_ending_inventory).abs()
                < f64::EPSILON);
        }
    }
}
