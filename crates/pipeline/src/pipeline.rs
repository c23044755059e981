//! End-to-end decision pipeline: forecast, simulate, optimize, explain.
//!
//! One pipeline instance owns the forecaster cache and the configuration
//! shared by every decision. Each call builds its own simulator from the
//! configured seed, so repeated calls with the same inputs reproduce the
//! same recommendation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use stocksense_core::{
    DecisionError, Forecast, ItemEconomics, OrderConstraints, RiskCategory, SalesRecord,
    SizeCurve,
};
use stocksense_economics::{CostModel, FootwearCostModel};
use stocksense_forecast::{
    DemandForecaster, ForecasterConfig, SizeSalesRecord, SizeShareForecaster,
};
use stocksense_optimizer::{
    AllocationItem, AllocationOutcome, CapitalAllocator, NaiveComparison, ReorderOptimizer,
    SizeCurveOptimizer,
};
use stocksense_simulation::{
    DemandSimulator, RiskEstimator, SimulatorConfig, SizeDemandSimulator,
};

use crate::cache::ForecasterCache;
use crate::explain::DecisionExplainer;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub forecast_horizon_days: usize,
    pub holding_period_months: f64,
    pub forecaster: ForecasterConfig,
    pub simulator: SimulatorConfig,
    pub max_stockout_probability: f64,
    pub cache_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            forecast_horizon_days: 30,
            holding_period_months: 1.0,
            forecaster: ForecasterConfig::default(),
            simulator: SimulatorConfig::default(),
            max_stockout_probability: 0.20,
            cache_capacity: 64,
        }
    }
}

/// Inputs for one item's reorder recommendation.
#[derive(Debug, Clone)]
pub struct ReorderRequest {
    pub item_id: String,
    pub current_inventory: f64,
    pub economics: ItemEconomics,
    pub available_cash: Option<f64>,
    /// Gut-feel quantity to compare the recommendation against.
    pub naive_quantity: Option<f64>,
}

/// A complete reorder recommendation for one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub item_id: String,
    pub recommended_quantity: f64,
    pub current_inventory: f64,
    pub stockout_probability_before: f64,
    pub stockout_probability_after: f64,
    pub risk_category_before: RiskCategory,
    pub risk_category_after: RiskCategory,
    pub expected_overstock_cost: f64,
    pub expected_understock_cost: f64,
    /// Includes the risk penalty when the chosen quantity violates the
    /// ceiling; infinite for the infeasible sentinel.
    pub total_expected_loss: f64,
    pub cash_locked: f64,
    /// Cash freed versus the naive order; 0 without a comparison or when the
    /// recommendation needs more cash.
    pub cash_freed: f64,
    pub comparison: Option<NaiveComparison>,
    pub explanation: String,
}

impl Recommendation {
    #[must_use]
    pub fn is_infeasible(&self) -> bool {
        self.recommended_quantity == 0.0 && self.total_expected_loss.is_infinite()
    }
}

/// A request that failed during batch processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationFailure {
    pub item_id: String,
    pub reason: String,
}

/// Batch result: successful recommendations plus isolated failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub recommendations: Vec<Recommendation>,
    pub failures: Vec<RecommendationFailure>,
}

/// Inputs for one item in a capital allocation run.
#[derive(Debug, Clone)]
pub struct AllocationRequest {
    pub item_id: String,
    pub current_inventory: f64,
    pub economics: ItemEconomics,
    pub baseline_quantity: f64,
}

/// Allocation outcome plus its rendered explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationReport {
    pub outcome: AllocationOutcome,
    pub explanation: String,
}

/// Inputs for a footwear style recommendation.
#[derive(Debug, Clone)]
pub struct StyleReorderRequest {
    pub style_id: String,
    pub history: Vec<SizeSalesRecord>,
    pub current_inventory: BTreeMap<String, f64>,
    pub unit_cost: f64,
    pub selling_price: f64,
    pub lead_time_days: usize,
    pub min_order_total: u32,
    pub order_multiple: u32,
    pub max_order_total: Option<u32>,
    pub available_cash: Option<f64>,
}

/// Per-size slice of a style recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeLine {
    pub size: String,
    pub quantity: u32,
    pub stockout_probability: f64,
    pub risk_category: RiskCategory,
    pub cash_locked: f64,
    pub expected_loss: f64,
}

/// Style-level recommendation with its size breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleRecommendation {
    pub style_id: String,
    pub curve: SizeCurve,
    pub sizes: Vec<SizeLine>,
    pub total_cash: f64,
    pub total_expected_loss: f64,
    pub protected_revenue: f64,
    pub style_stockout_probability: f64,
    /// Cash locked in sizes whose stockout risk is HIGH.
    pub cash_at_risk: f64,
    pub explanation: String,
}

pub struct DecisionPipeline {
    config: PipelineConfig,
    cache: ForecasterCache,
    risk_estimator: RiskEstimator,
    explainer: DecisionExplainer,
}

impl DecisionPipeline {
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        let cache = ForecasterCache::new(config.cache_capacity);
        Self {
            config,
            cache,
            risk_estimator: RiskEstimator::new(),
            explainer: DecisionExplainer::default(),
        }
    }

    #[must_use]
    pub fn with_explainer(mut self, explainer: DecisionExplainer) -> Self {
        self.explainer = explainer;
        self
    }

    #[must_use]
    pub fn cache(&self) -> &ForecasterCache {
        &self.cache
    }

    /// Drops an item's cached forecaster, forcing retraining on next use.
    pub fn invalidate_item(&mut self, item_id: &str) -> bool {
        self.cache.invalidate(item_id)
    }

    /// Trains and caches a demand forecaster for an item.
    ///
    /// # Errors
    /// `DecisionError::InsufficientData` when the history is too short.
    pub fn train_item(
        &mut self,
        item_id: &str,
        history: &[SalesRecord],
    ) -> Result<(), DecisionError> {
        info!(item_id, observations = history.len(), "training demand forecaster");
        let mut forecaster = DemandForecaster::new(self.config.forecaster.clone());
        forecaster.train(history)?;
        self.cache.insert(item_id, forecaster);
        Ok(())
    }

    fn forecast_item(&self, item_id: &str) -> Result<Forecast, DecisionError> {
        let forecaster = self.cache.get(item_id).ok_or(DecisionError::NotTrained)?;
        forecaster.forecast(self.config.forecast_horizon_days)
    }

    /// Produces a full reorder recommendation for one item.
    ///
    /// # Errors
    /// `DecisionError::NotTrained` when the item has no cached forecaster,
    /// plus any simulation error. An empty feasible grid is not an error: it
    /// yields an infeasible recommendation (quantity 0, infinite loss).
    pub fn recommend(&self, request: &ReorderRequest) -> Result<Recommendation, DecisionError> {
        let item_id = request.item_id.as_str();
        info!(item_id, "generating demand forecast");
        let forecast = self.forecast_item(item_id)?;

        let mut simulator = DemandSimulator::new(self.config.simulator.clone());
        let lead_time_days = request.economics.lead_time_days;

        info!(item_id, "estimating current stockout risk");
        let before = self.risk_estimator.estimate_stockout_risk(
            &mut simulator,
            &forecast,
            request.current_inventory,
            lead_time_days,
        )?;

        info!(item_id, "optimizing reorder quantity");
        let cost_model = CostModel::new(request.economics.clone());
        let optimizer = ReorderOptimizer::new(cost_model)
            .with_max_stockout_probability(self.config.max_stockout_probability);
        let mut constraints = OrderConstraints::from_economics(&request.economics);
        if let Some(cash) = request.available_cash {
            constraints = constraints.with_available_cash(cash);
        }
        let result = optimizer.optimize_reorder(
            &mut simulator,
            &forecast,
            request.current_inventory,
            &constraints,
            self.config.holding_period_months,
        )?;

        if result.is_infeasible() {
            warn!(item_id, "no feasible order quantity");
            let explanation = self.explainer.explain_reorder(&result, None);
            return Ok(Recommendation {
                item_id: request.item_id.clone(),
                recommended_quantity: 0.0,
                current_inventory: request.current_inventory,
                stockout_probability_before: before.stockout_probability,
                stockout_probability_after: before.stockout_probability,
                risk_category_before: before.risk_category,
                risk_category_after: before.risk_category,
                expected_overstock_cost: 0.0,
                expected_understock_cost: 0.0,
                total_expected_loss: f64::INFINITY,
                cash_locked: 0.0,
                cash_freed: 0.0,
                comparison: None,
                explanation,
            });
        }

        let comparison = match request.naive_quantity {
            Some(naive) => {
                info!(item_id, naive_quantity = naive, "comparing with naive order");
                Some(optimizer.compare_with_naive(
                    &mut simulator,
                    &forecast,
                    request.current_inventory,
                    naive,
                    &result,
                    self.config.holding_period_months,
                )?)
            }
            None => None,
        };

        let chosen = result
            .all_evaluations
            .iter()
            .find(|e| (e.quantity - result.optimal_quantity).abs() < 1e-9);
        let (expected_overstock_cost, expected_understock_cost) =
            chosen.map_or((0.0, 0.0), |e| (e.overstock_cost, e.understock_cost));

        // A feasible result always carries post-reorder metrics; mirror the
        // pre-reorder assessment if they are ever absent.
        let (prob_after, category_after) = result.risk_metrics.as_ref().map_or(
            (before.stockout_probability, before.risk_category),
            |m| (m.stockout_probability, m.risk_category),
        );
        let cash_freed = comparison
            .as_ref()
            .map_or(0.0, |c| c.cash_saved.max(0.0));
        let explanation = self
            .explainer
            .explain_reorder(&result, comparison.as_ref());

        info!(
            item_id,
            quantity = result.optimal_quantity,
            loss = result.optimal_loss,
            "recommendation ready"
        );
        Ok(Recommendation {
            item_id: request.item_id.clone(),
            recommended_quantity: result.optimal_quantity,
            current_inventory: request.current_inventory,
            stockout_probability_before: before.stockout_probability,
            stockout_probability_after: prob_after,
            risk_category_before: before.risk_category,
            risk_category_after: category_after,
            expected_overstock_cost,
            expected_understock_cost,
            total_expected_loss: result.optimal_loss,
            cash_locked: result.cash_locked,
            cash_freed,
            comparison,
            explanation,
        })
    }

    /// Runs `recommend` for each request, isolating failures so one bad item
    /// never blocks the batch.
    #[must_use]
    pub fn recommend_batch(&self, requests: &[ReorderRequest]) -> BatchOutcome {
        let mut recommendations = Vec::with_capacity(requests.len());
        let mut failures = Vec::new();
        for request in requests {
            match self.recommend(request) {
                Ok(recommendation) => recommendations.push(recommendation),
                Err(err) => {
                    warn!(item_id = %request.item_id, error = %err, "recommendation failed");
                    failures.push(RecommendationFailure {
                        item_id: request.item_id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        BatchOutcome {
            recommendations,
            failures,
        }
    }

    /// Allocates a shared cash budget across items by loss avoided per unit
    /// of cash. Items without a trained forecaster (or whose forecast fails)
    /// land in the outcome's failures.
    #[must_use]
    pub fn allocate(
        &self,
        requests: &[AllocationRequest],
        total_available_cash: f64,
    ) -> AllocationReport {
        info!(
            items = requests.len(),
            cash = total_available_cash,
            "allocating capital across items"
        );

        let mut items = Vec::with_capacity(requests.len());
        let mut forecast_failures = Vec::new();
        for request in requests {
            match self.forecast_item(&request.item_id) {
                Ok(forecast) => items.push(AllocationItem {
                    item_id: request.item_id.clone(),
                    forecast,
                    current_inventory: request.current_inventory,
                    economics: request.economics.clone(),
                    baseline_quantity: request.baseline_quantity,
                }),
                Err(err) => {
                    warn!(item_id = %request.item_id, error = %err, "excluded from allocation");
                    forecast_failures.push(stocksense_optimizer::AllocationFailure {
                        item_id: request.item_id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        let allocator = CapitalAllocator::new(self.config.simulator.clone());
        let mut outcome = allocator.allocate(
            &items,
            total_available_cash,
            self.config.holding_period_months,
        );
        outcome.failures.extend(forecast_failures);

        let explanation = self
            .explainer
            .explain_allocation(&outcome.plan, total_available_cash);
        AllocationReport {
            outcome,
            explanation,
        }
    }

    /// Footwear path: forecasts size-level demand, generates factory-valid
    /// curves, and recommends the best affordable one. `Ok(None)` means no
    /// curve fits the constraints.
    ///
    /// # Errors
    /// Training/forecast errors from the size-share forecaster and any
    /// simulation error during curve evaluation.
    pub fn recommend_style(
        &self,
        request: &StyleReorderRequest,
    ) -> Result<Option<StyleRecommendation>, DecisionError> {
        let style_id = request.style_id.as_str();
        info!(style_id, "training size-share forecaster");
        let mut forecaster = SizeShareForecaster::new(self.config.forecaster.clone());
        forecaster.train(&request.history)?;
        let forecast = forecaster.forecast(self.config.forecast_horizon_days)?;

        info!(style_id, "generating candidate size curves");
        let cost_model = FootwearCostModel::new(request.unit_cost, request.selling_price);
        let optimizer = SizeCurveOptimizer::new(cost_model.clone(), request.selling_price);
        let curves = optimizer.generate_valid_size_curves(
            &forecast.mean_shares(),
            request.min_order_total,
            request.order_multiple,
            request.max_order_total,
        );

        info!(style_id, candidates = curves.len(), "evaluating size curves");
        let mut simulator = SizeDemandSimulator::new(self.config.simulator.clone());
        let best = optimizer.optimize_style_reorder(
            &mut simulator,
            &forecast,
            &request.current_inventory,
            &curves,
            request.lead_time_days,
            request.available_cash,
        )?;

        let Some(evaluation) = best else {
            warn!(style_id, "no affordable size curve");
            return Ok(None);
        };

        let unit_cost = request.unit_cost;
        let sizes: Vec<SizeLine> = evaluation
            .simulation
            .sizes
            .iter()
            .map(|(size, outcome)| {
                let quantity = evaluation.curve.quantity(size);
                let expected_loss = cost_model.size_overstock_cost(
                    size,
                    outcome.expected_ending_inventory,
                    self.config.holding_period_months,
                ) + cost_model.size_understock_cost(
                    size,
                    outcome.expected_unmet_demand,
                    outcome.stockout_probability > 0.0,
                );
                SizeLine {
                    size: size.clone(),
                    quantity,
                    stockout_probability: outcome.stockout_probability,
                    risk_category: RiskCategory::from_probability(outcome.stockout_probability),
                    cash_locked: f64::from(quantity) * unit_cost,
                    expected_loss,
                }
            })
            .collect();

        let explanation = format!(
            "Recommended size curve: {} units across {} sizes\n\
             Cash committed: {}\n\
             Expected economic loss: {}\n\
             Protected revenue: {}\n\
             Style stockout risk: {:.1}%",
            evaluation.curve.total(),
            sizes.len(),
            self.explainer.format_currency(evaluation.total_cash),
            self.explainer
                .format_currency(evaluation.costs.total_expected_loss),
            self.explainer.format_currency(evaluation.protected_revenue),
            evaluation.simulation.style_stockout_probability * 100.0
        );

        info!(
            style_id,
            total = evaluation.curve.total(),
            "style recommendation ready"
        );
        Ok(Some(StyleRecommendation {
            style_id: request.style_id.clone(),
            curve: evaluation.curve.clone(),
            sizes,
            total_cash: evaluation.total_cash,
            total_expected_loss: evaluation.costs.total_expected_loss,
            protected_revenue: evaluation.protected_revenue,
            style_stockout_probability: evaluation.simulation.style_stockout_probability,
            cash_at_risk: evaluation.costs.cash_at_risk,
            explanation,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn history(days: usize, level: f64) -> Vec<SalesRecord> {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        (0..days)
            .map(|i| {
                let date = start + chrono::Duration::days(i as i64);
                let demand = (level + (i as f64 * 0.7).sin() * level * 0.05).max(0.0);
                SalesRecord::new(date, demand)
            })
            .collect()
    }

    fn test_pipeline() -> DecisionPipeline {
        DecisionPipeline::new(PipelineConfig {
            simulator: SimulatorConfig::default()
                .with_n_simulations(200)
                .with_seed(7),
            ..PipelineConfig::default()
        })
    }

    fn economics() -> ItemEconomics {
        ItemEconomics {
            unit_cost: 100.0,
            selling_price: 150.0,
            holding_cost_rate: 0.02,
            markdown_rate: 0.0,
            churn_penalty: 0.0,
            lead_time_days: 14,
            min_order_quantity: 0.0,
            order_multiple: 1.0,
            max_order_quantity: 500.0,
        }
    }

    fn request(item_id: &str) -> ReorderRequest {
        ReorderRequest {
            item_id: item_id.to_string(),
            current_inventory: 50.0,
            economics: economics(),
            available_cash: None,
            naive_quantity: None,
        }
    }

    // ============================================================
    // Training and Caching
    // ============================================================

    #[test]
    fn recommend_requires_a_trained_item() {
        let pipeline = test_pipeline();
        let err = pipeline.recommend(&request("sku-1")).unwrap_err();
        assert!(matches!(err, DecisionError::NotTrained));
    }

    #[test]
    fn training_populates_the_cache() {
        let mut pipeline = test_pipeline();
        pipeline.train_item("sku-1", &history(90, 10.0)).unwrap();
        assert!(pipeline.cache().contains("sku-1"));
        assert!(pipeline.invalidate_item("sku-1"));
        assert!(!pipeline.cache().contains("sku-1"));
    }

    #[test]
    fn short_history_is_rejected() {
        let mut pipeline = test_pipeline();
        let err = pipeline.train_item("sku-1", &history(5, 10.0)).unwrap_err();
        assert!(matches!(err, DecisionError::InsufficientData { .. }));
    }

    // ============================================================
    // Recommendations
    // ============================================================

    #[test]
    fn trained_item_yields_a_recommendation() {
        let mut pipeline = test_pipeline();
        pipeline.train_item("sku-1", &history(120, 10.0)).unwrap();
        let recommendation = pipeline.recommend(&request("sku-1")).unwrap();
        assert!(!recommendation.is_infeasible());
        assert!(recommendation.recommended_quantity >= 0.0);
        assert!(!recommendation.explanation.is_empty());
    }

    #[test]
    fn naive_comparison_is_attached_when_requested() {
        let mut pipeline = test_pipeline();
        pipeline.train_item("sku-1", &history(120, 10.0)).unwrap();
        let mut req = request("sku-1");
        req.naive_quantity = Some(400.0);
        let recommendation = pipeline.recommend(&req).unwrap();
        let comparison = recommendation.comparison.expect("comparison requested");
        assert!((comparison.naive_quantity - 400.0).abs() < 1e-9);
    }

    #[test]
    fn batch_isolates_untrained_items() {
        let mut pipeline = test_pipeline();
        pipeline.train_item("good", &history(120, 10.0)).unwrap();
        let outcome = pipeline.recommend_batch(&[request("good"), request("missing")]);
        assert_eq!(outcome.recommendations.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].item_id, "missing");
    }

    #[test]
    fn untrained_allocation_items_land_in_failures() {
        let mut pipeline = test_pipeline();
        pipeline.train_item("good", &history(120, 10.0)).unwrap();
        let requests = vec![
            AllocationRequest {
                item_id: "good".to_string(),
                current_inventory: 0.0,
                economics: economics(),
                baseline_quantity: 100.0,
            },
            AllocationRequest {
                item_id: "missing".to_string(),
                current_inventory: 0.0,
                economics: economics(),
                baseline_quantity: 100.0,
            },
        ];
        let report = pipeline.allocate(&requests, 50_000.0);
        assert!(report
            .outcome
            .failures
            .iter()
            .any(|f| f.item_id == "missing"));
        assert!(report.outcome.plan.total_cash_used <= 50_000.0);
    }
}
