pub mod cost_model;
pub mod footwear;

pub use cost_model::CostModel;
pub use footwear::{FootwearCostModel, SizeCostSummary, StyleCosts};
