pub mod risk;
pub mod simulator;
pub mod size_sim;

pub use risk::{RiskAssessment, RiskEstimator};
pub use simulator::{DemandSimulator, DistributionKind, SimulatorConfig};
pub use size_sim::{SizeDemandSimulator, SizeOutcome, StyleSimulation};
