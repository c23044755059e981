pub mod cache;
pub mod explain;
pub mod pipeline;

pub use cache::ForecasterCache;
pub use explain::DecisionExplainer;
pub use pipeline::{
    AllocationReport, AllocationRequest, BatchOutcome, DecisionPipeline, PipelineConfig,
    Recommendation, RecommendationFailure, ReorderRequest, SizeLine, StyleRecommendation,
    StyleReorderRequest,
};
