pub mod allocator;
pub mod reorder;
pub mod size_curve;

pub use allocator::{
    AllocationFailure, AllocationItem, AllocationOutcome, CapitalAllocator, ItemEfficiency,
};
pub use reorder::{NaiveComparison, ReorderOptimizer};
pub use size_curve::{CurveEvaluation, SizeCurveOptimizer};
