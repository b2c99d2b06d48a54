//! Provider combination optimizer.
//!
//! For a set of clubs the optimizer derives the competitions to watch, loads
//! the providers covering any of them, and searches provider combinations:
//! the cheapest one per coverage threshold, plus a ranked enumeration of
//! every combination up to a size limit. Results are cached per request.

mod cache;
mod combinations;
mod config;
mod engine;
mod savings;
mod search;
mod tiers;
mod types;

pub use cache::{CachedResults, ResultCache};
pub use combinations::{binomial, combinations, subset_count, subsets_up_to, Combinations};
pub use config::{OptimizerConfig, SearchPolicy};
pub use engine::Optimizer;
pub use savings::SavingsEstimate;
pub use search::{
    enumerate_all_feasible, evaluate_subsets, find_cheapest_meeting_threshold, rank_results,
};
pub use tiers::{RecommendationTiers, BEST_VALUE_MIN_COVERAGE, BUDGET_MIN_COVERAGE};
pub use types::{
    OptimizationRequest, OptimizeError, MAX_CLUBS_PER_REQUEST, MAX_COMBINATION_SIZE_LIMIT,
    MAX_THRESHOLDS_PER_REQUEST,
};
