//! Coverage evaluation of provider combinations.
//!
//! Given a combination of providers and the competitions a viewer needs, the
//! evaluator computes the share of competitions covered, the monthly cost and
//! per-competition detail. How several providers' percentages for the same
//! competition combine is delegated to a `CompetitionCoveragePolicy`.

mod evaluator;
mod policy;
mod types;

pub use evaluator::CoverageEvaluator;
pub use policy::{BestProviderCoverage, CompetitionCoveragePolicy};
pub use types::*;
