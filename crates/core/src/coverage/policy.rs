//! How a combination's coverage of a single competition is computed.

use crate::catalog::{CompetitionId, Provider};

/// Strategy for combining several providers' percentages for one competition.
pub trait CompetitionCoveragePolicy: Send + Sync + std::fmt::Debug {
    /// Short identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Coverage percentage (0-100) the providers together offer for the competition.
    fn competition_coverage(&self, providers: &[&Provider], competition_id: CompetitionId) -> u8;
}

/// Takes the best single provider's percentage.
///
/// Percentages are not added: two providers with 50% each of the same
/// competition may broadcast the same games, so the pair still counts as 50%.
#[derive(Debug, Default, Clone, Copy)]
pub struct BestProviderCoverage;

impl CompetitionCoveragePolicy for BestProviderCoverage {
    fn name(&self) -> &'static str {
        "best_provider"
    }

    fn competition_coverage(&self, providers: &[&Provider], competition_id: CompetitionId) -> u8 {
        providers
            .iter()
            .map(|p| p.coverage_for(competition_id))
            .max()
            .unwrap_or(0)
    }
}
