//! Types produced by coverage evaluation.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{CompetitionId, Provider, ProviderId};

/// Coverage of one competition by a combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitionDetail {
    pub competition_id: CompetitionId,
    pub competition_name: String,
    /// Coverage percentage the combination has for this competition.
    pub coverage_percentage: u8,
    pub total_games: u32,
    /// Estimated games watchable, `round(total_games * coverage / 100)`.
    pub covered_games: u32,
}

/// The evaluated outcome of one provider combination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinationResult {
    /// Providers in the combination. Owned providers, if merged, come first.
    pub providers: Vec<Provider>,
    /// Monthly cost, rounded to 2 decimal places. Excludes owned providers.
    pub total_cost: Decimal,
    /// Share of required competitions covered, 0-100.
    pub coverage_percentage: u8,
    pub covered_competitions: usize,
    pub total_competitions: usize,
    /// Covered competitions, ordered by competition id.
    pub competition_details: Vec<CompetitionDetail>,
    /// Required but uncovered competitions, ordered by competition id.
    pub missing_competitions: Vec<CompetitionDetail>,
    /// Ids of providers in `providers` the user already pays for.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owned_provider_ids: Vec<ProviderId>,
    /// Coverage threshold this result was selected for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_coverage: Option<u8>,
}

impl CombinationResult {
    /// Ids of all providers, in result order.
    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id).collect()
    }

    /// Providers the user would have to subscribe to.
    pub fn additional_providers(&self) -> impl Iterator<Item = &Provider> {
        self.providers
            .iter()
            .filter(|p| !self.owned_provider_ids.contains(&p.id))
    }

    /// Monthly cost of every provider in the result, owned ones included.
    pub fn full_monthly_cost(&self) -> Decimal {
        round_money(self.providers.iter().map(|p| p.monthly_price).sum())
    }

    /// Whether the result reaches `target` percent coverage.
    pub fn meets(&self, target: u8) -> bool {
        self.coverage_percentage >= target
    }
}

/// Round a money amount to cents, halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Errors from coverage evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoverageError {
    #[error("No required competitions to evaluate coverage against")]
    EmptyRequirement,
}
