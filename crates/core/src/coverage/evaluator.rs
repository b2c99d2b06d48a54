//! Scores a provider combination against the required competitions.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::warn;

use super::policy::{BestProviderCoverage, CompetitionCoveragePolicy};
use super::types::{round_money, CombinationResult, CompetitionDetail, CoverageError};
use crate::catalog::{CompetitionId, CompetitionInfo, Provider, ProviderId};

/// Evaluates combinations against a fixed set of competition details.
///
/// Pure: evaluation reads only the providers passed in and the details held
/// here, so one evaluator can be shared across worker threads.
#[derive(Debug, Clone)]
pub struct CoverageEvaluator {
    details: HashMap<CompetitionId, CompetitionInfo>,
    policy: Arc<dyn CompetitionCoveragePolicy>,
}

impl CoverageEvaluator {
    /// Create an evaluator using the best-provider coverage policy.
    ///
    /// Competitions in `required` without details get a placeholder (name =
    /// id, 0 games) and a warning, once, here rather than per evaluation.
    pub fn new(
        details: HashMap<CompetitionId, CompetitionInfo>,
        required: &BTreeSet<CompetitionId>,
    ) -> Self {
        Self::with_policy(details, required, Arc::new(BestProviderCoverage))
    }

    /// Create an evaluator with a custom per-competition coverage policy.
    pub fn with_policy(
        mut details: HashMap<CompetitionId, CompetitionInfo>,
        required: &BTreeSet<CompetitionId>,
        policy: Arc<dyn CompetitionCoveragePolicy>,
    ) -> Self {
        for id in required {
            details.entry(*id).or_insert_with(|| {
                warn!(competition_id = id, "No details for competition, using id as name");
                placeholder_info(*id)
            });
        }
        Self { details, policy }
    }

    /// Name of the active coverage policy.
    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Evaluate `providers` as one combination.
    pub fn evaluate<'a, I>(
        &self,
        providers: I,
        required: &BTreeSet<CompetitionId>,
    ) -> Result<CombinationResult, CoverageError>
    where
        I: IntoIterator<Item = &'a Provider>,
    {
        if required.is_empty() {
            return Err(CoverageError::EmptyRequirement);
        }

        let providers: Vec<&Provider> = providers.into_iter().collect();
        let total_cost: Decimal = providers.iter().map(|p| p.monthly_price).sum();

        let mut competition_details = Vec::new();
        let mut missing_competitions = Vec::new();

        for competition_id in required {
            if providers.iter().any(|p| p.covers(*competition_id)) {
                let pct = self.policy.competition_coverage(&providers, *competition_id);
                competition_details.push(self.detail(*competition_id, pct));
            } else {
                missing_competitions.push(self.detail(*competition_id, 0));
            }
        }

        let covered = competition_details.len();

        Ok(CombinationResult {
            providers: providers.into_iter().cloned().collect(),
            total_cost: round_money(total_cost),
            coverage_percentage: coverage_percentage(covered, required.len()),
            covered_competitions: covered,
            total_competitions: required.len(),
            competition_details,
            missing_competitions,
            owned_provider_ids: Vec::new(),
            target_coverage: None,
        })
    }

    /// Fold already-owned providers into `result`.
    ///
    /// Coverage is recomputed over the union of both provider sets; the cost
    /// stays that of `result`, since owned providers add no marginal spend.
    pub fn merge_owned(
        &self,
        result: &CombinationResult,
        owned: &[Provider],
        required: &BTreeSet<CompetitionId>,
    ) -> Result<CombinationResult, CoverageError> {
        if owned.is_empty() {
            return Ok(result.clone());
        }

        let result_ids: Vec<ProviderId> = result.provider_ids();
        let combined: Vec<&Provider> = owned
            .iter()
            .filter(|p| !result_ids.contains(&p.id))
            .chain(result.providers.iter())
            .collect();

        let merged = self.evaluate(combined, required)?;

        Ok(CombinationResult {
            total_cost: result.total_cost,
            owned_provider_ids: owned.iter().map(|p| p.id).collect(),
            target_coverage: result.target_coverage,
            ..merged
        })
    }

    fn detail(&self, competition_id: CompetitionId, coverage_percentage: u8) -> CompetitionDetail {
        let info = self
            .details
            .get(&competition_id)
            .cloned()
            .unwrap_or_else(|| placeholder_info(competition_id));

        CompetitionDetail {
            competition_id,
            competition_name: info.name,
            coverage_percentage,
            total_games: info.total_games,
            covered_games: covered_games(info.total_games, coverage_percentage),
        }
    }
}

fn placeholder_info(competition_id: CompetitionId) -> CompetitionInfo {
    CompetitionInfo {
        name: competition_id.to_string(),
        total_games: 0,
    }
}

/// `round(100 * covered / total)`, halves rounded up. `total` must be non-zero.
fn coverage_percentage(covered: usize, total: usize) -> u8 {
    let covered = covered.min(total) as u64;
    let total = total as u64;
    let pct = (200 * covered + total) / (2 * total);
    u8::try_from(pct).unwrap_or(100)
}

/// `round(total_games * pct / 100)`, halves rounded up.
fn covered_games(total_games: u32, coverage_percentage: u8) -> u32 {
    let games = (2 * u64::from(total_games) * u64::from(coverage_percentage) + 100) / 200;
    u32::try_from(games).unwrap_or(total_games)
}
