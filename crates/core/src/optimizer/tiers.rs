//! Recommendation tiers picked from a ranked enumeration.

use serde::{Deserialize, Serialize};

use crate::coverage::CombinationResult;

/// Minimum coverage for the "best value" tier.
pub const BEST_VALUE_MIN_COVERAGE: u8 = 90;

/// Minimum coverage for the "budget" tier.
pub const BUDGET_MIN_COVERAGE: u8 = 66;

/// Three headline picks for presenting results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationTiers {
    /// Highest coverage, cheapest among equals.
    pub best_overall: Option<CombinationResult>,
    /// Cheapest combination with at least 90% coverage.
    pub best_value: Option<CombinationResult>,
    /// Cheapest combination with at least 66% coverage.
    pub budget: Option<CombinationResult>,
}

impl RecommendationTiers {
    /// Pick tiers from an optimizer result sequence.
    ///
    /// Only the ranked enumeration part (entries without a target) is
    /// considered. Ties on cost keep the earlier ranked entry.
    pub fn from_results(results: &[CombinationResult]) -> Self {
        let ranked: Vec<&CombinationResult> = results
            .iter()
            .filter(|r| r.target_coverage.is_none())
            .collect();

        let cheapest_meeting = |min: u8| {
            ranked
                .iter()
                .filter(|r| r.meets(min))
                .min_by_key(|r| r.total_cost)
                .map(|r| (*r).clone())
        };

        Self {
            best_overall: ranked.first().map(|r| (*r).clone()),
            best_value: cheapest_meeting(BEST_VALUE_MIN_COVERAGE),
            budget: cheapest_meeting(BUDGET_MIN_COVERAGE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn result(coverage: u8, cost: i64, target: Option<u8>) -> CombinationResult {
        CombinationResult {
            providers: Vec::new(),
            total_cost: Decimal::from(cost),
            coverage_percentage: coverage,
            covered_competitions: 0,
            total_competitions: 3,
            competition_details: Vec::new(),
            missing_competitions: Vec::new(),
            owned_provider_ids: Vec::new(),
            target_coverage: target,
        }
    }

    #[test]
    fn test_tiers_from_ranked() {
        let results = vec![
            result(100, 1, Some(100)),
            result(100, 75, None),
            result(92, 40, None),
            result(90, 50, None),
            result(67, 30, None),
            result(33, 10, None),
        ];

        let tiers = RecommendationTiers::from_results(&results);

        assert_eq!(tiers.best_overall.unwrap().total_cost, Decimal::from(75));
        assert_eq!(tiers.best_value.unwrap().total_cost, Decimal::from(40));
        assert_eq!(tiers.budget.unwrap().total_cost, Decimal::from(30));
    }

    #[test]
    fn test_tiers_missing_when_nothing_qualifies() {
        let results = vec![result(50, 10, None)];
        let tiers = RecommendationTiers::from_results(&results);

        assert!(tiers.best_overall.is_some());
        assert!(tiers.best_value.is_none());
        assert!(tiers.budget.is_none());
    }

    #[test]
    fn test_tiers_empty() {
        assert_eq!(
            RecommendationTiers::from_results(&[]),
            RecommendationTiers::default()
        );
    }
}
