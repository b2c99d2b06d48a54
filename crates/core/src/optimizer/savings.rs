//! Savings estimate against a user's current subscriptions.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{Provider, ProviderId};
use crate::coverage::{round_money, CombinationResult};

/// What switching to the recommended combination would save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingsEstimate {
    pub current_provider_ids: Vec<ProviderId>,
    pub current_monthly_cost: Decimal,
    pub target_coverage: u8,
    /// Cheapest combination reaching the target, if any does.
    pub recommendation: Option<CombinationResult>,
    pub recommended_monthly_cost: Option<Decimal>,
    /// Never negative: switching to something pricier saves nothing.
    pub monthly_savings: Decimal,
    pub yearly_savings: Decimal,
}

impl SavingsEstimate {
    pub fn compute(
        current: &[Provider],
        target_coverage: u8,
        recommendation: Option<CombinationResult>,
    ) -> Self {
        let current_monthly_cost = round_money(current.iter().map(|p| p.monthly_price).sum());
        let recommended_monthly_cost = recommendation.as_ref().map(|r| r.full_monthly_cost());

        let monthly_savings = recommended_monthly_cost
            .map(|recommended| (current_monthly_cost - recommended).max(Decimal::ZERO))
            .unwrap_or(Decimal::ZERO);

        Self {
            current_provider_ids: current.iter().map(|p| p.id).collect(),
            current_monthly_cost,
            target_coverage,
            recommendation,
            recommended_monthly_cost,
            monthly_savings,
            yearly_savings: monthly_savings * Decimal::from(12),
        }
    }
}
