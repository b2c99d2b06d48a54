//! Types for the sports/streaming catalog.
//!
//! Two layers live here: the strict domain types the optimizer works with
//! (`Club`, `Competition`, `Provider`) and the loosely typed `*Record` types
//! that arrive from imports. Records are coerced into domain types at the
//! catalog boundary and never reach the optimizer.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use super::price::normalize_price;

pub type ClubId = i64;
pub type CompetitionId = i64;
pub type ProviderId = i64;

/// A football club a viewer can follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Club {
    pub id: ClubId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Competitions this club plays in.
    #[serde(default)]
    pub competition_ids: Vec<CompetitionId>,
}

/// A league, cup or tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competition {
    pub id: CompetitionId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Games in the current season.
    pub total_games: u32,
}

/// The slice of competition data the coverage evaluator needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitionInfo {
    pub name: String,
    pub total_games: u32,
}

/// A streaming provider with its per-competition coverage.
///
/// `coverage` only ever holds percentages in `1..=100`; a competition that is
/// not offered is absent from the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    /// Monthly price, currency-agnostic.
    pub monthly_price: Decimal,
    /// Competition id -> coverage percentage.
    pub coverage: BTreeMap<CompetitionId, u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliate_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

impl Provider {
    /// Coverage percentage for a competition, 0 when not offered.
    pub fn coverage_for(&self, competition_id: CompetitionId) -> u8 {
        self.coverage.get(&competition_id).copied().unwrap_or(0)
    }

    /// Whether this provider broadcasts any games of the competition.
    pub fn covers(&self, competition_id: CompetitionId) -> bool {
        self.coverage_for(competition_id) > 0
    }

    /// A copy whose coverage map is limited to `competitions`.
    ///
    /// Returns `None` when nothing of `competitions` is covered, since such a
    /// provider is never a candidate.
    pub fn restricted_to(&self, competitions: &BTreeSet<CompetitionId>) -> Option<Provider> {
        let coverage: BTreeMap<CompetitionId, u8> = self
            .coverage
            .iter()
            .filter(|(id, pct)| **pct > 0 && competitions.contains(id))
            .map(|(id, pct)| (*id, *pct))
            .collect();

        if coverage.is_empty() {
            return None;
        }

        Some(Provider {
            coverage,
            ..self.clone()
        })
    }
}

// ============================================================================
// Boundary records
// ============================================================================

/// A club as it arrives in a catalog snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClubRecord {
    pub id: ClubId,
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub competition_ids: Vec<CompetitionId>,
}

/// A competition as it arrives in a catalog snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitionRecord {
    pub id: CompetitionId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub total_games: Option<i64>,
}

/// One provider/competition coverage row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageRecord {
    pub competition_id: CompetitionId,
    pub coverage_percentage: i64,
}

/// A provider as it arrives in a catalog snapshot. Prices are free-form text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub id: ProviderId,
    pub name: String,
    #[serde(default)]
    pub monthly_price: String,
    #[serde(default)]
    pub affiliate_url: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub coverage: Vec<CoverageRecord>,
}

/// A full catalog export, used to seed or refresh a catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub clubs: Vec<ClubRecord>,
    #[serde(default)]
    pub competitions: Vec<CompetitionRecord>,
    #[serde(default)]
    pub providers: Vec<ProviderRecord>,
}

impl CompetitionRecord {
    /// Coerce into a domain competition.
    ///
    /// A missing or blank name falls back to the numeric id; a missing or
    /// negative game count becomes 0.
    pub fn into_competition(self) -> Competition {
        let name = match self.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => {
                warn!(competition_id = self.id, "Competition has no name, using id");
                self.id.to_string()
            }
        };

        let total_games = match self.total_games {
            Some(games) if games >= 0 => u32::try_from(games).unwrap_or(u32::MAX),
            Some(games) => {
                warn!(
                    competition_id = self.id,
                    total_games = games,
                    "Negative game count, treating as 0"
                );
                0
            }
            None => 0,
        };

        Competition {
            id: self.id,
            name,
            country: self.country,
            total_games,
        }
    }
}

/// Clamp a raw coverage value into `0..=100`, warning when it was out of range.
pub fn clamp_coverage(provider_id: ProviderId, competition_id: CompetitionId, raw: i64) -> u8 {
    if !(0..=100).contains(&raw) {
        warn!(
            provider_id,
            competition_id,
            coverage_percentage = raw,
            "Coverage percentage out of range, clamping"
        );
    }
    u8::try_from(raw.clamp(0, 100)).unwrap_or(0)
}

impl ProviderRecord {
    /// Coerce into a domain provider.
    ///
    /// Malformed prices become 0 (with a warning) and zero-coverage rows are
    /// dropped. The provider itself is always kept.
    pub fn into_provider(self) -> Provider {
        let monthly_price = normalize_price(&self.monthly_price, self.id);
        let id = self.id;

        let coverage = self
            .coverage
            .iter()
            .map(|c| {
                (
                    c.competition_id,
                    clamp_coverage(id, c.competition_id, c.coverage_percentage),
                )
            })
            .filter(|(_, pct)| *pct > 0)
            .collect();

        Provider {
            id,
            name: self.name,
            monthly_price,
            coverage,
            affiliate_url: self.affiliate_url,
            features: self.features,
        }
    }
}

/// Summary returned after importing a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub clubs: usize,
    pub competitions: usize,
    pub providers: usize,
    pub coverage_rows: usize,
    /// SHA-256 of the imported snapshot, identifies the catalog version.
    pub fingerprint: String,
    pub imported_at: chrono::DateTime<chrono::Utc>,
}

/// Errors for catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid catalog record: {0}")]
    InvalidRecord(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(coverage: &[(CompetitionId, u8)]) -> Provider {
        Provider {
            id: 1,
            name: "Sky".to_string(),
            monthly_price: Decimal::new(2999, 2),
            coverage: coverage.iter().copied().collect(),
            affiliate_url: None,
            features: Vec::new(),
        }
    }

    #[test]
    fn test_coverage_for_missing_is_zero() {
        let p = provider(&[(1, 100)]);
        assert_eq!(p.coverage_for(1), 100);
        assert_eq!(p.coverage_for(2), 0);
        assert!(p.covers(1));
        assert!(!p.covers(2));
    }

    #[test]
    fn test_restricted_to_keeps_only_requested() {
        let p = provider(&[(1, 100), (2, 50), (3, 20)]);
        let wanted: BTreeSet<CompetitionId> = [2, 3, 9].into_iter().collect();

        let restricted = p.restricted_to(&wanted).unwrap();
        assert_eq!(restricted.coverage.len(), 2);
        assert_eq!(restricted.coverage_for(1), 0);
        assert_eq!(restricted.coverage_for(2), 50);
    }

    #[test]
    fn test_restricted_to_none_when_nothing_covered() {
        let p = provider(&[(1, 100)]);
        let wanted: BTreeSet<CompetitionId> = [5].into_iter().collect();
        assert!(p.restricted_to(&wanted).is_none());
    }

    #[test]
    fn test_competition_record_missing_name_uses_id() {
        let record = CompetitionRecord {
            id: 42,
            name: Some("   ".to_string()),
            country: None,
            total_games: None,
        };
        let competition = record.into_competition();
        assert_eq!(competition.name, "42");
        assert_eq!(competition.total_games, 0);
    }

    #[test]
    fn test_competition_record_negative_games() {
        let record = CompetitionRecord {
            id: 1,
            name: Some("Bundesliga".to_string()),
            country: Some("DE".to_string()),
            total_games: Some(-4),
        };
        assert_eq!(record.into_competition().total_games, 0);
    }

    #[test]
    fn test_provider_record_coercion() {
        let record = ProviderRecord {
            id: 7,
            name: "DAZN".to_string(),
            monthly_price: "€44,99".to_string(),
            affiliate_url: None,
            features: vec!["4K".to_string()],
            coverage: vec![
                CoverageRecord {
                    competition_id: 1,
                    coverage_percentage: 0,
                },
                CoverageRecord {
                    competition_id: 2,
                    coverage_percentage: 85,
                },
                CoverageRecord {
                    competition_id: 3,
                    coverage_percentage: 140,
                },
            ],
        };

        let provider = record.into_provider();
        assert_eq!(provider.monthly_price, Decimal::new(4499, 2));
        assert_eq!(provider.coverage.len(), 2);
        assert_eq!(provider.coverage_for(2), 85);
        assert_eq!(provider.coverage_for(3), 100);
        assert_eq!(provider.features, vec!["4K".to_string()]);
    }

    #[test]
    fn test_provider_record_bad_price_is_kept() {
        let record = ProviderRecord {
            id: 3,
            name: "Mystery".to_string(),
            monthly_price: "call us".to_string(),
            affiliate_url: None,
            features: Vec::new(),
            coverage: vec![CoverageRecord {
                competition_id: 1,
                coverage_percentage: 10,
            }],
        };

        let provider = record.into_provider();
        assert_eq!(provider.monthly_price, Decimal::ZERO);
        assert_eq!(provider.name, "Mystery");
    }

    #[test]
    fn test_snapshot_deserializes_with_defaults() {
        let json = r#"{"providers": [{"id": 1, "name": "Sky"}]}"#;
        let snapshot: CatalogSnapshot = serde_json::from_str(json).unwrap();
        assert!(snapshot.clubs.is_empty());
        assert_eq!(snapshot.providers.len(), 1);
        assert_eq!(snapshot.providers[0].monthly_price, "");
    }
}
