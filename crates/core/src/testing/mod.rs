//! Testing utilities and mock implementations.
//!
//! Provides a controllable in-memory catalog and canned catalog snapshots so
//! optimizer and API tests run without a database.
//!
//! # Example
//!
//! ```rust,ignore
//! use fanpass_core::testing::{MockCatalog, fixtures};
//!
//! let catalog = Arc::new(MockCatalog::with_snapshot(fixtures::german_football_snapshot()));
//! let optimizer = Optimizer::new(catalog, Arc::new(ResultCache::new()), OptimizerConfig::default());
//! ```

mod mock_catalog;

pub use mock_catalog::{CatalogCall, MockCatalog};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::BTreeSet;

    use rust_decimal::Decimal;

    use crate::catalog::{
        CatalogSnapshot, ClubId, ClubRecord, CompetitionId, CompetitionRecord, CoverageRecord,
        Provider, ProviderId, ProviderRecord,
    };

    pub const BUNDESLIGA: CompetitionId = 1;
    pub const CHAMPIONS_LEAGUE: CompetitionId = 2;
    pub const DFB_POKAL: CompetitionId = 3;
    pub const PREMIER_LEAGUE: CompetitionId = 4;

    pub const BAYERN: ClubId = 10;
    pub const DORTMUND: ClubId = 11;
    pub const FREIBURG: ClubId = 12;
    pub const ARSENAL: ClubId = 13;

    pub const SKY: ProviderId = 1;
    pub const DAZN: ProviderId = 2;
    pub const PRIME_VIDEO: ProviderId = 3;
    pub const ARD_ZDF: ProviderId = 4;
    pub const CANAL_PLUS: ProviderId = 5;

    /// Build a provider directly, bypassing record coercion.
    pub fn provider(
        id: ProviderId,
        name: &str,
        price_cents: i64,
        coverage: &[(CompetitionId, u8)],
    ) -> Provider {
        Provider {
            id,
            name: name.to_string(),
            monthly_price: Decimal::new(price_cents, 2),
            coverage: coverage.iter().copied().collect(),
            affiliate_url: None,
            features: Vec::new(),
        }
    }

    /// A set of competition ids.
    pub fn competitions(ids: &[CompetitionId]) -> BTreeSet<CompetitionId> {
        ids.iter().copied().collect()
    }

    fn competition(id: CompetitionId, name: &str, country: &str, games: i64) -> CompetitionRecord {
        CompetitionRecord {
            id,
            name: Some(name.to_string()),
            country: Some(country.to_string()),
            total_games: Some(games),
        }
    }

    fn club(id: ClubId, name: &str, country: &str, competitions: &[CompetitionId]) -> ClubRecord {
        ClubRecord {
            id,
            name: name.to_string(),
            country: Some(country.to_string()),
            competition_ids: competitions.to_vec(),
        }
    }

    fn provider_record(
        id: ProviderId,
        name: &str,
        price: &str,
        features: &[&str],
        coverage: &[(CompetitionId, i64)],
    ) -> ProviderRecord {
        ProviderRecord {
            id,
            name: name.to_string(),
            monthly_price: price.to_string(),
            affiliate_url: None,
            features: features.iter().map(|f| f.to_string()).collect(),
            coverage: coverage
                .iter()
                .map(|(competition_id, pct)| CoverageRecord {
                    competition_id: *competition_id,
                    coverage_percentage: *pct,
                })
                .collect(),
        }
    }

    /// Four competitions, four clubs and five providers with free-form prices.
    ///
    /// For Bayern (Bundesliga, Champions League, DFB-Pokal) no single provider
    /// reaches 100%; the cheapest full pair is Sky + Prime Video at 38.98.
    pub fn german_football_snapshot() -> CatalogSnapshot {
        CatalogSnapshot {
            competitions: vec![
                competition(BUNDESLIGA, "Bundesliga", "DE", 306),
                competition(CHAMPIONS_LEAGUE, "UEFA Champions League", "EU", 189),
                competition(DFB_POKAL, "DFB-Pokal", "DE", 63),
                competition(PREMIER_LEAGUE, "Premier League", "EN", 380),
            ],
            clubs: vec![
                club(BAYERN, "FC Bayern München", "DE", &[BUNDESLIGA, CHAMPIONS_LEAGUE, DFB_POKAL]),
                club(DORTMUND, "Borussia Dortmund", "DE", &[BUNDESLIGA, CHAMPIONS_LEAGUE, DFB_POKAL]),
                club(FREIBURG, "SC Freiburg", "DE", &[BUNDESLIGA, DFB_POKAL]),
                club(ARSENAL, "Arsenal FC", "EN", &[PREMIER_LEAGUE, CHAMPIONS_LEAGUE]),
            ],
            providers: vec![
                provider_record(SKY, "Sky", "29,99 €", &["Konferenz"], &[(BUNDESLIGA, 75), (DFB_POKAL, 50)]),
                provider_record(DAZN, "DAZN", "€44.99", &[], &[(BUNDESLIGA, 25), (CHAMPIONS_LEAGUE, 85)]),
                provider_record(PRIME_VIDEO, "Amazon Prime Video", "8.99", &[], &[(CHAMPIONS_LEAGUE, 10)]),
                provider_record(ARD_ZDF, "ARD/ZDF", "18,36", &["Free-TV"], &[(DFB_POKAL, 50)]),
                provider_record(CANAL_PLUS, "Canal+", "€24.99", &[], &[(PREMIER_LEAGUE, 100)]),
            ],
        }
    }

    /// Two competitions covered by Sky (both, 30) and DAZN (Champions League, 45).
    pub fn two_competition_snapshot() -> CatalogSnapshot {
        CatalogSnapshot {
            competitions: vec![
                competition(BUNDESLIGA, "Bundesliga", "DE", 306),
                competition(CHAMPIONS_LEAGUE, "UEFA Champions League", "EU", 189),
            ],
            clubs: vec![club(BAYERN, "FC Bayern München", "DE", &[BUNDESLIGA, CHAMPIONS_LEAGUE])],
            providers: vec![
                provider_record(SKY, "Sky", "30", &[], &[(BUNDESLIGA, 100), (CHAMPIONS_LEAGUE, 100)]),
                provider_record(DAZN, "DAZN", "45", &[], &[(CHAMPIONS_LEAGUE, 85)]),
            ],
        }
    }
}
