//! Mock catalog for testing.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::{
    CatalogAccessor, CatalogError, CatalogSnapshot, Club, ClubId, Competition, CompetitionId,
    CompetitionInfo, Provider, ProviderRecord,
};

/// A catalog query recorded for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogCall {
    RequiredCompetitions(Vec<ClubId>),
    ProvidersCovering(BTreeSet<CompetitionId>),
    CompetitionDetails(BTreeSet<CompetitionId>),
    ListClubs,
    ListCompetitions,
    ListProviders,
}

/// Mock implementation of the `CatalogAccessor` trait.
///
/// Serves queries from an in-memory `CatalogSnapshot` and provides:
/// - Recorded calls for asserting cache hits and call order
/// - A one-shot injected error, or a persistent outage
///
/// # Example
///
/// ```rust,ignore
/// use fanpass_core::testing::{MockCatalog, fixtures};
///
/// let catalog = MockCatalog::with_snapshot(fixtures::german_football_snapshot());
/// catalog.set_unavailable(true).await;
///
/// let result = catalog.list_clubs().await;
/// assert!(matches!(result, Err(CatalogError::Unavailable(_))));
/// ```
pub struct MockCatalog {
    snapshot: Arc<RwLock<CatalogSnapshot>>,
    calls: Arc<RwLock<Vec<CatalogCall>>>,
    next_error: Arc<RwLock<Option<CatalogError>>>,
    unavailable: Arc<RwLock<bool>>,
}

impl std::fmt::Debug for MockCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCatalog")
            .field("snapshot", &"<snapshot>")
            .field("calls", &"<calls>")
            .finish()
    }
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalog {
    /// Create an empty mock catalog.
    pub fn new() -> Self {
        Self::with_snapshot(CatalogSnapshot::default())
    }

    /// Create a mock catalog serving `snapshot`.
    pub fn with_snapshot(snapshot: CatalogSnapshot) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(snapshot)),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            unavailable: Arc::new(RwLock::new(false)),
        }
    }

    /// Replace the served snapshot.
    pub async fn set_snapshot(&self, snapshot: CatalogSnapshot) {
        *self.snapshot.write().await = snapshot;
    }

    /// Make the next query fail with `error`.
    pub async fn set_next_error(&self, error: CatalogError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every query fail with `CatalogError::Unavailable` until reset.
    pub async fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().await = unavailable;
    }

    /// Get recorded calls.
    pub async fn recorded_calls(&self) -> Vec<CatalogCall> {
        self.calls.read().await.clone()
    }

    /// Number of recorded calls.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Clear recorded calls.
    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    async fn record(&self, call: CatalogCall) -> Result<(), CatalogError> {
        self.calls.write().await.push(call);

        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        if *self.unavailable.read().await {
            return Err(CatalogError::Unavailable("mock catalog offline".to_string()));
        }
        Ok(())
    }

    fn providers_from(records: &[ProviderRecord]) -> Vec<Provider> {
        let mut providers: Vec<Provider> = records
            .iter()
            .cloned()
            .map(ProviderRecord::into_provider)
            .collect();
        providers.sort_by_key(|p| p.id);
        providers
    }
}

#[async_trait]
impl CatalogAccessor for MockCatalog {
    async fn required_competitions_for_clubs(
        &self,
        club_ids: &[ClubId],
    ) -> Result<BTreeSet<CompetitionId>, CatalogError> {
        self.record(CatalogCall::RequiredCompetitions(club_ids.to_vec()))
            .await?;

        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .clubs
            .iter()
            .filter(|c| club_ids.contains(&c.id))
            .flat_map(|c| c.competition_ids.iter().copied())
            .collect())
    }

    async fn providers_covering_competitions(
        &self,
        competition_ids: &BTreeSet<CompetitionId>,
    ) -> Result<Vec<Provider>, CatalogError> {
        self.record(CatalogCall::ProvidersCovering(competition_ids.clone()))
            .await?;

        let snapshot = self.snapshot.read().await;
        Ok(Self::providers_from(&snapshot.providers)
            .iter()
            .filter_map(|p| p.restricted_to(competition_ids))
            .collect())
    }

    async fn competition_details(
        &self,
        competition_ids: &BTreeSet<CompetitionId>,
    ) -> Result<HashMap<CompetitionId, CompetitionInfo>, CatalogError> {
        self.record(CatalogCall::CompetitionDetails(competition_ids.clone()))
            .await?;

        let snapshot = self.snapshot.read().await;
        Ok(snapshot
            .competitions
            .iter()
            .filter(|c| competition_ids.contains(&c.id))
            .cloned()
            .map(|record| {
                let competition = record.into_competition();
                (
                    competition.id,
                    CompetitionInfo {
                        name: competition.name,
                        total_games: competition.total_games,
                    },
                )
            })
            .collect())
    }

    async fn list_clubs(&self) -> Result<Vec<Club>, CatalogError> {
        self.record(CatalogCall::ListClubs).await?;

        let snapshot = self.snapshot.read().await;
        let mut clubs: Vec<Club> = snapshot
            .clubs
            .iter()
            .map(|c| Club {
                id: c.id,
                name: c.name.clone(),
                country: c.country.clone(),
                competition_ids: c.competition_ids.clone(),
            })
            .collect();
        clubs.sort_by_key(|c| c.id);
        Ok(clubs)
    }

    async fn list_competitions(&self) -> Result<Vec<Competition>, CatalogError> {
        self.record(CatalogCall::ListCompetitions).await?;

        let snapshot = self.snapshot.read().await;
        let mut competitions: Vec<Competition> = snapshot
            .competitions
            .iter()
            .cloned()
            .map(|c| c.into_competition())
            .collect();
        competitions.sort_by_key(|c| c.id);
        Ok(competitions)
    }

    async fn list_providers(&self) -> Result<Vec<Provider>, CatalogError> {
        self.record(CatalogCall::ListProviders).await?;

        let snapshot = self.snapshot.read().await;
        Ok(Self::providers_from(&snapshot.providers))
    }
}
