//! Read-only sports and streaming catalog.
//!
//! The catalog answers the three questions the optimizer needs: which
//! competitions a set of clubs plays in, which providers cover those
//! competitions, and how many games each competition has. It also exposes
//! browse queries for the API.

mod price;
mod sqlite;
mod types;

pub use price::{normalize_price, parse_price};
pub use sqlite::SqliteCatalog;
pub use types::*;

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;

/// Trait for catalog access.
///
/// Implementations must return providers in a stable catalog order (ascending
/// provider id); the optimizer relies on it for deterministic tie-breaks.
#[async_trait]
pub trait CatalogAccessor: Send + Sync {
    /// Distinct competitions played by any of the given clubs.
    async fn required_competitions_for_clubs(
        &self,
        club_ids: &[ClubId],
    ) -> Result<BTreeSet<CompetitionId>, CatalogError>;

    /// Providers with non-zero coverage in at least one of the competitions.
    ///
    /// Each provider's coverage map is restricted to the queried competitions.
    async fn providers_covering_competitions(
        &self,
        competition_ids: &BTreeSet<CompetitionId>,
    ) -> Result<Vec<Provider>, CatalogError>;

    /// Name and game count for each known competition.
    async fn competition_details(
        &self,
        competition_ids: &BTreeSet<CompetitionId>,
    ) -> Result<HashMap<CompetitionId, CompetitionInfo>, CatalogError>;

    /// All clubs, ordered by id.
    async fn list_clubs(&self) -> Result<Vec<Club>, CatalogError>;

    /// All competitions, ordered by id.
    async fn list_competitions(&self) -> Result<Vec<Competition>, CatalogError>;

    /// All providers with their full coverage maps, ordered by id.
    async fn list_providers(&self) -> Result<Vec<Provider>, CatalogError>;
}
