//! SQLite-backed catalog implementation.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, ErrorCode};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::metrics;

use super::{
    CatalogAccessor, CatalogError, CatalogSnapshot, Club, ClubId, Competition, CompetitionId,
    CompetitionInfo, CompetitionRecord, CoverageRecord, ImportSummary, Provider, ProviderId,
    ProviderRecord,
};

/// SQLite-backed catalog.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

/// A provider joined with at most one of its coverage rows.
struct ProviderRow {
    id: ProviderId,
    name: String,
    monthly_price: String,
    affiliate_url: Option<String>,
    features: String,
    competition_id: Option<CompetitionId>,
    coverage_percentage: Option<i64>,
}

impl SqliteCatalog {
    /// Create a new SQLite catalog, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path).map_err(db_error)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite catalog (useful for testing).
    pub fn in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory().map_err(db_error)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CatalogError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS competitions (
                competition_id INTEGER PRIMARY KEY,
                name TEXT,
                country TEXT,
                total_games INTEGER
            );

            CREATE TABLE IF NOT EXISTS clubs (
                club_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                country TEXT
            );

            CREATE TABLE IF NOT EXISTS club_competitions (
                club_id INTEGER NOT NULL REFERENCES clubs(club_id) ON DELETE CASCADE,
                competition_id INTEGER NOT NULL REFERENCES competitions(competition_id) ON DELETE CASCADE,
                PRIMARY KEY (club_id, competition_id)
            );

            -- Prices are stored as imported and normalized on read
            CREATE TABLE IF NOT EXISTS providers (
                provider_id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                monthly_price TEXT NOT NULL DEFAULT '',
                affiliate_url TEXT,
                features TEXT NOT NULL DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS provider_coverage (
                provider_id INTEGER NOT NULL REFERENCES providers(provider_id) ON DELETE CASCADE,
                competition_id INTEGER NOT NULL REFERENCES competitions(competition_id) ON DELETE CASCADE,
                coverage_percentage INTEGER NOT NULL,
                PRIMARY KEY (provider_id, competition_id)
            );

            CREATE INDEX IF NOT EXISTS idx_provider_coverage_competition
                ON provider_coverage(competition_id);
            CREATE INDEX IF NOT EXISTS idx_club_competitions_club
                ON club_competitions(club_id);
            "#,
        )
        .map_err(db_error)?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn
            .lock()
            .map_err(|_| CatalogError::Unavailable("catalog connection lock poisoned".to_string()))
    }

    /// Replace the whole catalog with `snapshot`.
    ///
    /// The snapshot is validated first (unique ids, no dangling competition
    /// references) and written in a single transaction, so a rejected import
    /// leaves the previous catalog untouched.
    pub fn import(&self, snapshot: &CatalogSnapshot) -> Result<ImportSummary, CatalogError> {
        let result = self.write_snapshot(snapshot);
        let label = if result.is_ok() { "success" } else { "failure" };
        metrics::CATALOG_IMPORTS.with_label_values(&[label]).inc();
        result
    }

    fn write_snapshot(&self, snapshot: &CatalogSnapshot) -> Result<ImportSummary, CatalogError> {
        validate_snapshot(snapshot)?;

        let fingerprint = {
            let bytes = serde_json::to_vec(snapshot)
                .map_err(|e| CatalogError::InvalidRecord(e.to_string()))?;
            format!("{:x}", Sha256::digest(&bytes))
        };

        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(db_error)?;

        tx.execute_batch(
            "DELETE FROM provider_coverage;
             DELETE FROM club_competitions;
             DELETE FROM providers;
             DELETE FROM clubs;
             DELETE FROM competitions;",
        )
        .map_err(db_error)?;

        for competition in &snapshot.competitions {
            tx.execute(
                "INSERT INTO competitions (competition_id, name, country, total_games) VALUES (?, ?, ?, ?)",
                params![
                    competition.id,
                    &competition.name,
                    &competition.country,
                    competition.total_games
                ],
            )
            .map_err(db_error)?;
        }

        for club in &snapshot.clubs {
            tx.execute(
                "INSERT INTO clubs (club_id, name, country) VALUES (?, ?, ?)",
                params![club.id, &club.name, &club.country],
            )
            .map_err(db_error)?;

            for competition_id in &club.competition_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO club_competitions (club_id, competition_id) VALUES (?, ?)",
                    params![club.id, competition_id],
                )
                .map_err(db_error)?;
            }
        }

        let mut coverage_rows = 0;
        for provider in &snapshot.providers {
            let features = serde_json::to_string(&provider.features)
                .map_err(|e| CatalogError::InvalidRecord(e.to_string()))?;

            tx.execute(
                "INSERT INTO providers (provider_id, name, monthly_price, affiliate_url, features)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    provider.id,
                    &provider.name,
                    &provider.monthly_price,
                    &provider.affiliate_url,
                    &features,
                ],
            )
            .map_err(db_error)?;

            for coverage in &provider.coverage {
                tx.execute(
                    "INSERT INTO provider_coverage (provider_id, competition_id, coverage_percentage)
                     VALUES (?, ?, ?)
                     ON CONFLICT(provider_id, competition_id) DO UPDATE SET
                        coverage_percentage = excluded.coverage_percentage",
                    params![
                        provider.id,
                        coverage.competition_id,
                        coverage.coverage_percentage
                    ],
                )
                .map_err(db_error)?;
                coverage_rows += 1;
            }
        }

        tx.commit()
            .map_err(db_error)?;

        let summary = ImportSummary {
            clubs: snapshot.clubs.len(),
            competitions: snapshot.competitions.len(),
            providers: snapshot.providers.len(),
            coverage_rows,
            fingerprint,
            imported_at: Utc::now(),
        };

        info!(
            clubs = summary.clubs,
            competitions = summary.competitions,
            providers = summary.providers,
            fingerprint = %summary.fingerprint,
            "Catalog imported"
        );

        Ok(summary)
    }

    fn query_provider_rows(
        conn: &Connection,
        sql: &str,
        ids: &[CompetitionId],
    ) -> Result<Vec<ProviderRow>, CatalogError> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(db_error)?;

        let rows = stmt
            .query_map(params_from_iter(ids.iter()), |row| {
                Ok(ProviderRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    monthly_price: row.get(2)?,
                    affiliate_url: row.get(3)?,
                    features: row.get(4)?,
                    competition_id: row.get(5)?,
                    coverage_percentage: row.get(6)?,
                })
            })
            .map_err(db_error)?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row.map_err(db_error)?);
        }
        Ok(result)
    }
}

/// Fold joined rows (ordered by provider id) into providers.
fn collect_providers(rows: Vec<ProviderRow>) -> Vec<Provider> {
    let mut records: Vec<ProviderRecord> = Vec::new();

    for row in rows {
        let same_provider = records.last().is_some_and(|r| r.id == row.id);
        if !same_provider {
            let features = serde_json::from_str(&row.features).unwrap_or_else(|e| {
                warn!(provider_id = row.id, error = %e, "Malformed provider features, ignoring");
                Vec::new()
            });
            records.push(ProviderRecord {
                id: row.id,
                name: row.name,
                monthly_price: row.monthly_price,
                affiliate_url: row.affiliate_url,
                features,
                coverage: Vec::new(),
            });
        }

        if let (Some(competition_id), Some(coverage_percentage), Some(record)) =
            (row.competition_id, row.coverage_percentage, records.last_mut())
        {
            record.coverage.push(CoverageRecord {
                competition_id,
                coverage_percentage,
            });
        }
    }

    records
        .into_iter()
        .map(ProviderRecord::into_provider)
        .collect()
}

/// Classify a SQLite failure. Contention and I/O faults may clear on retry;
/// everything else is a property of the query or the data.
fn db_error(e: rusqlite::Error) -> CatalogError {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(
                failure.code,
                ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::CannotOpen
            ) =>
        {
            CatalogError::Unavailable(e.to_string())
        }
        _ => CatalogError::Database(e.to_string()),
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Reject snapshots that would produce an ambiguous catalog.
fn validate_snapshot(snapshot: &CatalogSnapshot) -> Result<(), CatalogError> {
    let mut competition_ids = HashSet::new();
    for competition in &snapshot.competitions {
        if !competition_ids.insert(competition.id) {
            return Err(CatalogError::InvalidRecord(format!(
                "duplicate competition id {}",
                competition.id
            )));
        }
    }

    let mut club_ids = HashSet::new();
    for club in &snapshot.clubs {
        if !club_ids.insert(club.id) {
            return Err(CatalogError::InvalidRecord(format!(
                "duplicate club id {}",
                club.id
            )));
        }
        if let Some(unknown) = club
            .competition_ids
            .iter()
            .find(|id| !competition_ids.contains(id))
        {
            return Err(CatalogError::InvalidRecord(format!(
                "club {} references unknown competition {}",
                club.id, unknown
            )));
        }
    }

    let mut provider_ids = HashSet::new();
    for provider in &snapshot.providers {
        if !provider_ids.insert(provider.id) {
            return Err(CatalogError::InvalidRecord(format!(
                "duplicate provider id {}",
                provider.id
            )));
        }
        if let Some(unknown) = provider
            .coverage
            .iter()
            .find(|c| !competition_ids.contains(&c.competition_id))
        {
            return Err(CatalogError::InvalidRecord(format!(
                "provider {} references unknown competition {}",
                provider.id, unknown.competition_id
            )));
        }
    }

    Ok(())
}

#[async_trait]
impl CatalogAccessor for SqliteCatalog {
    async fn required_competitions_for_clubs(
        &self,
        club_ids: &[ClubId],
    ) -> Result<BTreeSet<CompetitionId>, CatalogError> {
        if club_ids.is_empty() {
            return Ok(BTreeSet::new());
        }

        let conn = self.conn()?;
        let sql = format!(
            "SELECT DISTINCT competition_id FROM club_competitions WHERE club_id IN ({})",
            placeholders(club_ids.len())
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(db_error)?;

        let rows = stmt
            .query_map(params_from_iter(club_ids.iter()), |row| {
                row.get::<_, CompetitionId>(0)
            })
            .map_err(db_error)?;

        let mut competitions = BTreeSet::new();
        for row in rows {
            competitions.insert(row.map_err(db_error)?);
        }
        Ok(competitions)
    }

    async fn providers_covering_competitions(
        &self,
        competition_ids: &BTreeSet<CompetitionId>,
    ) -> Result<Vec<Provider>, CatalogError> {
        if competition_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<CompetitionId> = competition_ids.iter().copied().collect();
        let sql = format!(
            "SELECT p.provider_id, p.name, p.monthly_price, p.affiliate_url, p.features,
                    pc.competition_id, pc.coverage_percentage
             FROM providers p
             JOIN provider_coverage pc ON pc.provider_id = p.provider_id
             WHERE pc.competition_id IN ({}) AND pc.coverage_percentage > 0
             ORDER BY p.provider_id, pc.competition_id",
            placeholders(ids.len())
        );

        let conn = self.conn()?;
        let rows = Self::query_provider_rows(&conn, &sql, &ids)?;
        Ok(collect_providers(rows))
    }

    async fn competition_details(
        &self,
        competition_ids: &BTreeSet<CompetitionId>,
    ) -> Result<HashMap<CompetitionId, CompetitionInfo>, CatalogError> {
        if competition_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.conn()?;
        let sql = format!(
            "SELECT competition_id, name, country, total_games FROM competitions
             WHERE competition_id IN ({})",
            placeholders(competition_ids.len())
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(db_error)?;

        let rows = stmt
            .query_map(params_from_iter(competition_ids.iter()), row_to_competition_record)
            .map_err(db_error)?;

        let mut details = HashMap::new();
        for row in rows {
            let competition = row
                .map_err(db_error)?
                .into_competition();
            details.insert(
                competition.id,
                CompetitionInfo {
                    name: competition.name,
                    total_games: competition.total_games,
                },
            );
        }
        Ok(details)
    }

    async fn list_clubs(&self) -> Result<Vec<Club>, CatalogError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT c.club_id, c.name, c.country, cc.competition_id
                 FROM clubs c
                 LEFT JOIN club_competitions cc ON cc.club_id = c.club_id
                 ORDER BY c.club_id, cc.competition_id",
            )
            .map_err(db_error)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, ClubId>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<CompetitionId>>(3)?,
                ))
            })
            .map_err(db_error)?;

        let mut clubs: Vec<Club> = Vec::new();
        for row in rows {
            let (id, name, country, competition_id) =
                row.map_err(db_error)?;

            if clubs.last().is_none_or(|c| c.id != id) {
                clubs.push(Club {
                    id,
                    name,
                    country,
                    competition_ids: Vec::new(),
                });
            }
            if let (Some(competition_id), Some(club)) = (competition_id, clubs.last_mut()) {
                club.competition_ids.push(competition_id);
            }
        }
        Ok(clubs)
    }

    async fn list_competitions(&self) -> Result<Vec<Competition>, CatalogError> {
        let conn = self.conn()?;

        let mut stmt = conn
            .prepare(
                "SELECT competition_id, name, country, total_games FROM competitions
                 ORDER BY competition_id",
            )
            .map_err(db_error)?;

        let rows = stmt
            .query_map([], row_to_competition_record)
            .map_err(db_error)?;

        let mut competitions = Vec::new();
        for row in rows {
            competitions.push(
                row.map_err(db_error)?
                    .into_competition(),
            );
        }
        Ok(competitions)
    }

    async fn list_providers(&self) -> Result<Vec<Provider>, CatalogError> {
        let conn = self.conn()?;
        let rows = Self::query_provider_rows(
            &conn,
            "SELECT p.provider_id, p.name, p.monthly_price, p.affiliate_url, p.features,
                    pc.competition_id, pc.coverage_percentage
             FROM providers p
             LEFT JOIN provider_coverage pc ON pc.provider_id = p.provider_id
             ORDER BY p.provider_id, pc.competition_id",
            &[],
        )?;
        Ok(collect_providers(rows))
    }
}

fn row_to_competition_record(row: &rusqlite::Row) -> rusqlite::Result<CompetitionRecord> {
    Ok(CompetitionRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        country: row.get(2)?,
        total_games: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ClubRecord;
    use crate::testing::fixtures;
    use rust_decimal::Decimal;

    fn create_test_catalog() -> SqliteCatalog {
        let catalog = SqliteCatalog::in_memory().unwrap();
        catalog.import(&fixtures::german_football_snapshot()).unwrap();
        catalog
    }

    fn set(ids: &[CompetitionId]) -> BTreeSet<CompetitionId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_import_summary() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        let summary = catalog
            .import(&fixtures::german_football_snapshot())
            .unwrap();

        assert_eq!(summary.clubs, 4);
        assert_eq!(summary.competitions, 4);
        assert_eq!(summary.providers, 5);
        assert_eq!(summary.fingerprint.len(), 64);
    }

    #[test]
    fn test_import_same_snapshot_same_fingerprint() {
        let catalog = SqliteCatalog::in_memory().unwrap();
        let first = catalog
            .import(&fixtures::german_football_snapshot())
            .unwrap();
        let second = catalog
            .import(&fixtures::german_football_snapshot())
            .unwrap();
        assert_eq!(first.fingerprint, second.fingerprint);
    }

    #[tokio::test]
    async fn test_required_competitions_union() {
        let catalog = create_test_catalog();

        let required = catalog
            .required_competitions_for_clubs(&[fixtures::FREIBURG, fixtures::ARSENAL])
            .await
            .unwrap();

        assert_eq!(
            required,
            set(&[
                fixtures::BUNDESLIGA,
                fixtures::CHAMPIONS_LEAGUE,
                fixtures::DFB_POKAL,
                fixtures::PREMIER_LEAGUE
            ])
        );
    }

    #[tokio::test]
    async fn test_required_competitions_unknown_and_empty() {
        let catalog = create_test_catalog();

        assert!(catalog
            .required_competitions_for_clubs(&[999])
            .await
            .unwrap()
            .is_empty());
        assert!(catalog
            .required_competitions_for_clubs(&[])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_providers_covering_restricts_coverage() {
        let catalog = create_test_catalog();

        let providers = catalog
            .providers_covering_competitions(&set(&[fixtures::CHAMPIONS_LEAGUE]))
            .await
            .unwrap();

        let ids: Vec<ProviderId> = providers.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![fixtures::DAZN, fixtures::PRIME_VIDEO]);

        let dazn = &providers[0];
        assert_eq!(dazn.coverage.len(), 1);
        assert_eq!(dazn.coverage_for(fixtures::CHAMPIONS_LEAGUE), 85);
        assert_eq!(dazn.coverage_for(fixtures::BUNDESLIGA), 0);
    }

    #[tokio::test]
    async fn test_providers_covering_normalizes_prices() {
        let catalog = create_test_catalog();

        let providers = catalog
            .providers_covering_competitions(&set(&[fixtures::BUNDESLIGA]))
            .await
            .unwrap();

        let sky = providers.iter().find(|p| p.id == fixtures::SKY).unwrap();
        assert_eq!(sky.monthly_price, Decimal::new(2999, 2));
        assert_eq!(sky.features, vec!["Konferenz".to_string()]);
    }

    #[tokio::test]
    async fn test_competition_details() {
        let catalog = create_test_catalog();

        let details = catalog
            .competition_details(&set(&[fixtures::BUNDESLIGA, 12345]))
            .await
            .unwrap();

        assert_eq!(details.len(), 1);
        let bundesliga = &details[&fixtures::BUNDESLIGA];
        assert_eq!(bundesliga.name, "Bundesliga");
        assert_eq!(bundesliga.total_games, 306);
    }

    #[tokio::test]
    async fn test_list_queries() {
        let catalog = create_test_catalog();

        let clubs = catalog.list_clubs().await.unwrap();
        assert_eq!(clubs.len(), 4);
        assert_eq!(clubs[0].id, fixtures::BAYERN);
        assert_eq!(clubs[0].competition_ids.len(), 3);

        let competitions = catalog.list_competitions().await.unwrap();
        assert_eq!(competitions.len(), 4);

        let providers = catalog.list_providers().await.unwrap();
        assert_eq!(providers.len(), 5);
        assert!(providers.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_import_replaces_previous_catalog() {
        let catalog = create_test_catalog();
        catalog.import(&fixtures::two_competition_snapshot()).unwrap();

        let providers = catalog.list_providers().await.unwrap();
        assert_eq!(providers.len(), 2);
        assert!(catalog
            .required_competitions_for_clubs(&[fixtures::FREIBURG])
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_import_rejects_dangling_reference() {
        let catalog = create_test_catalog();
        let mut snapshot = fixtures::two_competition_snapshot();
        snapshot.clubs.push(ClubRecord {
            id: 77,
            name: "Nowhere FC".to_string(),
            country: None,
            competition_ids: vec![404],
        });

        let result = catalog.import(&snapshot);
        assert!(matches!(result, Err(CatalogError::InvalidRecord(_))));
    }

    #[tokio::test]
    async fn test_rejected_import_keeps_previous_catalog() {
        let catalog = create_test_catalog();
        let mut snapshot = fixtures::two_competition_snapshot();
        let duplicate = snapshot.providers[0].clone();
        snapshot.providers.push(duplicate);

        assert!(catalog.import(&snapshot).is_err());
        assert_eq!(catalog.list_providers().await.unwrap().len(), 5);
    }

    #[test]
    fn test_file_backed_catalog_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.db");

        {
            let catalog = SqliteCatalog::new(&path).unwrap();
            catalog.import(&fixtures::two_competition_snapshot()).unwrap();
        }

        let reopened = SqliteCatalog::new(&path).unwrap();
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let providers = runtime.block_on(reopened.list_providers()).unwrap();
        assert_eq!(providers.len(), 2);
    }

    #[test]
    fn test_db_error_classification() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(db_error(busy), CatalogError::Unavailable(_)));

        let catalog = SqliteCatalog::in_memory().unwrap();
        let conn = catalog.conn().unwrap();
        let syntax = conn.execute("NOT VALID SQL", []).unwrap_err();
        assert!(matches!(db_error(syntax), CatalogError::Database(_)));
    }

    #[tokio::test]
    async fn test_oversized_club_query_is_not_an_outage() {
        let catalog = create_test_catalog();
        let clubs: Vec<ClubId> = (0..40_000).collect();

        let result = catalog.required_competitions_for_clubs(&clubs).await;

        assert!(matches!(result, Err(CatalogError::Database(_))));
    }
}
