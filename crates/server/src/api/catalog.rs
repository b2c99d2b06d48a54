//! Catalog API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::info;

use fanpass_core::{
    CatalogAccessor, CatalogError, CatalogSnapshot, Club, Competition, ImportSummary, Provider,
};

use super::handlers::{error_response, ErrorResponse};
use crate::state::AppState;

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ClubListResponse {
    pub clubs: Vec<Club>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct CompetitionListResponse {
    pub competitions: Vec<Competition>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ProviderListResponse {
    pub providers: Vec<Provider>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    #[serde(flatten)]
    pub summary: ImportSummary,
    /// Cached optimization results dropped by the import.
    pub invalidated: usize,
}

fn catalog_error(e: CatalogError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        CatalogError::InvalidRecord(_) => StatusCode::BAD_REQUEST,
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        CatalogError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, e)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/clubs
pub async fn list_clubs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClubListResponse>, impl IntoResponse> {
    match state.catalog().list_clubs().await {
        Ok(clubs) => {
            let total = clubs.len();
            Ok(Json(ClubListResponse { clubs, total }))
        }
        Err(e) => Err(catalog_error(e)),
    }
}

/// GET /api/v1/competitions
pub async fn list_competitions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CompetitionListResponse>, impl IntoResponse> {
    match state.catalog().list_competitions().await {
        Ok(competitions) => {
            let total = competitions.len();
            Ok(Json(CompetitionListResponse {
                competitions,
                total,
            }))
        }
        Err(e) => Err(catalog_error(e)),
    }
}

/// GET /api/v1/providers
pub async fn list_providers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProviderListResponse>, impl IntoResponse> {
    match state.catalog().list_providers().await {
        Ok(providers) => {
            let total = providers.len();
            Ok(Json(ProviderListResponse { providers, total }))
        }
        Err(e) => Err(catalog_error(e)),
    }
}

/// POST /api/v1/catalog/import
///
/// Replace the catalog with the posted snapshot and drop cached results.
pub async fn import_catalog(
    State(state): State<Arc<AppState>>,
    Json(snapshot): Json<CatalogSnapshot>,
) -> Result<Json<ImportResponse>, impl IntoResponse> {
    match state.catalog().import(&snapshot) {
        Ok(summary) => {
            let invalidated = state.optimizer().invalidate_cache();
            info!(
                fingerprint = %summary.fingerprint,
                invalidated,
                "Catalog replaced via API"
            );
            Ok(Json(ImportResponse {
                summary,
                invalidated,
            }))
        }
        Err(e) => Err(catalog_error(e)),
    }
}
