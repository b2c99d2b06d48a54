//! Optimizer API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::debug;

use fanpass_core::{
    ClubId, CombinationResult, OptimizeError, ProviderId, RecommendationTiers, SavingsEstimate,
};

use super::handlers::{error_response, ErrorResponse};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OptimizeBody {
    pub club_ids: Vec<ClubId>,
    #[serde(default)]
    pub owned_provider_ids: Vec<ProviderId>,
    /// Defaults to the configured thresholds.
    #[serde(default)]
    pub thresholds: Option<Vec<u8>>,
    /// Defaults to the configured size limit.
    #[serde(default)]
    pub max_combination_size: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    /// Threshold winners first, then every combination ranked.
    pub results: Vec<CombinationResult>,
    pub tiers: RecommendationTiers,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct SavingsBody {
    pub club_ids: Vec<ClubId>,
    #[serde(default)]
    pub current_provider_ids: Vec<ProviderId>,
    /// Defaults to the first configured threshold.
    #[serde(default)]
    pub target_coverage: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub removed: usize,
}

fn optimize_error(e: OptimizeError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        OptimizeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        OptimizeError::CatalogUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        OptimizeError::CatalogFailure(_) | OptimizeError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, e)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/optimize
///
/// Find the cheapest provider combinations for the given clubs.
pub async fn optimize(
    State(state): State<Arc<AppState>>,
    Json(body): Json<OptimizeBody>,
) -> Result<Json<OptimizeResponse>, impl IntoResponse> {
    let optimizer = state.optimizer();

    let mut request = optimizer
        .request_for(body.club_ids)
        .with_owned(body.owned_provider_ids);
    if let Some(thresholds) = body.thresholds {
        request = request.with_thresholds(thresholds);
    }
    if let Some(size) = body.max_combination_size {
        request = request.with_max_combination_size(size);
    }

    debug!(clubs = ?request.club_ids, "Optimize request");

    match optimizer.optimize_for_clubs(&request).await {
        Ok(results) => {
            let tiers = RecommendationTiers::from_results(&results);
            let results = results.as_ref().clone();
            let total = results.len();
            Ok(Json(OptimizeResponse {
                results,
                tiers,
                total,
            }))
        }
        Err(e) => Err(optimize_error(e)),
    }
}

/// POST /api/v1/savings
///
/// Compare current subscriptions with the cheapest recommendation.
pub async fn estimate_savings(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SavingsBody>,
) -> Result<Json<SavingsEstimate>, impl IntoResponse> {
    let optimizer = state.optimizer();
    let target = body
        .target_coverage
        .or_else(|| optimizer.config().thresholds.first().copied())
        .unwrap_or(100);

    optimizer
        .estimate_savings(body.club_ids, &body.current_provider_ids, target)
        .await
        .map(Json)
        .map_err(optimize_error)
}

/// DELETE /api/v1/optimizer/cache
///
/// Drop all cached optimization results.
pub async fn invalidate_cache(State(state): State<Arc<AppState>>) -> Json<InvalidateResponse> {
    let removed = state.optimizer().invalidate_cache();
    Json(InvalidateResponse { removed })
}
