//! Request and error types for the optimizer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config::OptimizerConfig;
use crate::catalog::{CatalogError, ClubId, ProviderId};
use crate::coverage::CoverageError;

/// Largest combination size a request may ask for.
pub const MAX_COMBINATION_SIZE_LIMIT: usize = 8;

/// Most clubs a single request may select.
pub const MAX_CLUBS_PER_REQUEST: usize = 64;

/// Most coverage thresholds a single request may ask for.
pub const MAX_THRESHOLDS_PER_REQUEST: usize = 8;

/// One optimization run: which clubs, what the user already owns, which
/// coverage targets, and how large combinations may get.
///
/// Serialized as-is to form the result cache key, so two requests share a
/// cache entry only if they are field-for-field identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub club_ids: Vec<ClubId>,
    #[serde(default)]
    pub owned_provider_ids: Vec<ProviderId>,
    pub thresholds: Vec<u8>,
    pub max_combination_size: usize,
}

impl OptimizationRequest {
    /// A request for `club_ids` using the configured thresholds and size limit.
    pub fn new(club_ids: Vec<ClubId>, config: &OptimizerConfig) -> Self {
        Self {
            club_ids,
            owned_provider_ids: Vec::new(),
            thresholds: config.thresholds.clone(),
            max_combination_size: config.max_combination_size,
        }
    }

    pub fn with_owned(mut self, owned_provider_ids: Vec<ProviderId>) -> Self {
        self.owned_provider_ids = owned_provider_ids;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Vec<u8>) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_max_combination_size(mut self, max_combination_size: usize) -> Self {
        self.max_combination_size = max_combination_size;
        self
    }

    /// Deterministic cache key for this request.
    pub fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }

    /// Check the request before any catalog access.
    pub fn validate(&self) -> Result<(), OptimizeError> {
        if self.club_ids.is_empty() {
            return Err(OptimizeError::InvalidInput(
                "at least one club must be selected".to_string(),
            ));
        }
        if self.club_ids.len() > MAX_CLUBS_PER_REQUEST {
            return Err(OptimizeError::InvalidInput(format!(
                "{} clubs selected, at most {} allowed",
                self.club_ids.len(),
                MAX_CLUBS_PER_REQUEST
            )));
        }
        if self.thresholds.len() > MAX_THRESHOLDS_PER_REQUEST {
            return Err(OptimizeError::InvalidInput(format!(
                "{} coverage thresholds given, at most {} allowed",
                self.thresholds.len(),
                MAX_THRESHOLDS_PER_REQUEST
            )));
        }
        if let Some(threshold) = self.thresholds.iter().find(|t| **t > 100) {
            return Err(OptimizeError::InvalidInput(format!(
                "coverage threshold {} exceeds 100",
                threshold
            )));
        }
        if self.max_combination_size == 0 || self.max_combination_size > MAX_COMBINATION_SIZE_LIMIT
        {
            return Err(OptimizeError::InvalidInput(format!(
                "max_combination_size must be between 1 and {}",
                MAX_COMBINATION_SIZE_LIMIT
            )));
        }
        Ok(())
    }
}

/// Errors for optimization runs.
#[derive(Debug, Error)]
pub enum OptimizeError {
    /// The request cannot be optimized as given. Not retryable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The catalog could not be reached. Retry with backoff.
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(CatalogError),

    /// The catalog rejected the query. Retrying the same request fails the
    /// same way.
    #[error("Catalog error: {0}")]
    CatalogFailure(CatalogError),

    /// An evaluation worker failed.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl OptimizeError {
    /// Whether a caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OptimizeError::CatalogUnavailable(_))
    }
}

impl From<CatalogError> for OptimizeError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::Unavailable(_) => OptimizeError::CatalogUnavailable(e),
            CatalogError::Database(_)
            | CatalogError::NotFound(_)
            | CatalogError::InvalidRecord(_) => OptimizeError::CatalogFailure(e),
        }
    }
}

impl From<CoverageError> for OptimizeError {
    fn from(e: CoverageError) -> Self {
        OptimizeError::InvalidInput(e.to_string())
    }
}
