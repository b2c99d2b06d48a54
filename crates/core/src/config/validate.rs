use super::{types::Config, ConfigError};
use crate::optimizer::{MAX_COMBINATION_SIZE_LIMIT, MAX_THRESHOLDS_PER_REQUEST};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Optimizer thresholds are non-empty, not too many, and within 0-100
/// - Optimizer combination size is within 1-8
/// - At least one evaluation worker
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Optimizer validation
    let optimizer = &config.optimizer;
    if optimizer.thresholds.is_empty() {
        return Err(ConfigError::ValidationError(
            "optimizer.thresholds cannot be empty".to_string(),
        ));
    }
    if optimizer.thresholds.len() > MAX_THRESHOLDS_PER_REQUEST {
        return Err(ConfigError::ValidationError(format!(
            "optimizer.thresholds has {} entries, at most {} allowed",
            optimizer.thresholds.len(),
            MAX_THRESHOLDS_PER_REQUEST
        )));
    }
    if let Some(t) = optimizer.thresholds.iter().find(|t| **t > 100) {
        return Err(ConfigError::ValidationError(format!(
            "optimizer.thresholds contains {}, must be at most 100",
            t
        )));
    }
    if optimizer.max_combination_size == 0
        || optimizer.max_combination_size > MAX_COMBINATION_SIZE_LIMIT
    {
        return Err(ConfigError::ValidationError(format!(
            "optimizer.max_combination_size must be between 1 and {}",
            MAX_COMBINATION_SIZE_LIMIT
        )));
    }
    if optimizer.parallel_workers == 0 {
        return Err(ConfigError::ValidationError(
            "optimizer.parallel_workers must be at least 1".to_string(),
        ));
    }

    Ok(())
}
