//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Optimizer (runs, duration, evaluated subsets)
//! - Result cache (hits, misses, invalidations)
//! - Catalog (imports, unparseable prices)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Optimizer
// =============================================================================

/// Optimization runs by result.
pub static OPTIMIZATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "fanpass_optimizations_total",
            "Total optimization runs",
        ),
        &["result"], // "computed", "cached", "invalid_input", "catalog_unavailable", "internal"
    )
    .unwrap()
});

/// Duration of computed (uncached) optimization runs.
pub static OPTIMIZATION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "fanpass_optimization_duration_seconds",
            "Duration of uncached optimization runs",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0]),
        &["mode"], // "inline", "parallel"
    )
    .unwrap()
});

/// Provider subsets evaluated.
pub static SUBSETS_EVALUATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "fanpass_subsets_evaluated_total",
        "Total provider combinations evaluated",
    )
    .unwrap()
});

/// Candidate providers per optimization run.
pub static CANDIDATE_PROVIDERS: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "fanpass_candidate_providers",
            "Number of candidate providers per optimization run",
        )
        .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0]),
    )
    .unwrap()
});

// =============================================================================
// Result cache
// =============================================================================

/// Cache lookups by result.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fanpass_cache_lookups_total", "Result cache lookups"),
        &["result"], // "hit", "miss"
    )
    .unwrap()
});

/// Cache invalidations.
pub static CACHE_INVALIDATIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "fanpass_cache_invalidations_total",
        "Total result cache invalidations",
    )
    .unwrap()
});

// =============================================================================
// Catalog
// =============================================================================

/// Catalog imports by result.
pub static CATALOG_IMPORTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("fanpass_catalog_imports_total", "Total catalog imports"),
        &["result"], // "success", "failure"
    )
    .unwrap()
});

/// Prices that could not be parsed and were treated as 0.
pub static PRICE_PARSE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "fanpass_price_parse_failures_total",
        "Provider prices that could not be parsed",
    )
    .unwrap()
});

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Optimizer
        Box::new(OPTIMIZATIONS_TOTAL.clone()),
        Box::new(OPTIMIZATION_DURATION.clone()),
        Box::new(SUBSETS_EVALUATED.clone()),
        Box::new(CANDIDATE_PROVIDERS.clone()),
        // Cache
        Box::new(CACHE_LOOKUPS.clone()),
        Box::new(CACHE_INVALIDATIONS.clone()),
        // Catalog
        Box::new(CATALOG_IMPORTS.clone()),
        Box::new(PRICE_PARSE_FAILURES.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_providers_observes_without_labels() {
        let before = CANDIDATE_PROVIDERS.get_sample_count();
        CANDIDATE_PROVIDERS.observe(3.0);
        assert!(CANDIDATE_PROVIDERS.get_sample_count() > before);
    }

    #[test]
    fn test_all_metrics_are_prefixed() {
        for collector in all_metrics() {
            for desc in collector.desc() {
                assert!(desc.fq_name.starts_with("fanpass_"), "{}", desc.fq_name);
            }
        }
    }
}
