//! Optimization engine: ties catalog access, search and caching together.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::cache::{CachedResults, ResultCache};
use super::combinations::{subset_count, subsets_up_to};
use super::config::{OptimizerConfig, SearchPolicy};
use super::savings::SavingsEstimate;
use super::search::{
    enumerate_all_feasible, evaluate_subsets, find_cheapest_meeting_threshold, rank_results,
};
use super::types::{OptimizationRequest, OptimizeError};
use crate::catalog::{CatalogAccessor, ClubId, CompetitionId, Provider, ProviderId};
use crate::coverage::{
    BestProviderCoverage, CombinationResult, CompetitionCoveragePolicy, CoverageError,
    CoverageEvaluator,
};
use crate::metrics;

/// Finds the cheapest provider combinations for a set of clubs.
///
/// Results are cached per request. The cache must be invalidated through
/// [`Optimizer::invalidate_cache`] whenever the catalog changes.
pub struct Optimizer {
    catalog: Arc<dyn CatalogAccessor>,
    cache: Arc<ResultCache>,
    config: OptimizerConfig,
    coverage_policy: Arc<dyn CompetitionCoveragePolicy>,
}

impl std::fmt::Debug for Optimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Optimizer")
            .field("config", &self.config)
            .field("coverage_policy", &self.coverage_policy.name())
            .field("cached_entries", &self.cache.len())
            .finish()
    }
}

impl Optimizer {
    pub fn new(
        catalog: Arc<dyn CatalogAccessor>,
        cache: Arc<ResultCache>,
        config: OptimizerConfig,
    ) -> Self {
        Self {
            catalog,
            cache,
            config,
            coverage_policy: Arc::new(BestProviderCoverage),
        }
    }

    /// Replace the per-competition coverage policy.
    pub fn with_coverage_policy(mut self, policy: Arc<dyn CompetitionCoveragePolicy>) -> Self {
        self.coverage_policy = policy;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// A request for `club_ids` with the configured defaults.
    pub fn request_for(&self, club_ids: Vec<ClubId>) -> OptimizationRequest {
        OptimizationRequest::new(club_ids, &self.config)
    }

    /// Drop all cached results. Call after any catalog change.
    pub fn invalidate_cache(&self) -> usize {
        self.cache.invalidate_all()
    }

    /// Run an optimization.
    ///
    /// The result holds, in order: one entry per request threshold that some
    /// combination reaches (thresholds nothing reaches are skipped), then
    /// every combination up to the size limit ranked by coverage descending
    /// and cost ascending. Owned providers are merged into every entry
    /// without adding to its cost.
    ///
    /// Identical requests are answered from the cache until it is
    /// invalidated. A run that fails or is dropped caches nothing.
    pub async fn optimize_for_clubs(
        &self,
        request: &OptimizationRequest,
    ) -> Result<CachedResults, OptimizeError> {
        let outcome = self.run(request).await;
        if let Err(e) = &outcome {
            let label = match e {
                OptimizeError::InvalidInput(_) => "invalid_input",
                OptimizeError::CatalogUnavailable(_) => "catalog_unavailable",
                OptimizeError::CatalogFailure(_) => "catalog_error",
                OptimizeError::Internal(_) => "internal",
            };
            metrics::OPTIMIZATIONS_TOTAL.with_label_values(&[label]).inc();
            warn!(error = %e, clubs = ?request.club_ids, "Optimization failed");
        }
        outcome
    }

    async fn run(&self, request: &OptimizationRequest) -> Result<CachedResults, OptimizeError> {
        request.validate()?;

        let key = request.cache_key();
        if let Some(cached) = self.cache.get(&key) {
            debug!(clubs = ?request.club_ids, "Optimization served from cache");
            metrics::OPTIMIZATIONS_TOTAL
                .with_label_values(&["cached"])
                .inc();
            return Ok(cached);
        }

        let start = Instant::now();
        let generation = self.cache.generation();

        let required = self
            .catalog
            .required_competitions_for_clubs(&request.club_ids)
            .await?;
        if required.is_empty() {
            return Err(OptimizeError::InvalidInput(format!(
                "clubs {:?} play in no known competitions",
                request.club_ids
            )));
        }

        let candidates = self.catalog.providers_covering_competitions(&required).await?;
        let details = self.catalog.competition_details(&required).await?;

        let (owned, available): (Vec<Provider>, Vec<Provider>) = candidates
            .into_iter()
            .partition(|p| request.owned_provider_ids.contains(&p.id));

        metrics::CANDIDATE_PROVIDERS.observe(available.len() as f64);
        debug!(
            required = required.len(),
            candidates = available.len(),
            owned = owned.len(),
            "Optimizing provider combinations"
        );

        let space = Arc::new(SearchSpace {
            evaluator: CoverageEvaluator::with_policy(
                details,
                &required,
                Arc::clone(&self.coverage_policy),
            ),
            required,
            available,
            owned,
        });

        let max_size = request.max_combination_size;
        let policy = self.config.search_policy;
        let thresholds = request.thresholds.clone();
        let subsets = subset_count(space.available.len(), max_size);
        let parallel = self.config.parallel_workers > 1
            && subsets >= self.config.parallel_min_subsets as u64;

        let results = if parallel {
            let winners = {
                let space = Arc::clone(&space);
                run_blocking(move || space.threshold_winners(&thresholds, max_size, policy))
                    .await?
            };
            let ranked = self.enumerate_parallel(Arc::clone(&space), max_size).await?;
            winners.into_iter().chain(ranked).collect()
        } else {
            let space = Arc::clone(&space);
            run_blocking(move || {
                let mut results = space.threshold_winners(&thresholds, max_size, policy)?;
                results.extend(enumerate_all_feasible(
                    &space.evaluator,
                    &space.required,
                    &space.available,
                    &space.owned,
                    max_size,
                )?);
                Ok(results)
            })
            .await?
        };

        let results: CachedResults = Arc::new(results);
        self.cache
            .put_if_current(key, Arc::clone(&results), generation);

        let mode = if parallel { "parallel" } else { "inline" };
        metrics::OPTIMIZATION_DURATION
            .with_label_values(&[mode])
            .observe(start.elapsed().as_secs_f64());
        metrics::OPTIMIZATIONS_TOTAL
            .with_label_values(&["computed"])
            .inc();
        info!(
            clubs = ?request.club_ids,
            results = results.len(),
            subsets,
            mode,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Optimization complete"
        );

        Ok(results)
    }

    /// Evaluate all subsets across blocking worker tasks.
    ///
    /// Subsets are split into contiguous chunks and the chunk results are
    /// concatenated in chunk order before ranking, so the output matches the
    /// inline enumeration exactly.
    async fn enumerate_parallel(
        &self,
        space: Arc<SearchSpace>,
        max_size: usize,
    ) -> Result<Vec<CombinationResult>, OptimizeError> {
        let subsets: Vec<Vec<usize>> = subsets_up_to(space.available.len(), max_size).collect();
        let workers = self.config.parallel_workers.max(1);
        let chunk_size = subsets.len().div_ceil(workers).max(1);

        debug!(
            subsets = subsets.len(),
            workers, chunk_size, "Evaluating combinations in parallel"
        );

        let tasks = subsets.chunks(chunk_size).map(|chunk| {
            let chunk = chunk.to_vec();
            let space = Arc::clone(&space);
            run_blocking(move || {
                evaluate_subsets(
                    &space.evaluator,
                    &space.required,
                    &space.available,
                    &space.owned,
                    &chunk,
                )
            })
        });

        let mut results = Vec::with_capacity(subsets.len());
        for chunk in join_all(tasks).await {
            results.extend(chunk?);
        }

        rank_results(&mut results);
        Ok(results)
    }

    /// Compare the user's current subscriptions with the cheapest
    /// combination reaching `target_coverage` for their clubs.
    pub async fn estimate_savings(
        &self,
        club_ids: Vec<ClubId>,
        current_provider_ids: &[ProviderId],
        target_coverage: u8,
    ) -> Result<SavingsEstimate, OptimizeError> {
        let request = self
            .request_for(club_ids)
            .with_thresholds(vec![target_coverage]);
        let results = self.optimize_for_clubs(&request).await?;

        let all_providers = self.catalog.list_providers().await?;
        let mut seen = HashSet::new();
        let mut current = Vec::with_capacity(current_provider_ids.len());
        for id in current_provider_ids.iter().filter(|id| seen.insert(**id)) {
            match all_providers.iter().find(|p| p.id == *id) {
                Some(provider) => current.push(provider.clone()),
                None => {
                    return Err(OptimizeError::InvalidInput(format!(
                        "unknown provider {}",
                        id
                    )))
                }
            }
        }

        let recommendation = results
            .iter()
            .find(|r| r.target_coverage == Some(target_coverage))
            .cloned();

        Ok(SavingsEstimate::compute(
            &current,
            target_coverage,
            recommendation,
        ))
    }
}

/// Catalog data for one run, shared with blocking workers.
struct SearchSpace {
    evaluator: CoverageEvaluator,
    required: BTreeSet<CompetitionId>,
    /// Candidates the search may pick from.
    available: Vec<Provider>,
    /// Already subscribed; merged into every result at no cost.
    owned: Vec<Provider>,
}

impl SearchSpace {
    /// Cheapest combination per threshold, in threshold order, with owned
    /// providers merged in. Thresholds nothing reaches are skipped.
    fn threshold_winners(
        &self,
        thresholds: &[u8],
        max_size: usize,
        policy: SearchPolicy,
    ) -> Result<Vec<CombinationResult>, CoverageError> {
        let mut winners = Vec::with_capacity(thresholds.len());
        for &target in thresholds {
            let best = find_cheapest_meeting_threshold(
                &self.evaluator,
                &self.required,
                &self.available,
                target,
                max_size,
                policy,
            )?;
            match best {
                Some(best) => winners.push(self.evaluator.merge_owned(
                    &best,
                    &self.owned,
                    &self.required,
                )?),
                None => debug!(target, "No combination reaches coverage threshold"),
            }
        }
        Ok(winners)
    }
}

/// Run CPU-bound search work off the async executor.
async fn run_blocking<T, F>(work: F) -> Result<T, OptimizeError>
where
    F: FnOnce() -> Result<T, CoverageError> + Send + 'static,
    T: Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| OptimizeError::Internal(e.to_string()))?;
    Ok(outcome?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;
    use crate::optimizer::SearchPolicy;
    use crate::testing::{fixtures, CatalogCall, MockCatalog};
    use rust_decimal::Decimal;

    fn optimizer(catalog: Arc<MockCatalog>) -> Optimizer {
        Optimizer::new(
            catalog,
            Arc::new(ResultCache::new()),
            OptimizerConfig::default(),
        )
    }

    fn german_catalog() -> Arc<MockCatalog> {
        Arc::new(MockCatalog::with_snapshot(
            fixtures::german_football_snapshot(),
        ))
    }

    #[tokio::test]
    async fn test_empty_clubs_rejected_before_catalog_access() {
        let catalog = german_catalog();
        let optimizer = optimizer(Arc::clone(&catalog));

        let result = optimizer
            .optimize_for_clubs(&optimizer.request_for(Vec::new()))
            .await;

        assert!(matches!(result, Err(OptimizeError::InvalidInput(_))));
        assert_eq!(catalog.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_clubs_are_invalid_input() {
        let catalog = german_catalog();
        let optimizer = optimizer(Arc::clone(&catalog));

        let result = optimizer
            .optimize_for_clubs(&optimizer.request_for(vec![999]))
            .await;
        assert!(matches!(result, Err(OptimizeError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_catalog_failure_is_retryable_and_not_cached() {
        let catalog = german_catalog();
        let optimizer = optimizer(Arc::clone(&catalog));
        catalog
            .set_next_error(CatalogError::Unavailable("timeout".to_string()))
            .await;

        let request = optimizer.request_for(vec![fixtures::BAYERN]);
        let err = optimizer.optimize_for_clubs(&request).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(optimizer.cache().is_empty());

        // The error was one-shot; the retry succeeds.
        assert!(optimizer.optimize_for_clubs(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_second_call_served_from_cache() {
        let catalog = german_catalog();
        let optimizer = optimizer(Arc::clone(&catalog));
        let request = optimizer.request_for(vec![fixtures::BAYERN]);

        let first = optimizer.optimize_for_clubs(&request).await.unwrap();
        let calls = catalog.call_count().await;
        let second = optimizer.optimize_for_clubs(&request).await.unwrap();

        assert_eq!(catalog.call_count().await, calls);
        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompute() {
        let catalog = german_catalog();
        let optimizer = optimizer(Arc::clone(&catalog));
        let request = optimizer.request_for(vec![fixtures::BAYERN]);

        optimizer.optimize_for_clubs(&request).await.unwrap();
        assert_eq!(optimizer.invalidate_cache(), 1);
        catalog.clear_calls().await;

        optimizer.optimize_for_clubs(&request).await.unwrap();
        assert!(catalog
            .recorded_calls()
            .await
            .contains(&CatalogCall::RequiredCompetitions(vec![fixtures::BAYERN])));
    }

    #[tokio::test]
    async fn test_parallel_matches_inline() {
        let catalog = german_catalog();
        let inline = optimizer(Arc::clone(&catalog));
        let parallel = Optimizer::new(
            Arc::clone(&catalog) as Arc<dyn CatalogAccessor>,
            Arc::new(ResultCache::new()),
            OptimizerConfig {
                parallel_workers: 3,
                parallel_min_subsets: 1,
                ..OptimizerConfig::default()
            },
        );

        let clubs = vec![fixtures::BAYERN, fixtures::ARSENAL];
        let a = inline
            .optimize_for_clubs(&inline.request_for(clubs.clone()))
            .await
            .unwrap();
        let b = parallel
            .optimize_for_clubs(&parallel.request_for(clubs))
            .await
            .unwrap();

        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_exhaustive_policy_from_config() {
        let catalog = german_catalog();
        let optimizer = Optimizer::new(
            catalog,
            Arc::new(ResultCache::new()),
            OptimizerConfig {
                search_policy: SearchPolicy::Exhaustive,
                ..OptimizerConfig::default()
            },
        );

        let request = optimizer
            .request_for(vec![fixtures::BAYERN])
            .with_thresholds(vec![100]);
        let results = optimizer.optimize_for_clubs(&request).await.unwrap();
        assert_eq!(results[0].total_cost, Decimal::new(3898, 2));
    }

    #[tokio::test]
    async fn test_estimate_savings_unknown_provider() {
        let optimizer = optimizer(german_catalog());
        let result = optimizer
            .estimate_savings(vec![fixtures::BAYERN], &[999], 100)
            .await;
        assert!(matches!(result, Err(OptimizeError::InvalidInput(_))));
    }

    /// Delegates to [`BestProviderCoverage`] and records which threads
    /// evaluated coverage.
    #[derive(Debug, Default)]
    struct ThreadRecordingPolicy {
        threads: std::sync::Mutex<HashSet<std::thread::ThreadId>>,
    }

    impl CompetitionCoveragePolicy for ThreadRecordingPolicy {
        fn name(&self) -> &'static str {
            "thread_recording"
        }

        fn competition_coverage(
            &self,
            providers: &[&Provider],
            competition_id: CompetitionId,
        ) -> u8 {
            self.threads
                .lock()
                .unwrap()
                .insert(std::thread::current().id());
            BestProviderCoverage.competition_coverage(providers, competition_id)
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_inline_search_runs_off_the_executor_thread() {
        let policy = Arc::new(ThreadRecordingPolicy::default());
        let optimizer = optimizer(german_catalog())
            .with_coverage_policy(Arc::clone(&policy) as Arc<dyn CompetitionCoveragePolicy>);
        assert_eq!(optimizer.config().parallel_workers, 1);

        optimizer
            .optimize_for_clubs(&optimizer.request_for(vec![fixtures::BAYERN]))
            .await
            .unwrap();

        let threads = policy.threads.lock().unwrap();
        assert!(!threads.is_empty());
        assert!(!threads.contains(&std::thread::current().id()));
    }

    #[tokio::test]
    async fn test_owned_providers_merged_before_ranking() {
        let optimizer = optimizer(german_catalog());
        let request = optimizer
            .request_for(vec![fixtures::BAYERN])
            .with_owned(vec![fixtures::DAZN])
            .with_thresholds(Vec::new());

        let results = optimizer.optimize_for_clubs(&request).await.unwrap();

        for pair in results.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(
                a.coverage_percentage > b.coverage_percentage
                    || (a.coverage_percentage == b.coverage_percentage
                        && a.total_cost <= b.total_cost),
                "out of order: {:?} before {:?}",
                a.provider_ids(),
                b.provider_ids()
            );
        }

        // DAZN brings the Champions League, so ARD/ZDF alone completes the
        // set at the lowest extra cost.
        assert_eq!(
            results[0].provider_ids(),
            vec![fixtures::DAZN, fixtures::ARD_ZDF]
        );
        assert_eq!(results[0].coverage_percentage, 100);
        assert_eq!(results[0].total_cost, Decimal::new(1836, 2));
    }

    #[tokio::test]
    async fn test_owned_ranking_matches_between_inline_and_parallel() {
        let catalog = german_catalog();
        let inline = optimizer(Arc::clone(&catalog));
        let parallel = Optimizer::new(
            Arc::clone(&catalog) as Arc<dyn CatalogAccessor>,
            Arc::new(ResultCache::new()),
            OptimizerConfig {
                parallel_workers: 4,
                parallel_min_subsets: 1,
                ..OptimizerConfig::default()
            },
        );

        let request = inline
            .request_for(vec![fixtures::BAYERN])
            .with_owned(vec![fixtures::PRIME_VIDEO]);
        let a = inline.optimize_for_clubs(&request).await.unwrap();
        let b = parallel.optimize_for_clubs(&request).await.unwrap();

        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_estimate_savings_ignores_duplicate_ids() {
        let optimizer = optimizer(german_catalog());

        let estimate = optimizer
            .estimate_savings(
                vec![fixtures::BAYERN],
                &[fixtures::SKY, fixtures::DAZN, fixtures::SKY],
                100,
            )
            .await
            .unwrap();

        assert_eq!(
            estimate.current_provider_ids,
            vec![fixtures::SKY, fixtures::DAZN]
        );
        assert_eq!(estimate.current_monthly_cost, Decimal::new(7498, 2));
    }

    #[tokio::test]
    async fn test_deterministic_catalog_error_is_not_retryable() {
        let catalog = german_catalog();
        let optimizer = optimizer(Arc::clone(&catalog));
        catalog
            .set_next_error(CatalogError::Database("no such table".to_string()))
            .await;

        let err = optimizer
            .optimize_for_clubs(&optimizer.request_for(vec![fixtures::BAYERN]))
            .await
            .unwrap_err();

        assert!(matches!(err, OptimizeError::CatalogFailure(_)));
        assert!(!err.is_retryable());
    }
}
