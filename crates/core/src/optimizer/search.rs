//! Combination search over candidate providers.
//!
//! Everything here is synchronous and pure so that it can run inline or be
//! fanned out to blocking worker tasks by the engine.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::combinations::{combinations, subsets_up_to};
use super::config::SearchPolicy;
use crate::catalog::{CompetitionId, Provider};
use crate::coverage::{CombinationResult, CoverageError, CoverageEvaluator};
use crate::metrics;

/// Cheapest combination of at most `max_size` providers reaching `target`.
///
/// Sizes are searched in ascending order and, within a size, in stable
/// subset order; ties on cost keep the first combination found. Under
/// [`SearchPolicy::GreedyBySize`] the search stops at the first size with a
/// qualifying combination. Returns `None` when nothing qualifies.
pub fn find_cheapest_meeting_threshold(
    evaluator: &CoverageEvaluator,
    required: &BTreeSet<CompetitionId>,
    providers: &[Provider],
    target: u8,
    max_size: usize,
    policy: SearchPolicy,
) -> Result<Option<CombinationResult>, CoverageError> {
    let mut best: Option<CombinationResult> = None;
    let mut evaluated = 0u64;

    for size in 1..=max_size.min(providers.len()) {
        for combo in combinations(providers, size) {
            evaluated += 1;
            let result = evaluator.evaluate(combo, required)?;
            if !result.meets(target) {
                continue;
            }
            let cheaper = best
                .as_ref()
                .map_or(true, |current| result.total_cost < current.total_cost);
            if cheaper {
                best = Some(result);
            }
        }

        if best.is_some() && policy == SearchPolicy::GreedyBySize {
            break;
        }
    }

    metrics::SUBSETS_EVALUATED.inc_by(evaluated);

    Ok(best.map(|mut result| {
        result.target_coverage = Some(target);
        result
    }))
}

/// Every combination of at most `max_size` providers, ranked.
///
/// Owned providers are merged into each combination before ranking, so the
/// order reflects the coverage the user actually gets. Combinations with
/// zero coverage are included. See [`rank_results`] for the order.
pub fn enumerate_all_feasible(
    evaluator: &CoverageEvaluator,
    required: &BTreeSet<CompetitionId>,
    providers: &[Provider],
    owned: &[Provider],
    max_size: usize,
) -> Result<Vec<CombinationResult>, CoverageError> {
    let subsets: Vec<Vec<usize>> = subsets_up_to(providers.len(), max_size).collect();
    let mut results = evaluate_subsets(evaluator, required, providers, owned, &subsets)?;
    rank_results(&mut results);
    Ok(results)
}

/// Evaluate index subsets of `providers` with `owned` merged in, preserving
/// input order.
pub fn evaluate_subsets(
    evaluator: &CoverageEvaluator,
    required: &BTreeSet<CompetitionId>,
    providers: &[Provider],
    owned: &[Provider],
    subsets: &[Vec<usize>],
) -> Result<Vec<CombinationResult>, CoverageError> {
    let results = subsets
        .iter()
        .map(|indices| {
            let result = evaluator.evaluate(indices.iter().map(|i| &providers[*i]), required)?;
            if owned.is_empty() {
                Ok(result)
            } else {
                evaluator.merge_owned(&result, owned, required)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    metrics::SUBSETS_EVALUATED.inc_by(results.len() as u64);
    Ok(results)
}

/// Sort by coverage descending, then cost ascending.
///
/// The sort is stable: equal entries keep their enumeration order, so
/// smaller combinations come before larger ones at the same coverage and
/// cost.
pub fn rank_results(results: &mut [CombinationResult]) {
    results.sort_by(compare_ranked);
}

fn compare_ranked(a: &CombinationResult, b: &CombinationResult) -> Ordering {
    b.coverage_percentage
        .cmp(&a.coverage_percentage)
        .then_with(|| a.total_cost.cmp(&b.total_cost))
}
