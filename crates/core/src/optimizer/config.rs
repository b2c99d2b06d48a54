//! Optimizer configuration.

use serde::{Deserialize, Serialize};

/// When the cheapest-combination search stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SearchPolicy {
    /// Fewest providers first: stop at the first combination size that has
    /// any qualifying combination and return the cheapest of that size.
    #[default]
    GreedyBySize,
    /// Search every size up to the limit and return the globally cheapest
    /// qualifying combination. Ties keep the smaller, earlier combination.
    Exhaustive,
}

/// Configuration for the combination optimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Coverage thresholds (percent) to find a cheapest combination for,
    /// used when a request does not name its own.
    #[serde(default = "default_thresholds")]
    pub thresholds: Vec<u8>,

    /// Largest combination considered, used when a request does not name one.
    #[serde(default = "default_max_combination_size")]
    pub max_combination_size: usize,

    #[serde(default)]
    pub search_policy: SearchPolicy,

    /// Worker tasks for subset evaluation. 1 evaluates inline.
    #[serde(default = "default_parallel_workers")]
    pub parallel_workers: usize,

    /// Below this many subsets evaluation stays inline even with workers.
    #[serde(default = "default_parallel_min_subsets")]
    pub parallel_min_subsets: usize,
}

fn default_thresholds() -> Vec<u8> {
    vec![100, 90, 66]
}

fn default_max_combination_size() -> usize {
    4
}

fn default_parallel_workers() -> usize {
    1
}

fn default_parallel_min_subsets() -> usize {
    2048
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            thresholds: default_thresholds(),
            max_combination_size: default_max_combination_size(),
            search_policy: SearchPolicy::default(),
            parallel_workers: default_parallel_workers(),
            parallel_min_subsets: default_parallel_min_subsets(),
        }
    }
}
