pub mod catalog;
pub mod config;
pub mod coverage;
pub mod metrics;
pub mod optimizer;
pub mod testing;

pub use catalog::{
    CatalogAccessor, CatalogError, CatalogSnapshot, Club, ClubId, Competition, CompetitionId,
    CompetitionInfo, ImportSummary, Provider, ProviderId, SqliteCatalog,
};
pub use config::{
    load_config, load_config_from_str, validate_config, CatalogConfig, Config, ConfigError,
    DatabaseConfig, ServerConfig,
};
pub use coverage::{
    BestProviderCoverage, CombinationResult, CompetitionCoveragePolicy, CompetitionDetail,
    CoverageError, CoverageEvaluator,
};
pub use optimizer::{
    OptimizationRequest, OptimizeError, Optimizer, OptimizerConfig, RecommendationTiers,
    ResultCache, SavingsEstimate, SearchPolicy,
};
