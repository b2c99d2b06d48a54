use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fanpass_core::{
    load_config, validate_config, CatalogAccessor, CatalogSnapshot, Optimizer, ResultCache,
    SqliteCatalog,
};
use fanpass_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("FANPASS_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        config_hash = &config_hash[..16],
        "Configuration loaded successfully"
    );
    info!("Database path: {:?}", config.database.path);
    info!(
        "Optimizer: thresholds {:?}, max combination size {}, policy {:?}, {} worker(s)",
        config.optimizer.thresholds,
        config.optimizer.max_combination_size,
        config.optimizer.search_policy,
        config.optimizer.parallel_workers
    );

    // Create SQLite catalog
    let catalog = Arc::new(
        SqliteCatalog::new(&config.database.path).context("Failed to open catalog database")?,
    );

    // Seed the catalog if configured
    if let Some(seed_path) = &config.catalog.seed_path {
        seed_catalog(&catalog, seed_path)?;
    }

    let providers = catalog
        .list_providers()
        .await
        .context("Failed to read catalog")?;
    info!("Catalog initialized with {} providers", providers.len());

    // Create optimizer with its result cache
    let optimizer = Arc::new(Optimizer::new(
        Arc::clone(&catalog) as Arc<dyn CatalogAccessor>,
        Arc::new(ResultCache::new()),
        config.optimizer.clone(),
    ));

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), catalog, optimizer));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");

    Ok(())
}

/// Replace the stored catalog with the JSON snapshot at `path`.
fn seed_catalog(catalog: &SqliteCatalog, path: &Path) -> Result<()> {
    info!("Importing catalog snapshot from {:?}", path);
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog snapshot {:?}", path))?;
    let snapshot: CatalogSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse catalog snapshot {:?}", path))?;
    let summary = catalog
        .import(&snapshot)
        .context("Failed to import catalog snapshot")?;
    info!(
        clubs = summary.clubs,
        competitions = summary.competitions,
        providers = summary.providers,
        fingerprint = %summary.fingerprint,
        "Catalog snapshot imported"
    );
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
