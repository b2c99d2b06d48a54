//! Common test utilities for API testing.
//!
//! This module provides a test fixture that builds the full router in-process
//! over a SQLite catalog seeded from the core fixtures, or over a mock catalog
//! when catalog failures need to be injected.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use fanpass_core::{
    testing::MockCatalog, CatalogAccessor, CatalogSnapshot, Config, DatabaseConfig, Optimizer,
    OptimizerConfig, ResultCache, ServerConfig, SqliteCatalog,
};

/// Re-export fixtures for test convenience
pub use fanpass_core::testing::fixtures;

/// Test fixture for in-process API testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_optimize() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/optimize", json!({
///         "club_ids": [10]
///     })).await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// SQLite catalog behind the browse and import endpoints
    pub catalog: Arc<SqliteCatalog>,
    /// Mock catalog behind the optimizer, when requested
    pub mock_catalog: Option<Arc<MockCatalog>>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Serve the optimizer from a `MockCatalog` instead of SQLite
    pub mock_optimizer_catalog: bool,
    /// Optimizer settings
    pub optimizer: OptimizerConfig,
}

impl TestConfig {
    /// Create config with the optimizer reading from a mock catalog.
    pub fn with_mock_catalog() -> Self {
        Self {
            mock_optimizer_catalog: true,
            ..Default::default()
        }
    }
}

impl TestFixture {
    /// Create a fixture seeded with the German football snapshot.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        Self::build(fixtures::german_football_snapshot(), test_config).await
    }

    async fn build(snapshot: CatalogSnapshot, test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            optimizer: test_config.optimizer.clone(),
            ..Default::default()
        };

        let catalog = Arc::new(SqliteCatalog::new(&db_path).expect("Failed to create catalog"));
        catalog.import(&snapshot).expect("Failed to seed catalog");

        let mock_catalog = test_config
            .mock_optimizer_catalog
            .then(|| Arc::new(MockCatalog::with_snapshot(snapshot)));

        let optimizer_catalog: Arc<dyn CatalogAccessor> = match &mock_catalog {
            Some(mock) => Arc::clone(mock) as Arc<dyn CatalogAccessor>,
            None => Arc::clone(&catalog) as Arc<dyn CatalogAccessor>,
        };

        let optimizer = Arc::new(Optimizer::new(
            optimizer_catalog,
            Arc::new(ResultCache::new()),
            test_config.optimizer,
        ));

        let state = Arc::new(fanpass_server::state::AppState::new(
            config,
            Arc::clone(&catalog),
            optimizer,
        ));

        let router = fanpass_server::api::create_router(state);

        Self {
            router,
            catalog,
            mock_catalog,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
