//! Sift Web Server
//!
//! Axum-based REST API for the Sift categorization engine.
//!
//! Security features:
//! - Restrictive CORS policy
//! - Input validation (batch size, pagination and body limits)
//! - Audit logging for all API access (reads and writes)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use sift_core::{BatchCoordinator, CategorizationEngine, Database, EngineConfig, IndexCache};

mod handlers;

/// Maximum request body for batch endpoints (10 MB)
pub const MAX_BATCH_BODY: usize = 10 * 1024 * 1024;

/// Maximum body for small JSON requests (10 KB)
pub const MAX_JSON_BODY: usize = 1024 * 10;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Header naming the requesting user
pub const USER_HEADER: &str = "x-sift-user";

/// User assumed when no user header is sent
pub const DEFAULT_USER: &str = "local-dev";

/// Prepared category indexes kept per server
const INDEX_CACHE_CAPACITY: usize = 64;

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// Create config from environment variables
    ///
    /// - `SIFT_ALLOWED_ORIGINS`: comma-separated CORS origins
    pub fn from_env() -> Self {
        let allowed_origins = std::env::var("SIFT_ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self { allowed_origins }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    /// Engine plus the worker pool used for batch requests
    pub batch: BatchCoordinator,
    /// Prepared indexes keyed by category-set version
    pub index_cache: IndexCache,
}

impl AppState {
    pub fn engine(&self) -> &CategorizationEngine {
        self.batch.engine()
    }

    pub fn engine_config(&self) -> &EngineConfig {
        self.batch.engine().config()
    }
}

/// Get the requesting user from the user header
pub fn get_user_id(headers: &HeaderMap) -> String {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_USER)
        .to_string()
}

/// Create the application router
pub fn create_router(
    db: Database,
    engine_config: EngineConfig,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<Router> {
    let batch = BatchCoordinator::from_engine(CategorizationEngine::new(engine_config))?;
    info!(
        "Categorization engine ready ({} batch workers, max batch {})",
        batch.workers(),
        batch.engine().config().batch.max_batch_size
    );

    let state = Arc::new(AppState {
        db,
        batch,
        index_cache: IndexCache::new(INDEX_CACHE_CAPACITY),
    });

    let api_routes = Router::new()
        // Categorization
        .route("/categorize/test", post(handlers::test_categorization))
        .route("/categorize/preview", post(handlers::preview_categorization))
        .route("/categorize/analyze", post(handlers::analyze_categorization))
        .route("/categorize/apply", post(handlers::apply_categorization))
        .route(
            "/categorize/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        // Categories
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/categories/:id",
            get(handlers::get_category)
                .patch(handlers::update_category)
                .delete(handlers::delete_category),
        )
        // Audit
        .route("/audit", get(handlers::list_audit_log));

    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    Ok(app)
}

/// Start the server
pub async fn serve(
    db: Database,
    engine_config: EngineConfig,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    serve_with_config(db, engine_config, host, port, static_dir, ServerConfig::from_env()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    engine_config: EngineConfig,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    match db.seed_system_categories() {
        Ok(count) if count > 0 => info!("Seeded {} system categories", count),
        Ok(_) => {}
        Err(e) => warn!("Failed to seed system categories: {}", e),
    }

    let app = create_router(db, engine_config, static_dir, config)?;
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();

        // Caller mistakes are reported as-is; everything else is sanitized
        if let Some(core) = err.downcast_ref::<sift_core::Error>() {
            if core.is_validation() {
                return Self::bad_request(&core.to_string());
            }
            if let sift_core::Error::NotFound(what) = core {
                return Self::not_found(what);
            }
        }

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "An internal error occurred".to_string(),
            internal: Some(err),
        }
    }
}

/// Generic success body for operations without a payload
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}
