/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tasktrack_api::{app::AppState, config::Config};
/// use tasktrack_shared::audit::TracingAuditSink;
/// use tasktrack_shared::store::memory::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(Arc::new(MemoryStore::new()), config, Arc::new(TracingAuditSink));
/// let app = tasktrack_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tasktrack_shared::{
    audit::{AuditEvent, AuditSink},
    auth::principal::authenticate,
    db::{migrations::run_migrations, pool},
    store::{memory::MemoryStore, postgres::PgStore, Store},
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// User and task storage
    pub store: Arc<dyn Store>,

    /// Application configuration
    pub config: Arc<Config>,

    /// Receives one event per mutation
    pub audit: Arc<dyn AuditSink>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store,
            config: Arc::new(config),
            audit,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    pub fn record(&self, event: AuditEvent) {
        self.audit.record(event);
    }
}

/// Opens the store selected by `DATABASE_URL`
///
/// Postgres pools are migrated before they are handed out. The in-memory
/// store starts empty and is lost on exit.
pub async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    if config.is_memory_store() {
        tracing::warn!("Using the in-memory store; data will not survive a restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let pool = pool::create_pool(pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;
    run_migrations(&pool).await?;

    Ok(Arc::new(PgStore::new(pool)))
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                                  # public
/// ├── /api/token/
/// │   ├── POST /api/token/                          # public
/// │   └── POST /api/token/refresh/                  # public
/// ├── /api/tasks/                                   # bearer
/// │   ├── GET    /api/tasks/
/// │   ├── POST   /api/tasks/create/
/// │   ├── GET    /api/tasks/:id/
/// │   ├── PATCH  /api/tasks/:id/update-description/
/// │   ├── PATCH  /api/tasks/:id/toggle-complete/
/// │   └── DELETE /api/tasks/:id/delete/
/// └── /api/users/
///     ├── POST /api/users/register/                 # public
///     ├── GET  /api/users/                          # bearer
///     └── GET|PUT|PATCH|DELETE /api/users/profiles/:id/   # bearer
/// ```
///
/// # Middleware Stack
///
/// Applied in order (innermost first):
/// 1. Authentication (protected routes only)
/// 2. Compression
/// 3. Logging (tower-http TraceLayer)
/// 4. CORS
/// 5. Security headers
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/token/", post(routes::auth::obtain_token))
        .route("/api/token/refresh/", post(routes::auth::refresh_token))
        .route("/api/users/register/", post(routes::users::register));

    let task_routes = Router::new()
        .route("/api/tasks/", get(routes::tasks::list_tasks))
        .route("/api/tasks/create/", post(routes::tasks::create_task))
        .route("/api/tasks/:id/", get(routes::tasks::get_task))
        .route(
            "/api/tasks/:id/update-description/",
            patch(routes::tasks::update_description),
        )
        .route(
            "/api/tasks/:id/toggle-complete/",
            patch(routes::tasks::toggle_complete),
        )
        .route(
            "/api/tasks/:id/delete/",
            axum::routing::delete(routes::tasks::delete_task),
        );

    let user_routes = Router::new()
        .route("/api/users/", get(routes::users::list_users))
        .route(
            "/api/users/profiles/:id/",
            get(routes::users::get_profile)
                .put(routes::users::replace_profile)
                .patch(routes::users::patch_profile)
                .delete(routes::users::delete_profile),
        );

    let protected_routes = Router::new()
        .merge(task_routes)
        .merge(user_routes)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
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
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Bearer authentication layer
///
/// Resolves the access token to an active user and inserts the
/// [`Principal`](tasktrack_shared::auth::principal::Principal) into request
/// extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let principal = authenticate(state.store.as_ref(), authorization, state.jwt_secret()).await?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}
