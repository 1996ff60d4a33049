//! affils-svc library - Affiliations service
//!
//! CRUD service for curation expert panel affiliations: sequential
//! identifier allocation, expert panel ID derivation, cross-field
//! consistency validation, and the REST surface over the shared database.

use axum::{middleware, routing::get, Router};
use sqlx::SqlitePool;

pub mod api;
pub mod db;
pub mod ids;
pub mod sentinels;
pub mod validate;

pub use sentinels::Sentinels;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Sentinel working group references resolved at startup
    pub sentinels: Sentinels,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, sentinels: Sentinels) -> Self {
        Self { db, sentinels }
    }
}

/// Build application router
///
/// Protected routes require an API key; the health endpoint does not.
pub fn build_router(state: AppState) -> Router {
    use axum::routing::put;

    let protected = Router::new()
        .route(
            "/api/affiliations",
            get(api::affiliations::list_affiliations).post(api::affiliations::create_affiliation),
        )
        .route(
            "/api/affiliations/:affiliation_id",
            get(api::affiliations::get_affiliation).delete(api::affiliations::delete_affiliation),
        )
        .route(
            "/api/affiliations/uuid/:external_uuid",
            get(api::affiliations::get_affiliation_by_uuid),
        )
        .route(
            "/api/affiliations/affiliation_id/:affiliation_id",
            put(api::affiliations::update_by_affiliation_id),
        )
        .route(
            "/api/affiliations/expert_panel_id/:expert_panel_id",
            put(api::affiliations::update_by_expert_panel_id),
        )
        .route(
            "/api/working_groups",
            get(api::working_groups::list_working_groups)
                .post(api::working_groups::create_working_group),
        )
        .route(
            "/api/working_groups/:id",
            get(api::working_groups::get_working_group)
                .put(api::working_groups::update_working_group),
        )
        .route(
            "/api/working_groups/name/:name",
            get(api::working_groups::get_working_group_by_name),
        )
        .route("/api/legacy/affiliations", get(api::legacy::legacy_list))
        .route("/api/legacy/affiliation", get(api::legacy::legacy_detail))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    // Public routes (no authentication)
    let public = Router::new().merge(api::health_routes());

    // Combine routers
    Router::new()
        .merge(protected)
        .merge(public)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
