//! Affiliation CRUD endpoints
//!
//! Creation never accepts identifiers from the caller; they are allocated
//! and derived inside one transaction. Updates accept either identifier as
//! the lookup key and reject changes to immutable fields.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

use crate::api::ApiError;
use crate::db::affiliations::{
    self, AffiliationKey, AffiliationRecord, AffiliationUpdate, NewAffiliation,
};
use crate::AppState;

/// GET /api/affiliations
///
/// List all affiliations that have not been soft-deleted.
pub async fn list_affiliations(
    State(state): State<AppState>,
) -> Result<Json<Vec<AffiliationRecord>>, ApiError> {
    let records = affiliations::list_affiliations(&state.db).await?;
    Ok(Json(records))
}

/// POST /api/affiliations
///
/// Create an affiliation through the allocation pipeline.
pub async fn create_affiliation(
    State(state): State<AppState>,
    Json(new): Json<NewAffiliation>,
) -> Result<(StatusCode, Json<AffiliationRecord>), ApiError> {
    let record = affiliations::create_affiliation(&state.db, &state.sentinels, new).await?;
    info!(
        "Created affiliation {} (expert panel {:?})",
        record.affiliation_id, record.expert_panel_id
    );
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/affiliations/:affiliation_id
pub async fn get_affiliation(
    State(state): State<AppState>,
    Path(affiliation_id): Path<i64>,
) -> Result<Json<AffiliationRecord>, ApiError> {
    let record = affiliations::get_by_affiliation_id(&state.db, affiliation_id).await?;
    Ok(Json(record))
}

/// GET /api/affiliations/uuid/:external_uuid
pub async fn get_affiliation_by_uuid(
    State(state): State<AppState>,
    Path(external_uuid): Path<Uuid>,
) -> Result<Json<AffiliationRecord>, ApiError> {
    let record = affiliations::get_by_external_uuid(&state.db, external_uuid).await?;
    Ok(Json(record))
}

/// PUT /api/affiliations/affiliation_id/:affiliation_id
pub async fn update_by_affiliation_id(
    State(state): State<AppState>,
    Path(affiliation_id): Path<i64>,
    Json(update): Json<AffiliationUpdate>,
) -> Result<Json<AffiliationRecord>, ApiError> {
    let record = affiliations::update_affiliation(
        &state.db,
        &state.sentinels,
        AffiliationKey::AffiliationId(affiliation_id),
        update,
    )
    .await?;
    Ok(Json(record))
}

/// PUT /api/affiliations/expert_panel_id/:expert_panel_id
pub async fn update_by_expert_panel_id(
    State(state): State<AppState>,
    Path(expert_panel_id): Path<i64>,
    Json(update): Json<AffiliationUpdate>,
) -> Result<Json<AffiliationRecord>, ApiError> {
    let record = affiliations::update_affiliation(
        &state.db,
        &state.sentinels,
        AffiliationKey::ExpertPanelId(expert_panel_id),
        update,
    )
    .await?;
    Ok(Json(record))
}

/// DELETE /api/affiliations/:affiliation_id
///
/// Soft delete: the record stays in storage and keeps its identifiers.
pub async fn delete_affiliation(
    State(state): State<AppState>,
    Path(affiliation_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    affiliations::soft_delete_affiliation(&state.db, affiliation_id).await?;
    info!("Soft-deleted affiliation {}", affiliation_id);
    Ok(StatusCode::NO_CONTENT)
}
