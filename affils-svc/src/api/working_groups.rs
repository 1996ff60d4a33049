//! Working group CRUD endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use affils_common::db::models::WorkingGroup;

use crate::api::ApiError;
use crate::db::working_groups::{self, WorkingGroupInput};
use crate::AppState;

/// GET /api/working_groups
pub async fn list_working_groups(
    State(state): State<AppState>,
) -> Result<Json<Vec<WorkingGroup>>, ApiError> {
    let groups = working_groups::list_working_groups(&state.db).await?;
    Ok(Json(groups))
}

/// POST /api/working_groups
pub async fn create_working_group(
    State(state): State<AppState>,
    Json(input): Json<WorkingGroupInput>,
) -> Result<(StatusCode, Json<WorkingGroup>), ApiError> {
    let group = working_groups::create_working_group(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// GET /api/working_groups/:id
pub async fn get_working_group(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<WorkingGroup>, ApiError> {
    let group = working_groups::get_working_group(&state.db, id).await?;
    Ok(Json(group))
}

/// GET /api/working_groups/name/:name
pub async fn get_working_group_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<WorkingGroup>, ApiError> {
    let group = working_groups::get_working_group_by_name(&state.db, &name).await?;
    Ok(Json(group))
}

/// PUT /api/working_groups/:id
pub async fn update_working_group(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<WorkingGroupInput>,
) -> Result<Json<WorkingGroup>, ApiError> {
    let group = working_groups::update_working_group(&state.db, id, input).await?;
    Ok(Json(group))
}
