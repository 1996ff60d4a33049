//! Working group persistence
//!
//! Names are unique case-insensitively; the check excludes the record being
//! updated so re-casing an existing name is allowed.

use affils_common::db::models::WorkingGroup;
use affils_common::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::validate::validate_unique_working_group_name;

/// Create/update payload for a working group
#[derive(Debug, Clone, Deserialize)]
pub struct WorkingGroupInput {
    pub name: String,
}

/// List all working groups ordered by name
pub async fn list_working_groups(db: &SqlitePool) -> Result<Vec<WorkingGroup>> {
    let rows: Vec<(i64, String)> =
        sqlx::query_as("SELECT id, name FROM working_groups ORDER BY name")
            .fetch_all(db)
            .await?;

    Ok(rows
        .into_iter()
        .map(|(id, name)| WorkingGroup { id, name })
        .collect())
}

/// Look up one working group by row ID
pub async fn get_working_group(db: &SqlitePool, id: i64) -> Result<WorkingGroup> {
    let row: Option<(i64, String)> =
        sqlx::query_as("SELECT id, name FROM working_groups WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await?;

    row.map(|(id, name)| WorkingGroup { id, name })
        .ok_or_else(|| Error::NotFound(format!("Working group {} not found", id)))
}

/// Look up one working group by name, case-insensitively
pub async fn get_working_group_by_name(db: &SqlitePool, name: &str) -> Result<WorkingGroup> {
    let row: Option<(i64, String)> =
        sqlx::query_as("SELECT id, name FROM working_groups WHERE name = ? COLLATE NOCASE")
            .bind(name)
            .fetch_optional(db)
            .await?;

    row.map(|(id, name)| WorkingGroup { id, name })
        .ok_or_else(|| Error::NotFound(format!("Working group '{}' not found", name)))
}

/// Create a working group with a unique name
pub async fn create_working_group(db: &SqlitePool, input: WorkingGroupInput) -> Result<WorkingGroup> {
    let name = normalized_name(&input)?;
    validate_unique_working_group_name(db, name, None).await?;

    let id = sqlx::query("INSERT INTO working_groups (name) VALUES (?)")
        .bind(name)
        .execute(db)
        .await?
        .last_insert_rowid();

    get_working_group(db, id).await
}

/// Rename an existing working group
pub async fn update_working_group(
    db: &SqlitePool,
    id: i64,
    input: WorkingGroupInput,
) -> Result<WorkingGroup> {
    // Lookup first so a missing record reports 404 rather than a name clash
    get_working_group(db, id).await?;

    let name = normalized_name(&input)?;
    validate_unique_working_group_name(db, name, Some(id)).await?;

    sqlx::query("UPDATE working_groups SET name = ? WHERE id = ?")
        .bind(name)
        .bind(id)
        .execute(db)
        .await?;

    get_working_group(db, id).await
}

fn normalized_name(input: &WorkingGroupInput) -> Result<&str> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(Error::invalid_input("name", "This field is required."));
    }
    Ok(name)
}
