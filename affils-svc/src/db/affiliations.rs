//! Affiliation persistence
//!
//! Creation runs the full allocate -> derive -> validate pipeline inside one
//! transaction; the affiliation row and all of its child rows persist
//! together or not at all. Updates replace the child collections wholesale
//! (delete all, recreate) inside the same transaction as the scalar changes.

use affils_common::db::models::{
    AffiliationRow, AffiliationStatus, AffiliationType, Approver, Coordinator, SubmitterId,
    WorkingGroup,
};
use affils_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::ids::{allocate_next_affiliation_id, derive_expert_panel_id};
use crate::sentinels::Sentinels;
use crate::validate;

/// Creation payload
///
/// Identifier fields are present only so that caller-supplied values can be
/// rejected explicitly; they must always be absent.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAffiliation {
    pub affiliation_id: Option<i64>,
    pub expert_panel_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: AffiliationType,
    pub status: AffiliationStatus,
    pub full_name: String,
    pub short_name: Option<String>,
    pub working_group_id: i64,
    pub members: Option<String>,
    pub external_uuid: Option<Uuid>,
    #[serde(default)]
    pub coordinators: Vec<Coordinator>,
    #[serde(default)]
    pub approvers: Vec<Approver>,
    #[serde(default)]
    pub clinvar_submitter_ids: Vec<SubmitterId>,
}

/// Partial update payload
///
/// Absent scalar fields keep their stored values. Child collections are
/// always replaced with the supplied lists; an absent list clears the
/// collection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AffiliationUpdate {
    pub affiliation_id: Option<i64>,
    pub expert_panel_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<AffiliationType>,
    pub status: Option<AffiliationStatus>,
    pub full_name: Option<String>,
    pub short_name: Option<String>,
    pub working_group_id: Option<i64>,
    pub members: Option<String>,
    pub is_deleted: Option<bool>,
    pub external_uuid: Option<Uuid>,
    #[serde(default)]
    pub coordinators: Vec<Coordinator>,
    #[serde(default)]
    pub approvers: Vec<Approver>,
    #[serde(default)]
    pub clinvar_submitter_ids: Vec<SubmitterId>,
}

/// A fully loaded affiliation: row fields, working group and child records
#[derive(Debug, Clone, Serialize)]
pub struct AffiliationRecord {
    pub id: i64,
    pub affiliation_id: i64,
    pub expert_panel_id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: AffiliationType,
    pub status: AffiliationStatus,
    pub full_name: String,
    pub short_name: Option<String>,
    pub working_group: WorkingGroup,
    pub members: Option<String>,
    pub is_deleted: bool,
    pub external_uuid: Option<Uuid>,
    pub coordinators: Vec<Coordinator>,
    pub approvers: Vec<Approver>,
    pub clinvar_submitter_ids: Vec<SubmitterId>,
}

/// Lookup key accepted by the update operation
#[derive(Debug, Clone, Copy)]
pub enum AffiliationKey {
    AffiliationId(i64),
    ExpertPanelId(i64),
}

const ROW_COLUMNS: &str = "id, affiliation_id, expert_panel_id, type, status, full_name, \
                           short_name, working_group_id, members, is_deleted, external_uuid";

type AffiliationTuple = (
    i64,
    i64,
    Option<i64>,
    String,
    String,
    String,
    Option<String>,
    i64,
    Option<String>,
    i64,
    Option<String>,
);

fn row_from_tuple(t: AffiliationTuple) -> Result<AffiliationRow> {
    let external_uuid = match t.10 {
        Some(text) => Some(
            Uuid::parse_str(&text)
                .map_err(|e| Error::Internal(format!("Stored external_uuid is invalid: {}", e)))?,
        ),
        None => None,
    };

    Ok(AffiliationRow {
        id: t.0,
        affiliation_id: t.1,
        expert_panel_id: t.2,
        kind: t.3.parse()?,
        status: t.4.parse()?,
        full_name: t.5,
        short_name: t.6,
        working_group_id: t.7,
        members: t.8,
        is_deleted: t.9 != 0,
        external_uuid,
    })
}

// ============================================================================
// Create
// ============================================================================

/// Create an affiliation through the allocation pipeline
///
/// One atomic unit: identifier allocation, derivation, validation and the
/// insertion of the affiliation plus all child rows either all commit or all
/// roll back.
pub async fn create_affiliation(
    db: &SqlitePool,
    sentinels: &Sentinels,
    new: NewAffiliation,
) -> Result<AffiliationRecord> {
    validate::validate_no_caller_identifiers(&new)?;
    validate::validate_external_uuid_allowed(new.kind, new.external_uuid)?;

    let mut tx = db.begin().await?;

    let affiliation_id = allocate_next_affiliation_id(&mut tx).await?;
    let expert_panel_id = derive_expert_panel_id(affiliation_id, new.kind)?;

    ensure_working_group_exists(&mut tx, new.working_group_id).await?;
    validate::validate_type_matches_working_group(new.kind, new.working_group_id, sentinels)?;
    if let Some(external_uuid) = new.external_uuid {
        validate::validate_external_uuid_available(&mut tx, external_uuid, None).await?;
    }
    validate::validate_identifier_suffixes(affiliation_id, expert_panel_id)?;
    validate::validate_identifier_pair_available(&mut tx, affiliation_id, expert_panel_id, None)
        .await?;

    let row_id = sqlx::query(
        "INSERT INTO affiliations \
         (affiliation_id, expert_panel_id, type, status, full_name, short_name, \
          working_group_id, members, is_deleted, external_uuid) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
    )
    .bind(affiliation_id)
    .bind(expert_panel_id)
    .bind(new.kind.as_str())
    .bind(new.status.as_str())
    .bind(&new.full_name)
    .bind(&new.short_name)
    .bind(new.working_group_id)
    .bind(&new.members)
    .bind(new.external_uuid.map(|u| u.to_string()))
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    insert_children(
        &mut tx,
        row_id,
        &new.coordinators,
        &new.approvers,
        &new.clinvar_submitter_ids,
    )
    .await?;

    tx.commit().await?;

    get_by_row_id(db, row_id).await
}

// ============================================================================
// Update
// ============================================================================

/// Update an affiliation looked up by either identifier
///
/// Immutable-field violations abort before anything is written, reporting
/// every offending field together. Child collections are replaced wholesale
/// within the same transaction.
pub async fn update_affiliation(
    db: &SqlitePool,
    sentinels: &Sentinels,
    key: AffiliationKey,
    update: AffiliationUpdate,
) -> Result<AffiliationRecord> {
    let mut tx = db.begin().await?;

    let existing = fetch_row_by_key(&mut tx, key).await?;

    let violations = validate::immutable_field_violations(&existing, &update);
    if !violations.is_empty() {
        return Err(Error::ImmutableField {
            fields: violations.iter().map(|f| f.to_string()).collect(),
        });
    }

    // Type is immutable, so the stored type governs the working group rule
    // even when the payload omits it.
    let working_group_id = update.working_group_id.unwrap_or(existing.working_group_id);
    if working_group_id != existing.working_group_id {
        ensure_working_group_exists(&mut tx, working_group_id).await?;
    }
    validate::validate_type_matches_working_group(existing.kind, working_group_id, sentinels)?;

    sqlx::query(
        "UPDATE affiliations SET \
         status = COALESCE(?1, status), \
         full_name = COALESCE(?2, full_name), \
         short_name = COALESCE(?3, short_name), \
         working_group_id = ?4, \
         members = COALESCE(?5, members), \
         is_deleted = COALESCE(?6, is_deleted), \
         updated_at = CURRENT_TIMESTAMP \
         WHERE id = ?7",
    )
    .bind(update.status.map(|s| s.as_str()))
    .bind(&update.full_name)
    .bind(&update.short_name)
    .bind(working_group_id)
    .bind(&update.members)
    .bind(update.is_deleted.map(|d| d as i64))
    .bind(existing.id)
    .execute(&mut *tx)
    .await?;

    replace_children(
        &mut tx,
        existing.id,
        &update.coordinators,
        &update.approvers,
        &update.clinvar_submitter_ids,
    )
    .await?;

    tx.commit().await?;

    get_by_row_id(db, existing.id).await
}

// ============================================================================
// Lookups
// ============================================================================

/// Load one affiliation by internal row key
pub async fn get_by_row_id(db: &SqlitePool, row_id: i64) -> Result<AffiliationRecord> {
    let tuple: Option<AffiliationTuple> =
        sqlx::query_as(&format!("SELECT {} FROM affiliations WHERE id = ?", ROW_COLUMNS))
            .bind(row_id)
            .fetch_optional(db)
            .await?;

    let row = tuple
        .map(row_from_tuple)
        .transpose()?
        .ok_or_else(|| Error::NotFound(format!("Affiliation row {} not found", row_id)))?;

    load_record(db, row).await
}

/// Load one affiliation by its affiliation ID
pub async fn get_by_affiliation_id(db: &SqlitePool, affiliation_id: i64) -> Result<AffiliationRecord> {
    let tuple: Option<AffiliationTuple> = sqlx::query_as(&format!(
        "SELECT {} FROM affiliations WHERE affiliation_id = ?",
        ROW_COLUMNS
    ))
    .bind(affiliation_id)
    .fetch_optional(db)
    .await?;

    let row = tuple.map(row_from_tuple).transpose()?.ok_or_else(|| {
        Error::NotFound(format!("Affiliation {} not found", affiliation_id))
    })?;

    load_record(db, row).await
}

/// Load one affiliation by its expert panel ID
pub async fn get_by_expert_panel_id(db: &SqlitePool, expert_panel_id: i64) -> Result<AffiliationRecord> {
    let tuple: Option<AffiliationTuple> = sqlx::query_as(&format!(
        "SELECT {} FROM affiliations WHERE expert_panel_id = ?",
        ROW_COLUMNS
    ))
    .bind(expert_panel_id)
    .fetch_optional(db)
    .await?;

    let row = tuple.map(row_from_tuple).transpose()?.ok_or_else(|| {
        Error::NotFound(format!("Expert panel {} not found", expert_panel_id))
    })?;

    load_record(db, row).await
}

/// Load one affiliation by its external UUID
pub async fn get_by_external_uuid(db: &SqlitePool, external_uuid: Uuid) -> Result<AffiliationRecord> {
    let tuple: Option<AffiliationTuple> = sqlx::query_as(&format!(
        "SELECT {} FROM affiliations WHERE external_uuid = ?",
        ROW_COLUMNS
    ))
    .bind(external_uuid.to_string())
    .fetch_optional(db)
    .await?;

    let row = tuple.map(row_from_tuple).transpose()?.ok_or_else(|| {
        Error::NotFound(format!("Affiliation with UUID {} not found", external_uuid))
    })?;

    load_record(db, row).await
}

/// List affiliations, excluding soft-deleted records
pub async fn list_affiliations(db: &SqlitePool) -> Result<Vec<AffiliationRecord>> {
    let tuples: Vec<AffiliationTuple> = sqlx::query_as(&format!(
        "SELECT {} FROM affiliations WHERE is_deleted = 0 ORDER BY affiliation_id",
        ROW_COLUMNS
    ))
    .fetch_all(db)
    .await?;

    let mut records = Vec::with_capacity(tuples.len());
    for tuple in tuples {
        records.push(load_record(db, row_from_tuple(tuple)?).await?);
    }
    Ok(records)
}

/// Soft-delete an affiliation by its affiliation ID
///
/// The record stays in storage with its identifiers; it is only excluded
/// from default listings. Slots are never freed for reuse.
pub async fn soft_delete_affiliation(db: &SqlitePool, affiliation_id: i64) -> Result<()> {
    let result = sqlx::query(
        "UPDATE affiliations SET is_deleted = 1, updated_at = CURRENT_TIMESTAMP \
         WHERE affiliation_id = ?",
    )
    .bind(affiliation_id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "Affiliation {} not found",
            affiliation_id
        )));
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

async fn fetch_row_by_key(
    tx: &mut Transaction<'_, Sqlite>,
    key: AffiliationKey,
) -> Result<AffiliationRow> {
    let (sql, value) = match key {
        AffiliationKey::AffiliationId(id) => (
            format!("SELECT {} FROM affiliations WHERE affiliation_id = ?", ROW_COLUMNS),
            id,
        ),
        AffiliationKey::ExpertPanelId(id) => (
            format!("SELECT {} FROM affiliations WHERE expert_panel_id = ?", ROW_COLUMNS),
            id,
        ),
    };

    let tuple: Option<AffiliationTuple> = sqlx::query_as(&sql)
        .bind(value)
        .fetch_optional(&mut **tx)
        .await?;

    tuple
        .map(row_from_tuple)
        .transpose()?
        .ok_or_else(|| Error::NotFound("Affiliation not found".to_string()))
}

async fn ensure_working_group_exists(
    tx: &mut Transaction<'_, Sqlite>,
    working_group_id: i64,
) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM working_groups WHERE id = ?")
        .bind(working_group_id)
        .fetch_one(&mut **tx)
        .await?;

    if count == 0 {
        return Err(Error::invalid_input(
            "working_group_id",
            format!("Unknown working group: {}", working_group_id),
        ));
    }
    Ok(())
}

async fn insert_children(
    tx: &mut Transaction<'_, Sqlite>,
    row_id: i64,
    coordinators: &[Coordinator],
    approvers: &[Approver],
    submitter_ids: &[SubmitterId],
) -> Result<()> {
    for coordinator in coordinators {
        sqlx::query(
            "INSERT INTO coordinators (affiliation_row, coordinator_name, coordinator_email) \
             VALUES (?, ?, ?)",
        )
        .bind(row_id)
        .bind(&coordinator.coordinator_name)
        .bind(&coordinator.coordinator_email)
        .execute(&mut **tx)
        .await?;
    }

    for approver in approvers {
        sqlx::query("INSERT INTO approvers (affiliation_row, approver_name) VALUES (?, ?)")
            .bind(row_id)
            .bind(&approver.approver_name)
            .execute(&mut **tx)
            .await?;
    }

    for submitter in submitter_ids {
        sqlx::query(
            "INSERT INTO submitter_ids (affiliation_row, clinvar_submitter_id) VALUES (?, ?)",
        )
        .bind(row_id)
        .bind(&submitter.clinvar_submitter_id)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Replace all child collections: delete everything, recreate from the lists
async fn replace_children(
    tx: &mut Transaction<'_, Sqlite>,
    row_id: i64,
    coordinators: &[Coordinator],
    approvers: &[Approver],
    submitter_ids: &[SubmitterId],
) -> Result<()> {
    for table in ["coordinators", "approvers", "submitter_ids"] {
        sqlx::query(&format!("DELETE FROM {} WHERE affiliation_row = ?", table))
            .bind(row_id)
            .execute(&mut **tx)
            .await?;
    }

    insert_children(tx, row_id, coordinators, approvers, submitter_ids).await
}

async fn load_record(db: &SqlitePool, row: AffiliationRow) -> Result<AffiliationRecord> {
    let working_group: Option<(i64, String)> =
        sqlx::query_as("SELECT id, name FROM working_groups WHERE id = ?")
            .bind(row.working_group_id)
            .fetch_optional(db)
            .await?;
    let working_group = working_group
        .map(|(id, name)| WorkingGroup { id, name })
        .ok_or_else(|| {
            Error::Internal(format!(
                "Affiliation {} references missing working group {}",
                row.affiliation_id, row.working_group_id
            ))
        })?;

    let coordinators: Vec<(String, String)> = sqlx::query_as(
        "SELECT coordinator_name, coordinator_email FROM coordinators \
         WHERE affiliation_row = ? ORDER BY id",
    )
    .bind(row.id)
    .fetch_all(db)
    .await?;

    let approvers: Vec<(String,)> = sqlx::query_as(
        "SELECT approver_name FROM approvers WHERE affiliation_row = ? ORDER BY id",
    )
    .bind(row.id)
    .fetch_all(db)
    .await?;

    let submitter_ids: Vec<(String,)> = sqlx::query_as(
        "SELECT clinvar_submitter_id FROM submitter_ids WHERE affiliation_row = ? ORDER BY id",
    )
    .bind(row.id)
    .fetch_all(db)
    .await?;

    Ok(AffiliationRecord {
        id: row.id,
        affiliation_id: row.affiliation_id,
        expert_panel_id: row.expert_panel_id,
        kind: row.kind,
        status: row.status,
        full_name: row.full_name,
        short_name: row.short_name,
        working_group,
        members: row.members,
        is_deleted: row.is_deleted,
        external_uuid: row.external_uuid,
        coordinators: coordinators
            .into_iter()
            .map(|(coordinator_name, coordinator_email)| Coordinator {
                coordinator_name,
                coordinator_email,
            })
            .collect(),
        approvers: approvers
            .into_iter()
            .map(|(approver_name,)| Approver { approver_name })
            .collect(),
        clinvar_submitter_ids: submitter_ids
            .into_iter()
            .map(|(clinvar_submitter_id,)| SubmitterId {
                clinvar_submitter_id,
            })
            .collect(),
    })
}
