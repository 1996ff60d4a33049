//! Cross-field consistency validation
//!
//! Every rule here must pass before a create or update commits; any failure
//! aborts the surrounding transaction with no partial writes. This module
//! owns all type/working-group rules - identifier derivation (ids module)
//! performs none of them.

use affils_common::db::models::{AffiliationRow, AffiliationType};
use affils_common::{Error, Result};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::db::affiliations::{AffiliationUpdate, NewAffiliation};
use crate::sentinels::Sentinels;

/// Fields that may never change after creation
pub const IMMUTABLE_FIELDS: [&str; 4] =
    ["affiliation_id", "expert_panel_id", "type", "external_uuid"];

/// Reject caller-supplied identifiers on create
///
/// Identifiers are always system-generated; a creation payload carrying
/// either one is invalid input, checked before allocation runs.
pub fn validate_no_caller_identifiers(new: &NewAffiliation) -> Result<()> {
    if new.affiliation_id.is_some() {
        return Err(Error::invalid_input(
            "affiliation_id",
            "This field is system-generated and cannot be supplied.",
        ));
    }
    if new.expert_panel_id.is_some() {
        return Err(Error::invalid_input(
            "expert_panel_id",
            "This field is system-generated and cannot be supplied.",
        ));
    }
    Ok(())
}

/// Enforce the type/working-group pairing rules
///
/// SC_VCEP records must reference the "Somatic Cancer" group; independent
/// curation groups must reference the sentinel "None" group. Other types are
/// unconstrained by this rule.
pub fn validate_type_matches_working_group(
    kind: AffiliationType,
    working_group_id: i64,
    sentinels: &Sentinels,
) -> Result<()> {
    match kind {
        AffiliationType::ScVcep if working_group_id != sentinels.somatic_cancer => {
            Err(Error::TypeWorkingGroupMismatch(
                "If type is 'Somatic Cancer Variant Curation Expert Panel', \
                 then working group must be 'Somatic Cancer'."
                    .to_string(),
            ))
        }
        AffiliationType::IndependentCuration if working_group_id != sentinels.none => {
            Err(Error::TypeWorkingGroupMismatch(
                "If type is 'Independent Curation Group', then working group must be 'None'."
                    .to_string(),
            ))
        }
        _ => Ok(()),
    }
}

/// The last three decimal digits of both identifiers must agree
pub fn validate_identifier_suffixes(
    affiliation_id: i64,
    expert_panel_id: Option<i64>,
) -> Result<()> {
    if let Some(ep_id) = expert_panel_id {
        if affiliation_id % 1000 != ep_id % 1000 {
            return Err(Error::InconsistentIdentifier {
                affiliation_id,
                expert_panel_id: ep_id,
            });
        }
    }
    Ok(())
}

/// Fail if either identifier collides with a different existing record
///
/// `exclude_row` skips the record being updated so an unchanged pair always
/// passes. The error names every identifier that collided.
pub async fn validate_identifier_pair_available(
    tx: &mut Transaction<'_, Sqlite>,
    affiliation_id: i64,
    expert_panel_id: Option<i64>,
    exclude_row: Option<i64>,
) -> Result<()> {
    let mut fields = Vec::new();

    let affil_taken: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM affiliations \
         WHERE affiliation_id = ?1 AND (?2 IS NULL OR id != ?2)",
    )
    .bind(affiliation_id)
    .bind(exclude_row)
    .fetch_one(&mut **tx)
    .await?;
    if affil_taken > 0 {
        fields.push("affiliation_id".to_string());
    }

    if let Some(ep_id) = expert_panel_id {
        let ep_taken: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM affiliations \
             WHERE expert_panel_id = ?1 AND (?2 IS NULL OR id != ?2)",
        )
        .bind(ep_id)
        .bind(exclude_row)
        .fetch_one(&mut **tx)
        .await?;
        if ep_taken > 0 {
            fields.push("expert_panel_id".to_string());
        }
    }

    if fields.is_empty() {
        Ok(())
    } else {
        Err(Error::DuplicateIdentifier { fields })
    }
}

/// Collect every immutable field an update tries to change
///
/// Re-supplying the current value is allowed; only a differing value is a
/// violation. All offending fields are returned together so the caller can
/// report them in one combined error.
pub fn immutable_field_violations(
    existing: &AffiliationRow,
    update: &AffiliationUpdate,
) -> Vec<&'static str> {
    let mut violations = Vec::new();

    if let Some(affiliation_id) = update.affiliation_id {
        if affiliation_id != existing.affiliation_id {
            violations.push("affiliation_id");
        }
    }
    if let Some(ep_id) = update.expert_panel_id {
        if existing.expert_panel_id != Some(ep_id) {
            violations.push("expert_panel_id");
        }
    }
    if let Some(kind) = update.kind {
        if kind != existing.kind {
            violations.push("type");
        }
    }
    if let Some(external_uuid) = update.external_uuid {
        if existing.external_uuid != Some(external_uuid) {
            violations.push("external_uuid");
        }
    }

    violations
}

/// External UUIDs are forbidden on independent curation groups
pub fn validate_external_uuid_allowed(
    kind: AffiliationType,
    external_uuid: Option<Uuid>,
) -> Result<()> {
    if kind == AffiliationType::IndependentCuration && external_uuid.is_some() {
        return Err(Error::invalid_input(
            "external_uuid",
            "Independent Curation Groups cannot carry an external UUID.",
        ));
    }
    Ok(())
}

/// External UUIDs must be globally unique among affiliations when present
pub async fn validate_external_uuid_available(
    tx: &mut Transaction<'_, Sqlite>,
    external_uuid: Uuid,
    exclude_row: Option<i64>,
) -> Result<()> {
    let taken: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM affiliations \
         WHERE external_uuid = ?1 AND (?2 IS NULL OR id != ?2)",
    )
    .bind(external_uuid.to_string())
    .bind(exclude_row)
    .fetch_one(&mut **tx)
    .await?;

    if taken > 0 {
        return Err(Error::DuplicateIdentifier {
            fields: vec!["external_uuid".to_string()],
        });
    }
    Ok(())
}

/// Working group names are unique case-insensitively
///
/// `exclude_id` skips the group being updated so renaming only its casing is
/// allowed. The unique index on the table backstops the race between this
/// check and the write.
pub async fn validate_unique_working_group_name(
    db: &SqlitePool,
    name: &str,
    exclude_id: Option<i64>,
) -> Result<()> {
    let taken: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM working_groups \
         WHERE name = ?1 COLLATE NOCASE AND (?2 IS NULL OR id != ?2)",
    )
    .bind(name)
    .bind(exclude_id)
    .fetch_one(db)
    .await?;

    if taken > 0 {
        return Err(Error::invalid_input(
            "name",
            "A working group with this name already exists.",
        ));
    }
    Ok(())
}
