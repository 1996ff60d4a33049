//! Affiliation identifier allocation and expert panel ID derivation
//!
//! Affiliation IDs are allocated sequentially from a 10,000-slot space
//! starting at 10000. Expert panel IDs are derived from the affiliation ID by
//! offsetting into a type-specific band, so the last three digits of both
//! identifiers always agree. Neither identifier is ever accepted from a
//! caller during creation.

use affils_common::db::init::AFFILIATION_ID_SPACE;
use affils_common::db::models::AffiliationType;
use affils_common::{Error, Result};
use sqlx::{Sqlite, Transaction};

/// First valid affiliation ID
pub const AFFIL_BASE: i64 = 10000;
/// One past the last valid affiliation ID
pub const AFFIL_LIMIT: i64 = 20000;
/// First valid GCEP expert panel ID
pub const GCEP_BASE: i64 = 40000;
/// First valid VCEP/SC_VCEP expert panel ID (also one past the GCEP band)
pub const VCEP_BASE: i64 = 50000;
/// One past the last valid VCEP/SC_VCEP expert panel ID
pub const VCEP_LIMIT: i64 = 60000;

/// Allocate the next sequential affiliation ID inside `tx`
///
/// The first statement writes the `id_alloc` row for the affiliation space.
/// SQLite promotes the transaction to the exclusive writer on that first
/// write, so every concurrent allocator serializes here and the max-read
/// below can never observe a stale maximum from another in-flight create.
/// The lock is held until the surrounding transaction commits or rolls back.
///
/// Soft-deleted rows keep their identifiers, so the maximum is read across
/// all rows and deleted slots are never reused.
pub async fn allocate_next_affiliation_id(tx: &mut Transaction<'_, Sqlite>) -> Result<i64> {
    sqlx::query("UPDATE id_alloc SET updated_at = CURRENT_TIMESTAMP WHERE space = ?")
        .bind(AFFILIATION_ID_SPACE)
        .execute(&mut **tx)
        .await?;

    let max_id: Option<i64> = sqlx::query_scalar("SELECT MAX(affiliation_id) FROM affiliations")
        .fetch_one(&mut **tx)
        .await?;

    let next_id = match max_id {
        Some(last_id) => last_id + 1,
        None => AFFIL_BASE,
    };

    if !(AFFIL_BASE..AFFIL_LIMIT).contains(&next_id) {
        return Err(Error::OutOfRange(
            "Affiliation ID out of range. Contact administrator.".to_string(),
        ));
    }

    Ok(next_id)
}

/// Derive the expert panel ID for `affiliation_id` and `kind`
///
/// Pure function: deterministic, no side effects. Independent curation
/// groups carry no expert panel ID. Working group rules are owned entirely
/// by the validate module, not here.
pub fn derive_expert_panel_id(affiliation_id: i64, kind: AffiliationType) -> Result<Option<i64>> {
    match kind {
        AffiliationType::Gcep => {
            let ep_id = (affiliation_id - AFFIL_BASE) + GCEP_BASE;
            if !(GCEP_BASE..VCEP_BASE).contains(&ep_id) {
                return Err(Error::OutOfRange(
                    "GCEP ID out of range. Contact administrator.".to_string(),
                ));
            }
            Ok(Some(ep_id))
        }
        AffiliationType::Vcep | AffiliationType::ScVcep => {
            let ep_id = (affiliation_id - AFFIL_BASE) + VCEP_BASE;
            if !(VCEP_BASE..VCEP_LIMIT).contains(&ep_id) {
                return Err(Error::OutOfRange(
                    "VCEP ID out of range. Contact administrator.".to_string(),
                ));
            }
            Ok(Some(ep_id))
        }
        AffiliationType::IndependentCuration => Ok(None),
    }
}
