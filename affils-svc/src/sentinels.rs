//! Sentinel working group references
//!
//! The type validation rules point at two well-known working groups ("None"
//! and "Somatic Cancer"). Both are seeded at database initialization and
//! resolved once at startup, so validation compares row IDs instead of
//! re-querying by name on every request.

use affils_common::db::init::{NONE_GROUP, SOMATIC_CANCER_GROUP};
use affils_common::{Error, Result};
use sqlx::SqlitePool;

/// Resolved sentinel working group row IDs
#[derive(Debug, Clone, Copy)]
pub struct Sentinels {
    /// Row ID of the "None" group (required for independent curation groups)
    pub none: i64,
    /// Row ID of the "Somatic Cancer" group (required for SC_VCEP)
    pub somatic_cancer: i64,
}

impl Sentinels {
    /// Load the sentinel rows, failing startup if either is missing
    pub async fn load(db: &SqlitePool) -> Result<Self> {
        Ok(Sentinels {
            none: lookup(db, NONE_GROUP).await?,
            somatic_cancer: lookup(db, SOMATIC_CANCER_GROUP).await?,
        })
    }
}

async fn lookup(db: &SqlitePool, name: &str) -> Result<i64> {
    sqlx::query_scalar("SELECT id FROM working_groups WHERE name = ? COLLATE NOCASE")
        .bind(name)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::Config(format!("Sentinel working group '{}' is not seeded", name)))
}
