//! Database initialization
//!
//! Creates the schema on first run and is safe to call repeatedly; every
//! statement is idempotent.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Working group name required for SC_VCEP affiliations
pub const SOMATIC_CANCER_GROUP: &str = "Somatic Cancer";

/// Sentinel working group name required for independent curation groups
pub const NONE_GROUP: &str = "None";

/// Name of the affiliation identifier space in the `id_alloc` table
pub const AFFILIATION_ID_SPACE: &str = "affiliation";

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys (required for child-table cascade deletes)
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers while one create/update transaction
    // holds the writer lock
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Writers contending for the allocation lock wait instead of erroring
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_working_groups_table(&pool).await?;
    create_affiliations_table(&pool).await?;
    create_coordinators_table(&pool).await?;
    create_approvers_table(&pool).await?;
    create_submitter_ids_table(&pool).await?;
    create_api_keys_table(&pool).await?;
    create_id_alloc_table(&pool).await?;

    seed_sentinel_working_groups(&pool).await?;
    seed_id_alloc(&pool).await?;

    Ok(pool)
}

async fn create_working_groups_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS working_groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Name uniqueness is case-insensitive
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_working_groups_name \
         ON working_groups (name COLLATE NOCASE)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_affiliations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS affiliations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            affiliation_id INTEGER NOT NULL UNIQUE,
            expert_panel_id INTEGER UNIQUE,
            type TEXT NOT NULL,
            status TEXT NOT NULL,
            full_name TEXT NOT NULL,
            short_name TEXT,
            working_group_id INTEGER NOT NULL
                REFERENCES working_groups(id) ON DELETE CASCADE,
            members TEXT,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            external_uuid TEXT UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_coordinators_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS coordinators (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            affiliation_row INTEGER NOT NULL
                REFERENCES affiliations(id) ON DELETE CASCADE,
            coordinator_name TEXT NOT NULL,
            coordinator_email TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_approvers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS approvers (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            affiliation_row INTEGER NOT NULL
                REFERENCES affiliations(id) ON DELETE CASCADE,
            approver_name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_submitter_ids_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submitter_ids (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            affiliation_row INTEGER NOT NULL
                REFERENCES affiliations(id) ON DELETE CASCADE,
            clinvar_submitter_id TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_api_keys_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_keys (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            prefix TEXT NOT NULL,
            key_hash TEXT NOT NULL UNIQUE,
            can_write INTEGER NOT NULL DEFAULT 0,
            revoked INTEGER NOT NULL DEFAULT 0,
            expiry_date TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One row per identifier space; writing the row at the top of an allocation
/// transaction serializes concurrent allocators (see affils-svc ids module)
async fn create_id_alloc_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS id_alloc (
            space TEXT PRIMARY KEY,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed the sentinel working groups referenced by the type validation rules
async fn seed_sentinel_working_groups(pool: &SqlitePool) -> Result<()> {
    for name in [NONE_GROUP, SOMATIC_CANCER_GROUP] {
        sqlx::query("INSERT OR IGNORE INTO working_groups (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await?;
    }

    Ok(())
}

async fn seed_id_alloc(pool: &SqlitePool) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO id_alloc (space) VALUES (?)")
        .bind(AFFILIATION_ID_SPACE)
        .execute(pool)
        .await?;

    Ok(())
}
