//! Unit tests for database initialization

use affils_common::db::init::{init_database, AFFILIATION_ID_SPACE, NONE_GROUP, SOMATIC_CANCER_GROUP};
use std::path::PathBuf;

fn test_db_path(tag: &str) -> PathBuf {
    PathBuf::from(format!("/tmp/affils-test-db-{}-{}.db", tag, std::process::id()))
}

#[tokio::test]
async fn test_database_creation_when_missing() {
    let db_path = test_db_path("create");
    let _ = std::fs::remove_file(&db_path);

    let result = init_database(&db_path).await;
    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");

    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_idempotent_initialization() {
    let db_path = test_db_path("idempotent");
    let _ = std::fs::remove_file(&db_path);

    let pool1 = init_database(&db_path).await.unwrap();
    let groups1: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM working_groups")
        .fetch_one(&pool1)
        .await
        .unwrap();
    drop(pool1);

    // Second initialization must not duplicate seeded rows
    let pool2 = init_database(&db_path).await.unwrap();
    let groups2: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM working_groups")
        .fetch_one(&pool2)
        .await
        .unwrap();

    assert_eq!(groups1, groups2, "Seeded group count changed on re-initialization");

    drop(pool2);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_sentinel_working_groups_seeded() {
    let db_path = test_db_path("sentinels");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    for name in [NONE_GROUP, SOMATIC_CANCER_GROUP] {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM working_groups WHERE name = ?")
                .bind(name)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count, 1, "Sentinel group '{}' not seeded", name);
    }

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_id_alloc_row_seeded() {
    let db_path = test_db_path("id-alloc");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM id_alloc WHERE space = ?")
        .bind(AFFILIATION_ID_SPACE)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1, "Affiliation allocation row not seeded");

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_foreign_keys_enabled() {
    let db_path = test_db_path("fk");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    let fk_enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(fk_enabled, 1, "Foreign keys should be enabled");

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_working_group_name_unique_case_insensitive() {
    let db_path = test_db_path("wg-unique");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    sqlx::query("INSERT INTO working_groups (name) VALUES ('Cardiology')")
        .execute(&pool)
        .await
        .unwrap();

    let duplicate = sqlx::query("INSERT INTO working_groups (name) VALUES ('cardiology')")
        .execute(&pool)
        .await;
    assert!(duplicate.is_err(), "Case-insensitive duplicate name must be rejected");

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_affiliation_identifier_uniqueness_constraints() {
    let db_path = test_db_path("affil-unique");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    let group_id: i64 = sqlx::query_scalar("SELECT id FROM working_groups WHERE name = 'None'")
        .fetch_one(&pool)
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO affiliations \
         (affiliation_id, expert_panel_id, type, status, full_name, working_group_id) \
         VALUES (10000, 40000, 'GCEP', 'ACTIVE', 'First', ?)",
    )
    .bind(group_id)
    .execute(&pool)
    .await
    .unwrap();

    let duplicate = sqlx::query(
        "INSERT INTO affiliations \
         (affiliation_id, expert_panel_id, type, status, full_name, working_group_id) \
         VALUES (10000, 40001, 'GCEP', 'ACTIVE', 'Second', ?)",
    )
    .bind(group_id)
    .execute(&pool)
    .await;
    assert!(duplicate.is_err(), "Duplicate affiliation_id must be rejected");

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_child_rows_cascade_on_delete() {
    let db_path = test_db_path("cascade");
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();

    let group_id: i64 = sqlx::query_scalar("SELECT id FROM working_groups WHERE name = 'None'")
        .fetch_one(&pool)
        .await
        .unwrap();

    let row = sqlx::query(
        "INSERT INTO affiliations \
         (affiliation_id, expert_panel_id, type, status, full_name, working_group_id) \
         VALUES (10000, 40000, 'GCEP', 'ACTIVE', 'Cascade Test', ?)",
    )
    .bind(group_id)
    .execute(&pool)
    .await
    .unwrap()
    .last_insert_rowid();

    sqlx::query(
        "INSERT INTO coordinators (affiliation_row, coordinator_name, coordinator_email) \
         VALUES (?, 'Professor Oak', 'oak@email.com')",
    )
    .bind(row)
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("DELETE FROM affiliations WHERE id = ?")
        .bind(row)
        .execute(&pool)
        .await
        .unwrap();

    let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM coordinators WHERE affiliation_row = ?")
        .bind(row)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(orphans, 0, "Coordinator rows should cascade-delete with the parent");

    drop(pool);
    let _ = std::fs::remove_file(&db_path);
}
