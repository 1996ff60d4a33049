//! Integration tests for the affiliations REST API
//!
//! Exercises the full router with API key authentication, driving requests
//! through `tower::ServiceExt::oneshot`.

use affils_common::api::auth::create_api_key;
use affils_common::db::init_database;
use affils_svc::{build_router, AppState, Sentinels};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tower::ServiceExt;

struct TestServer {
    app: axum::Router,
    pool: SqlitePool,
    write_key: String,
    read_key: String,
    db_path: PathBuf,
}

impl TestServer {
    async fn cleanup(self) {
        drop(self.app);
        drop(self.pool);
        let _ = std::fs::remove_file(&self.db_path);
    }
}

async fn setup_test_server(tag: &str) -> TestServer {
    let db_path = PathBuf::from(format!(
        "/tmp/affils-api-test-{}-{}.db",
        tag,
        std::process::id()
    ));
    let _ = std::fs::remove_file(&db_path);

    let pool = init_database(&db_path).await.unwrap();
    let write_key = create_api_key(&pool, "test-service", true, None).await.unwrap();
    let read_key = create_api_key(&pool, "read-only", false, None).await.unwrap();

    let sentinels = Sentinels::load(&pool).await.unwrap();
    let app = build_router(AppState::new(pool.clone(), sentinels));

    TestServer {
        app,
        pool,
        write_key,
        read_key,
        db_path,
    }
}

async fn make_request(
    app: &axum::Router,
    method: Method,
    path: &str,
    api_key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Option<Value>) {
    let mut request = Request::builder().method(method).uri(path);

    if let Some(key) = api_key {
        request = request.header("x-api-key", key);
    }

    let request = if let Some(json_body) = body {
        request
            .header("content-type", "application/json")
            .body(Body::from(json_body.to_string()))
            .unwrap()
    } else {
        request.body(Body::empty()).unwrap()
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json_body = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).unwrap())
    };

    (status, json_body)
}

async fn seed_working_group(server: &TestServer, name: &str) -> i64 {
    let (status, body) = make_request(
        &server.app,
        Method::POST,
        "/api/working_groups",
        Some(&server.write_key),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body.unwrap()["id"].as_i64().unwrap()
}

// ============================================================================
// Health and Authentication
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_needs_no_key() {
    let server = setup_test_server("health").await;

    let (status, body) = make_request(&server.app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "affils-svc");
    assert!(body["version"].is_string());

    server.cleanup().await;
}

#[tokio::test]
async fn test_missing_api_key_is_unauthorized() {
    let server = setup_test_server("no-key").await;

    let (status, _) = make_request(&server.app, Method::GET, "/api/affiliations", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    server.cleanup().await;
}

#[tokio::test]
async fn test_invalid_api_key_is_unauthorized() {
    let server = setup_test_server("bad-key").await;

    let (status, _) = make_request(
        &server.app,
        Method::GET,
        "/api/affiliations",
        Some("not-a-key"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    server.cleanup().await;
}

#[tokio::test]
async fn test_read_only_key_cannot_write() {
    let server = setup_test_server("read-only-key").await;
    let group = seed_working_group(&server, "Hearing Loss").await;

    // Reads succeed
    let (status, _) = make_request(
        &server.app,
        Method::GET,
        "/api/affiliations",
        Some(&server.read_key),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Writes are forbidden
    let (status, _) = make_request(
        &server.app,
        Method::POST,
        "/api/affiliations",
        Some(&server.read_key),
        Some(json!({
            "type": "GCEP",
            "status": "ACTIVE",
            "full_name": "Nope",
            "working_group_id": group,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    server.cleanup().await;
}

// ============================================================================
// Affiliation CRUD
// ============================================================================

#[tokio::test]
async fn test_create_first_gcep_gets_base_identifiers() {
    let server = setup_test_server("create-gcep").await;
    let group = seed_working_group(&server, "Hearing Loss").await;

    let (status, body) = make_request(
        &server.app,
        Method::POST,
        "/api/affiliations",
        Some(&server.write_key),
        Some(json!({
            "type": "GCEP",
            "status": "INACTIVE",
            "full_name": "Test Success Result Affil",
            "short_name": "Successful",
            "members": "Bulbasaur, Charmander, Squirtle",
            "working_group_id": group,
            "coordinators": [
                {"coordinator_name": "Professor Oak", "coordinator_email": "ProfessorOak@email.com"}
            ],
            "approvers": [{"approver_name": "Mew"}],
            "clinvar_submitter_ids": [
                {"clinvar_submitter_id": "11"},
                {"clinvar_submitter_id": "22"},
                {"clinvar_submitter_id": "33"}
            ],
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let body = body.unwrap();
    assert_eq!(body["affiliation_id"], 10000);
    assert_eq!(body["expert_panel_id"], 40000);
    assert_eq!(body["type"], "GCEP");
    assert_eq!(body["working_group"]["name"], "Hearing Loss");
    assert_eq!(body["coordinators"].as_array().unwrap().len(), 1);
    assert_eq!(body["clinvar_submitter_ids"].as_array().unwrap().len(), 3);

    server.cleanup().await;
}

#[tokio::test]
async fn test_create_rejects_caller_supplied_identifiers() {
    let server = setup_test_server("create-supplied").await;
    let group = seed_working_group(&server, "Hearing Loss").await;

    let (status, body) = make_request(
        &server.app,
        Method::POST,
        "/api/affiliations",
        Some(&server.write_key),
        Some(json!({
            "affiliation_id": 12345,
            "type": "GCEP",
            "status": "ACTIVE",
            "full_name": "Sneaky",
            "working_group_id": group,
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = body.unwrap();
    assert!(body["details"]["affiliation_id"].is_array());

    server.cleanup().await;
}

#[tokio::test]
async fn test_sc_vcep_requires_somatic_cancer_group() {
    let server = setup_test_server("sc-vcep").await;
    let cardiology = seed_working_group(&server, "Cardiology").await;

    // Wrong group fails
    let (status, body) = make_request(
        &server.app,
        Method::POST,
        "/api/affiliations",
        Some(&server.write_key),
        Some(json!({
            "type": "SC_VCEP",
            "status": "ACTIVE",
            "full_name": "Misfiled Panel",
            "working_group_id": cardiology,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.unwrap()["details"]["non_field_errors"].is_array());

    // "Somatic Cancer" (seeded at init) succeeds
    let (status, body) = make_request(
        &server.app,
        Method::GET,
        "/api/working_groups/name/Somatic%20Cancer",
        Some(&server.read_key),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let somatic_cancer = body.unwrap()["id"].as_i64().unwrap();

    let (status, body) = make_request(
        &server.app,
        Method::POST,
        "/api/affiliations",
        Some(&server.write_key),
        Some(json!({
            "type": "SC_VCEP",
            "status": "ACTIVE",
            "full_name": "Test SC_VCEP",
            "working_group_id": somatic_cancer,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.unwrap()["expert_panel_id"].as_i64().unwrap() >= 50000);

    server.cleanup().await;
}

#[tokio::test]
async fn test_independent_curation_rules() {
    let server = setup_test_server("independent").await;
    let cardiology = seed_working_group(&server, "Cardiology").await;

    // Must use the sentinel "None" group
    let (status, _) = make_request(
        &server.app,
        Method::POST,
        "/api/affiliations",
        Some(&server.write_key),
        Some(json!({
            "type": "INDEPENDENT_CURATION",
            "status": "ACTIVE",
            "full_name": "Indy",
            "working_group_id": cardiology,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = make_request(
        &server.app,
        Method::GET,
        "/api/working_groups/name/None",
        Some(&server.read_key),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let none_group = body.unwrap()["id"].as_i64().unwrap();

    // External UUIDs are forbidden for this type
    let (status, _) = make_request(
        &server.app,
        Method::POST,
        "/api/affiliations",
        Some(&server.write_key),
        Some(json!({
            "type": "INDEPENDENT_CURATION",
            "status": "ACTIVE",
            "full_name": "Indy",
            "working_group_id": none_group,
            "external_uuid": "8c2b6e9e-4f8f-4d4e-9a6e-2f1d0a1b2c3d",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Valid payload: created without an expert panel ID
    let (status, body) = make_request(
        &server.app,
        Method::POST,
        "/api/affiliations",
        Some(&server.write_key),
        Some(json!({
            "type": "INDEPENDENT_CURATION",
            "status": "ACTIVE",
            "full_name": "Indy",
            "working_group_id": none_group,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body.unwrap()["expert_panel_id"].is_null());

    server.cleanup().await;
}

#[tokio::test]
async fn test_update_immutable_field_reports_field() {
    let server = setup_test_server("update-immutable").await;
    let group = seed_working_group(&server, "Immunology").await;

    let (status, _) = make_request(
        &server.app,
        Method::POST,
        "/api/affiliations",
        Some(&server.write_key),
        Some(json!({
            "type": "GCEP",
            "status": "ACTIVE",
            "full_name": "Original Name",
            "working_group_id": group,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = make_request(
        &server.app,
        Method::PUT,
        "/api/affiliations/affiliation_id/10000",
        Some(&server.write_key),
        Some(json!({ "type": "VCEP" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.unwrap()["details"]["type"].is_array());

    // The stored record is untouched
    let (status, body) = make_request(
        &server.app,
        Method::GET,
        "/api/affiliations/10000",
        Some(&server.read_key),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["type"], "GCEP");
    assert_eq!(body["full_name"], "Original Name");

    server.cleanup().await;
}

#[tokio::test]
async fn test_update_editable_fields_by_either_key() {
    let server = setup_test_server("update-keys").await;
    let group = seed_working_group(&server, "Immunology").await;

    let (status, _) = make_request(
        &server.app,
        Method::POST,
        "/api/affiliations",
        Some(&server.write_key),
        Some(json!({
            "type": "GCEP",
            "status": "ACTIVE",
            "full_name": "Original Name",
            "working_group_id": group,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = make_request(
        &server.app,
        Method::PUT,
        "/api/affiliations/affiliation_id/10000",
        Some(&server.write_key),
        Some(json!({ "full_name": "Updated Name", "status": "INACTIVE" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["full_name"], "Updated Name");
    assert_eq!(body["status"], "INACTIVE");

    let (status, body) = make_request(
        &server.app,
        Method::PUT,
        "/api/affiliations/expert_panel_id/40000",
        Some(&server.write_key),
        Some(json!({ "short_name": "UpdatedShort" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["short_name"], "UpdatedShort");

    server.cleanup().await;
}

#[tokio::test]
async fn test_update_missing_record_is_not_found() {
    let server = setup_test_server("update-404").await;

    let (status, _) = make_request(
        &server.app,
        Method::PUT,
        "/api/affiliations/expert_panel_id/99999",
        Some(&server.write_key),
        Some(json!({ "full_name": "Ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    server.cleanup().await;
}

#[tokio::test]
async fn test_soft_delete_hides_record_from_listing() {
    let server = setup_test_server("soft-delete").await;
    let group = seed_working_group(&server, "Hearing Loss").await;

    let (status, _) = make_request(
        &server.app,
        Method::POST,
        "/api/affiliations",
        Some(&server.write_key),
        Some(json!({
            "type": "GCEP",
            "status": "ACTIVE",
            "full_name": "Doomed",
            "working_group_id": group,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = make_request(
        &server.app,
        Method::DELETE,
        "/api/affiliations/10000",
        Some(&server.write_key),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Hidden from the default listing
    let (status, body) = make_request(
        &server.app,
        Method::GET,
        "/api/affiliations",
        Some(&server.read_key),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap().as_array().unwrap().len(), 0);

    // But still present in storage with its identifier
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM affiliations WHERE affiliation_id = 10000")
            .fetch_one(&server.pool)
            .await
            .unwrap();
    assert_eq!(count, 1);

    server.cleanup().await;
}

#[tokio::test]
async fn test_lookup_by_external_uuid() {
    let server = setup_test_server("uuid-lookup").await;
    let group = seed_working_group(&server, "Hearing Loss").await;
    let uuid = "f3b9a2e0-7c1d-4f6a-8e5b-9d0c1a2b3c4d";

    let (status, _) = make_request(
        &server.app,
        Method::POST,
        "/api/affiliations",
        Some(&server.write_key),
        Some(json!({
            "type": "VCEP",
            "status": "ACTIVE",
            "full_name": "UUID Panel",
            "working_group_id": group,
            "external_uuid": uuid,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = make_request(
        &server.app,
        Method::GET,
        &format!("/api/affiliations/uuid/{}", uuid),
        Some(&server.read_key),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["full_name"], "UUID Panel");

    server.cleanup().await;
}

// ============================================================================
// Working Groups
// ============================================================================

#[tokio::test]
async fn test_working_group_crud_and_case_insensitive_uniqueness() {
    let server = setup_test_server("wg-crud").await;

    let cardiology = seed_working_group(&server, "Cardiology").await;

    // Duplicate differing only in case is rejected
    let (status, body) = make_request(
        &server.app,
        Method::POST,
        "/api/working_groups",
        Some(&server.write_key),
        Some(json!({ "name": "cardiology" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.unwrap()["details"]["name"].is_array());

    // Missing name is rejected
    let (status, _) = make_request(
        &server.app,
        Method::POST,
        "/api/working_groups",
        Some(&server.write_key),
        Some(json!({ "name": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Lookup by ID and by name
    let (status, body) = make_request(
        &server.app,
        Method::GET,
        &format!("/api/working_groups/{}", cardiology),
        Some(&server.read_key),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["name"], "Cardiology");

    let (status, body) = make_request(
        &server.app,
        Method::GET,
        "/api/working_groups/name/cardiology",
        Some(&server.read_key),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["name"], "Cardiology");

    // Rename
    let (status, body) = make_request(
        &server.app,
        Method::PUT,
        &format!("/api/working_groups/{}", cardiology),
        Some(&server.write_key),
        Some(json!({ "name": "Cardiology Updated" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["name"], "Cardiology Updated");

    // Unknown ID is a 404
    let (status, _) = make_request(
        &server.app,
        Method::PUT,
        "/api/working_groups/99999",
        Some(&server.write_key),
        Some(json!({ "name": "Ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    server.cleanup().await;
}

// ============================================================================
// Legacy Aggregate View
// ============================================================================

#[tokio::test]
async fn test_legacy_detail_matches_historical_shape() {
    let server = setup_test_server("legacy").await;
    let group = seed_working_group(&server, "Hearing Loss").await;

    let (status, _) = make_request(
        &server.app,
        Method::POST,
        "/api/affiliations",
        Some(&server.write_key),
        Some(json!({
            "type": "GCEP",
            "status": "INACTIVE",
            "full_name": "Test Success Result Affil",
            "short_name": "Successful",
            "working_group_id": group,
            "approvers": [{"approver_name": "Mew"}],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = make_request(
        &server.app,
        Method::GET,
        "/api/legacy/affiliation?affil_id=10000",
        Some(&server.read_key),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        body.unwrap(),
        json!([
            {
                "affiliation_id": "10000",
                "affiliation_fullname": "Test Success Result Affil",
                "subgroups": {
                    "gcep": {
                        "id": "40000",
                        "fullname": "Test Success Result Affil"
                    }
                },
                "approver": ["Mew"]
            }
        ])
    );

    server.cleanup().await;
}

#[tokio::test]
async fn test_legacy_detail_unknown_id_is_not_found() {
    let server = setup_test_server("legacy-404").await;

    let (status, _) = make_request(
        &server.app,
        Method::GET,
        "/api/legacy/affiliation?affil_id=10000",
        Some(&server.read_key),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    server.cleanup().await;
}

#[tokio::test]
async fn test_legacy_list_counts_live_records() {
    let server = setup_test_server("legacy-list").await;
    let group = seed_working_group(&server, "Hearing Loss").await;

    for name in ["Alpha", "Beta"] {
        let (status, _) = make_request(
            &server.app,
            Method::POST,
            "/api/affiliations",
            Some(&server.write_key),
            Some(json!({
                "type": "GCEP",
                "status": "ACTIVE",
                "full_name": name,
                "working_group_id": group,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = make_request(
        &server.app,
        Method::GET,
        "/api/legacy/affiliations",
        Some(&server.read_key),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap().as_array().unwrap().len(), 2);

    server.cleanup().await;
}
