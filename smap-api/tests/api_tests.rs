//! Integration tests for the smap-api HTTP endpoints
//!
//! Drives the router end-to-end against an in-memory database: master data
//! CRUD, execution status/progress changes with their audit trail, the
//! dashboard statistics and the import endpoints.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use smap_api::{build_router, AppState};
use sqlx::sqlite::SqlitePoolOptions;
use tower::util::ServiceExt; // for `oneshot` method

/// Build the app on a fresh in-memory database (single connection so all
/// requests share it)
async fn setup_app() -> axum::Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory database");
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();
    smap_common::db::create_tables(&pool).await.unwrap();
    build_router(AppState::new(pool))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn send_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse JSON")
}

/// POST a body and return the parsed response, asserting the status
async fn request_json(
    app: &axum::Router,
    request: Request<Body>,
    expected: StatusCode,
) -> Value {
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), expected);
    extract_json(response.into_body()).await
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = setup_app().await;
    let body = request_json(&app, get("/health"), StatusCode::OK).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "smap-api");
    assert!(body["version"].is_string());
}

// =============================================================================
// Master klausul CRUD
// =============================================================================

#[tokio::test]
async fn klausul_crud_round_trip() {
    let app = setup_app().await;

    let created = request_json(
        &app,
        send_json(
            "POST",
            "/api/master-klausul",
            json!({"kode": "8.1", "nama": "Perencanaan", "deskripsi": "Operasi"}),
        ),
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(created["success"], true);
    assert_eq!(created["data"]["kode"], "8.1");
    assert_eq!(created["data"]["isActive"], true);
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let listed = request_json(&app, get("/api/master-klausul?page=1&limit=10"), StatusCode::OK).await;
    assert_eq!(listed["pagination"]["total"], 1);
    assert_eq!(listed["data"][0]["kode"], "8.1");
    assert!(listed["data"][0]["pilar"].as_array().unwrap().is_empty());

    let updated = request_json(
        &app,
        send_json(
            "PUT",
            &format!("/api/master-klausul/{}", id),
            json!({"nama": "Perencanaan operasional"}),
        ),
        StatusCode::OK,
    )
    .await;
    assert_eq!(updated["data"]["nama"], "Perencanaan operasional");
    assert_eq!(updated["data"]["kode"], "8.1");

    request_json(
        &app,
        send_json("DELETE", &format!("/api/master-klausul/{}", id), json!({})),
        StatusCode::OK,
    )
    .await;

    let missing = request_json(
        &app,
        get(&format!("/api/master-klausul/{}", id)),
        StatusCode::NOT_FOUND,
    )
    .await;
    assert_eq!(missing["success"], false);
    assert_eq!(missing["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn duplicate_kode_is_a_conflict() {
    let app = setup_app().await;
    let body = json!({"kode": "8.1", "nama": "Perencanaan"});

    request_json(
        &app,
        send_json("POST", "/api/master-klausul", body.clone()),
        StatusCode::CREATED,
    )
    .await;
    let conflict = request_json(
        &app,
        send_json("POST", "/api/master-klausul", body),
        StatusCode::CONFLICT,
    )
    .await;
    assert_eq!(conflict["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn pilar_create_requires_existing_klausul() {
    let app = setup_app().await;
    let orphan = request_json(
        &app,
        send_json(
            "POST",
            "/api/master-pilar",
            json!({
                "klausulId": "00000000-0000-0000-0000-000000000000",
                "nama": "Pendeteksian"
            }),
        ),
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(orphan["error"]["code"], "BAD_REQUEST");
}

// =============================================================================
// Import endpoints
// =============================================================================

fn template_row() -> Value {
    json!({
        "id": "1",
        "klausulSmap": "8.1 - Perencanaan dan pengendalian operasi\n9.1 - Pemantauan",
        "pilar": "Pendeteksian",
        "elemen": "Monitoring",
        "subElemen": "Fraud dan Compliance Risk Assessment",
        "pengukuran": "Pemenuhan Pemantauan CRA",
        "jadwalPengerjaan": "Dilakukan setiap Triwulan",
        "kualitasPemenuhan": "Kualitas",
        "indikator": "Monev CRA",
        "evidence": "Laporan monev",
        "pic": "Tim SDM",
        "semester1": "10/04/2024",
        "semester2": "08/10/2024"
    })
}

#[tokio::test]
async fn import_json_creates_hierarchy_and_reports_counts() {
    let app = setup_app().await;

    let body = request_json(
        &app,
        send_json(
            "POST",
            "/api/import/json",
            json!({
                "data": [template_row()],
                "createdBy": "tester",
                "options": {"defaultYear": 2024}
            }),
        ),
        StatusCode::OK,
    )
    .await;

    assert_eq!(body["success"], true);
    let summary = &body["data"]["summary"];
    assert_eq!(summary["totalProcessed"], 1);
    assert_eq!(summary["totalErrors"], 0);
    // 2 klausul + pilar + elemen + subElemen + pengukuran + 2 pelaksanaan
    assert_eq!(summary["totalCreated"], 8);
    assert_eq!(summary["totalUpdated"], 0);

    let details = &body["data"]["details"];
    assert_eq!(details["created"]["klausul"], 2);
    assert_eq!(details["created"]["pelaksanaan"], 2);

    // The hierarchy is visible through the read side, anchored on 8.1
    let listed = request_json(&app, get("/api/master-klausul?limit=50"), StatusCode::OK).await;
    assert_eq!(listed["pagination"]["total"], 2);
    let with_children: Vec<&Value> = listed["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|k| !k["pilar"].as_array().unwrap().is_empty())
        .collect();
    assert_eq!(with_children.len(), 1);
    assert_eq!(with_children[0]["kode"], "8.1");

    // Second import of the same payload only updates
    let again = request_json(
        &app,
        send_json(
            "POST",
            "/api/import/json",
            json!({"data": [template_row()], "options": {"defaultYear": 2024}}),
        ),
        StatusCode::OK,
    )
    .await;
    assert_eq!(again["data"]["summary"]["totalCreated"], 0);
    assert_eq!(again["data"]["summary"]["totalUpdated"], 8);
}

#[tokio::test]
async fn import_validate_partitions_rows_without_writing() {
    let app = setup_app().await;

    let mut missing = template_row();
    missing["subElemen"] = json!("");

    let body = request_json(
        &app,
        send_json(
            "POST",
            "/api/import/validate",
            json!({"data": [template_row(), missing]}),
        ),
        StatusCode::OK,
    )
    .await;

    let summary = &body["data"]["summary"];
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["valid"], 1);
    assert_eq!(summary["invalid"], 1);

    // Dry run: nothing was persisted
    let listed = request_json(&app, get("/api/master-klausul"), StatusCode::OK).await;
    assert_eq!(listed["pagination"]["total"], 0);
}

#[tokio::test]
async fn import_template_describes_the_row_contract() {
    let app = setup_app().await;
    let body = request_json(&app, get("/api/import/template"), StatusCode::OK).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"][0]["klausulSmap"].as_str().unwrap().contains("8.1"), true);
    assert!(body["instructions"]["requiredFields"].is_array());
}

// =============================================================================
// Execution write path and audit trail
// =============================================================================

/// Create the full hierarchy through the API and return a pengukuran id
async fn seed_pengukuran(app: &axum::Router) -> String {
    let klausul = request_json(
        app,
        send_json(
            "POST",
            "/api/master-klausul",
            json!({"kode": "8.1", "nama": "Perencanaan"}),
        ),
        StatusCode::CREATED,
    )
    .await;
    let pilar = request_json(
        app,
        send_json(
            "POST",
            "/api/master-pilar",
            json!({"klausulId": klausul["data"]["id"], "nama": "Pendeteksian"}),
        ),
        StatusCode::CREATED,
    )
    .await;
    let elemen = request_json(
        app,
        send_json(
            "POST",
            "/api/master-elemen",
            json!({"pilarId": pilar["data"]["id"], "nama": "Monitoring"}),
        ),
        StatusCode::CREATED,
    )
    .await;
    let sub_elemen = request_json(
        app,
        send_json(
            "POST",
            "/api/master-sub-elemen",
            json!({"elemenId": elemen["data"]["id"], "nama": "CRA"}),
        ),
        StatusCode::CREATED,
    )
    .await;
    let pengukuran = request_json(
        app,
        send_json(
            "POST",
            "/api/pengukuran-master",
            json!({
                "subElemenId": sub_elemen["data"]["id"],
                "namaPengukuran": "Pemantauan CRA",
                "indikator": "Monev CRA",
                "pic": "Tim SDM"
            }),
        ),
        StatusCode::CREATED,
    )
    .await;
    pengukuran["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn execution_changes_append_to_the_audit_trail() {
    let app = setup_app().await;
    let pengukuran_id = seed_pengukuran(&app).await;

    let created = request_json(
        &app,
        send_json(
            "POST",
            "/api/pelaksanaan-semester",
            json!({
                "pengukuranId": pengukuran_id,
                "semester": "S1",
                "tahun": 2024,
                "tanggalTarget": "2024-04-10",
                "createdBy": "tester"
            }),
        ),
        StatusCode::CREATED,
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["status"], "PLANNED");
    assert_eq!(created["data"]["progress"], 0);

    request_json(
        &app,
        send_json(
            "PATCH",
            &format!("/api/pelaksanaan-semester/{}/status", id),
            json!({"status": "IN_PROGRESS", "updatedBy": "tester"}),
        ),
        StatusCode::OK,
    )
    .await;

    request_json(
        &app,
        send_json(
            "PATCH",
            &format!("/api/pelaksanaan-semester/{}/progress", id),
            json!({"progress": 40, "updatedBy": "tester"}),
        ),
        StatusCode::OK,
    )
    .await;

    let detail = request_json(
        &app,
        get(&format!("/api/pelaksanaan-semester/{}", id)),
        StatusCode::OK,
    )
    .await;
    assert_eq!(detail["data"]["status"], "IN_PROGRESS");
    assert_eq!(detail["data"]["progress"], 40);

    // Most recent first: UPDATE_PROGRESS, UPDATE_STATUS, CREATE
    let history = detail["data"]["historyLog"].as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0]["action"], "UPDATE_PROGRESS");
    assert_eq!(history[0]["oldValue"], "0");
    assert_eq!(history[0]["newValue"], "40");
    assert_eq!(history[1]["action"], "UPDATE_STATUS");
    assert_eq!(history[1]["oldValue"], "PLANNED");
    assert_eq!(history[1]["newValue"], "IN_PROGRESS");
    assert_eq!(history[2]["action"], "CREATE");
}

#[tokio::test]
async fn progress_outside_bounds_is_rejected() {
    let app = setup_app().await;
    let pengukuran_id = seed_pengukuran(&app).await;

    let created = request_json(
        &app,
        send_json(
            "POST",
            "/api/pelaksanaan-semester",
            json!({"pengukuranId": pengukuran_id, "semester": "S1", "tahun": 2024}),
        ),
        StatusCode::CREATED,
    )
    .await;
    let id = created["data"]["id"].as_str().unwrap();

    let rejected = request_json(
        &app,
        send_json(
            "PATCH",
            &format!("/api/pelaksanaan-semester/{}/progress", id),
            json!({"progress": 120}),
        ),
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(rejected["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn duplicate_execution_period_is_a_conflict() {
    let app = setup_app().await;
    let pengukuran_id = seed_pengukuran(&app).await;
    let body = json!({"pengukuranId": pengukuran_id, "semester": "S1", "tahun": 2024});

    request_json(
        &app,
        send_json("POST", "/api/pelaksanaan-semester", body.clone()),
        StatusCode::CREATED,
    )
    .await;
    request_json(
        &app,
        send_json("POST", "/api/pelaksanaan-semester", body),
        StatusCode::CONFLICT,
    )
    .await;
}

// =============================================================================
// Statistics
// =============================================================================

#[tokio::test]
async fn dashboard_stats_aggregate_status_and_progress() {
    let app = setup_app().await;

    request_json(
        &app,
        send_json(
            "POST",
            "/api/import/json",
            json!({"data": [template_row()], "options": {"defaultYear": 2024}}),
        ),
        StatusCode::OK,
    )
    .await;

    let stats = request_json(
        &app,
        get("/api/pelaksanaan-semester/dashboard-stats?tahun=2024"),
        StatusCode::OK,
    )
    .await;
    assert_eq!(stats["data"]["statusDistribution"]["PLANNED"], 2);
    assert_eq!(stats["data"]["averageProgress"], 0.0);

    let filtered = request_json(
        &app,
        get("/api/pelaksanaan-semester/dashboard-stats?tahun=2024&semester=S1"),
        StatusCode::OK,
    )
    .await;
    assert_eq!(filtered["data"]["statusDistribution"]["PLANNED"], 1);
}

#[tokio::test]
async fn klausul_stats_cover_the_subtree() {
    let app = setup_app().await;

    request_json(
        &app,
        send_json(
            "POST",
            "/api/import/json",
            json!({"data": [template_row()], "options": {"defaultYear": 2024}}),
        ),
        StatusCode::OK,
    )
    .await;

    let listed = request_json(&app, get("/api/master-klausul?search=8.1"), StatusCode::OK).await;
    let id = listed["data"][0]["id"].as_str().unwrap();

    let stats = request_json(
        &app,
        get(&format!("/api/master-klausul/{}/stats", id)),
        StatusCode::OK,
    )
    .await;
    let statistics = &stats["data"]["statistics"];
    assert_eq!(statistics["totalPilar"], 1);
    assert_eq!(statistics["totalElemen"], 1);
    assert_eq!(statistics["totalSubElemen"], 1);
    assert_eq!(statistics["totalPengukuran"], 1);
    assert_eq!(statistics["totalPelaksanaan"], 2);
    assert_eq!(statistics["statusDistribution"]["PLANNED"], 2);
    assert_eq!(statistics["completionRate"], 0);
}

#[tokio::test]
async fn semester_group_splits_executions_by_half_year() {
    let app = setup_app().await;

    request_json(
        &app,
        send_json(
            "POST",
            "/api/import/json",
            json!({"data": [template_row()], "options": {"defaultYear": 2024}}),
        ),
        StatusCode::OK,
    )
    .await;

    let grouped = request_json(
        &app,
        get("/api/master-klausul/semester-group?tahun=2024"),
        StatusCode::OK,
    )
    .await;
    let summary = &grouped["data"]["summary"];
    assert_eq!(summary["totalKlausulS1"], 1);
    assert_eq!(summary["totalKlausulS2"], 1);
    assert_eq!(summary["totalPelaksanaanS1"], 1);
    assert_eq!(summary["totalPelaksanaanS2"], 1);
    assert_eq!(grouped["data"]["semester1"]["semester"], "S1");
    assert_eq!(
        grouped["data"]["semester1"]["klausul"]
            .as_array()
            .unwrap()
            .len(),
        1
    );
}
