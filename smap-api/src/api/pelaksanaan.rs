//! Pelaksanaan semester endpoints
//!
//! Every write path appends to the execution history: CREATE on insert,
//! UPDATE with full before/after snapshots, UPDATE_STATUS and
//! UPDATE_PROGRESS with the bare old/new values.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::ApiResponse;
use crate::db;
use crate::db::pelaksanaan::{NewPelaksanaan, PelaksanaanChanges};
use crate::db::stats::DashboardStats;
use crate::error::{ApiError, ApiResult};
use crate::pagination::{PageInfo, PageQuery};
use crate::AppState;
use smap_common::db::models::{
    ExecutionStatus, HistoryAction, HistoryLog, Pelaksanaan, Semester,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pelaksanaan).post(create_pelaksanaan))
        .route("/dashboard-stats", get(dashboard_stats))
        .route(
            "/:id",
            get(get_pelaksanaan)
                .put(update_pelaksanaan)
                .delete(delete_pelaksanaan),
        )
        .route("/:id/status", patch(update_status))
        .route("/:id/progress", patch(update_progress))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<ExecutionStatus>,
    pub semester: Option<Semester>,
    pub tahun: Option<i32>,
    pub pengukuran_id: Option<Uuid>,
}

/// GET /api/pelaksanaan-semester
pub async fn list_pelaksanaan(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<Pelaksanaan>>>> {
    let window = PageQuery {
        page: params.page.unwrap_or(1),
        limit: params.limit.unwrap_or(crate::pagination::DEFAULT_LIMIT),
    }
    .window();

    let filter = db::pelaksanaan::ListFilter {
        status: params.status,
        semester: params.semester,
        tahun: params.tahun,
        pengukuran_id: params.pengukuran_id,
        search: params.search,
    };
    let items = db::pelaksanaan::list(&state.db, &filter, window.limit, window.offset).await?;
    let total = db::pelaksanaan::count(&state.db, &filter).await?;

    Ok(Json(ApiResponse::paginated(
        items,
        PageInfo::new(window, total),
    )))
}

/// GET /api/pelaksanaan-semester/dashboard-stats
pub async fn dashboard_stats(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<DashboardStats>>> {
    let stats = db::stats::dashboard_stats(&state.db, params.tahun, params.semester).await?;
    Ok(Json(ApiResponse::ok(stats)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PelaksanaanDetail {
    #[serde(flatten)]
    pub pelaksanaan: Pelaksanaan,
    pub history_log: Vec<HistoryLog>,
}

/// GET /api/pelaksanaan-semester/:id
pub async fn get_pelaksanaan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<PelaksanaanDetail>>> {
    let pelaksanaan = db::pelaksanaan::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Pelaksanaan semester not found".to_string()))?;
    let history_log = db::history::list_for_pelaksanaan(&state.db, id, None).await?;

    Ok(Json(ApiResponse::ok(PelaksanaanDetail {
        pelaksanaan,
        history_log,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePelaksanaanRequest {
    pub pengukuran_id: Uuid,
    pub semester: Semester,
    pub tahun: i32,
    pub tanggal_target: Option<String>,
    pub tanggal_mulai: Option<String>,
    pub tanggal_selesai: Option<String>,
    #[serde(default = "default_status")]
    pub status: ExecutionStatus,
    #[serde(default)]
    pub progress: i64,
    pub catatan: Option<String>,
    pub evidence_actual: Option<String>,
    pub link_evidence_actual: Option<String>,
    pub pic_pelaksana: Option<String>,
    pub created_by: Option<String>,
}

fn default_status() -> ExecutionStatus {
    ExecutionStatus::Planned
}

/// POST /api/pelaksanaan-semester
pub async fn create_pelaksanaan(
    State(state): State<AppState>,
    Json(request): Json<CreatePelaksanaanRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Pelaksanaan>>)> {
    validate_progress(request.progress)?;

    let new = NewPelaksanaan {
        pengukuran_id: request.pengukuran_id,
        semester: request.semester,
        tahun: request.tahun,
        tanggal_target: request.tanggal_target,
        tanggal_mulai: request.tanggal_mulai,
        tanggal_selesai: request.tanggal_selesai,
        status: request.status,
        progress: request.progress,
        catatan: request.catatan,
        evidence_actual: request.evidence_actual,
        link_evidence_actual: request.link_evidence_actual,
        pic_pelaksana: request.pic_pelaksana,
        created_by: request.created_by.clone(),
    };
    let pelaksanaan = db::pelaksanaan::create(&state.db, &new).await?;

    db::history::append(
        &state.db,
        pelaksanaan.id,
        HistoryAction::Create,
        None,
        Some(serde_json::to_string(&pelaksanaan).map_err(smap_common::Error::from)?),
        "Pelaksanaan semester created",
        request.created_by.as_deref(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Pelaksanaan semester created successfully",
            pelaksanaan,
        )),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePelaksanaanRequest {
    pub pengukuran_id: Option<Uuid>,
    pub semester: Option<Semester>,
    pub tahun: Option<i32>,
    pub tanggal_target: Option<String>,
    pub tanggal_mulai: Option<String>,
    pub tanggal_selesai: Option<String>,
    pub status: Option<ExecutionStatus>,
    pub progress: Option<i64>,
    pub catatan: Option<String>,
    pub evidence_actual: Option<String>,
    pub link_evidence_actual: Option<String>,
    pub pic_pelaksana: Option<String>,
    pub updated_by: Option<String>,
}

/// PUT /api/pelaksanaan-semester/:id
pub async fn update_pelaksanaan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePelaksanaanRequest>,
) -> ApiResult<Json<ApiResponse<Pelaksanaan>>> {
    if let Some(progress) = request.progress {
        validate_progress(progress)?;
    }

    // Snapshot the record before mutating it for the audit trail
    let old = db::pelaksanaan::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Pelaksanaan semester not found".to_string()))?;

    let changes = PelaksanaanChanges {
        pengukuran_id: request.pengukuran_id,
        semester: request.semester,
        tahun: request.tahun,
        tanggal_target: request.tanggal_target,
        tanggal_mulai: request.tanggal_mulai,
        tanggal_selesai: request.tanggal_selesai,
        status: request.status,
        progress: request.progress,
        catatan: request.catatan,
        evidence_actual: request.evidence_actual,
        link_evidence_actual: request.link_evidence_actual,
        pic_pelaksana: request.pic_pelaksana,
        updated_by: request.updated_by.clone(),
    };
    let pelaksanaan = db::pelaksanaan::update(&state.db, id, &changes)
        .await?
        .ok_or_else(|| ApiError::NotFound("Pelaksanaan semester not found".to_string()))?;

    db::history::append(
        &state.db,
        pelaksanaan.id,
        HistoryAction::Update,
        Some(serde_json::to_string(&old).map_err(smap_common::Error::from)?),
        Some(serde_json::to_string(&pelaksanaan).map_err(smap_common::Error::from)?),
        "Pelaksanaan semester updated",
        request.updated_by.as_deref(),
    )
    .await?;

    Ok(Json(ApiResponse::with_message(
        "Pelaksanaan semester updated successfully",
        pelaksanaan,
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: ExecutionStatus,
    pub updated_by: Option<String>,
}

/// PATCH /api/pelaksanaan-semester/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> ApiResult<Json<ApiResponse<Pelaksanaan>>> {
    let old = db::pelaksanaan::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Pelaksanaan semester not found".to_string()))?;

    let pelaksanaan =
        db::pelaksanaan::set_status(&state.db, id, request.status, request.updated_by.as_deref())
            .await?
            .ok_or_else(|| ApiError::NotFound("Pelaksanaan semester not found".to_string()))?;

    db::history::append(
        &state.db,
        pelaksanaan.id,
        HistoryAction::UpdateStatus,
        Some(old.status.as_str().to_string()),
        Some(request.status.as_str().to_string()),
        &format!("Status changed from {} to {}", old.status, request.status),
        request.updated_by.as_deref(),
    )
    .await?;

    Ok(Json(ApiResponse::with_message(
        "Status updated successfully",
        pelaksanaan,
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgressRequest {
    pub progress: i64,
    pub updated_by: Option<String>,
}

/// PATCH /api/pelaksanaan-semester/:id/progress
pub async fn update_progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProgressRequest>,
) -> ApiResult<Json<ApiResponse<Pelaksanaan>>> {
    validate_progress(request.progress)?;

    let old = db::pelaksanaan::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Pelaksanaan semester not found".to_string()))?;

    let pelaksanaan = db::pelaksanaan::set_progress(
        &state.db,
        id,
        request.progress,
        request.updated_by.as_deref(),
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Pelaksanaan semester not found".to_string()))?;

    db::history::append(
        &state.db,
        pelaksanaan.id,
        HistoryAction::UpdateProgress,
        Some(old.progress.to_string()),
        Some(request.progress.to_string()),
        &format!(
            "Progress updated from {}% to {}%",
            old.progress, request.progress
        ),
        request.updated_by.as_deref(),
    )
    .await?;

    Ok(Json(ApiResponse::with_message(
        "Progress updated successfully",
        pelaksanaan,
    )))
}

/// DELETE /api/pelaksanaan-semester/:id
pub async fn delete_pelaksanaan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if !db::pelaksanaan::delete(&state.db, id).await? {
        return Err(ApiError::NotFound(
            "Pelaksanaan semester not found".to_string(),
        ));
    }
    Ok(Json(ApiResponse::with_message(
        "Pelaksanaan semester deleted successfully",
        (),
    )))
}

fn validate_progress(progress: i64) -> Result<(), ApiError> {
    if !(0..=100).contains(&progress) {
        return Err(ApiError::BadRequest(
            "progress must be between 0 and 100".to_string(),
        ));
    }
    Ok(())
}
