//! Pengukuran master endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::ApiResponse;
use crate::db;
use crate::db::pengukuran::PengukuranAttrs;
use crate::db::stats::StatusDistribution;
use crate::error::{ApiError, ApiResult};
use crate::pagination::{PageInfo, PageQuery};
use crate::AppState;
use smap_common::db::models::{Pelaksanaan, Pengukuran};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pengukuran).post(create_pengukuran))
        .route(
            "/:id",
            get(get_pengukuran)
                .put(update_pengukuran)
                .delete(delete_pengukuran),
        )
        .route("/:id/execution-summary", get(execution_summary))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub sub_elemen_id: Option<Uuid>,
}

/// GET /api/pengukuran-master
pub async fn list_pengukuran(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<Pengukuran>>>> {
    let window = PageQuery {
        page: params.page.unwrap_or(1),
        limit: params.limit.unwrap_or(crate::pagination::DEFAULT_LIMIT),
    }
    .window();

    let items = db::pengukuran::list(
        &state.db,
        params.sub_elemen_id,
        params.search.as_deref(),
        window.limit,
        window.offset,
    )
    .await?;
    let total =
        db::pengukuran::count(&state.db, params.sub_elemen_id, params.search.as_deref()).await?;

    Ok(Json(ApiResponse::paginated(
        items,
        PageInfo::new(window, total),
    )))
}

/// GET /api/pengukuran-master/:id
pub async fn get_pengukuran(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Pengukuran>>> {
    let pengukuran = db::pengukuran::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Pengukuran not found".to_string()))?;
    Ok(Json(ApiResponse::ok(pengukuran)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionSummary {
    #[serde(flatten)]
    pub pengukuran: Pengukuran,
    pub pelaksanaan_semester: Vec<Pelaksanaan>,
    pub total_pelaksanaan: usize,
    pub status_distribution: StatusDistribution,
    pub average_progress: i64,
}

/// GET /api/pengukuran-master/:id/execution-summary
///
/// Measurement with all of its executions and per-status aggregates.
pub async fn execution_summary(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<ExecutionSummary>>> {
    let pengukuran = db::pengukuran::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Pengukuran not found".to_string()))?;

    let executions = db::pelaksanaan::list_for_pengukuran(&state.db, id, None, None, None).await?;

    let mut distribution = StatusDistribution::default();
    let mut progress_sum: i64 = 0;
    for execution in &executions {
        distribution.record(execution.status, 1);
        progress_sum += execution.progress;
    }
    let average_progress = if executions.is_empty() {
        0
    } else {
        (progress_sum as f64 / executions.len() as f64).round() as i64
    };

    Ok(Json(ApiResponse::ok(ExecutionSummary {
        pengukuran,
        total_pelaksanaan: executions.len(),
        pelaksanaan_semester: executions,
        status_distribution: distribution,
        average_progress,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePengukuranRequest {
    pub sub_elemen_id: Uuid,
    pub nama_pengukuran: String,
    #[serde(default)]
    pub indikator: String,
    pub jadwal_pengerjaan: Option<String>,
    pub kualitas_pemenuhan: Option<String>,
    pub evidence: Option<String>,
    pub link_evidence: Option<String>,
    pub pic: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_by: Option<String>,
}

fn default_true() -> bool {
    true
}

/// POST /api/pengukuran-master
pub async fn create_pengukuran(
    State(state): State<AppState>,
    Json(request): Json<CreatePengukuranRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Pengukuran>>)> {
    if request.nama_pengukuran.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "namaPengukuran is required".to_string(),
        ));
    }

    let attrs = PengukuranAttrs {
        jadwal_pengerjaan: request.jadwal_pengerjaan,
        kualitas_pemenuhan: request.kualitas_pemenuhan,
        evidence: request.evidence,
        link_evidence: request.link_evidence,
        pic: request.pic,
    };
    let pengukuran = db::pengukuran::create(
        &state.db,
        request.sub_elemen_id,
        request.nama_pengukuran.trim(),
        request.indikator.trim(),
        &attrs,
        request.is_active,
        request.created_by.as_deref(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Pengukuran created successfully",
            pengukuran,
        )),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePengukuranRequest {
    pub sub_elemen_id: Option<Uuid>,
    pub nama_pengukuran: Option<String>,
    pub indikator: Option<String>,
    pub jadwal_pengerjaan: Option<String>,
    pub kualitas_pemenuhan: Option<String>,
    pub evidence: Option<String>,
    pub link_evidence: Option<String>,
    pub pic: Option<String>,
    pub is_active: Option<bool>,
    pub updated_by: Option<String>,
}

/// PUT /api/pengukuran-master/:id
pub async fn update_pengukuran(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePengukuranRequest>,
) -> ApiResult<Json<ApiResponse<Pengukuran>>> {
    let attrs = PengukuranAttrs {
        jadwal_pengerjaan: request.jadwal_pengerjaan,
        kualitas_pemenuhan: request.kualitas_pemenuhan,
        evidence: request.evidence,
        link_evidence: request.link_evidence,
        pic: request.pic,
    };
    let pengukuran = db::pengukuran::update(
        &state.db,
        id,
        request.sub_elemen_id,
        request.nama_pengukuran.as_deref(),
        request.indikator.as_deref(),
        &attrs,
        request.is_active,
        request.updated_by.as_deref(),
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Pengukuran not found".to_string()))?;

    Ok(Json(ApiResponse::with_message(
        "Pengukuran updated successfully",
        pengukuran,
    )))
}

/// DELETE /api/pengukuran-master/:id
pub async fn delete_pengukuran(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if !db::pengukuran::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Pengukuran not found".to_string()));
    }
    Ok(Json(ApiResponse::with_message(
        "Pengukuran deleted successfully",
        (),
    )))
}
