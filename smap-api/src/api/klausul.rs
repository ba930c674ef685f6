//! Master klausul endpoints
//!
//! List/detail views return the clause with its full nested hierarchy;
//! the stats variant adds computed aggregates over the subtree.

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
use crate::db::stats::SemesterStats;
use crate::db::tree::{KlausulStatistics, KlausulTree, TreeFilter};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{PageInfo, PageQuery};
use crate::AppState;
use smap_common::db::models::{Klausul, Semester};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_klausul).post(create_klausul))
        .route("/semester-group", get(semester_group))
        .route(
            "/:id",
            get(get_klausul).put(update_klausul).delete(delete_klausul),
        )
        .route("/:id/stats", get(get_klausul_stats))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub semester: Option<Semester>,
    pub tahun: Option<i32>,
}

/// GET /api/master-klausul
///
/// Paginated clause list with nested hierarchy. With a semester/tahun
/// filter only clauses having matching executions are returned.
pub async fn list_klausul(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<KlausulTree>>>> {
    let window = PageQuery {
        page: params.page.unwrap_or(1),
        limit: params.limit.unwrap_or(crate::pagination::DEFAULT_LIMIT),
    }
    .window();

    let filter = db::klausul::ListFilter {
        search: params.search,
        is_active: params.is_active,
        semester: params.semester,
        tahun: params.tahun,
    };
    let items = db::klausul::list(&state.db, &filter, window.limit, window.offset).await?;
    let total = db::klausul::count(&state.db, &filter).await?;

    let tree_filter = TreeFilter {
        semester: params.semester,
        tahun: params.tahun,
        active_only: true,
        history_limit: 0,
    };
    let mut trees = Vec::with_capacity(items.len());
    for klausul in items {
        trees.push(db::tree::load_klausul_tree(&state.db, klausul, &tree_filter).await?);
    }

    Ok(Json(ApiResponse::paginated(
        trees,
        PageInfo::new(window, total),
    )))
}

/// GET /api/master-klausul/:id
pub async fn get_klausul(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<KlausulTree>>> {
    let klausul = db::klausul::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Klausul not found".to_string()))?;

    let tree_filter = TreeFilter {
        semester: params.semester,
        tahun: params.tahun,
        active_only: false,
        history_limit: 5,
    };
    let tree = db::tree::load_klausul_tree(&state.db, klausul, &tree_filter).await?;
    Ok(Json(ApiResponse::ok(tree)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KlausulWithStats {
    #[serde(flatten)]
    pub tree: KlausulTree,
    pub statistics: KlausulStatistics,
}

/// GET /api/master-klausul/:id/stats
pub async fn get_klausul_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<KlausulWithStats>>> {
    let klausul = db::klausul::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Klausul not found".to_string()))?;

    let tree_filter = TreeFilter {
        semester: params.semester,
        tahun: params.tahun,
        active_only: false,
        history_limit: 3,
    };
    let tree = db::tree::load_klausul_tree(&state.db, klausul, &tree_filter).await?;
    let statistics = db::tree::compute_statistics(&tree);

    Ok(Json(ApiResponse::ok(KlausulWithStats { tree, statistics })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterGroup {
    pub semester: Semester,
    pub klausul: Vec<KlausulTree>,
    pub statistics: SemesterStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterGroupSummary {
    pub total_klausul_s1: i64,
    pub total_klausul_s2: i64,
    pub total_pengukuran_s1: i64,
    pub total_pengukuran_s2: i64,
    pub total_pelaksanaan_s1: i64,
    pub total_pelaksanaan_s2: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterGroupResponse {
    pub semester1: SemesterGroup,
    pub semester2: SemesterGroup,
    pub summary: SemesterGroupSummary,
}

/// GET /api/master-klausul/semester-group
///
/// Clauses and aggregate statistics grouped into S1/S2.
pub async fn semester_group(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<SemesterGroupResponse>>> {
    let semester1 = load_group(&state, Semester::S1, &params).await?;
    let semester2 = load_group(&state, Semester::S2, &params).await?;

    let summary = SemesterGroupSummary {
        total_klausul_s1: semester1.statistics.total_klausul,
        total_klausul_s2: semester2.statistics.total_klausul,
        total_pengukuran_s1: semester1.statistics.total_pengukuran,
        total_pengukuran_s2: semester2.statistics.total_pengukuran,
        total_pelaksanaan_s1: semester1.statistics.total_pelaksanaan,
        total_pelaksanaan_s2: semester2.statistics.total_pelaksanaan,
    };

    Ok(Json(ApiResponse::ok(SemesterGroupResponse {
        semester1,
        semester2,
        summary,
    })))
}

async fn load_group(
    state: &AppState,
    semester: Semester,
    params: &ListParams,
) -> ApiResult<SemesterGroup> {
    let statistics = db::stats::semester_stats(&state.db, semester, params.tahun).await?;

    let filter = db::klausul::ListFilter {
        search: params.search.clone(),
        is_active: params.is_active,
        semester: Some(semester),
        tahun: params.tahun,
    };
    let items = db::klausul::list(&state.db, &filter, crate::pagination::MAX_LIMIT, 0).await?;

    let tree_filter = TreeFilter {
        semester: Some(semester),
        tahun: params.tahun,
        active_only: true,
        history_limit: 0,
    };
    let mut trees = Vec::with_capacity(items.len());
    for klausul in items {
        trees.push(db::tree::load_klausul_tree(&state.db, klausul, &tree_filter).await?);
    }

    Ok(SemesterGroup {
        semester,
        klausul: trees,
        statistics,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKlausulRequest {
    pub kode: String,
    pub nama: String,
    pub deskripsi: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// POST /api/master-klausul
pub async fn create_klausul(
    State(state): State<AppState>,
    Json(request): Json<CreateKlausulRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Klausul>>)> {
    if request.kode.trim().is_empty() || request.nama.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "kode and nama are required".to_string(),
        ));
    }

    let klausul = db::klausul::create(
        &state.db,
        request.kode.trim(),
        request.nama.trim(),
        request.deskripsi.as_deref(),
        request.is_active,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Klausul created successfully",
            klausul,
        )),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateKlausulRequest {
    pub kode: Option<String>,
    pub nama: Option<String>,
    pub deskripsi: Option<String>,
    pub is_active: Option<bool>,
}

/// PUT /api/master-klausul/:id
pub async fn update_klausul(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateKlausulRequest>,
) -> ApiResult<Json<ApiResponse<Klausul>>> {
    let klausul = db::klausul::update(
        &state.db,
        id,
        request.kode.as_deref(),
        request.nama.as_deref(),
        request.deskripsi.as_deref(),
        request.is_active,
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Klausul not found".to_string()))?;

    Ok(Json(ApiResponse::with_message(
        "Klausul updated successfully",
        klausul,
    )))
}

/// DELETE /api/master-klausul/:id
pub async fn delete_klausul(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if !db::klausul::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Klausul not found".to_string()));
    }
    Ok(Json(ApiResponse::with_message(
        "Klausul deleted successfully",
        (),
    )))
}
