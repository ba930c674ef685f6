//! Master pilar endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::ApiResponse;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::pagination::{PageInfo, PageQuery};
use crate::AppState;
use smap_common::db::models::Pilar;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pilar).post(create_pilar))
        .route("/:id", get(get_pilar).put(update_pilar).delete(delete_pilar))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub klausul_id: Option<Uuid>,
}

/// GET /api/master-pilar
pub async fn list_pilar(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<Pilar>>>> {
    let window = PageQuery {
        page: params.page.unwrap_or(1),
        limit: params.limit.unwrap_or(crate::pagination::DEFAULT_LIMIT),
    }
    .window();

    let items = db::pilar::list(
        &state.db,
        params.klausul_id,
        params.search.as_deref(),
        window.limit,
        window.offset,
    )
    .await?;
    let total = db::pilar::count(&state.db, params.klausul_id, params.search.as_deref()).await?;

    Ok(Json(ApiResponse::paginated(
        items,
        PageInfo::new(window, total),
    )))
}

/// GET /api/master-pilar/:id
pub async fn get_pilar(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Pilar>>> {
    let pilar = db::pilar::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Pilar not found".to_string()))?;
    Ok(Json(ApiResponse::ok(pilar)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePilarRequest {
    pub klausul_id: Uuid,
    pub nama: String,
    pub deskripsi: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// POST /api/master-pilar
pub async fn create_pilar(
    State(state): State<AppState>,
    Json(request): Json<CreatePilarRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Pilar>>)> {
    if request.nama.trim().is_empty() {
        return Err(ApiError::BadRequest("nama is required".to_string()));
    }

    let pilar = db::pilar::create(
        &state.db,
        request.klausul_id,
        request.nama.trim(),
        request.deskripsi.as_deref(),
        request.is_active,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Pilar created successfully", pilar)),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePilarRequest {
    pub klausul_id: Option<Uuid>,
    pub nama: Option<String>,
    pub deskripsi: Option<String>,
    pub is_active: Option<bool>,
}

/// PUT /api/master-pilar/:id
pub async fn update_pilar(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePilarRequest>,
) -> ApiResult<Json<ApiResponse<Pilar>>> {
    let pilar = db::pilar::update(
        &state.db,
        id,
        request.klausul_id,
        request.nama.as_deref(),
        request.deskripsi.as_deref(),
        request.is_active,
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Pilar not found".to_string()))?;

    Ok(Json(ApiResponse::with_message(
        "Pilar updated successfully",
        pilar,
    )))
}

/// DELETE /api/master-pilar/:id
pub async fn delete_pilar(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if !db::pilar::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Pilar not found".to_string()));
    }
    Ok(Json(ApiResponse::with_message(
        "Pilar deleted successfully",
        (),
    )))
}
