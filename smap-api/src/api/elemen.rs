//! Master elemen endpoints

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
use smap_common::db::models::Elemen;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_elemen).post(create_elemen))
        .route(
            "/:id",
            get(get_elemen).put(update_elemen).delete(delete_elemen),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub pilar_id: Option<Uuid>,
}

/// GET /api/master-elemen
pub async fn list_elemen(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<Elemen>>>> {
    let window = PageQuery {
        page: params.page.unwrap_or(1),
        limit: params.limit.unwrap_or(crate::pagination::DEFAULT_LIMIT),
    }
    .window();

    let items = db::elemen::list(
        &state.db,
        params.pilar_id,
        params.search.as_deref(),
        window.limit,
        window.offset,
    )
    .await?;
    let total = db::elemen::count(&state.db, params.pilar_id, params.search.as_deref()).await?;

    Ok(Json(ApiResponse::paginated(
        items,
        PageInfo::new(window, total),
    )))
}

/// GET /api/master-elemen/:id
pub async fn get_elemen(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Elemen>>> {
    let elemen = db::elemen::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Elemen not found".to_string()))?;
    Ok(Json(ApiResponse::ok(elemen)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateElemenRequest {
    pub pilar_id: Uuid,
    pub nama: String,
    pub deskripsi: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// POST /api/master-elemen
pub async fn create_elemen(
    State(state): State<AppState>,
    Json(request): Json<CreateElemenRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Elemen>>)> {
    if request.nama.trim().is_empty() {
        return Err(ApiError::BadRequest("nama is required".to_string()));
    }

    let elemen = db::elemen::create(
        &state.db,
        request.pilar_id,
        request.nama.trim(),
        request.deskripsi.as_deref(),
        request.is_active,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Elemen created successfully",
            elemen,
        )),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateElemenRequest {
    pub pilar_id: Option<Uuid>,
    pub nama: Option<String>,
    pub deskripsi: Option<String>,
    pub is_active: Option<bool>,
}

/// PUT /api/master-elemen/:id
pub async fn update_elemen(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateElemenRequest>,
) -> ApiResult<Json<ApiResponse<Elemen>>> {
    let elemen = db::elemen::update(
        &state.db,
        id,
        request.pilar_id,
        request.nama.as_deref(),
        request.deskripsi.as_deref(),
        request.is_active,
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Elemen not found".to_string()))?;

    Ok(Json(ApiResponse::with_message(
        "Elemen updated successfully",
        elemen,
    )))
}

/// DELETE /api/master-elemen/:id
pub async fn delete_elemen(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if !db::elemen::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Elemen not found".to_string()));
    }
    Ok(Json(ApiResponse::with_message(
        "Elemen deleted successfully",
        (),
    )))
}
