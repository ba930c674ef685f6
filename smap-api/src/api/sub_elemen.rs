//! Master sub-elemen endpoints

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
use smap_common::db::models::SubElemen;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sub_elemen).post(create_sub_elemen))
        .route(
            "/:id",
            get(get_sub_elemen)
                .put(update_sub_elemen)
                .delete(delete_sub_elemen),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub elemen_id: Option<Uuid>,
}

/// GET /api/master-sub-elemen
pub async fn list_sub_elemen(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<ApiResponse<Vec<SubElemen>>>> {
    let window = PageQuery {
        page: params.page.unwrap_or(1),
        limit: params.limit.unwrap_or(crate::pagination::DEFAULT_LIMIT),
    }
    .window();

    let items = db::sub_elemen::list(
        &state.db,
        params.elemen_id,
        params.search.as_deref(),
        window.limit,
        window.offset,
    )
    .await?;
    let total =
        db::sub_elemen::count(&state.db, params.elemen_id, params.search.as_deref()).await?;

    Ok(Json(ApiResponse::paginated(
        items,
        PageInfo::new(window, total),
    )))
}

/// GET /api/master-sub-elemen/:id
pub async fn get_sub_elemen(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<SubElemen>>> {
    let sub_elemen = db::sub_elemen::get(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Sub elemen not found".to_string()))?;
    Ok(Json(ApiResponse::ok(sub_elemen)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubElemenRequest {
    pub elemen_id: Uuid,
    pub nama: String,
    pub deskripsi: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// POST /api/master-sub-elemen
pub async fn create_sub_elemen(
    State(state): State<AppState>,
    Json(request): Json<CreateSubElemenRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<SubElemen>>)> {
    if request.nama.trim().is_empty() {
        return Err(ApiError::BadRequest("nama is required".to_string()));
    }

    let sub_elemen = db::sub_elemen::create(
        &state.db,
        request.elemen_id,
        request.nama.trim(),
        request.deskripsi.as_deref(),
        request.is_active,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Sub elemen created successfully",
            sub_elemen,
        )),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubElemenRequest {
    pub elemen_id: Option<Uuid>,
    pub nama: Option<String>,
    pub deskripsi: Option<String>,
    pub is_active: Option<bool>,
}

/// PUT /api/master-sub-elemen/:id
pub async fn update_sub_elemen(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateSubElemenRequest>,
) -> ApiResult<Json<ApiResponse<SubElemen>>> {
    let sub_elemen = db::sub_elemen::update(
        &state.db,
        id,
        request.elemen_id,
        request.nama.as_deref(),
        request.deskripsi.as_deref(),
        request.is_active,
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Sub elemen not found".to_string()))?;

    Ok(Json(ApiResponse::with_message(
        "Sub elemen updated successfully",
        sub_elemen,
    )))
}

/// DELETE /api/master-sub-elemen/:id
pub async fn delete_sub_elemen(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if !db::sub_elemen::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Sub elemen not found".to_string()));
    }
    Ok(Json(ApiResponse::with_message(
        "Sub elemen deleted successfully",
        (),
    )))
}
