use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiResponse, AuthUser};
use crate::{error::Result, service, state::AppState, storage::CategoryRow};

/// 配置分类相关路由。
///
/// - `GET /public/categories`：前台分类列表（页签用）
/// - `GET/POST /admin/categories`
/// - `GET/PUT/DELETE /admin/categories/{id}`
pub(super) fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/public/categories", get(list))
        .route("/admin/categories", get(list).post(create))
        .route("/admin/categories/{id}", get(get_one).put(update).delete(remove))
}

/// 对外的分类表示
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBody {
    id: Uuid,
    name: String,
    created_at: i64,
    updated_at: i64,
}

impl From<CategoryRow> for CategoryBody {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_at: row.created_at.timestamp_millis(),
            updated_at: row.updated_at.timestamp_millis(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ListParams {
    page: i64,
    limit: i64,
    search: Option<String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryPayload {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CategoryUpdate {
    name: Option<String>,
}

async fn list(
    Query(params): Query<ListParams>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CategoryBody>>>> {
    let (rows, meta) =
        service::categories::list_categories(&state, params.search.as_deref(), params.page, params.limit)
            .await?;

    Ok(ApiResponse::paged(
        "Categories retrieved successfully",
        rows.into_iter().map(Into::into).collect(),
        meta,
    ))
}

async fn get_one(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CategoryBody>>> {
    let category = service::categories::get_category(&state, id).await?;
    Ok(ApiResponse::new(
        "Category retrieved successfully",
        category.into(),
    ))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CategoryPayload>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryBody>>)> {
    let category = service::categories::create_category(&state, user, &payload.name).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::new("Category created successfully", category.into()),
    ))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<Json<ApiResponse<CategoryBody>>> {
    let category =
        service::categories::rename_category(&state, id, payload.name.as_deref()).await?;
    Ok(ApiResponse::new(
        "Category updated successfully",
        category.into(),
    ))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    service::categories::delete_category(&state, id).await?;
    Ok(ApiResponse::new(
        "Category deleted successfully",
        serde_json::Value::Null,
    ))
}
