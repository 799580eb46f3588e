use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiResponse, AuthUser};
use crate::{error::Result, service, state::AppState, storage::AuthorRow};

/// 配置作者管理路由。
///
/// - `GET/POST /admin/authors`：下拉列表与显式新建
/// - `PUT/DELETE /admin/authors/{id}`
pub(super) fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/admin/authors", get(list).post(create))
        .route("/admin/authors/{id}", put(update).delete(remove))
}

/// 对外的作者表示
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorBody {
    id: Uuid,
    name: String,
    created_by: Uuid,
    created_at: i64,
    updated_at: i64,
}

impl From<AuthorRow> for AuthorBody {
    fn from(row: AuthorRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            created_by: row.created_by,
            created_at: row.created_at.timestamp_millis(),
            updated_at: row.updated_at.timestamp_millis(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthorPayload {
    name: String,
}

async fn list(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<AuthorBody>>>> {
    let rows = service::authors::list_authors(&state).await?;
    Ok(ApiResponse::new(
        "Authors retrieved successfully",
        rows.into_iter().map(Into::into).collect(),
    ))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<AuthorPayload>,
) -> Result<(StatusCode, Json<ApiResponse<AuthorBody>>)> {
    let author = service::authors::create_author(&state, user, &payload.name).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::new("Author created successfully", author.into()),
    ))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AuthorPayload>,
) -> Result<Json<ApiResponse<AuthorBody>>> {
    let author = service::authors::rename_author(&state, id, &payload.name).await?;
    Ok(ApiResponse::new(
        "Author updated successfully",
        author.into(),
    ))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    service::authors::delete_author(&state, id).await?;
    Ok(ApiResponse::new(
        "Author deleted successfully",
        serde_json::Value::Null,
    ))
}
