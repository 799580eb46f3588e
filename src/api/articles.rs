use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiResponse, AuthUser};
use crate::{
    content::{NewArticle, UpdateArticle},
    error::{Error, Result},
    service,
    state::AppState,
    storage::{ArticleFilter, ArticleRow},
};

/// 配置文章相关路由。
///
/// 前台：
/// - `GET /public/articles`：已发布文章列表
/// - `GET /public/articles/{identifier}`：按 id 或 slug 获取已发布文章
/// - `GET /public/articles/{identifier}/related`：同分类相关文章
/// - `GET /public/authors`：已发布文章的作者署名（筛选下拉用）
///
/// 后台：
/// - `GET/POST /admin/articles`
/// - `GET/PUT/DELETE /admin/articles/{id}`
/// - `PATCH /admin/articles/{id}/toggle-publish`
pub(super) fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/public/articles", get(public_list))
        .route("/public/articles/{identifier}", get(public_get_one))
        .route("/public/articles/{identifier}/related", get(public_related))
        .route("/public/authors", get(public_author_names))
        .route("/admin/articles", get(admin_list).post(create))
        .route(
            "/admin/articles/{id}",
            get(admin_get_one).put(update).delete(remove),
        )
        .route("/admin/articles/{id}/toggle-publish", patch(toggle_publish))
}

/// 对外的文章表示
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleBody {
    id: Uuid,
    title: String,
    slug: String,
    content: String,
    category: RefBody,
    author: RefBody,
    image: Option<String>,
    is_published: bool,
    created_at: i64,
    updated_at: i64,
}

/// 关联实体的最小表示
#[derive(Debug, Serialize)]
pub struct RefBody {
    id: Uuid,
    name: String,
}

impl From<ArticleRow> for ArticleBody {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            is_published: row.is_published(),
            title: row.title,
            slug: row.slug,
            content: row.content,
            category: RefBody {
                id: row.category_id,
                name: row.category_name,
            },
            author: RefBody {
                id: row.author_id,
                name: row.author_name,
            },
            image: row.featured_image,
            created_at: row.created_at.timestamp_millis(),
            updated_at: row.updated_at.timestamp_millis(),
        }
    }
}

/// 查询参数，用于文章列表分页和筛选。
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ListParams {
    page: i64,
    limit: i64,
    category: Option<String>,
    author: Option<String>,
    search: Option<String>,
    published: Option<bool>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            category: None,
            author: None,
            search: None,
            published: None,
        }
    }
}

impl ListParams {
    fn into_filter(self) -> ArticleFilter {
        ArticleFilter {
            search: self.search,
            category: self.category,
            author: self.author,
            published: self.published,
            page: self.page,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RelatedParams {
    limit: Option<i64>,
}

/// 前台文章列表，强制只看已发布
async fn public_list(
    Query(params): Query<ListParams>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ArticleBody>>>> {
    let filter = ArticleFilter {
        published: Some(true),
        ..params.into_filter()
    };

    let (rows, meta) = service::articles::list_articles(&state, filter).await?;
    Ok(ApiResponse::paged(
        "Articles retrieved successfully",
        rows.into_iter().map(Into::into).collect(),
        meta,
    ))
}

/// 后台文章列表，发布状态三态筛选
async fn admin_list(
    Query(params): Query<ListParams>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ArticleBody>>>> {
    let (rows, meta) = service::articles::list_articles(&state, params.into_filter()).await?;
    Ok(ApiResponse::paged(
        "Articles retrieved successfully",
        rows.into_iter().map(Into::into).collect(),
        meta,
    ))
}

/// 按 id 或 slug 获取已发布文章，草稿对前台不可见
async fn public_get_one(
    Path(identifier): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ArticleBody>>> {
    let article = service::articles::get_article(&state, &identifier)
        .await?
        .filter(ArticleRow::is_published)
        .ok_or(Error::NotFound("Article"))?;

    Ok(ApiResponse::new(
        "Article retrieved successfully",
        article.into(),
    ))
}

async fn admin_get_one(
    Path(identifier): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ArticleBody>>> {
    let article = service::articles::get_article(&state, &identifier)
        .await?
        .ok_or(Error::NotFound("Article"))?;

    Ok(ApiResponse::new(
        "Article retrieved successfully",
        article.into(),
    ))
}

async fn public_related(
    Path(identifier): Path<String>,
    Query(params): Query<RelatedParams>,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ArticleBody>>>> {
    let rows = service::articles::related_articles(&state, &identifier, params.limit).await?;
    Ok(ApiResponse::new(
        "Related articles retrieved successfully",
        rows.into_iter().map(Into::into).collect(),
    ))
}

async fn public_author_names(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>> {
    let names = service::articles::published_author_names(&state).await?;
    Ok(ApiResponse::new("Authors retrieved successfully", names))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(input): Json<NewArticle>,
) -> Result<(StatusCode, Json<ApiResponse<ArticleBody>>)> {
    let article = service::articles::create_article(&state, user, input).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::new("Article created successfully", article.into()),
    ))
}

async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateArticle>,
) -> Result<Json<ApiResponse<ArticleBody>>> {
    let article = service::articles::update_article(&state, user, id, input).await?;
    Ok(ApiResponse::new(
        "Article updated successfully",
        article.into(),
    ))
}

async fn toggle_publish(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ArticleBody>>> {
    let article = service::articles::toggle_publish(&state, id).await?;

    let message = if article.is_published() {
        "Article published successfully"
    } else {
        "Article drafted successfully"
    };
    Ok(ApiResponse::new(message, article.into()))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>> {
    service::articles::delete_article(&state, id).await?;
    Ok(ApiResponse::new(
        "Article deleted successfully",
        serde_json::Value::Null,
    ))
}
