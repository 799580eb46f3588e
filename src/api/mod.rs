mod articles;
mod authors;
mod categories;

use axum::{
    Json, Router,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::{service::PageMeta, state::AppState};

/// 配置全部业务路由
///
/// `/public/*` 面向前台读取，`/admin/*` 由上游认证中间件保护。
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .merge(articles::setup_route())
        .merge(categories::setup_route())
        .merge(authors::setup_route())
}

pub async fn run_server(state: AppState) {
    let router = Router::new()
        .nest("/api", setup_route())
        .with_state(state);

    let router = add_middlewares(router);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    println!("Listening on :3000");
    axum::serve(listener, router).await.unwrap();
}

fn add_middlewares(router: Router) -> Router {
    fn log_failure(
        err: tower_http::classify::ServerErrorsFailureClass,
        _latency: std::time::Duration,
        _span: &tracing::Span,
    ) {
        tracing::error!(error = %err, "request failed");
    }

    router.layer(TraceLayer::new_for_http().on_failure(log_failure))
}

/// 统一的成功响应信封
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    success: bool,
    message: &'static str,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<PageMeta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(message: &'static str, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message,
            data,
            pagination: None,
        })
    }

    /// 带分页信息的列表响应
    pub fn paged(message: &'static str, data: T, pagination: PageMeta) -> Json<Self> {
        Json(Self {
            success: true,
            message,
            data,
            pagination: Some(pagination),
        })
    }
}

/// 上游认证中间件注入的操作用户
///
/// 认证本身不在本服务内：网关完成鉴权后把用户 id 放进
/// `x-user-id` 头，这里只负责取出；缺失即 401。
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .map(AuthUser)
            .ok_or((StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}
