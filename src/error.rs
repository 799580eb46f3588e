use std::io;

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub type Result<T> = core::result::Result<T, Error>;

/// Postgres 唯一约束冲突的错误码
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("slug generation exhausted after {0} attempts")]
    GenerationExhausted(u32),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// 机器可判别的错误类别，随响应体一起返回
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::NotFound(_) => "not_found",
            Error::Conflict(_) => "conflict",
            Error::GenerationExhausted(_) | Error::Sqlx(_) | Error::Io(_) => "internal",
        }
    }

    /// 是否由唯一约束冲突引起
    ///
    /// 并发写入撞到 slug 或作者名的唯一索引时，调用方按该类别重试，
    /// 不解析错误文本。
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            Error::Sqlx(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNIQUE_VIOLATION)
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            Error::Validation(msg) | Error::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Error::GenerationExhausted(_) => {
                tracing::error!(error = %self, "slug generation exhausted");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            Error::Sqlx(e) => {
                tracing::error!(%e, "sqlx error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            Error::Io(e) => {
                tracing::error!(%e, "file io error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        (
            status,
            Json(json!({
                "success": false,
                "kind": self.kind(),
                "message": message,
            })),
        )
            .into_response()
    }
}
