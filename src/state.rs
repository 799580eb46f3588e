use std::sync::Arc;

use axum::extract::FromRef;

use crate::{storage::DbPool, uploads::Uploads};

/// 应用程序上下文
///
/// [`AppState`] 封装了数据库连接池和上传文件管理器，提供统一访问入口。
#[derive(Clone, FromRef)]
pub struct AppState {
    pool: DbPool,
    uploads: Arc<Uploads>,
}

impl AppState {
    /// 创建一个新的 [`AppState`] 实例
    pub fn new(pool: DbPool, uploads: Arc<Uploads>) -> Self {
        Self { pool, uploads }
    }

    /// 获取数据库连接池
    pub fn db(&self) -> &DbPool {
        &self.pool
    }

    /// 获取上传文件管理器
    pub fn uploads(&self) -> &Uploads {
        &self.uploads
    }
}
