use sqlx::PgExecutor;
use uuid::Uuid;

use super::{AuthorRow, DbPool};

/// 作者读写接口
///
/// 名称匹配一律大小写不敏感，且只针对未删除的行；
/// `LOWER(name)` 上的部分唯一索引是并发创建的最终防线。
pub trait AuthorStore {
    /// 获取 SQL 执行器，用于 [`sqlx::query()`] 执行
    fn executor<'t>(&'t mut self) -> impl PgExecutor<'t>;

    /// 按名称（大小写不敏感）查找未删除的作者
    fn find_by_name_ci(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<Option<AuthorRow>, sqlx::Error>> {
        async move {
            sqlx::query_as::<_, AuthorRow>(
                "
                SELECT id, name, created_by, created_at, updated_at
                FROM authors
                WHERE LOWER(name) = LOWER($1) AND deleted_at IS NULL
                ",
            )
            .bind(name)
            .fetch_optional(self.executor())
            .await
        }
    }

    /// 按 id 查找未删除的作者
    fn find_author(
        &mut self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<AuthorRow>, sqlx::Error>> {
        async move {
            sqlx::query_as::<_, AuthorRow>(
                "
                SELECT id, name, created_by, created_at, updated_at
                FROM authors
                WHERE id = $1 AND deleted_at IS NULL
                ",
            )
            .bind(id)
            .fetch_optional(self.executor())
            .await
        }
    }

    /// 新建作者
    fn insert_author(
        &mut self,
        id: Uuid,
        name: &str,
        created_by: Uuid,
    ) -> impl Future<Output = Result<(), sqlx::Error>> {
        async move {
            sqlx::query(
                "
                INSERT INTO authors (id, name, created_by, created_at, updated_at)
                VALUES ($1, $2, $3, now(), now())
                ",
            )
            .bind(id)
            .bind(name)
            .bind(created_by)
            .execute(self.executor())
            .await?;
            Ok(())
        }
    }

    /// 改名，返回受影响行数
    fn rename_author(
        &mut self,
        id: Uuid,
        name: &str,
    ) -> impl Future<Output = Result<u64, sqlx::Error>> {
        async move {
            let result = sqlx::query(
                "
                UPDATE authors SET name = $2, updated_at = now()
                WHERE id = $1 AND deleted_at IS NULL
                ",
            )
            .bind(id)
            .bind(name)
            .execute(self.executor())
            .await?;
            Ok(result.rows_affected())
        }
    }

    /// 除指定 id 外，名称是否已被占用
    fn author_name_taken(
        &mut self,
        name: &str,
        exclude: Uuid,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> {
        async move {
            sqlx::query_scalar(
                "
                SELECT EXISTS (
                    SELECT 1 FROM authors
                    WHERE LOWER(name) = LOWER($1) AND id <> $2 AND deleted_at IS NULL
                )
                ",
            )
            .bind(name)
            .bind(exclude)
            .fetch_one(self.executor())
            .await
        }
    }

    /// 软删除，返回受影响行数
    fn soft_delete_author(&mut self, id: Uuid) -> impl Future<Output = Result<u64, sqlx::Error>> {
        async move {
            let result = sqlx::query(
                "UPDATE authors SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
            )
            .bind(id)
            .execute(self.executor())
            .await?;
            Ok(result.rows_affected())
        }
    }

    /// 仍引用该作者的文章数（含草稿）
    fn author_article_count(
        &mut self,
        author_id: Uuid,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> {
        async move {
            sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE author_id = $1")
                .bind(author_id)
                .fetch_one(self.executor())
                .await
        }
    }
}

impl AuthorStore for sqlx::PgTransaction<'_> {
    fn executor<'t>(&'t mut self) -> impl PgExecutor<'t> {
        self.as_mut()
    }
}

impl AuthorStore for &'_ DbPool {
    fn executor<'t>(&'t mut self) -> impl PgExecutor<'t> {
        *self
    }
}

/// 作者列表查询
pub trait AuthorQuery {
    fn db(&self) -> &DbPool;

    /// 所有未删除的作者，按名称升序（下拉选项用）
    fn list_authors(&self) -> impl Future<Output = Result<Vec<AuthorRow>, sqlx::Error>> {
        async {
            sqlx::query_as::<_, AuthorRow>(
                "
                SELECT id, name, created_by, created_at, updated_at
                FROM authors
                WHERE deleted_at IS NULL
                ORDER BY name ASC
                ",
            )
            .fetch_all(self.db())
            .await
        }
    }
}

impl AuthorQuery for &DbPool {
    fn db(&self) -> &DbPool {
        self
    }
}
