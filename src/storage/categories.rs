use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{CategoryRow, DbPool};

const CATEGORY_COLUMNS: &str = "id, name, created_by, created_at, updated_at";

/// 分类读写接口
pub trait CategoryStore {
    /// 获取 SQL 执行器，用于 [`sqlx::query()`] 执行
    fn executor<'t>(&'t mut self) -> impl PgExecutor<'t>;

    /// 按 id 查找未删除的分类
    fn find_category(
        &mut self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<CategoryRow>, sqlx::Error>> {
        async move {
            sqlx::query_as::<_, CategoryRow>(&format!(
                "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1 AND deleted_at IS NULL"
            ))
            .bind(id)
            .fetch_optional(self.executor())
            .await
        }
    }

    /// 按名称（大小写不敏感）查找未删除的分类
    fn find_category_by_name(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<Option<CategoryRow>, sqlx::Error>> {
        async move {
            sqlx::query_as::<_, CategoryRow>(&format!(
                "
                SELECT {CATEGORY_COLUMNS} FROM categories
                WHERE LOWER(name) = LOWER($1) AND deleted_at IS NULL
                "
            ))
            .bind(name)
            .fetch_optional(self.executor())
            .await
        }
    }

    /// 新建分类
    fn insert_category(
        &mut self,
        id: Uuid,
        name: &str,
        created_by: Uuid,
    ) -> impl Future<Output = Result<(), sqlx::Error>> {
        async move {
            sqlx::query(
                "
                INSERT INTO categories (id, name, created_by, created_at, updated_at)
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
    fn rename_category(
        &mut self,
        id: Uuid,
        name: &str,
    ) -> impl Future<Output = Result<u64, sqlx::Error>> {
        async move {
            let result = sqlx::query(
                "
                UPDATE categories SET name = $2, updated_at = now()
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
    fn category_name_taken(
        &mut self,
        name: &str,
        exclude: Option<Uuid>,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> {
        async move {
            sqlx::query_scalar(
                "
                SELECT EXISTS (
                    SELECT 1 FROM categories
                    WHERE LOWER(name) = LOWER($1)
                    AND ($2::uuid IS NULL OR id <> $2)
                    AND deleted_at IS NULL
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
    fn soft_delete_category(
        &mut self,
        id: Uuid,
    ) -> impl Future<Output = Result<u64, sqlx::Error>> {
        async move {
            let result = sqlx::query(
                "UPDATE categories SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
            )
            .bind(id)
            .execute(self.executor())
            .await?;
            Ok(result.rows_affected())
        }
    }

    /// 该分类下已发布文章数，删除守卫用
    fn published_article_count(
        &mut self,
        category_id: Uuid,
    ) -> impl Future<Output = Result<i64, sqlx::Error>> {
        async move {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM articles WHERE category_id = $1 AND published_at IS NOT NULL",
            )
            .bind(category_id)
            .fetch_one(self.executor())
            .await
        }
    }
}

impl CategoryStore for sqlx::PgTransaction<'_> {
    fn executor<'t>(&'t mut self) -> impl PgExecutor<'t> {
        self.as_mut()
    }
}

impl CategoryStore for &'_ DbPool {
    fn executor<'t>(&'t mut self) -> impl PgExecutor<'t> {
        *self
    }
}

/// 分类列表查询
pub trait CategoryQuery {
    fn db(&self) -> &DbPool;

    /// 分页查询未删除的分类，可按名称模糊过滤，按创建时间倒序
    fn list_categories(
        &self,
        search: Option<&str>,
        page: i64,
        limit: i64,
    ) -> impl Future<Output = Result<(Vec<CategoryRow>, i64), sqlx::Error>> {
        async move {
            let push_filter = |builder: &mut QueryBuilder<'_, Postgres>| {
                builder.push(" WHERE deleted_at IS NULL");
                if let Some(search) = search {
                    builder
                        .push(" AND name ILIKE ")
                        .push_bind(format!("%{search}%"));
                }
            };

            let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM categories");
            push_filter(&mut count);
            let total: i64 = count.build_query_scalar().fetch_one(self.db()).await?;

            let page = page.max(1);
            let mut builder = QueryBuilder::<Postgres>::new(format!(
                "SELECT {CATEGORY_COLUMNS} FROM categories"
            ));
            push_filter(&mut builder);
            builder.push(" ORDER BY created_at DESC");
            builder.push(" LIMIT ").push_bind(limit);
            builder.push(" OFFSET ").push_bind((page - 1) * limit);

            let rows = builder
                .build_query_as::<CategoryRow>()
                .fetch_all(self.db())
                .await?;
            Ok((rows, total))
        }
    }
}

impl CategoryQuery for &DbPool {
    fn db(&self) -> &DbPool {
        self
    }
}
