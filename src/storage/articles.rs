use chrono::{DateTime, Local};
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{ArticleRow, DbPool, NewArticleRow};
use crate::content::SlugProbe;

/// 文章查询共用的列与连接
///
/// 分类名走连接取最新值，作者署名直接用文章上的反规范化副本。
const ARTICLE_SELECT: &str = "
    SELECT a.id, a.title, a.slug, a.content, a.featured_image,
           a.published_at, a.created_at, a.updated_at,
           c.id AS category_id, c.name AS category_name,
           a.author_id, a.author_name
    FROM articles a
    INNER JOIN categories c ON a.category_id = c.id
";

/// 文章列表的过滤与分页参数
///
/// `category` 和 `author` 接受 id 或名称；`published` 为
/// `None` 时不过滤发布状态。
#[derive(Debug)]
pub struct ArticleFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    pub published: Option<bool>,
    pub page: i64,
    pub limit: i64,
}

impl Default for ArticleFilter {
    fn default() -> Self {
        Self {
            search: None,
            category: None,
            author: None,
            published: None,
            page: 1,
            limit: 10,
        }
    }
}

/// 更新文章时已解析完成的字段集合
///
/// `slug` 只随 `title` 一起出现；`published_at` 的外层 `Option`
/// 表示是否更新，内层表示置为时间还是清空。
#[derive(Debug, Default)]
pub struct ArticleChanges {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub author_name: Option<String>,
    pub featured_image: Option<String>,
    pub published_at: Option<Option<DateTime<Local>>>,
}

impl ArticleChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.category_id.is_none()
            && self.author_id.is_none()
            && self.featured_image.is_none()
            && self.published_at.is_none()
    }
}

/// 文章写入接口
///
/// 经由 `executor()` 同时支持事务和连接池两种执行环境。
pub trait ArticleStore {
    /// 获取 SQL 执行器，用于 [`sqlx::query()`] 执行
    fn executor<'t>(&'t mut self) -> impl PgExecutor<'t>;

    /// 插入一篇引用均已解析的文章
    fn insert_article(
        &mut self,
        row: &NewArticleRow,
    ) -> impl Future<Output = Result<(), sqlx::Error>> {
        async {
            sqlx::query(
                "
                INSERT INTO articles
                    (id, title, slug, content, featured_image,
                     category_id, author_id, author_name, published_at,
                     created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now(), now())
                ",
            )
            .bind(row.id)
            .bind(&row.title)
            .bind(&row.slug)
            .bind(&row.content)
            .bind(&row.featured_image)
            .bind(row.category_id)
            .bind(row.author_id)
            .bind(&row.author_name)
            .bind(row.published_at)
            .execute(self.executor())
            .await?;
            Ok(())
        }
    }

    /// 按字段集合更新文章并刷新 `updated_at`，返回受影响行数
    ///
    /// 返回 0 说明行已不存在（与并发删除竞争），由调用方转成 NotFound。
    fn update_article(
        &mut self,
        id: Uuid,
        changes: &ArticleChanges,
    ) -> impl Future<Output = Result<u64, sqlx::Error>> {
        async move {
            let mut builder = QueryBuilder::<Postgres>::new("UPDATE articles SET updated_at = now()");

            if let Some(title) = &changes.title {
                builder.push(", title = ").push_bind(title.to_owned());
            }
            if let Some(slug) = &changes.slug {
                builder.push(", slug = ").push_bind(slug.to_owned());
            }
            if let Some(content) = &changes.content {
                builder.push(", content = ").push_bind(content.to_owned());
            }
            if let Some(category_id) = changes.category_id {
                builder.push(", category_id = ").push_bind(category_id);
            }
            if let Some(author_id) = changes.author_id {
                builder.push(", author_id = ").push_bind(author_id);
            }
            if let Some(author_name) = &changes.author_name {
                builder.push(", author_name = ").push_bind(author_name.to_owned());
            }
            if let Some(image) = &changes.featured_image {
                builder.push(", featured_image = ").push_bind(image.to_owned());
            }
            if let Some(published_at) = changes.published_at {
                builder.push(", published_at = ").push_bind(published_at);
            }

            builder.push(" WHERE id = ").push_bind(id);

            let result = builder.build().execute(self.executor()).await?;
            Ok(result.rows_affected())
        }
    }

    /// 设置或清空发布时间，返回受影响行数
    fn set_published(
        &mut self,
        id: Uuid,
        published_at: Option<DateTime<Local>>,
    ) -> impl Future<Output = Result<u64, sqlx::Error>> {
        async move {
            let result =
                sqlx::query("UPDATE articles SET published_at = $1, updated_at = now() WHERE id = $2")
                    .bind(published_at)
                    .bind(id)
                    .execute(self.executor())
                    .await?;
            Ok(result.rows_affected())
        }
    }

    /// 物理删除文章，返回受影响行数
    fn delete_article(&mut self, id: Uuid) -> impl Future<Output = Result<u64, sqlx::Error>> {
        async move {
            let result = sqlx::query("DELETE FROM articles WHERE id = $1")
                .bind(id)
                .execute(self.executor())
                .await?;
            Ok(result.rows_affected())
        }
    }
}

impl ArticleStore for sqlx::PgTransaction<'_> {
    fn executor<'t>(&'t mut self) -> impl PgExecutor<'t> {
        self.as_mut()
    }
}

impl ArticleStore for &'_ DbPool {
    fn executor<'t>(&'t mut self) -> impl PgExecutor<'t> {
        *self
    }
}

/// 基于数据库的 slug 占用探测
///
/// `exclude` 用于更新场景：把文章自身的行排除在冲突检查之外，
/// 改回相近标题时不会误判成与自己冲突。
pub struct StoredSlugs<'a> {
    conn: &'a mut sqlx::PgConnection,
    exclude: Option<Uuid>,
}

impl<'a> StoredSlugs<'a> {
    pub fn new(conn: &'a mut sqlx::PgConnection, exclude: Option<Uuid>) -> Self {
        Self { conn, exclude }
    }
}

impl SlugProbe for StoredSlugs<'_> {
    fn slug_taken(&mut self, candidate: &str) -> impl Future<Output = crate::error::Result<bool>> {
        async move {
            let taken = sqlx::query_scalar::<_, bool>(
                "
                SELECT EXISTS (
                    SELECT 1 FROM articles
                    WHERE slug = $1 AND ($2::uuid IS NULL OR id <> $2)
                )
                ",
            )
            .bind(candidate)
            .bind(self.exclude)
            .fetch_one(&mut *self.conn)
            .await?;
            Ok(taken)
        }
    }
}

/// 文章查询接口
pub trait ArticleQuery {
    /// 获取 [`DbPool`] 对象
    fn db(&self) -> &DbPool;

    /// 按 id 查询单篇文章
    fn fetch_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<ArticleRow>, sqlx::Error>> {
        async move {
            sqlx::query_as::<_, ArticleRow>(&format!("{ARTICLE_SELECT} WHERE a.id = $1"))
                .bind(id)
                .fetch_optional(self.db())
                .await
        }
    }

    /// 按 id 或 slug 查询单篇文章
    ///
    /// 标识符形如 UUID 则按 id 查，否则按 slug 查；
    /// 不存在返回 `None` 而不是错误。
    fn get_one(
        &self,
        identifier: impl AsRef<str>,
    ) -> impl Future<Output = Result<Option<ArticleRow>, sqlx::Error>> {
        async move {
            match Uuid::parse_str(identifier.as_ref()) {
                Ok(id) => self.fetch_by_id(id).await,
                Err(_) => {
                    sqlx::query_as::<_, ArticleRow>(&format!("{ARTICLE_SELECT} WHERE a.slug = $1"))
                        .bind(identifier.as_ref())
                        .fetch_optional(self.db())
                        .await
                }
            }
        }
    }

    /// 分页查询文章列表，按创建时间倒序
    ///
    /// 返回当前页数据和满足过滤条件的总条数。
    fn list(
        &self,
        filter: &ArticleFilter,
    ) -> impl Future<Output = Result<(Vec<ArticleRow>, i64), sqlx::Error>> {
        async move {
            let mut count = QueryBuilder::<Postgres>::new(
                "SELECT COUNT(*) FROM articles a INNER JOIN categories c ON a.category_id = c.id",
            );
            push_filters(&mut count, filter);
            let total: i64 = count.build_query_scalar().fetch_one(self.db()).await?;

            let page = filter.page.max(1);
            let offset = (page - 1) * filter.limit;

            let mut builder = QueryBuilder::<Postgres>::new(ARTICLE_SELECT);
            push_filters(&mut builder, filter);
            builder.push(" ORDER BY a.created_at DESC");
            builder.push(" LIMIT ").push_bind(filter.limit);
            builder.push(" OFFSET ").push_bind(offset);

            let rows = builder
                .build_query_as::<ArticleRow>()
                .fetch_all(self.db())
                .await?;
            Ok((rows, total))
        }
    }

    /// 同分类下的已发布相关文章，排除自身，最新在前
    fn related(
        &self,
        article_id: Uuid,
        category_id: Uuid,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<ArticleRow>, sqlx::Error>> {
        async move {
            sqlx::query_as::<_, ArticleRow>(&format!(
                "
                {ARTICLE_SELECT}
                WHERE a.category_id = $1
                AND a.id <> $2
                AND a.published_at IS NOT NULL
                ORDER BY a.created_at DESC
                LIMIT $3
                "
            ))
            .bind(category_id)
            .bind(article_id)
            .bind(limit)
            .fetch_all(self.db())
            .await
        }
    }

    /// 出现在至少一篇已发布文章上的作者署名，升序去重
    fn published_author_names(&self) -> impl Future<Output = Result<Vec<String>, sqlx::Error>> {
        async {
            sqlx::query_scalar(
                "
                SELECT DISTINCT author_name FROM articles
                WHERE published_at IS NOT NULL
                ORDER BY author_name ASC
                ",
            )
            .fetch_all(self.db())
            .await
        }
    }
}

impl ArticleQuery for &DbPool {
    fn db(&self) -> &DbPool {
        self
    }
}

/// 把列表过滤条件追加到查询上
///
/// 计数查询和取数查询各自构建一次，条件必须保持一致。
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ArticleFilter) {
    builder.push(" WHERE TRUE");

    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        builder
            .push(" AND (a.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.content ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.author_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if let Some(category) = &filter.category {
        match Uuid::parse_str(category) {
            Ok(id) => builder.push(" AND a.category_id = ").push_bind(id),
            Err(_) => builder
                .push(" AND LOWER(c.name) = LOWER(")
                .push_bind(category.to_owned())
                .push(")"),
        };
    }

    if let Some(author) = &filter.author {
        match Uuid::parse_str(author) {
            Ok(id) => builder.push(" AND a.author_id = ").push_bind(id),
            Err(_) => builder
                .push(" AND LOWER(a.author_name) = LOWER(")
                .push_bind(author.to_owned())
                .push(")"),
        };
    }

    match filter.published {
        Some(true) => {
            builder.push(" AND a.published_at IS NOT NULL");
        }
        Some(false) => {
            builder.push(" AND a.published_at IS NULL");
        }
        None => {}
    }
}
