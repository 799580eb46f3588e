use chrono::Local;
use uuid::Uuid;

use super::{PageMeta, authors::resolve_author, categories::validate_category};
use crate::{
    content::{ArticleField, NewArticle, UpdateArticle, generate_base_slug, resolve_unique_slug},
    error::{Error, Result},
    state::AppState,
    storage::{
        ArticleChanges, ArticleFilter, ArticleQuery, ArticleRow, ArticleStore, NewArticleRow,
        StoredSlugs,
    },
};

/// 唯一约束冲突（slug、作者名竞态）时整个事务的重试次数
const WRITE_RETRIES: u32 = 3;

/// 相关文章的默认条数
const RELATED_DEFAULT_LIMIT: i64 = 5;

/// 创建文章
///
/// 步骤固定：必填校验 → 分类校验 → 作者解析 → slug 解析 →
/// 暂存文件转存 → 落库 → 回读。前五步都在同一事务里，
/// 后一步可以假定前一步已成功。
///
/// 文件一旦被请求携带，之后任何一步失败（包括与文件无关的失败）
/// 都会丢弃暂存文件。
pub async fn create_article(
    state: &AppState,
    acting_user: Uuid,
    input: NewArticle,
) -> Result<ArticleRow> {
    input.validate()?;

    let result = create_inner(state, acting_user, &input).await;

    if result.is_err() {
        if let Some(name) = &input.featured_image {
            state.uploads().discard(name).await;
        }
    }
    result
}

async fn create_inner(
    state: &AppState,
    acting_user: Uuid,
    input: &NewArticle,
) -> Result<ArticleRow> {
    let mut committed = None;
    let mut attempts = 0;

    // 探测与写入并不原子；撞上唯一索引时重放整个事务，
    // 下一轮的探测/查找会看到竞争胜者留下的行
    loop {
        attempts += 1;
        match try_create(state, acting_user, input, &mut committed).await {
            Err(e) if e.is_unique_violation() => {
                if attempts < WRITE_RETRIES {
                    continue;
                }
                return Err(Error::Conflict(
                    "Duplicate slug or author name persisted after retries".into(),
                ));
            }
            result => return result,
        }
    }
}

async fn try_create(
    state: &AppState,
    acting_user: Uuid,
    input: &NewArticle,
    committed: &mut Option<String>,
) -> Result<ArticleRow> {
    let mut tx = state.db().begin().await?;

    let category = validate_category(&mut tx, &input.category)
        .await?
        .ok_or_else(|| Error::Validation("Category not found".into()))?;

    let author_name = input.author.trim().to_string();
    let author_id = resolve_author(&mut tx, &author_name, acting_user).await?;

    let base = generate_base_slug(&input.title);
    if base.is_empty() {
        return Err(Error::Validation(
            "Title must contain letters or digits".into(),
        ));
    }
    let mut probe = StoredSlugs::new(tx.as_mut(), None);
    let slug = resolve_unique_slug(&base, &mut probe).await?;

    let featured_image = commit_once(state, committed, input.featured_image.as_deref()).await?;

    let row = NewArticleRow {
        id: Uuid::new_v4(),
        title: input.title.trim().to_string(),
        slug,
        content: input.content.trim().to_string(),
        featured_image,
        category_id: category.id,
        author_id,
        author_name,
        published_at: input.is_published.then(Local::now),
    };

    tx.insert_article(&row).await?;
    tx.commit().await?;

    state
        .db()
        .fetch_by_id(row.id)
        .await?
        .ok_or(Error::NotFound("Article"))
}

/// 更新文章
///
/// 只应用白名单内的字段（见 [`ArticleField`]）：改标题重算 slug
/// （把自身的行排除在冲突检查外），改分类重新校验，改作者重新
/// 解析，发布状态翻转时间戳。空字段集直接拒绝。
///
/// 新图先转存、新行落库之后才清理旧图；失败路径上只清理新收的
/// 暂存文件。
pub async fn update_article(
    state: &AppState,
    acting_user: Uuid,
    id: Uuid,
    update: UpdateArticle,
) -> Result<ArticleRow> {
    let fields = update.into_fields();
    if fields.is_empty() {
        return Err(Error::Validation("No valid fields to update".into()));
    }

    let new_image = fields.iter().find_map(|f| match f {
        ArticleField::FeaturedImage(name) => Some(name.clone()),
        _ => None,
    });

    let result = update_inner(state, acting_user, id, &fields).await;

    if result.is_err() {
        if let Some(name) = &new_image {
            state.uploads().discard(name).await;
        }
    }
    result
}

async fn update_inner(
    state: &AppState,
    acting_user: Uuid,
    id: Uuid,
    fields: &[ArticleField],
) -> Result<ArticleRow> {
    let mut committed = None;
    let mut attempts = 0;

    loop {
        attempts += 1;
        match try_update(state, acting_user, id, fields, &mut committed).await {
            Err(e) if e.is_unique_violation() => {
                if attempts < WRITE_RETRIES {
                    continue;
                }
                return Err(Error::Conflict(
                    "Duplicate slug or author name persisted after retries".into(),
                ));
            }
            result => return result,
        }
    }
}

async fn try_update(
    state: &AppState,
    acting_user: Uuid,
    id: Uuid,
    fields: &[ArticleField],
    committed: &mut Option<String>,
) -> Result<ArticleRow> {
    let existing = state
        .db()
        .fetch_by_id(id)
        .await?
        .ok_or(Error::NotFound("Article"))?;

    let mut tx = state.db().begin().await?;
    let mut changes = ArticleChanges::default();

    for field in fields {
        match field {
            ArticleField::Category(reference) => {
                let category = validate_category(&mut tx, reference)
                    .await?
                    .ok_or_else(|| Error::Validation("Category not found".into()))?;
                changes.category_id = Some(category.id);
            }
            ArticleField::AuthorName(name) => {
                changes.author_id = Some(resolve_author(&mut tx, name, acting_user).await?);
                changes.author_name = Some(name.clone());
            }
            ArticleField::Title(title) => {
                let base = generate_base_slug(title);
                if base.is_empty() {
                    return Err(Error::Validation(
                        "Title must contain letters or digits".into(),
                    ));
                }
                let mut probe = StoredSlugs::new(tx.as_mut(), Some(id));
                changes.slug = Some(resolve_unique_slug(&base, &mut probe).await?);
                changes.title = Some(title.clone());
            }
            ArticleField::Content(content) => changes.content = Some(content.clone()),
            ArticleField::Published(published) => {
                // 翻转总是盖当前时间或清空，不保留历史时间戳
                changes.published_at = Some(published.then(Local::now));
            }
            ArticleField::FeaturedImage(name) => {
                changes.featured_image = commit_once(state, committed, Some(name.as_str())).await?;
            }
        }
    }

    let affected = tx.update_article(id, &changes).await?;
    if affected == 0 {
        // 与并发删除竞争：行在加载后被删掉了
        return Err(Error::NotFound("Article"));
    }
    tx.commit().await?;

    // 新行已落库，此时才清理被替换的旧图
    if let (Some(new), Some(old)) = (&changes.featured_image, &existing.featured_image) {
        if new != old {
            state.uploads().remove_durable(old).await;
        }
    }

    state
        .db()
        .fetch_by_id(id)
        .await?
        .ok_or(Error::NotFound("Article"))
}

/// 暂存文件只转存一次，事务重试时复用已转存的文件名
async fn commit_once(
    state: &AppState,
    committed: &mut Option<String>,
    provisional: Option<&str>,
) -> Result<Option<String>> {
    if let Some(name) = committed {
        return Ok(Some(name.clone()));
    }
    let Some(name) = provisional else {
        return Ok(None);
    };

    let durable = state.uploads().commit(name).await?;
    *committed = Some(durable.clone());
    Ok(Some(durable))
}

/// 翻转发布状态
///
/// 草稿盖上当前时间变为已发布，已发布清空时间戳退回草稿；
/// 连翻两次回到原状态，但原发布时间不保留。
pub async fn toggle_publish(state: &AppState, id: Uuid) -> Result<ArticleRow> {
    let existing = state
        .db()
        .fetch_by_id(id)
        .await?
        .ok_or(Error::NotFound("Article"))?;

    let published_at = match existing.published_at {
        Some(_) => None,
        None => Some(Local::now()),
    };

    let mut db = state.db();
    if db.set_published(id, published_at).await? == 0 {
        return Err(Error::NotFound("Article"));
    }

    state
        .db()
        .fetch_by_id(id)
        .await?
        .ok_or(Error::NotFound("Article"))
}

/// 物理删除文章
pub async fn delete_article(state: &AppState, id: Uuid) -> Result<()> {
    state
        .db()
        .fetch_by_id(id)
        .await?
        .ok_or(Error::NotFound("Article"))?;

    let mut db = state.db();
    if db.delete_article(id).await? == 0 {
        // 与并发删除竞争：行已被别人删掉
        return Err(Error::NotFound("Article"));
    }
    Ok(())
}

/// 分页查询文章列表
pub async fn list_articles(
    state: &AppState,
    filter: ArticleFilter,
) -> Result<(Vec<ArticleRow>, PageMeta)> {
    let filter = ArticleFilter {
        page: filter.page.max(1),
        limit: filter.limit.clamp(1, 100),
        ..filter
    };

    let (rows, total) = state.db().list(&filter).await?;
    let meta = PageMeta::new(total, filter.page, filter.limit);
    Ok((rows, meta))
}

/// 按 id 或 slug 查询单篇文章；不存在返回 `None` 而不是错误
pub async fn get_article(state: &AppState, identifier: &str) -> Result<Option<ArticleRow>> {
    Ok(state.db().get_one(identifier).await?)
}

/// 同分类下的已发布相关文章
pub async fn related_articles(
    state: &AppState,
    identifier: &str,
    limit: Option<i64>,
) -> Result<Vec<ArticleRow>> {
    let article = state
        .db()
        .get_one(identifier)
        .await?
        .ok_or(Error::NotFound("Article"))?;

    let limit = limit.unwrap_or(RELATED_DEFAULT_LIMIT).clamp(1, 50);
    Ok(state
        .db()
        .related(article.id, article.category_id, limit)
        .await?)
}

/// 已发布文章上出现过的作者署名，升序去重
pub async fn published_author_names(state: &AppState) -> Result<Vec<String>> {
    Ok(state.db().published_author_names().await?)
}
