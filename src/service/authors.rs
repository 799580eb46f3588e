use uuid::Uuid;

use crate::{
    error::{Error, Result},
    state::AppState,
    storage::{AuthorQuery, AuthorRow, AuthorStore},
};

/// 以"存在即复用，不存在则创建"的方式解析作者署名
///
/// 大小写不敏感匹配；命中时返回已有作者的 id，保留库中原有写法，
/// 不做改名。未命中则以操作用户为归属新建一条作者记录。
///
/// 与文章写入共用同一事务执行；并发提交同名作者由
/// `LOWER(name)` 唯一索引兜底，冲突令整个事务重试后在此复用胜者。
pub async fn resolve_author(
    store: &mut impl AuthorStore,
    name: &str,
    acting_user: Uuid,
) -> Result<Uuid> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Author name is required".into()));
    }

    if let Some(existing) = store.find_by_name_ci(name).await? {
        return Ok(existing.id);
    }

    let id = Uuid::new_v4();
    store.insert_author(id, name, acting_user).await?;
    Ok(id)
}

/// 下拉选项用的作者列表
pub async fn list_authors(state: &AppState) -> Result<Vec<AuthorRow>> {
    Ok(state.db().list_authors().await?)
}

/// 显式新建作者，重名（大小写不敏感）视为冲突
pub async fn create_author(state: &AppState, acting_user: Uuid, name: &str) -> Result<AuthorRow> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Author name is required".into()));
    }

    let mut db = state.db();
    if db.find_by_name_ci(name).await?.is_some() {
        return Err(Error::Conflict("Author name already exists".into()));
    }

    let id = Uuid::new_v4();
    if let Err(e) = db.insert_author(id, name, acting_user).await {
        let e = Error::from(e);
        // 预检和插入之间仍可能被并发抢先
        if e.is_unique_violation() {
            return Err(Error::Conflict("Author name already exists".into()));
        }
        return Err(e);
    }

    db.find_author(id).await?.ok_or(Error::NotFound("Author"))
}

/// 改名；新名字与其他作者（大小写不敏感）重复时拒绝
pub async fn rename_author(state: &AppState, id: Uuid, name: &str) -> Result<AuthorRow> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Author name cannot be empty".into()));
    }

    let mut db = state.db();
    db.find_author(id).await?.ok_or(Error::NotFound("Author"))?;

    if db.author_name_taken(name, id).await? {
        return Err(Error::Conflict("Author name already exists".into()));
    }

    if db.rename_author(id, name).await? == 0 {
        return Err(Error::NotFound("Author"));
    }

    db.find_author(id).await?.ok_or(Error::NotFound("Author"))
}

/// 软删除作者；仍被任何文章（含草稿）引用时拒绝
pub async fn delete_author(state: &AppState, id: Uuid) -> Result<()> {
    let mut db = state.db();
    db.find_author(id).await?.ok_or(Error::NotFound("Author"))?;

    let count = db.author_article_count(id).await?;
    if count > 0 {
        return Err(Error::Conflict(format!(
            "Cannot delete author that still has {count} articles"
        )));
    }

    if db.soft_delete_author(id).await? == 0 {
        return Err(Error::NotFound("Author"));
    }
    Ok(())
}
