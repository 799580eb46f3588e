use uuid::Uuid;

use super::PageMeta;
use crate::{
    error::{Error, Result},
    state::AppState,
    storage::{CategoryQuery, CategoryRow, CategoryStore},
};

/// 校验分类引用并解析出分类行
///
/// 引用形如 UUID 则按 id 查找，否则按名称（大小写不敏感）查找，
/// 均只匹配未删除的分类。返回 `None` 表示引用无效，由调用方
/// 决定转成何种字段级错误。
pub async fn validate_category(
    store: &mut impl CategoryStore,
    reference: &str,
) -> Result<Option<CategoryRow>> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Ok(None);
    }

    let found = match Uuid::parse_str(reference) {
        Ok(id) => store.find_category(id).await?,
        Err(_) => store.find_category_by_name(reference).await?,
    };
    Ok(found)
}

/// 分页查询分类列表
pub async fn list_categories(
    state: &AppState,
    search: Option<&str>,
    page: i64,
    limit: i64,
) -> Result<(Vec<CategoryRow>, PageMeta)> {
    let page = page.max(1);
    let limit = limit.clamp(1, 100);

    let (rows, total) = state.db().list_categories(search, page, limit).await?;
    Ok((rows, PageMeta::new(total, page, limit)))
}

pub async fn get_category(state: &AppState, id: Uuid) -> Result<CategoryRow> {
    let mut db = state.db();
    db.find_category(id).await?.ok_or(Error::NotFound("Category"))
}

/// 新建分类，重名（大小写不敏感）视为冲突
pub async fn create_category(
    state: &AppState,
    acting_user: Uuid,
    name: &str,
) -> Result<CategoryRow> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Category name is required".into()));
    }

    let mut db = state.db();
    if db.category_name_taken(name, None).await? {
        return Err(Error::Conflict("Category name already exists".into()));
    }

    let id = Uuid::new_v4();
    if let Err(e) = db.insert_category(id, name, acting_user).await {
        let e = Error::from(e);
        // 预检和插入之间仍可能被并发抢先
        if e.is_unique_violation() {
            return Err(Error::Conflict("Category name already exists".into()));
        }
        return Err(e);
    }

    db.find_category(id).await?.ok_or(Error::NotFound("Category"))
}

/// 改名；未提交有效名称视为空更新
pub async fn rename_category(
    state: &AppState,
    id: Uuid,
    name: Option<&str>,
) -> Result<CategoryRow> {
    let name = name
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Validation("No valid fields to update".into()))?;

    let mut db = state.db();
    db.find_category(id).await?.ok_or(Error::NotFound("Category"))?;

    if db.category_name_taken(name, Some(id)).await? {
        return Err(Error::Conflict("Category name already exists".into()));
    }

    if db.rename_category(id, name).await? == 0 {
        return Err(Error::NotFound("Category"));
    }

    db.find_category(id).await?.ok_or(Error::NotFound("Category"))
}

/// 软删除分类
///
/// 引用守卫：该分类下仍有已发布文章时拒绝删除并保留原行。
pub async fn delete_category(state: &AppState, id: Uuid) -> Result<()> {
    let mut db = state.db();
    db.find_category(id).await?.ok_or(Error::NotFound("Category"))?;

    let count = db.published_article_count(id).await?;
    if count > 0 {
        return Err(Error::Conflict(
            "Cannot delete category that has published articles".into(),
        ));
    }

    if db.soft_delete_category(id).await? == 0 {
        return Err(Error::NotFound("Category"));
    }
    Ok(())
}
