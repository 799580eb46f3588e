use chrono::{DateTime, Local};
use uuid::Uuid;

/// 文章行，连同所属分类信息一并取出
///
/// `author_name` 是文章落库时的作者署名（反规范化副本），
/// 作者记录之后改名不影响已发布文章的署名。
#[derive(Debug, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: Uuid,
    /// 标题
    pub title: String,
    /// 文章唯一标识，由标题派生
    pub slug: String,
    /// 正文
    pub content: String,
    /// 正式目录中的题图文件名
    pub featured_image: Option<String>,
    /// 发布时间；`NULL` 即草稿
    pub published_at: Option<DateTime<Local>>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,

    pub category_id: Uuid,
    pub category_name: String,
    pub author_id: Uuid,
    pub author_name: String,
}

impl ArticleRow {
    /// 发布状态唯一以 `published_at` 为准
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }
}

/// 待插入的文章行，所有引用均已解析完成
#[derive(Debug)]
pub struct NewArticleRow {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub featured_image: Option<String>,
    pub category_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub published_at: Option<DateTime<Local>>,
}

/// 作者行
#[derive(Debug, sqlx::FromRow)]
pub struct AuthorRow {
    pub id: Uuid,
    pub name: String,
    /// 创建该作者的操作用户
    pub created_by: Uuid,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

/// 分类行
#[derive(Debug, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}
