use serde::Deserialize;

use crate::error::{Error, Result};

/// 创建文章的完整输入
///
/// `category` 接受分类 id 或名称；`featured_image` 为上传中间件
/// 已写入暂存目录的文件名。
#[derive(Debug, Deserialize)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub category: String,
    pub author: String,
    pub featured_image: Option<String>,
    #[serde(default)]
    pub is_published: bool,
}

impl NewArticle {
    /// 必填字段校验，缺失项返回字段级错误
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("Title is required".into()));
        }
        if self.content.trim().is_empty() {
            return Err(Error::Validation("Content is required".into()));
        }
        if self.category.trim().is_empty() {
            return Err(Error::Validation("Category is required".into()));
        }
        if self.author.trim().is_empty() {
            return Err(Error::Validation("Author is required".into()));
        }
        Ok(())
    }
}

/// 更新文章时允许修改的字段，按变体分发
#[derive(Debug, Clone)]
pub enum ArticleField {
    Category(String),
    AuthorName(String),
    Title(String),
    Content(String),
    Published(bool),
    FeaturedImage(String),
}

/// 更新文章的部分输入，缺省字段不参与更新
#[derive(Debug, Default, Deserialize)]
pub struct UpdateArticle {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    pub featured_image: Option<String>,
    pub is_published: Option<bool>,
}

impl UpdateArticle {
    /// 展开为字段列表
    ///
    /// 顺序即执行顺序：分类校验、作者解析、slug 重算、正文、
    /// 发布状态，文件转存放在最后。提交了空白字符串的字段按
    /// 未提交处理。
    pub fn into_fields(self) -> Vec<ArticleField> {
        fn present(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }

        let mut fields = Vec::new();

        if let Some(category) = present(self.category) {
            fields.push(ArticleField::Category(category));
        }
        if let Some(author) = present(self.author) {
            fields.push(ArticleField::AuthorName(author));
        }
        if let Some(title) = present(self.title) {
            fields.push(ArticleField::Title(title));
        }
        if let Some(content) = present(self.content) {
            fields.push(ArticleField::Content(content));
        }
        if let Some(published) = self.is_published {
            fields.push(ArticleField::Published(published));
        }
        if let Some(image) = present(self.featured_image) {
            fields.push(ArticleField::FeaturedImage(image));
        }

        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_article_requires_all_fields() {
        let input = NewArticle {
            title: "  ".into(),
            content: "body".into(),
            category: "Tutorial".into(),
            author: "Ann".into(),
            featured_image: None,
            is_published: false,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_update_drops_blank_fields() {
        let update = UpdateArticle {
            title: Some("  ".into()),
            content: Some("new body".into()),
            ..Default::default()
        };

        let fields = update.into_fields();
        assert_eq!(fields.len(), 1);
        assert!(matches!(&fields[0], ArticleField::Content(c) if c == "new body"));
    }

    #[test]
    fn test_update_orders_category_before_title() {
        // 字段顺序决定管线内的执行顺序
        let update = UpdateArticle {
            title: Some("New Title".into()),
            category: Some("Tutorial".into()),
            is_published: Some(true),
            ..Default::default()
        };

        let fields = update.into_fields();
        assert!(matches!(fields[0], ArticleField::Category(_)));
        assert!(matches!(fields[1], ArticleField::Title(_)));
        assert!(matches!(fields[2], ArticleField::Published(true)));
    }
}
