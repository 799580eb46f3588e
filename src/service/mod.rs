pub mod articles;
pub mod authors;
pub mod categories;

use serde::Serialize;

/// 分页信息，随列表响应一起返回
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageMeta {
    /// 由总条数和分页参数计算分页信息
    ///
    /// `total_pages = ceil(total_items / limit)`。
    pub fn new(total_items: i64, page: i64, limit: i64) -> Self {
        let total_pages = if limit > 0 {
            (total_items + limit - 1) / limit
        } else {
            0
        };

        Self {
            current_page: page,
            total_pages,
            total_items,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_is_ceiling() {
        assert_eq!(PageMeta::new(0, 1, 10).total_pages, 0);
        assert_eq!(PageMeta::new(10, 1, 10).total_pages, 1);
        assert_eq!(PageMeta::new(11, 1, 10).total_pages, 2);
        assert_eq!(PageMeta::new(25, 1, 10).total_pages, 3);
    }

    #[test]
    fn test_has_next_and_has_prev() {
        // 首页：只有后页
        let meta = PageMeta::new(25, 1, 10);
        assert!(meta.has_next);
        assert!(!meta.has_prev);

        // 中间页：前后都有
        let meta = PageMeta::new(25, 2, 10);
        assert!(meta.has_next);
        assert!(meta.has_prev);

        // 末页：只有前页
        let meta = PageMeta::new(25, 3, 10);
        assert!(!meta.has_next);
        assert!(meta.has_prev);
    }

    #[test]
    fn test_empty_result_has_no_pages() {
        let meta = PageMeta::new(0, 1, 10);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
        assert_eq!(meta.total_items, 0);
    }
}
