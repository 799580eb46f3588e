use crate::error::{Error, Result};

/// 后缀探测的尝试上限，超出即认为数据异常并放弃
pub(crate) const MAX_SLUG_ATTEMPTS: u32 = 1000;

/// 由标题生成基础 slug
///
/// 规则：转小写，去掉 `[a-z0-9]`、空白和连字符以外的字符，
/// 空白段折叠为单个连字符，连续连字符折叠，最后去掉首尾连字符。
/// 纯函数；退化输入（如全标点）产生空串，由调用方拒绝。
pub fn generate_base_slug(title: impl AsRef<str>) -> String {
    let mut slug = String::new();
    let mut prev_hyphen = false;

    for c in title.as_ref().to_lowercase().chars() {
        let c = match c {
            'a'..='z' | '0'..='9' => c,
            '-' => '-',
            c if c.is_whitespace() => '-',
            _ => continue,
        };

        if c == '-' {
            if prev_hyphen {
                continue;
            }
            prev_hyphen = true;
        } else {
            prev_hyphen = false;
        }
        slug.push(c);
    }

    slug.trim_matches('-').to_string()
}

/// slug 占用情况的探测接口
///
/// 数据库实现见 [`crate::storage::StoredSlugs`]，更新场景通过其
/// `exclude` 把文章自身的行排除在冲突检查之外。
pub trait SlugProbe {
    /// 候选 slug 是否已被占用
    fn slug_taken(&mut self, candidate: &str) -> impl Future<Output = Result<bool>>;
}

/// 在基础 slug 上追加递增后缀，直到探测到未占用的候选
///
/// 依次探测 `base`、`base-1`、`base-2`……探测与写入并不原子，
/// 最终一致性由 slug 唯一索引兜底（冲突由调用方整体重试）。
/// 超过 [`MAX_SLUG_ATTEMPTS`] 返回 [`Error::GenerationExhausted`]。
pub async fn resolve_unique_slug<P: SlugProbe>(base: &str, probe: &mut P) -> Result<String> {
    if !probe.slug_taken(base).await? {
        return Ok(base.to_string());
    }

    for n in 1..=MAX_SLUG_ATTEMPTS {
        let candidate = format!("{base}-{n}");
        if !probe.slug_taken(&candidate).await? {
            return Ok(candidate);
        }
    }

    Err(Error::GenerationExhausted(MAX_SLUG_ATTEMPTS))
}
