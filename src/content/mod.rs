mod article;
mod slug;

pub use self::{
    article::{ArticleField, NewArticle, UpdateArticle},
    slug::{SlugProbe, generate_base_slug, resolve_unique_slug},
};
