mod articles;
mod authors;
mod categories;
mod models;
mod postgres;

pub use self::{
    articles::{ArticleChanges, ArticleFilter, ArticleQuery, ArticleStore, StoredSlugs},
    authors::{AuthorQuery, AuthorStore},
    categories::{CategoryQuery, CategoryStore},
    models::{ArticleRow, AuthorRow, CategoryRow, NewArticleRow},
    postgres::{DbPool, init_db_from_env, migrate},
};
