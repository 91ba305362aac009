//! Persistence for users, articles and highlights.
//!
//! Every article lookup that takes a `user_id` is owner-scoped: a row owned by
//! someone else is indistinguishable from a missing one. Deleting a user
//! removes their articles, and deleting an article removes its highlights.

mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Article, ArticleUpdate, Highlight, NewArticle, NewHighlight, NewUser, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("referenced row does not exist: {0}")]
    ForeignKeyViolation(String),

    #[error("failed to create connection pool: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result of inserting an article.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Inserted(Article),
    /// The owner already has an article with this URL.
    AlreadyExists,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Creates tables and indexes if they are missing. Safe to run repeatedly.
    async fn ensure_schema(&self) -> StoreResult<()>;

    /// Fails with [`StoreError::UniqueViolation`] when the username or email is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>>;
    /// Removes the user with all of their articles and highlights.
    async fn delete_user(&self, id: i64) -> StoreResult<bool>;

    async fn create_article(&self, article: NewArticle) -> StoreResult<CreateOutcome>;
    async fn find_article_by_user_and_url(&self, user_id: i64, url: &str) -> StoreResult<Option<Article>>;
    /// Most recently saved first.
    async fn list_articles_by_user(&self, user_id: i64) -> StoreResult<Vec<Article>>;
    async fn find_article_by_id_and_user(&self, id: i64, user_id: i64) -> StoreResult<Option<Article>>;
    async fn update_article_fields(&self, id: i64, user_id: i64, update: &ArticleUpdate)
    -> StoreResult<Option<Article>>;
    async fn delete_article(&self, id: i64, user_id: i64) -> StoreResult<bool>;

    /// Fails with [`StoreError::ForeignKeyViolation`] when the article is gone.
    async fn create_highlight(&self, highlight: NewHighlight) -> StoreResult<Highlight>;
    /// Not owner-scoped.
    async fn find_highlight_by_id(&self, id: i64) -> StoreResult<Option<Highlight>>;
    async fn delete_highlight(&self, id: i64) -> StoreResult<bool>;
    /// Ordered by position, then id.
    async fn list_highlights_by_article(&self, article_id: i64) -> StoreResult<Vec<Highlight>>;

    async fn count_articles_by_user(&self, user_id: i64) -> StoreResult<i64>;
    async fn count_read_articles_by_user(&self, user_id: i64) -> StoreResult<i64>;
    async fn count_highlights_by_user(&self, user_id: i64) -> StoreResult<i64>;
}
