use std::cmp::Reverse;
use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use super::{CreateOutcome, Store, StoreError, StoreResult};
use crate::models::{Article, ArticleUpdate, Highlight, NewArticle, NewHighlight, NewUser, User};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    articles: BTreeMap<i64, Article>,
    highlights: BTreeMap<i64, Highlight>,
    next_user_id: i64,
    next_article_id: i64,
    next_highlight_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn remove_article(&mut self, id: i64) {
        self.articles.remove(&id);
        self.highlights.retain(|_, h| h.article_id != id);
    }
}

/// Process-local [`Store`] with the same constraints and cascades as [`super::PgStore`].
///
/// All tables sit behind one mutex, so every operation is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ensure_schema(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::UniqueViolation("users.username".to_string()));
        }
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation("users.email".to_string()));
        }

        let id = next_id(&mut tables.next_user_id);
        let user = User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        let owned: Vec<i64> = tables.articles.values().filter(|a| a.user_id == id).map(|a| a.id).collect();
        for article_id in owned {
            tables.remove_article(article_id);
        }
        Ok(true)
    }

    async fn create_article(&self, article: NewArticle) -> StoreResult<CreateOutcome> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&article.user_id) {
            return Err(StoreError::ForeignKeyViolation("articles.user_id".to_string()));
        }
        if tables.articles.values().any(|a| a.user_id == article.user_id && a.url == article.url) {
            return Ok(CreateOutcome::AlreadyExists);
        }

        let id = next_id(&mut tables.next_article_id);
        let article = Article {
            id,
            user_id: article.user_id,
            url: article.url,
            title: article.title,
            content: article.content,
            author: article.author,
            published_date: article.published_date,
            top_image: article.top_image,
            saved_at: OffsetDateTime::now_utc(),
            is_read: false,
            reading_progress: 0.0,
            tags: article.tags,
        };
        tables.articles.insert(id, article.clone());
        Ok(CreateOutcome::Inserted(article))
    }

    async fn find_article_by_user_and_url(&self, user_id: i64, url: &str) -> StoreResult<Option<Article>> {
        let tables = self.tables.lock().await;
        Ok(tables.articles.values().find(|a| a.user_id == user_id && a.url == url).cloned())
    }

    async fn list_articles_by_user(&self, user_id: i64) -> StoreResult<Vec<Article>> {
        let tables = self.tables.lock().await;
        let mut articles: Vec<Article> = tables.articles.values().filter(|a| a.user_id == user_id).cloned().collect();
        articles.sort_by_key(|a| Reverse((a.saved_at, a.id)));
        Ok(articles)
    }

    async fn find_article_by_id_and_user(&self, id: i64, user_id: i64) -> StoreResult<Option<Article>> {
        let tables = self.tables.lock().await;
        Ok(tables.articles.get(&id).filter(|a| a.user_id == user_id).cloned())
    }

    async fn update_article_fields(
        &self, id: i64, user_id: i64, update: &ArticleUpdate,
    ) -> StoreResult<Option<Article>> {
        let mut tables = self.tables.lock().await;
        let Some(article) = tables.articles.get_mut(&id).filter(|a| a.user_id == user_id) else {
            return Ok(None);
        };

        if let Some(is_read) = update.is_read {
            article.is_read = is_read;
        }
        if let Some(progress) = update.reading_progress {
            article.reading_progress = progress;
        }
        if let Some(tags) = &update.tags {
            article.tags = tags.clone();
        }
        Ok(Some(article.clone()))
    }

    async fn delete_article(&self, id: i64, user_id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        if !tables.articles.get(&id).is_some_and(|a| a.user_id == user_id) {
            return Ok(false);
        }
        tables.remove_article(id);
        Ok(true)
    }

    async fn create_highlight(&self, highlight: NewHighlight) -> StoreResult<Highlight> {
        let mut tables = self.tables.lock().await;
        if !tables.articles.contains_key(&highlight.article_id) {
            return Err(StoreError::ForeignKeyViolation("highlights.article_id".to_string()));
        }

        let id = next_id(&mut tables.next_highlight_id);
        let highlight = Highlight {
            id,
            article_id: highlight.article_id,
            text: highlight.text,
            note: highlight.note,
            color: highlight.color,
            position: highlight.position,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.highlights.insert(id, highlight.clone());
        Ok(highlight)
    }

    async fn find_highlight_by_id(&self, id: i64) -> StoreResult<Option<Highlight>> {
        Ok(self.tables.lock().await.highlights.get(&id).cloned())
    }

    async fn delete_highlight(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.lock().await.highlights.remove(&id).is_some())
    }

    async fn list_highlights_by_article(&self, article_id: i64) -> StoreResult<Vec<Highlight>> {
        let tables = self.tables.lock().await;
        let mut highlights: Vec<Highlight> =
            tables.highlights.values().filter(|h| h.article_id == article_id).cloned().collect();
        highlights.sort_by_key(|h| (h.position, h.id));
        Ok(highlights)
    }

    async fn count_articles_by_user(&self, user_id: i64) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        Ok(tables.articles.values().filter(|a| a.user_id == user_id).count() as i64)
    }

    async fn count_read_articles_by_user(&self, user_id: i64) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        Ok(tables.articles.values().filter(|a| a.user_id == user_id && a.is_read).count() as i64)
    }

    async fn count_highlights_by_user(&self, user_id: i64) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        let count = tables
            .highlights
            .values()
            .filter(|h| tables.articles.get(&h.article_id).is_some_and(|a| a.user_id == user_id))
            .count();
        Ok(count as i64)
    }
}
