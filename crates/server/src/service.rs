//! Article and highlight lifecycle, scoped to the acting user.

use std::sync::Arc;

use async_trait::async_trait;
use shelfmark_core::{ArticleRecord, ExtractionFailure, Extractor};

use crate::error::{ApiError, ApiResult};
use crate::models::{
    Article, ArticleDetail, ArticleUpdate, DEFAULT_HIGHLIGHT_COLOR, Highlight, HighlightRequest, NewArticle,
    NewHighlight, Stats, User,
};
use crate::store::{CreateOutcome, Store, StoreError};

const ARTICLE_NOT_FOUND: &str = "Article not found";
const HIGHLIGHT_NOT_FOUND: &str = "Highlight not found";

/// Turns a URL into an article record. Implemented by the core [`Extractor`].
#[async_trait]
pub trait ArticleExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<ArticleRecord, ExtractionFailure>;
}

#[async_trait]
impl ArticleExtractor for Extractor {
    async fn extract(&self, url: &str) -> Result<ArticleRecord, ExtractionFailure> {
        Extractor::extract(self, url).await
    }
}

/// Result of a save: the stored article, and whether this call created it.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub article: Article,
    pub created: bool,
}

pub struct ArticleService {
    store: Arc<dyn Store>,
    extractor: Arc<dyn ArticleExtractor>,
}

impl ArticleService {
    pub fn new(store: Arc<dyn Store>, extractor: Arc<dyn ArticleExtractor>) -> Self {
        Self { store, extractor }
    }

    /// Saves `url` for `user`, extracting it unless it is already saved.
    pub async fn save(&self, user: &User, url: &str, tags: Option<String>) -> ApiResult<SaveOutcome> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ApiError::Validation("URL is required".to_string()));
        }

        if let Some(article) = self.store.find_article_by_user_and_url(user.id, url).await? {
            return Ok(SaveOutcome { article, created: false });
        }

        let record = self.extractor.extract(url).await.map_err(ApiError::ExtractionFailed)?;
        let new_article = NewArticle::from_record(user.id, url, record, tags.unwrap_or_default());

        match self.store.create_article(new_article).await? {
            CreateOutcome::Inserted(article) => {
                tracing::info!(user_id = user.id, article_id = article.id, "article saved");
                Ok(SaveOutcome { article, created: true })
            }
            // A concurrent save won the race; hand back its row.
            CreateOutcome::AlreadyExists => {
                let article = self
                    .store
                    .find_article_by_user_and_url(user.id, url)
                    .await?
                    .ok_or_else(|| ApiError::Internal(format!("article for {url} vanished after conflict")))?;
                Ok(SaveOutcome { article, created: false })
            }
        }
    }

    pub async fn list(&self, user: &User) -> ApiResult<Vec<Article>> {
        Ok(self.store.list_articles_by_user(user.id).await?)
    }

    pub async fn get(&self, user: &User, id: i64) -> ApiResult<ArticleDetail> {
        let article = self.owned_article(user, id).await?;
        let highlights = self.store.list_highlights_by_article(article.id).await?;
        Ok(ArticleDetail { article, highlights })
    }

    pub async fn update(&self, user: &User, id: i64, update: &ArticleUpdate) -> ApiResult<Article> {
        self.store
            .update_article_fields(id, user.id, update)
            .await?
            .ok_or(ApiError::NotFound(ARTICLE_NOT_FOUND))
    }

    pub async fn delete(&self, user: &User, id: i64) -> ApiResult<()> {
        if self.store.delete_article(id, user.id).await? {
            Ok(())
        } else {
            Err(ApiError::NotFound(ARTICLE_NOT_FOUND))
        }
    }

    pub async fn add_highlight(&self, user: &User, article_id: i64, req: HighlightRequest) -> ApiResult<Highlight> {
        let article = self.owned_article(user, article_id).await?;
        if req.text.is_empty() {
            return Err(ApiError::Validation("Highlight text is required".to_string()));
        }

        let highlight = NewHighlight {
            article_id: article.id,
            text: req.text,
            note: req.note.unwrap_or_default(),
            color: req.color.unwrap_or_else(|| DEFAULT_HIGHLIGHT_COLOR.to_string()),
            position: req.position.unwrap_or(0),
        };
        self.store.create_highlight(highlight).await.map_err(|e| match e {
            StoreError::ForeignKeyViolation(_) => ApiError::NotFound(ARTICLE_NOT_FOUND),
            other => ApiError::Store(other),
        })
    }

    /// Deletes a highlight on one of the user's articles.
    ///
    /// A highlight that exists under someone else's article is `Forbidden`
    /// rather than `NotFound`.
    pub async fn delete_highlight(&self, user: &User, id: i64) -> ApiResult<()> {
        let highlight = self.store.find_highlight_by_id(id).await?.ok_or(ApiError::NotFound(HIGHLIGHT_NOT_FOUND))?;
        if self.store.find_article_by_id_and_user(highlight.article_id, user.id).await?.is_none() {
            tracing::warn!(user_id = user.id, highlight_id = id, "refused to delete highlight on foreign article");
            return Err(ApiError::Forbidden);
        }
        self.store.delete_highlight(id).await?;
        Ok(())
    }

    pub async fn stats(&self, user: &User) -> ApiResult<Stats> {
        let total = self.store.count_articles_by_user(user.id).await?;
        let read = self.store.count_read_articles_by_user(user.id).await?;
        let highlights = self.store.count_highlights_by_user(user.id).await?;
        Ok(Stats::new(total, read, highlights))
    }

    async fn owned_article(&self, user: &User, id: i64) -> ApiResult<Article> {
        self.store
            .find_article_by_id_and_user(id, user.id)
            .await?
            .ok_or(ApiError::NotFound(ARTICLE_NOT_FOUND))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::store::{MemoryStore, StoreResult};
    use shelfmark_core::FailureKind;
    use std::sync::Mutex;

    /// Returns a canned record for every URL and counts calls.
    struct CannedExtractor {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl CannedExtractor {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self { calls: Mutex::new(Vec::new()), fail })
        }
    }

    #[async_trait]
    impl ArticleExtractor for CannedExtractor {
        async fn extract(&self, url: &str) -> Result<ArticleRecord, ExtractionFailure> {
            self.calls.lock().unwrap().push(url.to_string());
            if self.fail {
                return Err(ExtractionFailure {
                    url: url.to_string(),
                    kind: FailureKind::Timeout,
                    message: "timed out".to_string(),
                });
            }
            Ok(ArticleRecord {
                title: format!("Title of {url}"),
                content: "Body".to_string(),
                author: Some("Ada".to_string()),
                published_date: None,
                top_image: None,
            })
        }
    }

    /// Delegates to a [`MemoryStore`] but misses on the first URL lookup, as if
    /// another request saved the article between the check and the insert.
    struct RacingStore {
        inner: MemoryStore,
        lookups: Mutex<usize>,
    }

    #[async_trait]
    impl Store for RacingStore {
        async fn ensure_schema(&self) -> StoreResult<()> {
            self.inner.ensure_schema().await
        }
        async fn create_user(&self, user: NewUser) -> StoreResult<User> {
            self.inner.create_user(user).await
        }
        async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
            self.inner.find_user_by_username(username).await
        }
        async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
            self.inner.find_user_by_email(email).await
        }
        async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
            self.inner.find_user_by_id(id).await
        }
        async fn delete_user(&self, id: i64) -> StoreResult<bool> {
            self.inner.delete_user(id).await
        }
        async fn create_article(&self, article: NewArticle) -> StoreResult<CreateOutcome> {
            self.inner.create_article(article).await
        }
        async fn find_article_by_user_and_url(&self, user_id: i64, url: &str) -> StoreResult<Option<Article>> {
            let first = {
                let mut lookups = self.lookups.lock().unwrap();
                *lookups += 1;
                *lookups == 1
            };
            if first { Ok(None) } else { self.inner.find_article_by_user_and_url(user_id, url).await }
        }
        async fn list_articles_by_user(&self, user_id: i64) -> StoreResult<Vec<Article>> {
            self.inner.list_articles_by_user(user_id).await
        }
        async fn find_article_by_id_and_user(&self, id: i64, user_id: i64) -> StoreResult<Option<Article>> {
            self.inner.find_article_by_id_and_user(id, user_id).await
        }
        async fn update_article_fields(
            &self, id: i64, user_id: i64, update: &ArticleUpdate,
        ) -> StoreResult<Option<Article>> {
            self.inner.update_article_fields(id, user_id, update).await
        }
        async fn delete_article(&self, id: i64, user_id: i64) -> StoreResult<bool> {
            self.inner.delete_article(id, user_id).await
        }
        async fn create_highlight(&self, highlight: NewHighlight) -> StoreResult<Highlight> {
            self.inner.create_highlight(highlight).await
        }
        async fn find_highlight_by_id(&self, id: i64) -> StoreResult<Option<Highlight>> {
            self.inner.find_highlight_by_id(id).await
        }
        async fn delete_highlight(&self, id: i64) -> StoreResult<bool> {
            self.inner.delete_highlight(id).await
        }
        async fn list_highlights_by_article(&self, article_id: i64) -> StoreResult<Vec<Highlight>> {
            self.inner.list_highlights_by_article(article_id).await
        }
        async fn count_articles_by_user(&self, user_id: i64) -> StoreResult<i64> {
            self.inner.count_articles_by_user(user_id).await
        }
        async fn count_read_articles_by_user(&self, user_id: i64) -> StoreResult<i64> {
            self.inner.count_read_articles_by_user(user_id).await
        }
        async fn count_highlights_by_user(&self, user_id: i64) -> StoreResult<i64> {
            self.inner.count_highlights_by_user(user_id).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_save_returns_winning_row() {
        let store = Arc::new(RacingStore { inner: MemoryStore::new(), lookups: Mutex::new(0) });
        let user = store
            .create_user(NewUser {
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "x".to_string(),
            })
            .await
            .unwrap();
        let record = ArticleRecord {
            title: "Saved first".to_string(),
            content: "Body".to_string(),
            author: None,
            published_date: None,
            top_image: None,
        };
        let winner = match store
            .create_article(NewArticle::from_record(user.id, "https://e.com/a", record, "first".to_string()))
            .await
            .unwrap()
        {
            CreateOutcome::Inserted(article) => article,
            CreateOutcome::AlreadyExists => panic!("first insert must succeed"),
        };

        let extractor = CannedExtractor::new(false);
        let service = ArticleService::new(store.clone(), extractor.clone());
        let outcome = service.save(&user, "https://e.com/a", Some("second".to_string())).await.unwrap();

        assert!(!outcome.created);
        assert_eq!(outcome.article, winner);
        assert_eq!(outcome.article.tags, "first");
        assert_eq!(extractor.calls.lock().unwrap().len(), 1);
        assert_eq!(service.list(&user).await.unwrap().len(), 1);
    }

    async fn setup(fail: bool) -> (ArticleService, Arc<CannedExtractor>, Arc<MemoryStore>, User) {
        let store = Arc::new(MemoryStore::new());
        let extractor = CannedExtractor::new(fail);
        let user = store
            .create_user(NewUser {
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "x".to_string(),
            })
            .await
            .unwrap();
        (ArticleService::new(store.clone(), extractor.clone()), extractor, store, user)
    }

    #[tokio::test]
    async fn test_save_is_idempotent() {
        let (service, extractor, _, user) = setup(false).await;

        let first = service.save(&user, "https://e.com/a", Some("rust".to_string())).await.unwrap();
        let second = service.save(&user, "https://e.com/a", None).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.article.id, second.article.id);
        assert_eq!(second.article.tags, "rust");
        assert_eq!(extractor.calls.lock().unwrap().len(), 1);
        assert_eq!(service.list(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_requires_url() {
        let (service, extractor, _, user) = setup(false).await;
        assert!(matches!(service.save(&user, "  ", None).await, Err(ApiError::Validation(_))));
        assert!(extractor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_extraction_persists_nothing() {
        let (service, _, _, user) = setup(true).await;
        let err = service.save(&user, "https://e.com/a", None).await.unwrap_err();
        assert!(matches!(err, ApiError::ExtractionFailed(ref f) if f.kind == FailureKind::Timeout));
        assert!(service.list(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_highlight_defaults() {
        let (service, _, _, user) = setup(false).await;
        let saved = service.save(&user, "https://e.com/a", None).await.unwrap();

        let req = HighlightRequest { text: "quote".to_string(), ..Default::default() };
        let highlight = service.add_highlight(&user, saved.article.id, req).await.unwrap();
        assert_eq!(highlight.note, "");
        assert_eq!(highlight.color, "yellow");
        assert_eq!(highlight.position, 0);

        let empty = HighlightRequest::default();
        assert!(matches!(service.add_highlight(&user, saved.article.id, empty).await, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_cascades_highlights() {
        let (service, _, store, user) = setup(false).await;
        let saved = service.save(&user, "https://e.com/a", None).await.unwrap();
        let req = HighlightRequest { text: "quote".to_string(), ..Default::default() };
        let highlight = service.add_highlight(&user, saved.article.id, req).await.unwrap();

        service.delete(&user, saved.article.id).await.unwrap();
        assert!(store.find_highlight_by_id(highlight.id).await.unwrap().is_none());
        assert!(matches!(service.delete(&user, saved.article.id).await, Err(ApiError::NotFound(_))));
    }
}
