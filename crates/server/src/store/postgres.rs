use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use sha2::{Digest, Sha256};
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};

use super::{CreateOutcome, Store, StoreError, StoreResult};
use crate::models::{Article, ArticleUpdate, Highlight, NewArticle, NewHighlight, NewUser, User};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            BIGSERIAL PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS articles (
    id               BIGSERIAL PRIMARY KEY,
    user_id          BIGINT NOT NULL REFERENCES users (id) ON DELETE CASCADE,
    url              TEXT NOT NULL,
    url_digest       TEXT NOT NULL,
    title            TEXT NOT NULL,
    content          TEXT NOT NULL,
    author           TEXT,
    published_date   TEXT,
    top_image        TEXT,
    saved_at         TIMESTAMPTZ NOT NULL DEFAULT now(),
    is_read          BOOLEAN NOT NULL DEFAULT FALSE,
    reading_progress DOUBLE PRECISION NOT NULL DEFAULT 0,
    tags             TEXT NOT NULL DEFAULT ''
);

CREATE UNIQUE INDEX IF NOT EXISTS articles_user_url_digest ON articles (user_id, url_digest);

CREATE TABLE IF NOT EXISTS highlights (
    id         BIGSERIAL PRIMARY KEY,
    article_id BIGINT NOT NULL REFERENCES articles (id) ON DELETE CASCADE,
    text       TEXT NOT NULL,
    note       TEXT NOT NULL DEFAULT '',
    color      TEXT NOT NULL DEFAULT 'yellow',
    position   INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS highlights_article_id ON highlights (article_id);
"#;

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";
const ARTICLE_COLUMNS: &str =
    "id, user_id, url, title, content, author, published_date, top_image, saved_at, is_read, reading_progress, tags";
const HIGHLIGHT_COLUMNS: &str = "id, article_id, text, note, color, position, created_at";

/// Hex SHA-256 of a URL. URLs can be long, so the unique index is over this digest.
pub(crate) fn url_digest(url: &str) -> String {
    format!("{:x}", Sha256::digest(url.as_bytes()))
}

fn user_from_row(row: &Row) -> Result<User, tokio_postgres::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

fn article_from_row(row: &Row) -> Result<Article, tokio_postgres::Error> {
    Ok(Article {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        url: row.try_get("url")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        author: row.try_get("author")?,
        published_date: row.try_get("published_date")?,
        top_image: row.try_get("top_image")?,
        saved_at: row.try_get("saved_at")?,
        is_read: row.try_get("is_read")?,
        reading_progress: row.try_get("reading_progress")?,
        tags: row.try_get("tags")?,
    })
}

fn highlight_from_row(row: &Row) -> Result<Highlight, tokio_postgres::Error> {
    Ok(Highlight {
        id: row.try_get("id")?,
        article_id: row.try_get("article_id")?,
        text: row.try_get("text")?,
        note: row.try_get("note")?,
        color: row.try_get("color")?,
        position: row.try_get("position")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Maps constraint failures onto their [`StoreError`] variants.
fn classify(err: tokio_postgres::Error) -> StoreError {
    let constraint = err.as_db_error().and_then(|db| db.constraint()).unwrap_or_default().to_string();
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        StoreError::UniqueViolation(constraint)
    } else if err.code() == Some(&SqlState::FOREIGN_KEY_VIOLATION) {
        StoreError::ForeignKeyViolation(constraint)
    } else {
        StoreError::Database(err)
    }
}

/// PostgreSQL-backed [`Store`] over a deadpool connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn connect(database_url: &str, pool_size: usize) -> StoreResult<Self> {
        let mut config = Config::new();
        config.url = Some(database_url.to_string());
        config.manager = Some(ManagerConfig { recycling_method: RecyclingMethod::Fast });
        config.pool = Some(PoolConfig::new(pool_size));
        let pool = config.create_pool(Some(Runtime::Tokio1), NoTls)?;
        Ok(Self { pool })
    }

    async fn user_where(&self, clause: &str, param: &(dyn ToSql + Sync)) -> StoreResult<Option<User>> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {clause}");
        let row = client.query_opt(&sql, &[param]).await?;
        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn count(&self, sql: &str, user_id: i64) -> StoreResult<i64> {
        let client = self.pool.get().await?;
        let row = client.query_one(sql, &[&user_id]).await?;
        Ok(row.try_get(0)?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ensure_schema(&self) -> StoreResult<()> {
        let client = self.pool.get().await?;
        client.batch_execute(SCHEMA).await?;
        tracing::info!("database schema ready");
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let client = self.pool.get().await?;
        let sql = format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        );
        let row = client
            .query_one(&sql, &[&user.username, &user.email, &user.password_hash])
            .await
            .map_err(classify)?;
        Ok(user_from_row(&row)?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.user_where("username = $1", &username).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.user_where("email = $1", &email).await
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        self.user_where("id = $1", &id).await
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let client = self.pool.get().await?;
        let deleted = client.execute("DELETE FROM users WHERE id = $1", &[&id]).await?;
        Ok(deleted > 0)
    }

    async fn create_article(&self, article: NewArticle) -> StoreResult<CreateOutcome> {
        let client = self.pool.get().await?;
        let sql = format!(
            "INSERT INTO articles \
             (user_id, url, url_digest, title, content, author, published_date, top_image, tags) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (user_id, url_digest) DO NOTHING \
             RETURNING {ARTICLE_COLUMNS}"
        );
        let row = client
            .query_opt(
                &sql,
                &[
                    &article.user_id,
                    &article.url,
                    &url_digest(&article.url),
                    &article.title,
                    &article.content,
                    &article.author,
                    &article.published_date,
                    &article.top_image,
                    &article.tags,
                ],
            )
            .await
            .map_err(classify)?;

        match row {
            Some(row) => Ok(CreateOutcome::Inserted(article_from_row(&row)?)),
            None => Ok(CreateOutcome::AlreadyExists),
        }
    }

    async fn find_article_by_user_and_url(&self, user_id: i64, url: &str) -> StoreResult<Option<Article>> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE user_id = $1 AND url_digest = $2 AND url = $3");
        let row = client.query_opt(&sql, &[&user_id, &url_digest(url), &url]).await?;
        Ok(row.as_ref().map(article_from_row).transpose()?)
    }

    async fn list_articles_by_user(&self, user_id: i64) -> StoreResult<Vec<Article>> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE user_id = $1 ORDER BY saved_at DESC, id DESC");
        let rows = client.query(&sql, &[&user_id]).await?;
        Ok(rows.iter().map(article_from_row).collect::<Result<_, _>>()?)
    }

    async fn find_article_by_id_and_user(&self, id: i64, user_id: i64) -> StoreResult<Option<Article>> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1 AND user_id = $2");
        let row = client.query_opt(&sql, &[&id, &user_id]).await?;
        Ok(row.as_ref().map(article_from_row).transpose()?)
    }

    async fn update_article_fields(
        &self, id: i64, user_id: i64, update: &ArticleUpdate,
    ) -> StoreResult<Option<Article>> {
        let client = self.pool.get().await?;
        let sql = format!(
            "UPDATE articles SET \
             is_read = COALESCE($3, is_read), \
             reading_progress = COALESCE($4, reading_progress), \
             tags = COALESCE($5, tags) \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {ARTICLE_COLUMNS}"
        );
        let row = client
            .query_opt(&sql, &[&id, &user_id, &update.is_read, &update.reading_progress, &update.tags])
            .await?;
        Ok(row.as_ref().map(article_from_row).transpose()?)
    }

    async fn delete_article(&self, id: i64, user_id: i64) -> StoreResult<bool> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute("DELETE FROM articles WHERE id = $1 AND user_id = $2", &[&id, &user_id])
            .await?;
        Ok(deleted > 0)
    }

    async fn create_highlight(&self, highlight: NewHighlight) -> StoreResult<Highlight> {
        let client = self.pool.get().await?;
        let sql = format!(
            "INSERT INTO highlights (article_id, text, note, color, position) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {HIGHLIGHT_COLUMNS}"
        );
        let row = client
            .query_one(
                &sql,
                &[&highlight.article_id, &highlight.text, &highlight.note, &highlight.color, &highlight.position],
            )
            .await
            .map_err(classify)?;
        Ok(highlight_from_row(&row)?)
    }

    async fn find_highlight_by_id(&self, id: i64) -> StoreResult<Option<Highlight>> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {HIGHLIGHT_COLUMNS} FROM highlights WHERE id = $1");
        let row = client.query_opt(&sql, &[&id]).await?;
        Ok(row.as_ref().map(highlight_from_row).transpose()?)
    }

    async fn delete_highlight(&self, id: i64) -> StoreResult<bool> {
        let client = self.pool.get().await?;
        let deleted = client.execute("DELETE FROM highlights WHERE id = $1", &[&id]).await?;
        Ok(deleted > 0)
    }

    async fn list_highlights_by_article(&self, article_id: i64) -> StoreResult<Vec<Highlight>> {
        let client = self.pool.get().await?;
        let sql = format!("SELECT {HIGHLIGHT_COLUMNS} FROM highlights WHERE article_id = $1 ORDER BY position, id");
        let rows = client.query(&sql, &[&article_id]).await?;
        Ok(rows.iter().map(highlight_from_row).collect::<Result<_, _>>()?)
    }

    async fn count_articles_by_user(&self, user_id: i64) -> StoreResult<i64> {
        self.count("SELECT COUNT(*) FROM articles WHERE user_id = $1", user_id).await
    }

    async fn count_read_articles_by_user(&self, user_id: i64) -> StoreResult<i64> {
        self.count("SELECT COUNT(*) FROM articles WHERE user_id = $1 AND is_read", user_id).await
    }

    async fn count_highlights_by_user(&self, user_id: i64) -> StoreResult<i64> {
        self.count(
            "SELECT COUNT(*) FROM highlights h JOIN articles a ON a.id = h.article_id WHERE a.user_id = $1",
            user_id,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_digest_is_stable_hex() {
        let digest = url_digest("https://example.com/a");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, url_digest("https://example.com/a"));
        assert_ne!(digest, url_digest("https://example.com/b"));
    }

    #[test]
    fn test_schema_declares_cascades() {
        assert_eq!(SCHEMA.matches("ON DELETE CASCADE").count(), 2);
        assert!(SCHEMA.contains("(user_id, url_digest)"));
    }
}
