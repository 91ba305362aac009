//! Domain records and the JSON shapes the API exchanges.

use serde::{Deserialize, Serialize};
use shelfmark_core::ArticleRecord;
use time::OffsetDateTime;

pub const DEFAULT_HIGHLIGHT_COLOR: &str = "yellow";

/// A registered account. The password hash never leaves the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

/// Public view of a [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self { id: user.id, username: user.username.clone(), email: user.email.clone() }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// A saved article. `user_id` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub url: String,
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub published_date: Option<String>,
    pub top_image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub saved_at: OffsetDateTime,
    pub is_read: bool,
    pub reading_progress: f64,
    pub tags: String,
}

/// An article together with its highlights, as returned by a single-article lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    pub highlights: Vec<Highlight>,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub user_id: i64,
    pub url: String,
    pub title: String,
    pub content: String,
    pub author: Option<String>,
    pub published_date: Option<String>,
    pub top_image: Option<String>,
    pub tags: String,
}

impl NewArticle {
    pub fn from_record(user_id: i64, url: impl Into<String>, record: ArticleRecord, tags: String) -> Self {
        Self {
            user_id,
            url: url.into(),
            title: record.title,
            content: record.content,
            author: record.author,
            published_date: record.published_date,
            top_image: record.top_image,
            tags,
        }
    }
}

/// Partial update of an article's mutable fields. Absent fields stay as they are.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ArticleUpdate {
    pub is_read: Option<bool>,
    pub reading_progress: Option<f64>,
    pub tags: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub id: i64,
    pub article_id: i64,
    pub text: String,
    pub note: String,
    pub color: String,
    pub position: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewHighlight {
    pub article_id: i64,
    pub text: String,
    pub note: String,
    pub color: String,
    pub position: i32,
}

/// Per-user counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total_articles: i64,
    pub read_articles: i64,
    pub unread_articles: i64,
    pub total_highlights: i64,
}

impl Stats {
    pub fn new(total_articles: i64, read_articles: i64, total_highlights: i64) -> Self {
        Self { total_articles, read_articles, unread_articles: total_articles - read_articles, total_highlights }
    }
}

// Request bodies. Missing strings deserialize as empty so validation can
// answer with a message instead of a body rejection.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveArticleRequest {
    #[serde(default)]
    pub url: String,
    pub tags: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HighlightRequest {
    #[serde(default)]
    pub text: String,
    pub note: Option<String>,
    pub color: Option<String>,
    pub position: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn article() -> Article {
        Article {
            id: 7,
            user_id: 3,
            url: "https://example.com/a".to_string(),
            title: "A".to_string(),
            content: "Body".to_string(),
            author: None,
            published_date: None,
            top_image: None,
            saved_at: datetime!(2024-06-03 09:15:00 UTC),
            is_read: false,
            reading_progress: 0.0,
            tags: String::new(),
        }
    }

    #[test]
    fn test_article_json_hides_owner() {
        let json = serde_json::to_value(article()).unwrap();
        assert!(json.get("user_id").is_none());
        assert_eq!(json["saved_at"], "2024-06-03T09:15:00Z");
        assert_eq!(json["author"], serde_json::Value::Null);
    }

    #[test]
    fn test_detail_flattens_article() {
        let detail = ArticleDetail { article: article(), highlights: Vec::new() };
        let json = serde_json::to_value(detail).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["highlights"], serde_json::json!([]));
    }

    #[test]
    fn test_stats_derives_unread() {
        assert_eq!(Stats::new(5, 2, 7).unread_articles, 3);
    }

    #[test]
    fn test_update_fields_are_optional() {
        let update: ArticleUpdate = serde_json::from_str(r#"{"is_read": true}"#).unwrap();
        assert_eq!(update, ArticleUpdate { is_read: Some(true), ..Default::default() });
    }
}
