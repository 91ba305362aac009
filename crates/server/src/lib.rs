//! HTTP API for Shelfmark: accounts, saved articles, highlights and reading stats.
//!
//! Articles are fetched and extracted with [`shelfmark_core::Extractor`] when
//! they are first saved. Everything a user saves is visible only to them.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod service;
pub mod store;

use std::sync::Arc;

use axum::Router;

pub use auth::AuthService;
pub use config::{ServerConfig, StoreBackend};
pub use error::{ApiError, ApiResult};
pub use routes::{HttpOptions, router};
pub use service::{ArticleExtractor, ArticleService};
pub use store::{MemoryStore, PgStore, Store};

/// Shared handler state. Cloned per request; everything inside is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub articles: Arc<ArticleService>,
}

impl AppState {
    pub fn new(auth: AuthService, articles: ArticleService) -> Self {
        Self { auth: Arc::new(auth), articles: Arc::new(articles) }
    }
}

/// Wires the services over `store` and `extractor` and returns the full router.
pub fn build_app(store: Arc<dyn Store>, extractor: Arc<dyn ArticleExtractor>, config: &ServerConfig) -> Router {
    let auth = AuthService::new(store.clone(), &config.jwt_secret, config.token_ttl_hours, config.bcrypt_cost);
    let articles = ArticleService::new(store, extractor);
    let options = HttpOptions { cors_origins: config.cors_origins.clone(), request_timeout: config.request_timeout() };
    router(AppState::new(auth, articles), &options)
}
