use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router, middleware};
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::auth::require_user;
use crate::error::ApiResult;
use crate::models::{ArticleUpdate, HighlightRequest, LoginRequest, RegisterRequest, SaveArticleRequest, User, UserProfile};

/// Cross-cutting HTTP settings applied around every route.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub cors_origins: Vec<HeaderValue>,
    pub request_timeout: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self { cors_origins: vec![HeaderValue::from_static("http://localhost:3000")], request_timeout: Duration::from_secs(45) }
    }
}

pub fn router(state: AppState, options: &HttpOptions) -> Router {
    let protected = Router::new()
        .route("/articles", post(save_article).get(list_articles))
        .route("/articles/{id}", get(get_article).put(update_article).delete(delete_article))
        .route("/articles/{id}/highlights", post(add_highlight))
        .route("/highlights/{id}", delete(delete_highlight))
        .route("/stats", get(stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_user));

    let api = Router::new().route("/register", post(register)).route("/login", post(login)).merge(protected);

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(options.cors_origins.clone()))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .nest("/api", api)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(options.request_timeout))
        .layer(cors)
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn register(
    State(state): State<AppState>, payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let (user, token) = state.auth.register(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "token": token,
            "user": UserProfile::from(&user),
        })),
    ))
}

async fn login(
    State(state): State<AppState>, payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let (user, token) = state.auth.login(req).await?;
    Ok(Json(json!({ "token": token, "user": UserProfile::from(&user) })))
}

async fn save_article(
    State(state): State<AppState>, Extension(user): Extension<User>,
    payload: Result<Json<SaveArticleRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let outcome = state.articles.save(&user, &req.url, req.tags).await?;
    let (status, message) = if outcome.created {
        (StatusCode::CREATED, "Article saved successfully")
    } else {
        (StatusCode::OK, "Article already saved")
    };
    Ok((status, Json(json!({ "message": message, "article": outcome.article }))))
}

async fn list_articles(State(state): State<AppState>, Extension(user): Extension<User>) -> ApiResult<impl IntoResponse> {
    let articles = state.articles.list(&user).await?;
    Ok(Json(json!({ "articles": articles })))
}

async fn get_article(
    State(state): State<AppState>, Extension(user): Extension<User>, Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let article = state.articles.get(&user, id).await?;
    Ok(Json(json!({ "article": article })))
}

async fn update_article(
    State(state): State<AppState>, Extension(user): Extension<User>, Path(id): Path<i64>,
    payload: Result<Json<ArticleUpdate>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(update) = payload?;
    let article = state.articles.update(&user, id, &update).await?;
    Ok(Json(json!({ "message": "Article updated successfully", "article": article })))
}

async fn delete_article(
    State(state): State<AppState>, Extension(user): Extension<User>, Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    state.articles.delete(&user, id).await?;
    Ok(Json(json!({ "message": "Article deleted successfully" })))
}

async fn add_highlight(
    State(state): State<AppState>, Extension(user): Extension<User>, Path(id): Path<i64>,
    payload: Result<Json<HighlightRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload?;
    let highlight = state.articles.add_highlight(&user, id, req).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Highlight added successfully", "highlight": highlight }))))
}

async fn delete_highlight(
    State(state): State<AppState>, Extension(user): Extension<User>, Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    state.articles.delete_highlight(&user, id).await?;
    Ok(Json(json!({ "message": "Highlight deleted successfully" })))
}

async fn stats(State(state): State<AppState>, Extension(user): Extension<User>) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.articles.stats(&user).await?))
}
