//! Registration, login and the bearer-token gate.
//!
//! Tokens are stateless HS256 JWTs carrying the user id in `sub`. The gate
//! re-reads the user on every request, so a token for a deleted account stops
//! working immediately.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::{LoginRequest, NewUser, RegisterRequest, User};
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id, as a decimal string.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct AuthService {
    store: Arc<dyn Store>,
    encoding: EncodingKey,
    decoding: DecodingKey,
    token_ttl: Duration,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, secret: &str, token_ttl_hours: i64, bcrypt_cost: u32) -> Self {
        Self {
            store,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            token_ttl: Duration::hours(token_ttl_hours),
            bcrypt_cost,
        }
    }

    /// Creates an account and returns it with a fresh token.
    pub async fn register(&self, req: RegisterRequest) -> ApiResult<(User, String)> {
        if req.username.is_empty() || req.email.is_empty() || req.password.is_empty() {
            return Err(ApiError::Validation("Missing required fields".to_string()));
        }
        if self.store.find_user_by_username(&req.username).await?.is_some() {
            return Err(ApiError::Conflict("Username already exists".to_string()));
        }
        if self.store.find_user_by_email(&req.email).await?.is_some() {
            return Err(ApiError::Conflict("Email already exists".to_string()));
        }

        let cost = self.bcrypt_cost;
        let password = req.password;
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await?
            .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;

        let user = self
            .store
            .create_user(NewUser { username: req.username, email: req.email, password_hash })
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => ApiError::Conflict("Username or email already exists".to_string()),
                other => ApiError::Store(other),
            })?;

        tracing::info!(user_id = user.id, "user registered");
        let token = self.issue_token(user.id)?;
        Ok((user, token))
    }

    pub async fn login(&self, req: LoginRequest) -> ApiResult<(User, String)> {
        let Some(user) = self.store.find_user_by_username(&req.username).await? else {
            return Err(ApiError::InvalidCredentials);
        };

        let hash = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || bcrypt::verify(req.password, &hash))
            .await?
            .unwrap_or(false);
        if !valid {
            return Err(ApiError::InvalidCredentials);
        }

        let token = self.issue_token(user.id)?;
        Ok((user, token))
    }

    pub fn issue_token(&self, user_id: i64) -> ApiResult<String> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + self.token_ttl).unix_timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
    }

    /// Checks signature and expiry and returns the user id the token was issued for.
    pub fn verify_token(&self, token: &str) -> ApiResult<i64> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default()).map_err(|e| {
            tracing::debug!(error = %e, "rejected token");
            ApiError::InvalidToken
        })?;
        data.claims.sub.parse().map_err(|_| ApiError::InvalidToken)
    }

    /// Resolves an `Authorization` header value to the acting user.
    ///
    /// The `Bearer ` prefix is optional.
    pub async fn authenticate(&self, authorization: Option<&str>) -> ApiResult<User> {
        let credential = authorization.filter(|value| !value.is_empty()).ok_or(ApiError::MissingToken)?;
        let token = credential.strip_prefix("Bearer ").unwrap_or(credential);
        let user_id = self.verify_token(token)?;
        self.store.find_user_by_id(user_id).await?.ok_or(ApiError::InvalidToken)
    }
}

/// Middleware for protected routes: puts the authenticated [`User`] into request extensions.
pub async fn require_user(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let authorization = match req.headers().get(header::AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| ApiError::InvalidToken)?.to_owned()),
        None => None,
    };
    let user = state.auth.authenticate(authorization.as_deref()).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    /// Minimum cost accepted by bcrypt (the crate keeps its own `MIN_COST` private).
    const BCRYPT_MIN_COST: u32 = 4;

    fn service() -> AuthService {
        AuthService::new(Arc::new(MemoryStore::new()), "test-secret", 24, BCRYPT_MIN_COST)
    }

    fn register_req(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest { username: username.to_string(), email: email.to_string(), password: "hunter22".to_string() }
    }

    #[tokio::test]
    async fn test_token_round_trips_to_user() {
        let auth = service();
        let (user, token) = auth.register(register_req("ada", "ada@example.com")).await.unwrap();

        assert_eq!(auth.verify_token(&token).unwrap(), user.id);
        let bearer = format!("Bearer {token}");
        assert_eq!(auth.authenticate(Some(bearer.as_str())).await.unwrap().id, user.id);
        assert_eq!(auth.authenticate(Some(token.as_str())).await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn test_password_is_hashed() {
        let auth = service();
        let (user, _) = auth.register(register_req("ada", "ada@example.com")).await.unwrap();
        assert_ne!(user.password_hash, "hunter22");
        assert!(bcrypt::verify("hunter22", &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let auth = service();
        auth.register(register_req("ada", "ada@example.com")).await.unwrap();
        let err = auth.register(register_req("ada", "other@example.com")).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(ref m) if m == "Username already exists"));
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let err = service().register(register_req("", "ada@example.com")).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_login_rejects_wrong_password() {
        let auth = service();
        auth.register(register_req("ada", "ada@example.com")).await.unwrap();

        let wrong = LoginRequest { username: "ada".to_string(), password: "nope".to_string() };
        assert!(matches!(auth.login(wrong).await, Err(ApiError::InvalidCredentials)));

        let unknown = LoginRequest { username: "bob".to_string(), password: "hunter22".to_string() };
        assert!(matches!(auth.login(unknown).await, Err(ApiError::InvalidCredentials)));

        let right = LoginRequest { username: "ada".to_string(), password: "hunter22".to_string() };
        assert!(auth.login(right).await.is_ok());
    }

    #[tokio::test]
    async fn test_gate_failures() {
        let auth = service();
        assert!(matches!(auth.authenticate(None).await, Err(ApiError::MissingToken)));
        assert!(matches!(auth.authenticate(Some("Bearer garbage")).await, Err(ApiError::InvalidToken)));

        let other = AuthService::new(Arc::new(MemoryStore::new()), "other-secret", 24, BCRYPT_MIN_COST);
        let foreign = other.issue_token(1).unwrap();
        assert!(matches!(auth.authenticate(Some(foreign.as_str())).await, Err(ApiError::InvalidToken)));

        let orphan = auth.issue_token(999).unwrap();
        assert!(matches!(auth.authenticate(Some(orphan.as_str())).await, Err(ApiError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let auth = AuthService::new(Arc::new(MemoryStore::new()), "test-secret", -1, BCRYPT_MIN_COST);
        let token = auth.issue_token(1).unwrap();
        assert!(matches!(auth.verify_token(&token), Err(ApiError::InvalidToken)));
    }
}
