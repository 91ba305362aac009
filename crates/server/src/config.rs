use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use axum::http::HeaderValue;
use shelfmark_core::{ExtractorConfig, FetchConfig};
use url::{Origin, Url};

const DEFAULT_BIND: &str = "0.0.0.0:5001";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000";

/// Slack on top of both extraction timeouts before a request is cut off.
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

const TIMEOUT_SECS: RangeInclusive<u64> = 1..=3_600;
const TOKEN_TTL_HOURS: RangeInclusive<i64> = 1..=24 * 365;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres { url: String, pool_size: usize },
    /// Process-local store; data is lost on restart.
    Memory,
}

/// Server configuration loaded from `SHELFMARK_*` environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub store: StoreBackend,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<HeaderValue>,
    pub fetch_timeout_secs: u64,
    pub fallback_timeout_secs: u64,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let store = match get("SHELFMARK_STORE").as_deref().unwrap_or("postgres") {
            "postgres" => StoreBackend::Postgres {
                url: get("DATABASE_URL").context("DATABASE_URL must be set")?,
                pool_size: parsed(&get, "SHELFMARK_POOL_SIZE", 16)?,
            },
            "memory" => StoreBackend::Memory,
            other => bail!("SHELFMARK_STORE must be \"postgres\" or \"memory\", got {other:?}"),
        };

        let jwt_secret = get("SHELFMARK_JWT_SECRET").context("SHELFMARK_JWT_SECRET must be set")?;
        if jwt_secret.is_empty() {
            bail!("SHELFMARK_JWT_SECRET must not be empty");
        }

        let cors = get("SHELFMARK_CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string());
        let cors_origins = cors
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(parse_origin)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            bind: parsed(&get, "SHELFMARK_BIND", DEFAULT_BIND.parse()?)?,
            store,
            jwt_secret,
            token_ttl_hours: bounded(&get, "SHELFMARK_TOKEN_TTL_HOURS", 24, TOKEN_TTL_HOURS)?,
            bcrypt_cost: parsed(&get, "SHELFMARK_BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            cors_origins,
            fetch_timeout_secs: bounded(&get, "SHELFMARK_FETCH_TIMEOUT_SECS", 30, TIMEOUT_SECS)?,
            fallback_timeout_secs: bounded(&get, "SHELFMARK_FALLBACK_TIMEOUT_SECS", 10, TIMEOUT_SECS)?,
        })
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            primary: FetchConfig::with_timeout(self.fetch_timeout_secs),
            fallback: FetchConfig::with_timeout(self.fallback_timeout_secs),
            ..Default::default()
        }
    }

    /// Upper bound for one request: both extraction attempts plus a margin.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.saturating_add(self.fallback_timeout_secs))
            .saturating_add(REQUEST_TIMEOUT_MARGIN)
    }
}

fn parsed<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e| anyhow!("{key} has invalid value {raw:?}: {e}")),
        None => Ok(default),
    }
}

fn bounded<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T, range: RangeInclusive<T>) -> Result<T>
where
    T: FromStr + PartialOrd + Display,
    T::Err: Display,
{
    let value = parsed(get, key, default)?;
    if !range.contains(&value) {
        bail!("{key} must be between {} and {}, got {value}", range.start(), range.end());
    }
    Ok(value)
}

fn parse_origin(raw: &str) -> Result<HeaderValue> {
    let url = Url::parse(raw).with_context(|| format!("invalid CORS origin {raw:?}"))?;
    match url.origin() {
        origin @ Origin::Tuple(..) => Ok(HeaderValue::from_str(&origin.ascii_serialization())?),
        Origin::Opaque(_) => bail!("CORS origin {raw:?} has no host"),
    }
}
