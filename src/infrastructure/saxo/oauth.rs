//! Saxo OAuth2 authorization-code flow and token refresh.
//!
//! The sync core only sees [`TokenProvider`]; this adapter keeps the token
//! in a [`TokenStore`] and refreshes it shortly before it expires.

use super::SaxoEnvironment;
use crate::domain::entities::token::Token;
use crate::domain::error::DomainError;
use crate::domain::ports::token_provider::{TokenProvider, TokenStore};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 1200;

#[derive(Clone)]
pub struct OAuthCredentials {
    pub app_key: String,
    pub app_secret: String,
    pub redirect_uri: String,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("app_key", &self.app_key)
            .field("app_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

pub struct SaxoOAuth {
    credentials: OAuthCredentials,
    authorize_url: String,
    token_url: String,
    store: Arc<dyn TokenStore>,
    client: reqwest::Client,
    current: Mutex<Option<Token>>,
}

impl SaxoOAuth {
    pub fn new(
        credentials: OAuthCredentials,
        environment: SaxoEnvironment,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self::with_endpoints(
            credentials,
            environment.authorize_url(),
            environment.token_url(),
            store,
        )
    }

    pub fn with_endpoints(
        credentials: OAuthCredentials,
        authorize_url: &str,
        token_url: &str,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            credentials,
            authorize_url: authorize_url.to_string(),
            token_url: token_url.to_string(),
            store,
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            current: Mutex::new(None),
        }
    }

    pub fn redirect_uri(&self) -> &str {
        &self.credentials.redirect_uri
    }

    /// URL the user opens to grant access.
    pub fn authorization_url(&self, state: &str) -> Result<String, DomainError> {
        let url = reqwest::Url::parse_with_params(
            &self.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", self.credentials.app_key.as_str()),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| DomainError::Configuration(format!("invalid authorize URL: {e}")))?;
        Ok(url.to_string())
    }

    /// Store `token` unless one is already persisted. Returns whether it
    /// was stored.
    pub fn seed(&self, token: Token) -> Result<bool, DomainError> {
        if self.store.load()?.is_some() {
            return Ok(false);
        }
        self.store.save(&token)?;
        info!("Seeded token store from environment");
        Ok(true)
    }

    /// Exchange an authorization code for tokens and persist them.
    pub async fn exchange_code(&self, code: &str) -> Result<Token, DomainError> {
        info!("Exchanging authorization code for tokens");
        let token = self
            .request_token(
                &[
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("redirect_uri", self.credentials.redirect_uri.as_str()),
                ],
                None,
            )
            .await?;
        self.store.save(&token)?;
        *self.current.lock().await = Some(token.clone());
        info!(expires_at = ?token.expires_at, "Tokens obtained");
        Ok(token)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Token, DomainError> {
        info!("Access token expired or expiring soon, refreshing");
        let token = self
            .request_token(
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                ],
                Some(refresh_token),
            )
            .await?;
        self.store.save(&token)?;
        info!(expires_at = ?token.expires_at, "Access token refreshed");
        Ok(token)
    }

    async fn request_token(
        &self,
        form: &[(&str, &str)],
        previous_refresh: Option<&str>,
    ) -> Result<Token, DomainError> {
        let resp = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.credentials.app_key, Some(&self.credentials.app_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| DomainError::Authentication(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DomainError::Authentication(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let data: TokenResponse = resp
            .json()
            .await
            .map_err(|e| DomainError::Authentication(format!("invalid token response: {e}")))?;

        let expires_in = data.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        Ok(Token {
            access: data.access_token,
            refresh: data
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_string)),
            expires_at: Some(Utc::now() + Duration::seconds(expires_in)),
        })
    }
}

#[async_trait]
impl TokenProvider for SaxoOAuth {
    async fn get_valid_access_token(&self) -> Result<Token, DomainError> {
        let mut current = self.current.lock().await;

        if current.is_none() {
            *current = self.store.load()?;
        }

        let token = current.clone().ok_or_else(|| {
            DomainError::Authentication(
                "no Saxo token available; run `saxofolio auth` first".into(),
            )
        })?;

        if !token.needs_refresh(Utc::now()) {
            return Ok(token);
        }

        let Some(refresh_token) = token.refresh.as_deref() else {
            warn!("Access token expiring and no refresh token stored");
            return Err(DomainError::Authentication(
                "access token expired and no refresh token available".into(),
            ));
        };

        let refreshed = self.refresh(refresh_token).await?;
        *current = Some(refreshed.clone());
        Ok(refreshed)
    }
}
