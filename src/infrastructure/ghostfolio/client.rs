use crate::domain::entities::account::{AccountBalance, TrackedAccount};
use crate::domain::entities::activity::{Activity, ExistingActivity};
use crate::domain::error::DomainError;
use crate::domain::ports::portfolio_tracker::PortfolioTracker;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const DEFAULT_HOST: &str = "https://ghostfol.io";
pub const PLATFORM_NAME: &str = "Saxo Bank";
pub const PLATFORM_URL: &str = "https://www.home.saxo";

/// Ghostfolio REST client.
///
/// The session token from the anonymous auth endpoint and the platform id
/// are fetched lazily and kept for the lifetime of the client.
pub struct GhostfolioClient {
    host: String,
    access_token: String,
    configured_platform: Option<String>,
    client: reqwest::Client,
    session: Mutex<Option<String>>,
    platform: Mutex<Option<String>>,
}

impl fmt::Debug for GhostfolioClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GhostfolioClient")
            .field("host", &self.host)
            .field("access_token", &"[REDACTED]")
            .field("configured_platform", &self.configured_platform)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    auth_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountEntry {
    id: String,
    name: String,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    platform_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AccountListing {
    List(Vec<AccountEntry>),
    Wrapped { accounts: Vec<AccountEntry> },
}

impl AccountListing {
    fn into_vec(self) -> Vec<AccountEntry> {
        match self {
            AccountListing::List(v) => v,
            AccountListing::Wrapped { accounts } => accounts,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PlatformEntry {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PlatformListing {
    List(Vec<PlatformEntry>),
    Wrapped { platforms: Vec<PlatformEntry> },
}

impl PlatformListing {
    fn into_vec(self) -> Vec<PlatformEntry> {
        match self {
            PlatformListing::List(v) => v,
            PlatformListing::Wrapped { platforms } => platforms,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SymbolProfile {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderEntry {
    id: String,
    #[serde(rename = "type", default)]
    activity_type: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    quantity: Option<Decimal>,
    #[serde(default)]
    unit_price: Option<Decimal>,
    #[serde(default)]
    fee: Option<Decimal>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(rename = "SymbolProfile", default)]
    symbol_profile: Option<SymbolProfile>,
}

impl From<OrderEntry> for ExistingActivity {
    fn from(o: OrderEntry) -> Self {
        let (symbol, profile_currency) = match o.symbol_profile {
            Some(p) => (p.symbol, p.currency),
            None => (None, None),
        };
        ExistingActivity {
            id: o.id,
            symbol,
            activity_type: o.activity_type,
            date: o.date,
            quantity: o.quantity,
            unit_price: o.unit_price,
            fee: o.fee,
            currency: o.currency.or(profile_currency),
            comment: o.comment,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrderListing {
    #[serde(default)]
    activities: Vec<OrderEntry>,
}

#[derive(Serialize)]
struct ImportRequest<'a> {
    activities: &'a [Activity],
}

impl GhostfolioClient {
    pub fn new(host: &str, access_token: &str, configured_platform: Option<String>) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            configured_platform: configured_platform.filter(|p| !p.trim().is_empty()),
            client: reqwest::Client::builder()
                .user_agent("saxofolio/0.1")
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            session: Mutex::new(None),
            platform: Mutex::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    async fn session_token(&self) -> Result<String, DomainError> {
        let mut session = self.session.lock().await;
        if let Some(token) = session.as_ref() {
            return Ok(token.clone());
        }

        debug!("Opening Ghostfolio session");
        let resp = self
            .client
            .post(self.url("/api/v1/auth/anonymous"))
            .json(&json!({ "accessToken": self.access_token }))
            .send()
            .await
            .map_err(|e| DomainError::Authentication(format!("Ghostfolio auth failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DomainError::Authentication(format!(
                "Ghostfolio auth returned {status}"
            )));
        }

        let body: AuthResponse = resp.json().await.map_err(|e| {
            DomainError::Authentication(format!("invalid Ghostfolio auth response: {e}"))
        })?;
        *session = Some(body.auth_token.clone());
        Ok(body.auth_token)
    }

    /// Send a request with the session bearer token and decode the JSON
    /// body. Failures map through `to_error`, except 401 which is always
    /// an authentication failure.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
        to_error: fn(String) -> DomainError,
    ) -> Result<T, DomainError> {
        let resp = self.send(request, what, to_error).await?;
        resp.json()
            .await
            .map_err(|e| to_error(format!("invalid response for {what}: {e}")))
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
        to_error: fn(String) -> DomainError,
    ) -> Result<reqwest::Response, DomainError> {
        let token = self.session_token().await?;
        let resp = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| to_error(format!("{what}: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(DomainError::Authentication(format!(
                "Ghostfolio rejected the session for {what}"
            )));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(to_error(format!("{what} returned {status}: {body}")));
        }
        Ok(resp)
    }

    async fn list_accounts(&self) -> Result<Vec<AccountEntry>, DomainError> {
        let listing: AccountListing = self
            .send_json(
                self.client.get(self.url("/api/v1/account")),
                "account listing",
                DomainError::Submission,
            )
            .await?;
        Ok(listing.into_vec())
    }

    /// Platform id for Saxo Bank: configured, found by name, or created.
    async fn platform_id(&self) -> Result<String, DomainError> {
        if let Some(id) = &self.configured_platform {
            return Ok(id.clone());
        }

        let mut cached = self.platform.lock().await;
        if let Some(id) = cached.as_ref() {
            return Ok(id.clone());
        }

        let listing: PlatformListing = self
            .send_json(
                self.client.get(self.url("/api/v1/platform")),
                "platform listing",
                DomainError::Submission,
            )
            .await?;

        let id = match listing
            .into_vec()
            .into_iter()
            .find(|p| p.name == PLATFORM_NAME)
        {
            Some(p) => {
                debug!(platform_id = %p.id, "Found platform");
                p.id
            }
            None => {
                info!("Creating platform {PLATFORM_NAME}");
                let created: PlatformEntry = self
                    .send_json(
                        self.client
                            .post(self.url("/api/v1/platform"))
                            .json(&json!({ "name": PLATFORM_NAME, "url": PLATFORM_URL })),
                        "platform creation",
                        DomainError::Submission,
                    )
                    .await?;
                created.id
            }
        };

        *cached = Some(id.clone());
        Ok(id)
    }
}

#[async_trait]
impl PortfolioTracker for GhostfolioClient {
    async fn get_or_create_account(
        &self,
        name: &str,
        currency: &str,
    ) -> Result<TrackedAccount, DomainError> {
        if let Some(existing) = self.list_accounts().await?.into_iter().find(|a| a.name == name) {
            debug!(account_id = %existing.id, "Using existing account");
            return Ok(TrackedAccount {
                id: existing.id,
                name: existing.name,
                currency: existing.currency.unwrap_or_else(|| currency.to_string()),
                platform_id: existing.platform_id,
            });
        }

        let platform_id = self.platform_id().await?;
        info!(name, currency, "Creating account");
        let created: AccountEntry = self
            .send_json(
                self.client.post(self.url("/api/v1/account")).json(&json!({
                    "balance": 0,
                    "currency": currency,
                    "isExcluded": false,
                    "name": name,
                    "platformId": platform_id,
                })),
                "account creation",
                DomainError::Submission,
            )
            .await?;

        Ok(TrackedAccount {
            id: created.id,
            name: created.name,
            currency: created.currency.unwrap_or_else(|| currency.to_string()),
            platform_id: created.platform_id.or(Some(platform_id)),
        })
    }

    async fn list_activities(&self, account_id: &str) -> Result<Vec<ExistingActivity>, DomainError> {
        let listing: OrderListing = self
            .send_json(
                self.client
                    .get(self.url("/api/v1/order"))
                    .query(&[("accounts", account_id)]),
                "activity listing",
                DomainError::Fetch,
            )
            .await?;
        Ok(listing.activities.into_iter().map(Into::into).collect())
    }

    async fn bulk_import(&self, activities: &[Activity]) -> Result<(), DomainError> {
        self.send(
            self.client
                .post(self.url("/api/v1/import"))
                .json(&ImportRequest { activities }),
            "import",
            DomainError::Submission,
        )
        .await?;
        Ok(())
    }

    async fn update_account_balance(
        &self,
        account: &TrackedAccount,
        balance: &AccountBalance,
    ) -> Result<(), DomainError> {
        self.send(
            self.client
                .put(self.url(&format!("/api/v1/account/{}", account.id)))
                .json(&json!({
                    "balance": balance.cash,
                    "comment": null,
                    "currency": account.currency,
                    "id": account.id,
                    "isExcluded": false,
                    "name": account.name,
                    "platformId": account.platform_id,
                })),
            "balance update",
            DomainError::BalanceUpdate,
        )
        .await?;
        Ok(())
    }

    async fn delete_all_activities(&self, account_id: &str) -> Result<(), DomainError> {
        info!(account_id, "Deleting all activities");
        self.send(
            self.client
                .delete(self.url("/api/v1/order"))
                .query(&[("accounts", account_id)]),
            "activity deletion",
            DomainError::Submission,
        )
        .await?;
        Ok(())
    }
}
