use super::SaxoEnvironment;
use crate::domain::entities::account::{AccountBalance, BrokerAccount};
use crate::domain::entities::instrument::InstrumentInfo;
use crate::domain::entities::raw_position::RawPosition;
use crate::domain::error::DomainError;
use crate::domain::ports::broker_client::BrokerClient;
use crate::domain::ports::token_provider::TokenProvider;
use crate::domain::values::asset_type::AssetType;
use crate::domain::values::direction::Direction;
use crate::domain::values::netting_mode::NettingMode;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Saxo OpenAPI portfolio and reference-data client.
pub struct SaxoClient {
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
    client: reqwest::Client,
}

impl SaxoClient {
    pub fn new(environment: SaxoEnvironment, tokens: Arc<dyn TokenProvider>) -> Self {
        Self::with_base_url(environment.gateway_url(), tokens)
    }

    pub fn with_base_url(base_url: &str, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            client: reqwest::Client::builder()
                .user_agent("saxofolio/0.1")
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        to_error: fn(String) -> DomainError,
    ) -> Result<T, DomainError> {
        let token = self.tokens.get_valid_access_token().await?;
        debug!("GET {url}");

        let resp = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&token.access)
            .send()
            .await
            .map_err(|e| to_error(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(DomainError::Authentication(format!(
                "Saxo rejected the access token for {url}"
            )));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(to_error(format!("Saxo API returned {status} for {url}: {body}")));
        }

        resp.json()
            .await
            .map_err(|e| to_error(format!("invalid response from {url}: {e}")))
    }

    /// Follow `__next` links until the listing is exhausted.
    async fn get_paged<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, DomainError> {
        let mut page: Page<T> = self
            .get_json(&format!("{}{path}", self.base_url), query, DomainError::Fetch)
            .await?;
        let mut items = std::mem::take(&mut page.data);

        while let Some(next) = page.next.take() {
            page = self.get_json(&next, &[], DomainError::Fetch).await?;
            items.append(&mut page.data);
        }

        Ok(items)
    }

    async fn fetch_closed_positions(&self) -> Result<Vec<Keyed>, DomainError> {
        let entries: Vec<ClosedPositionEntry> = self
            .get_paged(
                "/port/v1/closedpositions/me",
                &[("FieldGroups", "ClosedPosition,DisplayAndFormat")],
            )
            .await?;
        info!("Found {} closed positions", entries.len());
        Ok(entries.into_iter().map(ClosedPositionEntry::into_raw).collect())
    }

    async fn fetch_open_positions(&self) -> Result<Vec<Keyed>, DomainError> {
        let entries: Vec<PositionEntry> = self
            .get_paged(
                "/port/v1/positions/me",
                &[("FieldGroups", "PositionBase,PositionView,DisplayAndFormat")],
            )
            .await?;
        info!("Found {} open positions", entries.len());
        Ok(entries.into_iter().map(PositionEntry::into_raw).collect())
    }
}

#[async_trait]
impl BrokerClient for SaxoClient {
    async fn fetch_positions(
        &self,
        account_key: &str,
        netting_mode: NettingMode,
    ) -> Result<Vec<RawPosition>, DomainError> {
        let positions = match netting_mode {
            NettingMode::EndOfDay => self.fetch_closed_positions().await?,
            NettingMode::Intraday => self.fetch_open_positions().await?,
        };
        // The `me` endpoints span every account of the client.
        Ok(positions
            .into_iter()
            .filter(|p| p.account_key.as_deref().map_or(true, |k| k == account_key))
            .map(|p| p.raw)
            .collect())
    }

    async fn fetch_instrument_details(
        &self,
        uic: u64,
        asset_type: &AssetType,
    ) -> Result<InstrumentInfo, DomainError> {
        let url = format!(
            "{}/ref/v1/instruments/details/{uic}/{}",
            self.base_url,
            asset_type.as_str()
        );
        let details: InstrumentDetails = self.get_json(&url, &[], DomainError::Lookup).await?;
        Ok(InstrumentInfo {
            uic: details.uic.unwrap_or(uic),
            asset_type: details
                .asset_type
                .map(AssetType::from)
                .unwrap_or_else(|| asset_type.clone()),
            symbol: details.symbol.unwrap_or_default(),
            isin: details.isin.filter(|s| !s.trim().is_empty()),
            description: details.description.unwrap_or_default(),
            currency: details.currency_code.unwrap_or_default(),
        })
    }

    async fn fetch_balance(&self, account_key: &str) -> Result<AccountBalance, DomainError> {
        // Account-scoped balances need the owning client's key.
        let accounts: Vec<AccountEntry> = self.get_paged("/port/v1/accounts/me", &[]).await?;
        let client_key = accounts
            .into_iter()
            .find(|a| a.account_key == account_key)
            .ok_or_else(|| DomainError::Fetch(format!("account {account_key} not found")))?
            .client_key
            .ok_or_else(|| DomainError::Fetch(format!("no client key for {account_key}")))?;

        let url = format!("{}/port/v1/balances", self.base_url);
        let balance: BalanceResponse = self
            .get_json(
                &url,
                &[("AccountKey", account_key), ("ClientKey", client_key.as_str())],
                DomainError::Fetch,
            )
            .await?;
        let cash = balance
            .cash_balance
            .ok_or_else(|| DomainError::Fetch(format!("no cash balance for {account_key}")))?;
        let currency = balance
            .currency
            .ok_or_else(|| DomainError::Fetch(format!("no balance currency for {account_key}")))?;
        info!("Balance: {cash} {currency}");
        Ok(AccountBalance { cash, currency })
    }

    async fn list_accounts(&self) -> Result<Vec<BrokerAccount>, DomainError> {
        let accounts: Vec<AccountEntry> = self.get_paged("/port/v1/accounts/me", &[]).await?;
        Ok(accounts
            .into_iter()
            .map(|a| BrokerAccount {
                account_key: a.account_key,
                account_id: a.account_id,
                currency: a.currency,
                display_name: a.display_name,
            })
            .collect())
    }
}

/// A raw position plus the account it belongs to, before account filtering.
struct Keyed {
    account_key: Option<String>,
    raw: RawPosition,
}

#[derive(Debug, serde::Deserialize)]
struct Page<T> {
    #[serde(rename = "Data", default = "Vec::new")]
    data: Vec<T>,
    #[serde(rename = "__next", default)]
    next: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DisplayAndFormat {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default, alias = "IsinCode")]
    isin: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ClosedPositionEntry {
    #[serde(default)]
    closed_position_unique_id: Option<String>,
    #[serde(default)]
    closed_position: Option<ClosedPositionBody>,
    #[serde(default)]
    display_and_format: Option<DisplayAndFormat>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ClosedPositionBody {
    #[serde(default)]
    account_key: Option<String>,
    #[serde(default)]
    amount: Option<Decimal>,
    #[serde(default)]
    asset_type: Option<String>,
    #[serde(default)]
    buy_or_sell: Option<String>,
    #[serde(default)]
    closing_price: Option<Decimal>,
    #[serde(default)]
    open_price: Option<Decimal>,
    #[serde(default)]
    cost_closing: Option<Decimal>,
    #[serde(default)]
    cost_opening: Option<Decimal>,
    #[serde(default)]
    execution_time_close: Option<DateTime<Utc>>,
    #[serde(default)]
    execution_time_open: Option<DateTime<Utc>>,
    #[serde(default)]
    uic: Option<u64>,
}

/// Buy/sell from the explicit field, else from the sign of the amount.
fn open_time_or_now(time: Option<DateTime<Utc>>, position_id: &str) -> DateTime<Utc> {
    time.unwrap_or_else(|| {
        warn!("Position {position_id} has no execution time, dating it now");
        Utc::now()
    })
}

fn direction_of(buy_or_sell: Option<&str>, amount: Option<Decimal>) -> Direction {
    buy_or_sell
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| match amount {
            Some(a) if a.is_sign_negative() => Direction::Sell,
            _ => Direction::Buy,
        })
}

/// Saxo reports cost components as signed amounts; the sum of their
/// magnitudes is the fee.
fn total_cost(parts: &[Option<Decimal>]) -> Option<Decimal> {
    let present: Vec<Decimal> = parts.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().map(|d| d.abs()).sum())
    }
}

impl ClosedPositionEntry {
    fn into_raw(self) -> Keyed {
        let position_id = self.closed_position_unique_id.unwrap_or_default();
        let body = self.closed_position.unwrap_or_default();
        let display = self.display_and_format.unwrap_or_default();
        let open_date = open_time_or_now(body.execution_time_open, &position_id);
        Keyed {
            account_key: body.account_key,
            raw: RawPosition {
                position_id,
                uic: body.uic.unwrap_or_default(),
                asset_type: AssetType::from(body.asset_type.unwrap_or_default()),
                direction: direction_of(body.buy_or_sell.as_deref(), body.amount),
                quantity: body.amount,
                open_price: body.open_price,
                close_price: body.closing_price,
                trade_cost: total_cost(&[body.cost_opening, body.cost_closing]),
                currency: display.currency,
                open_date,
                close_date: body.execution_time_close,
                symbol_hint: display.symbol,
                isin: display.isin,
            },
        }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PositionEntry {
    #[serde(default)]
    position_id: Option<String>,
    #[serde(default)]
    position_base: Option<PositionBase>,
    #[serde(default)]
    position_view: Option<PositionView>,
    #[serde(default)]
    display_and_format: Option<DisplayAndFormat>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PositionBase {
    #[serde(default)]
    account_key: Option<String>,
    #[serde(default)]
    amount: Option<Decimal>,
    #[serde(default)]
    asset_type: Option<String>,
    #[serde(default)]
    open_price: Option<Decimal>,
    #[serde(default)]
    execution_time_open: Option<DateTime<Utc>>,
    #[serde(default)]
    uic: Option<u64>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PositionView {
    #[serde(default)]
    trade_costs_total: Option<Decimal>,
}

impl PositionEntry {
    fn into_raw(self) -> Keyed {
        let position_id = self.position_id.unwrap_or_default();
        let base = self.position_base.unwrap_or_default();
        let view = self.position_view.unwrap_or_default();
        let display = self.display_and_format.unwrap_or_default();
        let open_date = open_time_or_now(base.execution_time_open, &position_id);
        Keyed {
            account_key: base.account_key,
            raw: RawPosition {
                position_id,
                uic: base.uic.unwrap_or_default(),
                asset_type: AssetType::from(base.asset_type.unwrap_or_default()),
                direction: direction_of(None, base.amount),
                quantity: base.amount,
                open_price: base.open_price,
                close_price: None,
                trade_cost: total_cost(&[view.trade_costs_total]),
                currency: display.currency,
                open_date,
                close_date: None,
                symbol_hint: display.symbol,
                isin: display.isin,
            },
        }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InstrumentDetails {
    #[serde(default)]
    uic: Option<u64>,
    #[serde(default)]
    asset_type: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    currency_code: Option<String>,
    #[serde(default, alias = "IsinCode")]
    isin: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BalanceResponse {
    #[serde(default)]
    cash_balance: Option<Decimal>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AccountEntry {
    account_key: String,
    account_id: String,
    currency: String,
    #[serde(default)]
    client_key: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
}
