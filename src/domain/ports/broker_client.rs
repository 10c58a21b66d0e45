use crate::domain::entities::account::{AccountBalance, BrokerAccount};
use crate::domain::entities::instrument::InstrumentInfo;
use crate::domain::entities::raw_position::RawPosition;
use crate::domain::error::DomainError;
use crate::domain::values::asset_type::AssetType;
use crate::domain::values::netting_mode::NettingMode;
use async_trait::async_trait;

/// Read-only access to the brokerage.
#[async_trait]
pub trait BrokerClient: Send + Sync {
    /// Closed positions for `EndOfDay` accounts, open positions for `Intraday`.
    async fn fetch_positions(
        &self,
        account_key: &str,
        netting_mode: NettingMode,
    ) -> Result<Vec<RawPosition>, DomainError>;

    async fn fetch_instrument_details(
        &self,
        uic: u64,
        asset_type: &AssetType,
    ) -> Result<InstrumentInfo, DomainError>;

    async fn fetch_balance(&self, account_key: &str) -> Result<AccountBalance, DomainError>;

    async fn list_accounts(&self) -> Result<Vec<BrokerAccount>, DomainError>;
}
