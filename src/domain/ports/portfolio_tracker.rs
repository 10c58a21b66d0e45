use crate::domain::entities::account::{AccountBalance, TrackedAccount};
use crate::domain::entities::activity::{Activity, ExistingActivity};
use crate::domain::error::DomainError;
use async_trait::async_trait;

/// The portfolio tracking application that activities are pushed into.
#[async_trait]
pub trait PortfolioTracker: Send + Sync {
    /// Find the account by exact name or create it. Repeated calls with the
    /// same name return the same account.
    async fn get_or_create_account(
        &self,
        name: &str,
        currency: &str,
    ) -> Result<TrackedAccount, DomainError>;

    async fn list_activities(&self, account_id: &str) -> Result<Vec<ExistingActivity>, DomainError>;

    /// Import one chunk in a single request. Either the whole chunk is
    /// accepted or the call fails.
    async fn bulk_import(&self, activities: &[Activity]) -> Result<(), DomainError>;

    async fn update_account_balance(
        &self,
        account: &TrackedAccount,
        balance: &AccountBalance,
    ) -> Result<(), DomainError>;

    async fn delete_all_activities(&self, account_id: &str) -> Result<(), DomainError>;
}
