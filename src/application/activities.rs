use crate::domain::entities::account::TrackedAccount;
use crate::domain::entities::activity::ExistingActivity;
use crate::domain::error::DomainError;
use crate::domain::ports::portfolio_tracker::PortfolioTracker;
use std::sync::Arc;
use tracing::{info, warn};

/// Read and reset the tracker account's activities outside of a sync.
pub struct ActivitiesUseCase {
    tracker: Arc<dyn PortfolioTracker>,
    account_name: String,
    currency: String,
}

impl ActivitiesUseCase {
    pub fn new(tracker: Arc<dyn PortfolioTracker>, account_name: &str, currency: &str) -> Self {
        Self {
            tracker,
            account_name: account_name.to_string(),
            currency: currency.to_string(),
        }
    }

    async fn account(&self) -> Result<TrackedAccount, DomainError> {
        self.tracker
            .get_or_create_account(&self.account_name, &self.currency)
            .await
    }

    pub async fn list(&self) -> Result<Vec<ExistingActivity>, DomainError> {
        let account = self.account().await?;
        let activities = self.tracker.list_activities(&account.id).await?;
        info!("Found {} activities in {}", activities.len(), account.name);
        Ok(activities)
    }

    /// Delete every activity of the account. Intended for manual resets.
    pub async fn delete_all(&self) -> Result<(), DomainError> {
        let account = self.account().await?;
        warn!("Deleting all activities of {} ({})", account.name, account.id);
        self.tracker.delete_all_activities(&account.id).await?;
        info!("All activities deleted");
        Ok(())
    }
}
