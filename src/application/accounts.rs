use crate::domain::entities::account::BrokerAccount;
use crate::domain::error::DomainError;
use crate::domain::ports::broker_client::BrokerClient;
use std::sync::Arc;

/// Lists brokerage accounts so the user can pick the account key to sync.
pub struct AccountsUseCase {
    broker: Arc<dyn BrokerClient>,
}

impl AccountsUseCase {
    pub fn new(broker: Arc<dyn BrokerClient>) -> Self {
        Self { broker }
    }

    pub async fn list(&self) -> Result<Vec<BrokerAccount>, DomainError> {
        self.broker.list_accounts().await
    }
}
