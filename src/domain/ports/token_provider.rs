use crate::domain::entities::token::Token;
use crate::domain::error::DomainError;
use async_trait::async_trait;

/// Supplies a usable brokerage access token, refreshing it when needed.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn get_valid_access_token(&self) -> Result<Token, DomainError>;
}

/// Persistence for brokerage tokens between process invocations.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<Token>, DomainError>;
    fn save(&self, token: &Token) -> Result<(), DomainError>;
}
