use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Lookup error: {0}")]
    Lookup(String),

    #[error("Normalization error: {0}")]
    Normalization(String),

    #[error("Submission error: {0}")]
    Submission(String),

    #[error("Balance update error: {0}")]
    BalanceUpdate(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Another sync run is active (held by {0})")]
    RunInProgress(String),
}

impl From<rusqlite::Error> for DomainError {
    fn from(e: rusqlite::Error) -> Self {
        DomainError::Storage(e.to_string())
    }
}
