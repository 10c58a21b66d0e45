//! Sync orchestrator.
//!
//! Linear pipeline, one pass per invocation:
//! `Init → Authenticated → AccountResolved → Fetched → Normalized →
//! Deduped → Submitted → BalanceUpdated → Done`, with `Failed` reachable
//! from any step. Configuration, authentication, account, and fetch
//! failures end the run. Lookup, normalization, chunk, and balance failures
//! are recovered locally and show up in the [`SyncReport`].

use crate::application::dedup::{filter_new, DedupIndex};
use crate::application::instrument_resolver::{InstrumentCache, InstrumentResolver};
use crate::application::normalize::normalize;
use crate::application::submit::{BatchSubmitter, ImportResult, DEFAULT_CHUNK_SIZE};
use crate::domain::entities::account::{AccountBalance, TrackedAccount};
use crate::domain::entities::activity::Activity;
use crate::domain::error::DomainError;
use crate::domain::ports::broker_client::BrokerClient;
use crate::domain::ports::portfolio_tracker::PortfolioTracker;
use crate::domain::ports::symbol_map::{SymbolMap, SymbolMapSource};
use crate::domain::ports::token_provider::TokenProvider;
use crate::domain::values::netting_mode::NettingMode;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub account_key: String,
    pub account_name: String,
    pub currency: String,
    pub netting_mode: NettingMode,
    pub chunk_size: usize,
}

impl SyncConfig {
    pub fn new(account_key: &str, account_name: &str, currency: &str) -> Self {
        Self {
            account_key: account_key.to_string(),
            account_name: account_name.to_string(),
            currency: currency.to_string(),
            netting_mode: NettingMode::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let mut missing = Vec::new();
        if self.account_key.trim().is_empty() {
            missing.push("source account key");
        }
        if self.account_name.trim().is_empty() {
            missing.push("target account name");
        }
        if self.currency.trim().is_empty() {
            missing.push("target account currency");
        }
        if !missing.is_empty() {
            return Err(DomainError::Configuration(format!(
                "missing {}",
                missing.join(", ")
            )));
        }
        if self.chunk_size == 0 {
            return Err(DomainError::Configuration(
                "chunk size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    Init,
    Authenticated,
    AccountResolved,
    Fetched,
    Normalized,
    Deduped,
    Submitted,
    BalanceUpdated,
    Done,
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncState::Init => "INIT",
            SyncState::Authenticated => "AUTHENTICATED",
            SyncState::AccountResolved => "ACCOUNT_RESOLVED",
            SyncState::Fetched => "FETCHED",
            SyncState::Normalized => "NORMALIZED",
            SyncState::Deduped => "DEDUPED",
            SyncState::Submitted => "SUBMITTED",
            SyncState::BalanceUpdated => "BALANCE_UPDATED",
            SyncState::Done => "DONE",
            SyncState::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    /// Every chunk imported (or nothing to import).
    Complete,
    /// Ran to the end but at least one chunk was rejected.
    Degraded,
    /// Stopped before finishing.
    Failed,
}

/// End-of-run summary. Emitted for every run, whatever the outcome.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub state: SyncState,
    pub failed_at: Option<SyncState>,
    pub error: Option<String>,
    pub account_id: Option<String>,
    pub fetched: usize,
    pub normalized: usize,
    pub normalization_failures: usize,
    pub lookups: usize,
    pub duplicates: usize,
    pub new: usize,
    pub submitted: usize,
    pub failed: usize,
    pub chunks: Vec<ImportResult>,
    pub balance_updated: bool,
    pub balance_error: Option<String>,
}

impl SyncReport {
    fn new() -> Self {
        Self {
            state: SyncState::Init,
            failed_at: None,
            error: None,
            account_id: None,
            fetched: 0,
            normalized: 0,
            normalization_failures: 0,
            lookups: 0,
            duplicates: 0,
            new: 0,
            submitted: 0,
            failed: 0,
            chunks: Vec::new(),
            balance_updated: false,
            balance_error: None,
        }
    }

    pub fn outcome(&self) -> SyncOutcome {
        if self.error.is_some() {
            SyncOutcome::Failed
        } else if self.chunks.iter().any(|c| !c.success) {
            SyncOutcome::Degraded
        } else {
            SyncOutcome::Complete
        }
    }

    pub fn failed_chunks(&self) -> impl Iterator<Item = &ImportResult> {
        self.chunks.iter().filter(|c| !c.success)
    }

    fn log_summary(&self) {
        info!(
            outcome = ?self.outcome(),
            fetched = self.fetched,
            normalized = self.normalized,
            normalization_failures = self.normalization_failures,
            lookups = self.lookups,
            duplicates = self.duplicates,
            new = self.new,
            submitted = self.submitted,
            failed = self.failed,
            chunks = self.chunks.len(),
            balance_updated = self.balance_updated,
            "Sync summary"
        );
        for chunk in self.failed_chunks() {
            error!(
                chunk = chunk.chunk_index + 1,
                activities = chunk.submitted_count,
                "Chunk failed: {}",
                chunk.error.as_deref().unwrap_or("unknown error")
            );
        }
        if let (Some(at), Some(err)) = (self.failed_at, self.error.as_deref()) {
            error!("Sync failed after {at}: {err}");
        }
    }
}

pub struct SyncUseCase {
    broker: Arc<dyn BrokerClient>,
    tracker: Arc<dyn PortfolioTracker>,
    tokens: Arc<dyn TokenProvider>,
    symbols: Arc<dyn SymbolMapSource>,
    config: SyncConfig,
}

impl SyncUseCase {
    pub fn new(
        broker: Arc<dyn BrokerClient>,
        tracker: Arc<dyn PortfolioTracker>,
        tokens: Arc<dyn TokenProvider>,
        symbols: Arc<dyn SymbolMapSource>,
        config: SyncConfig,
    ) -> Self {
        Self {
            broker,
            tracker,
            tokens,
            symbols,
            config,
        }
    }

    /// Run the pipeline once. Always returns a report; check
    /// [`SyncReport::outcome`] for the result.
    pub async fn execute(&self) -> SyncReport {
        info!(
            account = %self.config.account_name,
            netting_mode = %self.config.netting_mode,
            "Starting Saxo Bank sync"
        );

        let mut report = SyncReport::new();
        match self.run(&mut report).await {
            Ok(()) => report.state = SyncState::Done,
            Err(e) => {
                report.failed_at = Some(report.state);
                report.state = SyncState::Failed;
                report.error = Some(e.to_string());
            }
        }
        report.log_summary();
        report
    }

    async fn run(&self, report: &mut SyncReport) -> Result<(), DomainError> {
        self.config.validate()?;

        self.tokens.get_valid_access_token().await?;
        report.state = SyncState::Authenticated;

        let account = self
            .tracker
            .get_or_create_account(&self.config.account_name, &self.config.currency)
            .await?;
        info!(account_id = %account.id, "Using tracker account {}", account.name);
        report.account_id = Some(account.id.clone());
        report.state = SyncState::AccountResolved;

        let positions = self
            .broker
            .fetch_positions(&self.config.account_key, self.config.netting_mode)
            .await?;
        let balance = self.broker.fetch_balance(&self.config.account_key).await?;
        report.fetched = positions.len();
        info!("Fetched {} positions", positions.len());
        report.state = SyncState::Fetched;

        let manual_map = self.load_symbol_map();
        let resolver = InstrumentResolver::new(self.broker.clone());
        let mut cache = InstrumentCache::new();
        let mut candidates = Vec::with_capacity(positions.len());
        for position in &positions {
            let resolution = resolver.resolve(position, &manual_map, &mut cache).await;
            match normalize(position, &resolution, &account.id) {
                Ok(activity) => {
                    debug!(
                        "Normalized {}: {} {} {} @ {} ({:?})",
                        position.position_id,
                        activity.activity_type,
                        activity.quantity,
                        activity.symbol,
                        activity.unit_price,
                        resolution.source
                    );
                    candidates.push(activity);
                }
                Err(e) => {
                    warn!("Skipping position: {e}");
                    report.normalization_failures += 1;
                }
            }
        }
        report.lookups = cache.lookups();
        report.normalized = candidates.len();
        report.state = SyncState::Normalized;

        let mut new_activities = if candidates.is_empty() {
            Vec::new()
        } else {
            let existing = self.tracker.list_activities(&account.id).await?;
            let index = DedupIndex::build(&existing);
            debug!(
                "Dedup index: {} ids from {} existing activities",
                index.len(),
                existing.len()
            );
            let outcome = filter_new(candidates, &index);
            report.duplicates = outcome.duplicates();
            outcome.new
        };
        report.new = new_activities.len();
        info!("Found {} new activities to import", new_activities.len());
        report.state = SyncState::Deduped;

        new_activities.sort_by_key(|a| a.date);
        self.submit(&new_activities, report).await;
        report.state = SyncState::Submitted;

        self.update_balance(&account, &balance, report).await;
        report.state = SyncState::BalanceUpdated;

        Ok(())
    }

    fn load_symbol_map(&self) -> SymbolMap {
        match self.symbols.load() {
            Ok(map) => map,
            Err(e) => {
                warn!("Failed to load symbol mapping, continuing without it: {e}");
                SymbolMap::new()
            }
        }
    }

    async fn submit(&self, activities: &[Activity], report: &mut SyncReport) {
        if activities.is_empty() {
            info!("No activities to import");
            return;
        }
        let submitter = BatchSubmitter::new(self.tracker.clone());
        report.chunks = submitter.submit(activities, self.config.chunk_size).await;
        for chunk in &report.chunks {
            if chunk.success {
                report.submitted += chunk.submitted_count;
            } else {
                report.failed += chunk.submitted_count;
            }
        }
    }

    async fn update_balance(
        &self,
        account: &TrackedAccount,
        balance: &AccountBalance,
        report: &mut SyncReport,
    ) {
        let result = if !balance.currency.eq_ignore_ascii_case(&account.currency) {
            Err(DomainError::BalanceUpdate(format!(
                "source balance is in {} but the account is in {}",
                balance.currency, account.currency
            )))
        } else {
            self.tracker.update_account_balance(account, balance).await
        };

        match result {
            Ok(()) => {
                info!("Updated account balance: {} {}", balance.cash, balance.currency);
                report.balance_updated = true;
            }
            Err(e) => {
                warn!("Balance not updated: {e}");
                report.balance_error = Some(e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation_lists_missing_fields() {
        let cfg = SyncConfig::new("", "Saxo Bank", "");
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("source account key"));
        assert!(err.contains("target account currency"));
        assert!(!err.contains("target account name"));
    }

    #[test]
    fn test_config_rejects_zero_chunk_size() {
        let mut cfg = SyncConfig::new("key", "Saxo Bank", "USD");
        cfg.chunk_size = 0;
        assert!(matches!(cfg.validate(), Err(DomainError::Configuration(_))));
    }

    #[test]
    fn test_outcome_from_chunks() {
        let mut report = SyncReport::new();
        assert_eq!(report.outcome(), SyncOutcome::Complete);
        report.chunks.push(ImportResult {
            chunk_index: 0,
            submitted_count: 3,
            success: false,
            error: Some("HTTP 400".into()),
        });
        assert_eq!(report.outcome(), SyncOutcome::Degraded);
        report.error = Some("boom".into());
        assert_eq!(report.outcome(), SyncOutcome::Failed);
    }
}
