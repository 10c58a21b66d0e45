//! Shared test helpers: in-memory fakes for every port.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use saxofolio::application::sync::SyncConfig;
use saxofolio::domain::entities::account::{AccountBalance, BrokerAccount, TrackedAccount};
use saxofolio::domain::entities::activity::{Activity, ExistingActivity};
use saxofolio::domain::entities::instrument::InstrumentInfo;
use saxofolio::domain::entities::raw_position::RawPosition;
use saxofolio::domain::entities::token::Token;
use saxofolio::domain::error::DomainError;
use saxofolio::domain::ports::broker_client::BrokerClient;
use saxofolio::domain::ports::portfolio_tracker::PortfolioTracker;
use saxofolio::domain::ports::run_lock::RunLock;
use saxofolio::domain::ports::symbol_map::{SymbolMap, SymbolMapSource};
use saxofolio::domain::ports::token_provider::TokenProvider;
use saxofolio::domain::values::asset_type::AssetType;
use saxofolio::domain::values::direction::Direction;
use saxofolio::domain::values::netting_mode::NettingMode;
use saxofolio::SaxoFolio;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ACCOUNT_KEY: &str = "acc-key-1";

pub fn date(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap()
}

pub fn closed_position(id: &str, uic: u64, quantity: i64) -> RawPosition {
    RawPosition {
        position_id: id.to_string(),
        uic,
        asset_type: AssetType::Stock,
        direction: Direction::Buy,
        quantity: Some(Decimal::new(quantity, 0)),
        open_price: Some(Decimal::new(1000, 2)),
        close_price: Some(Decimal::new(1250, 2)),
        trade_cost: Some(Decimal::new(3, 0)),
        currency: Some("USD".into()),
        open_date: date(1),
        close_date: Some(date(2)),
        symbol_hint: None,
        isin: None,
    }
}

pub fn instrument(uic: u64, symbol: &str, isin: Option<&str>) -> InstrumentInfo {
    InstrumentInfo {
        uic,
        asset_type: AssetType::Stock,
        symbol: symbol.to_string(),
        isin: isin.map(str::to_string),
        description: format!("Instrument {uic}"),
        currency: "USD".into(),
    }
}

// ---------------------------------------------------------------- broker

#[derive(Default)]
pub struct FakeBroker {
    pub positions: Mutex<Vec<RawPosition>>,
    pub instruments: Mutex<HashMap<u64, InstrumentInfo>>,
    pub balance: Mutex<Option<AccountBalance>>,
    pub accounts: Mutex<Vec<BrokerAccount>>,
    pub fail_fetch: Mutex<bool>,
    pub lookups: AtomicUsize,
    pub fetch_modes: Mutex<Vec<NettingMode>>,
}

impl FakeBroker {
    pub fn new() -> Self {
        let broker = Self::default();
        *broker.balance.lock().unwrap() = Some(AccountBalance {
            cash: Decimal::new(150_000, 2),
            currency: "USD".into(),
        });
        broker
    }

    pub fn with_positions(self, positions: Vec<RawPosition>) -> Self {
        *self.positions.lock().unwrap() = positions;
        self
    }

    pub fn with_instrument(self, info: InstrumentInfo) -> Self {
        self.instruments.lock().unwrap().insert(info.uic, info);
        self
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerClient for FakeBroker {
    async fn fetch_positions(
        &self,
        _account_key: &str,
        netting_mode: NettingMode,
    ) -> Result<Vec<RawPosition>, DomainError> {
        self.fetch_modes.lock().unwrap().push(netting_mode);
        if *self.fail_fetch.lock().unwrap() {
            return Err(DomainError::Fetch("Saxo API returned 503".into()));
        }
        Ok(self.positions.lock().unwrap().clone())
    }

    async fn fetch_instrument_details(
        &self,
        uic: u64,
        _asset_type: &AssetType,
    ) -> Result<InstrumentInfo, DomainError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.instruments
            .lock()
            .unwrap()
            .get(&uic)
            .cloned()
            .ok_or_else(|| DomainError::Lookup(format!("unknown uic {uic}")))
    }

    async fn fetch_balance(&self, _account_key: &str) -> Result<AccountBalance, DomainError> {
        self.balance
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| DomainError::Fetch("no balance".into()))
    }

    async fn list_accounts(&self) -> Result<Vec<BrokerAccount>, DomainError> {
        Ok(self.accounts.lock().unwrap().clone())
    }
}

// --------------------------------------------------------------- tracker

#[derive(Default)]
pub struct FakeTracker {
    pub accounts: Mutex<Vec<TrackedAccount>>,
    pub activities: Mutex<Vec<Activity>>,
    /// Seeded listing entries that did not come from an import.
    pub preexisting: Mutex<Vec<ExistingActivity>>,
    /// 0-based import calls that fail.
    pub failing_imports: Mutex<HashSet<usize>>,
    pub import_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub balance_updates: Mutex<Vec<AccountBalance>>,
    pub fail_balance: Mutex<bool>,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(self, calls: &[usize]) -> Self {
        self.failing_imports.lock().unwrap().extend(calls);
        self
    }

    pub fn stored(&self) -> Vec<Activity> {
        self.activities.lock().unwrap().clone()
    }

    pub fn import_count(&self) -> usize {
        self.import_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PortfolioTracker for FakeTracker {
    async fn get_or_create_account(
        &self,
        name: &str,
        currency: &str,
    ) -> Result<TrackedAccount, DomainError> {
        let mut accounts = self.accounts.lock().unwrap();
        if let Some(a) = accounts.iter().find(|a| a.name == name) {
            return Ok(a.clone());
        }
        let account = TrackedAccount {
            id: format!("gf-{}", accounts.len() + 1),
            name: name.to_string(),
            currency: currency.to_string(),
            platform_id: Some("platform-saxo".into()),
        };
        accounts.push(account.clone());
        Ok(account)
    }

    async fn list_activities(&self, account_id: &str) -> Result<Vec<ExistingActivity>, DomainError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut listing = self.preexisting.lock().unwrap().clone();
        listing.extend(
            self.activities
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.account_id == account_id)
                .enumerate()
                .map(|(i, a)| ExistingActivity {
                    id: format!("order-{i}"),
                    symbol: Some(a.symbol.clone()),
                    activity_type: Some(a.activity_type.to_string()),
                    date: Some(a.date.to_rfc3339()),
                    quantity: Some(a.quantity),
                    unit_price: Some(a.unit_price),
                    fee: Some(a.fee),
                    currency: Some(a.currency.clone()),
                    comment: Some(a.comment.clone()),
                }),
        );
        Ok(listing)
    }

    async fn bulk_import(&self, activities: &[Activity]) -> Result<(), DomainError> {
        let call = self.import_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_imports.lock().unwrap().contains(&call) {
            return Err(DomainError::Submission("import returned 400 Bad Request".into()));
        }
        self.activities.lock().unwrap().extend_from_slice(activities);
        Ok(())
    }

    async fn update_account_balance(
        &self,
        _account: &TrackedAccount,
        balance: &AccountBalance,
    ) -> Result<(), DomainError> {
        if *self.fail_balance.lock().unwrap() {
            return Err(DomainError::BalanceUpdate("PUT returned 500".into()));
        }
        self.balance_updates.lock().unwrap().push(balance.clone());
        Ok(())
    }

    async fn delete_all_activities(&self, account_id: &str) -> Result<(), DomainError> {
        self.activities
            .lock()
            .unwrap()
            .retain(|a| a.account_id != account_id);
        self.preexisting.lock().unwrap().clear();
        Ok(())
    }
}

// ------------------------------------------------------- tokens, symbols

pub struct StaticTokens {
    pub fail: bool,
}

#[async_trait]
impl TokenProvider for StaticTokens {
    async fn get_valid_access_token(&self) -> Result<Token, DomainError> {
        if self.fail {
            return Err(DomainError::Authentication("refresh rejected".into()));
        }
        Ok(Token {
            access: "test-access".into(),
            refresh: Some("test-refresh".into()),
            expires_at: Some(Utc::now() + Duration::minutes(20)),
        })
    }
}

#[derive(Default)]
pub struct StaticSymbolMap {
    pub map: SymbolMap,
    pub fail: bool,
}

impl StaticSymbolMap {
    pub fn with(entries: &[(&str, &str)]) -> Self {
        Self {
            map: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            fail: false,
        }
    }
}

impl SymbolMapSource for StaticSymbolMap {
    fn load(&self) -> Result<SymbolMap, DomainError> {
        if self.fail {
            return Err(DomainError::Configuration("invalid mapping YAML".into()));
        }
        Ok(self.map.clone())
    }
}

// -------------------------------------------------------------- run lock

#[derive(Default)]
pub struct MemoryRunLock {
    pub holder: Mutex<Option<String>>,
    pub releases: AtomicUsize,
}

impl RunLock for MemoryRunLock {
    fn try_acquire(&self, holder: &str) -> Result<Option<String>, DomainError> {
        let mut current = self.holder.lock().unwrap();
        if let Some(existing) = current.as_ref() {
            return Ok(Some(existing.clone()));
        }
        *current = Some(holder.to_string());
        Ok(None)
    }

    fn release(&self, holder: &str) -> Result<(), DomainError> {
        let mut current = self.holder.lock().unwrap();
        if current.as_deref() == Some(holder) {
            *current = None;
        }
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ----------------------------------------------------------------- setup

pub struct Harness {
    pub app: SaxoFolio,
    pub broker: Arc<FakeBroker>,
    pub tracker: Arc<FakeTracker>,
    pub lock: Arc<MemoryRunLock>,
}

pub fn config() -> SyncConfig {
    SyncConfig::new(ACCOUNT_KEY, "Saxo Bank", "USD")
}

pub fn setup(broker: FakeBroker, tracker: FakeTracker) -> Harness {
    setup_with(broker, tracker, StaticSymbolMap::default(), config())
}

pub fn setup_with(
    broker: FakeBroker,
    tracker: FakeTracker,
    symbols: StaticSymbolMap,
    config: SyncConfig,
) -> Harness {
    let broker = Arc::new(broker);
    let tracker = Arc::new(tracker);
    let lock = Arc::new(MemoryRunLock::default());
    let app = SaxoFolio::with_providers(
        broker.clone(),
        tracker.clone(),
        Arc::new(StaticTokens { fail: false }),
        Arc::new(symbols),
        lock.clone(),
        config,
    );
    Harness {
        app,
        broker,
        tracker,
        lock,
    }
}
