pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

use crate::application::accounts::AccountsUseCase;
use crate::application::activities::ActivitiesUseCase;
use crate::application::sync::{SyncConfig, SyncReport, SyncUseCase};
use crate::domain::entities::account::BrokerAccount;
use crate::domain::entities::activity::ExistingActivity;
use crate::domain::error::DomainError;
use crate::domain::ports::broker_client::BrokerClient;
use crate::domain::ports::portfolio_tracker::PortfolioTracker;
use crate::domain::ports::run_lock::{RunLease, RunLock};
use crate::domain::ports::symbol_map::SymbolMapSource;
use crate::domain::ports::token_provider::{TokenProvider, TokenStore};
use crate::infrastructure::config::{Settings, YamlSymbolMap};
use crate::infrastructure::ghostfolio::GhostfolioClient;
use crate::infrastructure::saxo::callback::CallbackListener;
use crate::infrastructure::saxo::client::SaxoClient;
use crate::infrastructure::saxo::oauth::{OAuthCredentials, SaxoOAuth};
use crate::infrastructure::saxo::SaxoEnvironment;
use crate::infrastructure::sqlite::open_database;
use crate::infrastructure::sqlite::run_lock::SqliteRunLock;
use crate::infrastructure::sqlite::token_repo::SqliteTokenStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// How long `authorize` waits for the browser redirect.
const AUTHORIZE_TIMEOUT: Duration = Duration::from_secs(300);

pub struct SaxoFolio {
    sync_uc: SyncUseCase,
    activities_uc: ActivitiesUseCase,
    accounts_uc: AccountsUseCase,
    run_lock: Arc<dyn RunLock>,
    authorizer: Option<Arc<SaxoOAuth>>,
}

impl SaxoFolio {
    /// Wire the production adapters from `settings`.
    pub fn new(settings: &Settings) -> Result<Self, DomainError> {
        let environment = SaxoEnvironment::from_production_flag(settings.saxo_use_production);

        let token_store: Arc<dyn TokenStore> =
            Arc::new(SqliteTokenStore::new(open_database(&settings.db_path)?));
        let oauth = Arc::new(SaxoOAuth::new(
            OAuthCredentials {
                app_key: settings.saxo_app_key.clone(),
                app_secret: settings.saxo_app_secret.clone(),
                redirect_uri: settings.saxo_redirect_uri.clone(),
            },
            environment,
            token_store,
        ));
        if let Some(seed) = &settings.saxo_seed_token {
            oauth.seed(seed.clone())?;
        }

        let stale_after = chrono::Duration::from_std(settings.lock_stale_after)
            .map_err(|e| DomainError::Configuration(format!("LOCK_STALE_AFTER: {e}")))?;
        let run_lock: Arc<dyn RunLock> = Arc::new(SqliteRunLock::new(
            open_database(&settings.db_path)?,
            stale_after,
        ));

        let tokens: Arc<dyn TokenProvider> = oauth.clone();
        let broker: Arc<dyn BrokerClient> = Arc::new(SaxoClient::new(environment, tokens.clone()));
        let tracker: Arc<dyn PortfolioTracker> = Arc::new(GhostfolioClient::new(
            &settings.ghost_host,
            &settings.ghost_key,
            settings.ghost_platform.clone(),
        ));
        let symbols: Arc<dyn SymbolMapSource> =
            Arc::new(YamlSymbolMap::new(settings.mapping_file.clone()));

        let mut config = SyncConfig::new(
            &settings.saxo_account_key,
            &settings.ghost_account_name,
            &settings.ghost_currency,
        );
        config.netting_mode = settings.netting_mode;
        config.chunk_size = settings.chunk_size;

        let mut app = Self::with_providers(broker, tracker, tokens, symbols, run_lock, config);
        app.authorizer = Some(oauth);
        Ok(app)
    }

    /// Wire arbitrary port implementations. Interactive authorization is
    /// unavailable on an instance built this way.
    pub fn with_providers(
        broker: Arc<dyn BrokerClient>,
        tracker: Arc<dyn PortfolioTracker>,
        tokens: Arc<dyn TokenProvider>,
        symbols: Arc<dyn SymbolMapSource>,
        run_lock: Arc<dyn RunLock>,
        config: SyncConfig,
    ) -> Self {
        Self {
            activities_uc: ActivitiesUseCase::new(
                tracker.clone(),
                &config.account_name,
                &config.currency,
            ),
            accounts_uc: AccountsUseCase::new(broker.clone()),
            sync_uc: SyncUseCase::new(broker, tracker, tokens, symbols, config),
            run_lock,
            authorizer: None,
        }
    }

    /// Run one sync under the run marker. Fails with `RunInProgress`
    /// without touching either system when another run holds it.
    pub async fn sync(&self) -> Result<SyncReport, DomainError> {
        let lease = RunLease::acquire(self.run_lock.clone())?;
        info!(holder = lease.holder(), "Run marker acquired");
        let report = self.sync_uc.execute().await;
        drop(lease);
        Ok(report)
    }

    pub async fn list_activities(&self) -> Result<Vec<ExistingActivity>, DomainError> {
        self.activities_uc.list().await
    }

    /// Takes the run marker too, so a reset never interleaves with a sync.
    pub async fn delete_all_activities(&self) -> Result<(), DomainError> {
        let _lease = RunLease::acquire(self.run_lock.clone())?;
        self.activities_uc.delete_all().await
    }

    pub async fn accounts(&self) -> Result<Vec<BrokerAccount>, DomainError> {
        self.accounts_uc.list().await
    }

    /// Interactive OAuth authorization. `show_url` receives the URL the
    /// user has to open; the call then waits for the redirect and stores
    /// the resulting tokens.
    pub async fn authorize<F>(&self, show_url: F) -> Result<(), DomainError>
    where
        F: FnOnce(&str),
    {
        let oauth = self.authorizer.as_ref().ok_or_else(|| {
            DomainError::Configuration("interactive authorization is not configured".into())
        })?;

        let state = uuid::Uuid::new_v4().to_string();
        let url = oauth.authorization_url(&state)?;
        let listener = CallbackListener::bind(oauth.redirect_uri()).await?;

        show_url(&url);
        let code = listener.wait_for_code(&state, AUTHORIZE_TIMEOUT).await?;
        oauth.exchange_code(&code).await?;
        info!("Saxo authorization complete, tokens stored");
        Ok(())
    }
}
