pub mod broker_client;
pub mod portfolio_tracker;
pub mod run_lock;
pub mod symbol_map;
pub mod token_provider;
