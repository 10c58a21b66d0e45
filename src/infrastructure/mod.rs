pub mod config;
pub mod ghostfolio;
pub mod saxo;
pub mod sqlite;
pub mod telemetry;
