pub mod client;

pub use client::GhostfolioClient;
