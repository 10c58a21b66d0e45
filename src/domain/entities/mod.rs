pub mod account;
pub mod activity;
pub mod instrument;
pub mod raw_position;
pub mod token;
