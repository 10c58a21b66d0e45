pub mod accounts;
pub mod activities;
pub mod dedup;
pub mod instrument_resolver;
pub mod normalize;
pub mod submit;
pub mod sync;
