pub mod asset_type;
pub mod data_source;
pub mod direction;
pub mod netting_mode;
pub mod symbol_resolution;
