use crate::domain::values::asset_type::AssetType;
use serde::{Deserialize, Serialize};

/// Instrument reference data looked up by `(uic, asset_type)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentInfo {
    pub uic: u64,
    pub asset_type: AssetType,
    pub symbol: String,
    pub isin: Option<String>,
    pub description: String,
    pub currency: String,
}
