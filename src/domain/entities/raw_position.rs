use crate::domain::values::asset_type::AssetType;
use crate::domain::values::direction::Direction;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A position exactly as the brokerage reports it. Open positions have
/// no close fields; closed positions carry both.
///
/// `quantity` and `currency` are optional because the source payload can
/// omit them; the normalizer rejects such records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPosition {
    pub position_id: String,
    pub uic: u64,
    pub asset_type: AssetType,
    pub direction: Direction,
    pub quantity: Option<Decimal>,
    pub open_price: Option<Decimal>,
    pub close_price: Option<Decimal>,
    pub trade_cost: Option<Decimal>,
    pub currency: Option<String>,
    pub open_date: DateTime<Utc>,
    pub close_date: Option<DateTime<Utc>>,
    /// Symbol from the payload's display block, e.g. `QUBT:xnas`.
    pub symbol_hint: Option<String>,
    pub isin: Option<String>,
}
