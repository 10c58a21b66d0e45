use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The tracker-side account that activities are imported into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedAccount {
    pub id: String,
    pub name: String,
    pub currency: String,
    pub platform_id: Option<String>,
}

/// Cash balance of the brokerage account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub cash: Decimal,
    pub currency: String,
}

/// A brokerage account visible to the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerAccount {
    pub account_key: String,
    pub account_id: String,
    pub currency: String,
    pub display_name: Option<String>,
}
