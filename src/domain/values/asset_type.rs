use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Saxo asset type code. Scopes a UIC: the same number can name
/// different instruments under different asset types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssetType {
    Stock,
    Etf,
    Etc,
    Etn,
    Bond,
    MutualFund,
    CfdOnStock,
    CfdOnEtf,
    FxSpot,
    Other(String),
}

impl AssetType {
    pub fn as_str(&self) -> &str {
        match self {
            AssetType::Stock => "Stock",
            AssetType::Etf => "Etf",
            AssetType::Etc => "Etc",
            AssetType::Etn => "Etn",
            AssetType::Bond => "Bond",
            AssetType::MutualFund => "MutualFund",
            AssetType::CfdOnStock => "CfdOnStock",
            AssetType::CfdOnEtf => "CfdOnEtf",
            AssetType::FxSpot => "FxSpot",
            AssetType::Other(s) => s,
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AssetType::from(s.to_string()))
    }
}

impl From<String> for AssetType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Stock" => AssetType::Stock,
            "Etf" => AssetType::Etf,
            "Etc" => AssetType::Etc,
            "Etn" => AssetType::Etn,
            "Bond" => AssetType::Bond,
            "MutualFund" => AssetType::MutualFund,
            "CfdOnStock" => AssetType::CfdOnStock,
            "CfdOnEtf" => AssetType::CfdOnEtf,
            "FxSpot" => AssetType::FxSpot,
            _ => AssetType::Other(s),
        }
    }
}

impl From<AssetType> for String {
    fn from(a: AssetType) -> Self {
        a.as_str().to_string()
    }
}
