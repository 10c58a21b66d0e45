use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Saxo account netting mode, which decides what a sync fetches.
///
/// - `EndOfDay`: trades are netted overnight and surface as closed
///   positions; the sync imports closed positions.
/// - `Intraday`: trades surface as open positions; the sync imports
///   open positions with their open date and price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NettingMode {
    #[default]
    EndOfDay,
    Intraday,
}

impl fmt::Display for NettingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NettingMode::EndOfDay => write!(f, "endofday"),
            NettingMode::Intraday => write!(f, "intraday"),
        }
    }
}

impl FromStr for NettingMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "endofday" | "eod" | "closed" => Ok(NettingMode::EndOfDay),
            "intraday" | "open" => Ok(NettingMode::Intraday),
            _ => Err(format!("Unknown netting mode: {s}")),
        }
    }
}
