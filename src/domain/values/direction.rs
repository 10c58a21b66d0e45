use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Side of a brokerage position as reported by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => write!(f, "Buy"),
            Direction::Sell => write!(f, "Sell"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" => Ok(Direction::Buy),
            "sell" => Ok(Direction::Sell),
            _ => Err(format!("Unknown direction: {s}")),
        }
    }
}

/// Activity type in the portfolio tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActivityType {
    Buy,
    Sell,
}

impl From<Direction> for ActivityType {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Buy => ActivityType::Buy,
            Direction::Sell => ActivityType::Sell,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityType::Buy => write!(f, "BUY"),
            ActivityType::Sell => write!(f, "SELL"),
        }
    }
}
