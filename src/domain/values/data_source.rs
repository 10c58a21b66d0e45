use serde::{Deserialize, Serialize};
use std::fmt;

/// Market data provider the tracker uses to price an activity's symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataSource {
    Yahoo,
    Manual,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Yahoo => write!(f, "YAHOO"),
            DataSource::Manual => write!(f, "MANUAL"),
        }
    }
}
