use crate::domain::values::data_source::DataSource;
use serde::Serialize;

/// Which rung of the resolution chain produced the symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Isin,
    ManualMapping,
    Lookup,
    Fallback,
}

/// The tradable identifier chosen for one position. Derived per run,
/// never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolResolution {
    pub symbol: String,
    pub isin: Option<String>,
    pub source: ResolutionSource,
    pub data_source: DataSource,
}

impl SymbolResolution {
    /// Synthesized identifier for an instrument nothing else could name.
    pub fn fallback(uic: u64, isin: Option<String>) -> Self {
        Self {
            symbol: format!("SAXO{uic}"),
            isin,
            source: ResolutionSource::Fallback,
            data_source: DataSource::Manual,
        }
    }
}
