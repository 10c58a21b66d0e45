use crate::domain::error::DomainError;
use std::collections::HashMap;

/// Manual symbol overrides keyed by the brokerage's raw symbol.
pub type SymbolMap = HashMap<String, String>;

/// Source of the manual mapping table. Read at the start of every run so
/// edits apply without a restart.
pub trait SymbolMapSource: Send + Sync {
    fn load(&self) -> Result<SymbolMap, DomainError>;
}
