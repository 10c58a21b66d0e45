use crate::domain::error::DomainError;
use crate::domain::ports::symbol_map::{SymbolMap, SymbolMapSource};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct MappingFile {
    #[serde(default)]
    symbol_mapping: Option<SymbolMap>,
}

/// Manual symbol overrides read from a YAML file:
///
/// ```yaml
/// symbol_mapping:
///   "QUBT:xnas": QUBT
/// ```
///
/// A missing file is an empty map. Read and parse failures are errors; the
/// sync treats them as recoverable.
pub struct YamlSymbolMap {
    path: PathBuf,
}

impl YamlSymbolMap {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

pub fn parse_mapping(yaml: &str) -> Result<SymbolMap, DomainError> {
    if yaml.trim().is_empty() {
        return Ok(SymbolMap::new());
    }
    let file: MappingFile = serde_yaml_bw::from_str(yaml)
        .map_err(|e| DomainError::Configuration(format!("invalid mapping YAML: {e}")))?;
    Ok(file
        .symbol_mapping
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect())
}

impl SymbolMapSource for YamlSymbolMap {
    fn load(&self) -> Result<SymbolMap, DomainError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No mapping file, using empty map");
            return Ok(SymbolMap::new());
        }

        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            DomainError::Configuration(format!(
                "cannot read mapping file {}: {e}",
                self.path.display()
            ))
        })?;

        let map = parse_mapping(&contents)?;
        debug!(path = %self.path.display(), entries = map.len(), "Loaded symbol mapping");
        Ok(map)
    }
}
