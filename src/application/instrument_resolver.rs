//! Instrument resolution: picks the tradable symbol for a position.
//!
//! Priority, first success wins:
//! 1. ISIN, from the position payload or the instrument lookup
//! 2. manual mapping entry keyed by the raw brokerage symbol
//! 3. looked-up symbol with its exchange suffix stripped (`QUBT:xnas` → `QUBT`)
//! 4. synthesized `SAXO{uic}`
//!
//! Lookups go through a run-scoped [`InstrumentCache`], so each
//! `(uic, asset_type)` costs at most one request per run.

use crate::domain::entities::instrument::InstrumentInfo;
use crate::domain::entities::raw_position::RawPosition;
use crate::domain::ports::broker_client::BrokerClient;
use crate::domain::ports::symbol_map::SymbolMap;
use crate::domain::values::asset_type::AssetType;
use crate::domain::values::data_source::DataSource;
use crate::domain::values::symbol_resolution::{ResolutionSource, SymbolResolution};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Strip everything from the first colon on. Symbols without a colon are
/// returned unchanged.
pub fn strip_exchange_suffix(symbol: &str) -> &str {
    match symbol.find(':') {
        Some(idx) => &symbol[..idx],
        None => symbol,
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Lookup results for one run. Failed lookups are cached as `None` so a
/// broken instrument is not re-requested for every position on it.
#[derive(Debug, Default)]
pub struct InstrumentCache {
    entries: HashMap<(u64, AssetType), Option<InstrumentInfo>>,
    lookups: usize,
}

impl InstrumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lookup requests issued through this cache.
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct InstrumentResolver {
    broker: Arc<dyn BrokerClient>,
}

impl InstrumentResolver {
    pub fn new(broker: Arc<dyn BrokerClient>) -> Self {
        Self { broker }
    }

    async fn instrument(
        &self,
        uic: u64,
        asset_type: &AssetType,
        cache: &mut InstrumentCache,
    ) -> Option<InstrumentInfo> {
        let key = (uic, asset_type.clone());
        if let Some(cached) = cache.entries.get(&key) {
            return cached.clone();
        }

        cache.lookups += 1;
        let info = match self.broker.fetch_instrument_details(uic, asset_type).await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(uic, asset_type = %asset_type, "instrument lookup failed: {e}");
                None
            }
        };
        cache.entries.insert(key, info.clone());
        info
    }

    /// Resolve the symbol for `position`. Never fails: an unresolvable
    /// instrument degrades to the synthesized fallback.
    pub async fn resolve(
        &self,
        position: &RawPosition,
        manual_map: &SymbolMap,
        cache: &mut InstrumentCache,
    ) -> SymbolResolution {
        if let Some(isin) = non_empty(position.isin.as_deref()) {
            return SymbolResolution {
                symbol: isin.to_string(),
                isin: Some(isin.to_string()),
                source: ResolutionSource::Isin,
                data_source: DataSource::Yahoo,
            };
        }

        let info = self
            .instrument(position.uic, &position.asset_type, cache)
            .await;

        if let Some(isin) = non_empty(info.as_ref().and_then(|i| i.isin.as_deref())) {
            return SymbolResolution {
                symbol: isin.to_string(),
                isin: Some(isin.to_string()),
                source: ResolutionSource::Isin,
                data_source: DataSource::Yahoo,
            };
        }

        let raw_symbol = non_empty(position.symbol_hint.as_deref())
            .or_else(|| non_empty(info.as_ref().map(|i| i.symbol.as_str())));

        if let Some(raw) = raw_symbol {
            let mapped = manual_map
                .get(raw)
                .or_else(|| manual_map.get(strip_exchange_suffix(raw)))
                .map(|s| s.trim())
                .filter(|s| !s.is_empty());
            if let Some(mapped) = mapped {
                debug!(raw, mapped, "symbol from manual mapping");
                return SymbolResolution {
                    symbol: mapped.to_string(),
                    isin: None,
                    source: ResolutionSource::ManualMapping,
                    data_source: DataSource::Yahoo,
                };
            }
        }

        if let Some(looked_up) = info
            .as_ref()
            .map(|i| strip_exchange_suffix(i.symbol.trim()))
            .filter(|s| !s.is_empty())
        {
            return SymbolResolution {
                symbol: looked_up.to_string(),
                isin: None,
                source: ResolutionSource::Lookup,
                data_source: DataSource::Yahoo,
            };
        }

        warn!(
            uic = position.uic,
            position_id = %position.position_id,
            "no symbol for instrument, using SAXO{} fallback",
            position.uic
        );
        SymbolResolution::fallback(position.uic, None)
    }
}
