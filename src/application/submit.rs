use crate::domain::entities::activity::Activity;
use crate::domain::ports::portfolio_tracker::PortfolioTracker;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Outcome of importing one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub chunk_index: usize,
    pub submitted_count: usize,
    pub success: bool,
    pub error: Option<String>,
}

/// Imports activities in fixed-size chunks, one request per chunk,
/// strictly in sequence. A failed chunk is recorded and the next one is
/// still attempted. Nothing is retried here: failed activities stay absent
/// from the tracker and are offered again by the next run.
pub struct BatchSubmitter {
    tracker: Arc<dyn PortfolioTracker>,
}

impl BatchSubmitter {
    pub fn new(tracker: Arc<dyn PortfolioTracker>) -> Self {
        Self { tracker }
    }

    pub async fn submit(&self, activities: &[Activity], chunk_size: usize) -> Vec<ImportResult> {
        let chunk_size = chunk_size.max(1);
        let total_chunks = activities.len().div_ceil(chunk_size);
        let mut results = Vec::with_capacity(total_chunks);
        let mut imported = 0;

        for (chunk_index, chunk) in activities.chunks(chunk_size).enumerate() {
            let result = match self.tracker.bulk_import(chunk).await {
                Ok(()) => {
                    imported += chunk.len();
                    info!(
                        "Imported chunk {}/{}: {} activities (total: {}/{})",
                        chunk_index + 1,
                        total_chunks,
                        chunk.len(),
                        imported,
                        activities.len()
                    );
                    ImportResult {
                        chunk_index,
                        submitted_count: chunk.len(),
                        success: true,
                        error: None,
                    }
                }
                Err(e) => {
                    error!(
                        "Chunk {}/{} ({} activities) rejected: {e}",
                        chunk_index + 1,
                        total_chunks,
                        chunk.len()
                    );
                    ImportResult {
                        chunk_index,
                        submitted_count: chunk.len(),
                        success: false,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(result);
        }

        results
    }
}
