use crate::domain::entities::activity::{Activity, ExistingActivity};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Position ids already present in the tracker for one account.
/// Rebuilt from a full listing every run.
#[derive(Debug, Default, Clone)]
pub struct DedupIndex {
    ids: HashSet<String>,
}

impl DedupIndex {
    /// Scrape ids from existing activity comments. Activities without a
    /// token (manual or legacy entries) are skipped.
    pub fn build(existing: &[ExistingActivity]) -> Self {
        let ids = existing
            .iter()
            .filter_map(|a| a.position_id())
            .map(str::to_string)
            .collect();
        Self { ids }
    }

    pub fn contains(&self, position_id: &str) -> bool {
        self.ids.contains(position_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub new: Vec<Activity>,
    /// Already in the tracker.
    pub existing: usize,
    /// Repeated within this batch.
    pub repeated: usize,
}

impl FilterOutcome {
    pub fn duplicates(&self) -> usize {
        self.existing + self.repeated
    }
}

/// Keep candidates whose position id is neither in `index` nor seen
/// earlier in the same batch. Order is preserved.
pub fn filter_new(candidates: Vec<Activity>, index: &DedupIndex) -> FilterOutcome {
    let mut seen = HashSet::new();
    let mut outcome = FilterOutcome::default();

    for activity in candidates {
        let Some(id) = activity.position_id().map(str::to_string) else {
            warn!(symbol = %activity.symbol, "activity has no position id token, importing as new");
            outcome.new.push(activity);
            continue;
        };

        if index.contains(&id) {
            debug!(position_id = %id, "already imported");
            outcome.existing += 1;
        } else if !seen.insert(id.clone()) {
            debug!(position_id = %id, "repeated within batch");
            outcome.repeated += 1;
        } else {
            outcome.new.push(activity);
        }
    }

    outcome
}
