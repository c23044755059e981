//! Bounded per-item forecaster cache.
//!
//! Training dominates per-item latency, so trained forecasters are kept
//! keyed by item id. Eviction is insertion-order (oldest first); re-inserting
//! an id refreshes its position.

use stocksense_forecast::DemandForecaster;

#[derive(Debug, Clone)]
pub struct ForecasterCache {
    capacity: usize,
    entries: Vec<(String, DemandForecaster)>,
}

impl ForecasterCache {
    /// A capacity of 0 disables caching entirely.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, item_id: &str) -> bool {
        self.entries.iter().any(|(id, _)| id == item_id)
    }

    #[must_use]
    pub fn get(&self, item_id: &str) -> Option<&DemandForecaster> {
        self.entries
            .iter()
            .find(|(id, _)| id == item_id)
            .map(|(_, forecaster)| forecaster)
    }

    /// Inserts a trained forecaster, evicting the oldest entry when full.
    pub fn insert(&mut self, item_id: impl Into<String>, forecaster: DemandForecaster) {
        let item_id = item_id.into();
        self.invalidate(&item_id);
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity {
            self.entries.remove(0);
        }
        self.entries.push((item_id, forecaster));
    }

    /// Drops an item's cached forecaster; returns whether one was present.
    pub fn invalidate(&mut self, item_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(id, _)| id != item_id);
        self.entries.len() != before
    }
}
