use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::{timestamp::Timestamp, types::FormId};

/// Load state of a form's decision flow.
///
/// `Empty → Loading → {Loaded | Failed}`. A `Loaded` form goes back to
/// `Loading` only through an explicit reload or once its entry has expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum FlowState {
    #[default]
    Empty,
    Loading,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub form_id: FormId,
    pub html: String,
    pub fetched_at: Instant,
    /// Wall-clock time of the fetch, shown to the user.
    pub stamped_at: Timestamp,
}

impl CacheEntry {
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

/// One decision-flow document per form, expired lazily on access.
pub struct DecisionFlowCache {
    entries: DashMap<FormId, CacheEntry>,
    states: DashMap<FormId, FlowState>,
    ttl: Duration,
}

impl DecisionFlowCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            states: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The entry for `form_id` if it is younger than the TTL.
    pub fn fresh(&self, form_id: FormId) -> Option<CacheEntry> {
        self.entries
            .get(&form_id)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.value().clone())
    }

    /// The entry for `form_id` regardless of age.
    pub fn get(&self, form_id: FormId) -> Option<CacheEntry> {
        self.entries.get(&form_id).map(|entry| entry.value().clone())
    }

    /// Replaces any previous entry for the form.
    pub fn store(&self, form_id: FormId, html: String) -> CacheEntry {
        let entry = CacheEntry {
            form_id,
            html,
            fetched_at: Instant::now(),
            stamped_at: Timestamp::now(),
        };
        self.entries.insert(form_id, entry.clone());
        entry
    }

    pub fn invalidate(&self, form_id: FormId) -> bool {
        let removed = self.entries.remove(&form_id).is_some();
        if removed {
            self.states.insert(form_id, FlowState::Empty);
        }
        removed
    }

    pub fn state(&self, form_id: FormId) -> FlowState {
        self.states
            .get(&form_id)
            .map(|state| *state.value())
            .unwrap_or_default()
    }

    pub fn set_state(&self, form_id: FormId, state: FlowState) {
        self.states.insert(form_id, state);
    }
}
