use chrono::Utc;
use event_bus::types::method_state::TSMethodState;
use event_bus::{AnalysisEvent, AnalysisUpdated, EventBus};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::types::ResolutionState;

/// Latest resolution state per method name, in first-seen order.
pub struct AnalysisStore {
    methods: IndexMap<String, ResolutionState>,
    first_scan_done: bool,
    event_bus: Arc<EventBus>,
}

impl AnalysisStore {
    pub fn new(event_bus: Arc<EventBus>) -> Self {
        Self {
            methods: IndexMap::new(),
            first_scan_done: false,
            event_bus,
        }
    }

    pub fn set(&mut self, name: impl Into<String>, state: ResolutionState) {
        self.methods.insert(name.into(), state);
    }

    pub fn get(&self, name: &str) -> Option<&ResolutionState> {
        self.methods.get(name)
    }

    pub fn get_all(&self) -> Vec<ResolutionState> {
        self.methods.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Drops every entry whose name is not in `names`. Returns whether
    /// anything was removed.
    pub fn keep_only(&mut self, names: &HashSet<String>) -> bool {
        let before = self.methods.len();
        self.methods.retain(|name, _| names.contains(name));
        before != self.methods.len()
    }

    pub fn first_scan_done(&self) -> bool {
        self.first_scan_done
    }

    pub fn set_first_scan_done(&mut self, done: bool) {
        self.first_scan_done = done;
    }

    pub fn snapshot(&self) -> AnalysisUpdated {
        AnalysisUpdated {
            methods: self.methods.values().map(to_ts_method_state).collect(),
            first_scan_done: self.first_scan_done,
            updated_at: Utc::now(),
        }
    }

    /// Publishes the complete current state.
    pub fn notify(&self) {
        debug!(
            "Publishing analysis snapshot with {} methods (first scan done: {})",
            self.methods.len(),
            self.first_scan_done
        );
        self.event_bus
            .send(&AnalysisEvent::AnalysisUpdated(self.snapshot()));
    }
}

pub fn to_ts_method_state(state: &ResolutionState) -> TSMethodState {
    let info = state.info.as_ref();
    let documentation = info.and_then(|info| info.documentation.as_ref());
    TSMethodState {
        name: state.name.clone(),
        line: state.line,
        col: state.col,
        status: state.status.as_str().to_string(),
        class_name: info.map(|info| info.class_name.clone()),
        url: documentation.map(|doc| doc.url.clone()),
        separator: documentation.map(|doc| doc.separator.clone()),
    }
}
