//! # Analysis Event Bus
//!
//! The event bus broadcasts structured information about what the analysis
//! engine has accomplished, so presentation layers (method lists, hover
//! cards, diagnostics gutters) can react without polling.
//!
//! ## Event Flow Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────┐    ┌─────────────────┐
//! │   Engine        │    │  Event Bus   │    │   Consumers     │
//! │                 │───▶│  (Broadcast) │───▶│   • Method list │
//! │ • Lifecycle     │    │              │    │   • Context     │
//! │ • Scan passes   │    │              │    │     panel       │
//! │ • Diagnostics   │    │              │    │   • CLI         │
//! └─────────────────┘    └──────────────┘    └─────────────────┘
//! ```
//!
//! Every `AnalysisUpdated` event carries the complete store snapshot;
//! consumers must never assume partial updates.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast::{self, Sender};
use ts_rs::TS;

use crate::types::{diagnostic::TSDiagnosticMarker, method_state::TSMethodState};
pub mod types;

const EVENT_BUS_CAPACITY: usize = 1024;

#[derive(Clone, Debug, Serialize, TS)]
#[ts(export, export_to = "../../../bindings/events.ts")]
#[serde(tag = "type", content = "payload")]
pub enum AnalysisEvent {
    Engine(EngineEvent),
    AnalysisUpdated(AnalysisUpdated),
    DiagnosticsPublished(DiagnosticsPublished),
}

#[derive(Clone, Debug, Serialize, TS)]
#[ts(export, export_to = "../../../bindings/events.ts")]
#[serde(tag = "status")]
pub enum EngineEvent {
    StateChanged(EngineStateChanged),
    InitialAnalysisFinished(InitialAnalysisFinished),
}

#[derive(Clone, Debug, Serialize, TS)]
#[ts(export, export_to = "../../../bindings/events.ts")]
pub struct EngineStateChanged {
    /// One of `uninitialized`, `initializing`, `ready`.
    pub state: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, TS)]
#[ts(export, export_to = "../../../bindings/events.ts")]
pub struct InitialAnalysisFinished {
    pub finished_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, TS)]
#[ts(export, export_to = "../../../bindings/events.ts")]
pub struct AnalysisUpdated {
    pub methods: Vec<TSMethodState>,
    pub first_scan_done: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, TS)]
#[ts(export, export_to = "../../../bindings/events.ts")]
pub struct DiagnosticsPublished {
    /// Marker owner, e.g. `TypeProf` or `RubySyntax`.
    pub source: String,
    pub markers: Vec<TSDiagnosticMarker>,
    pub published_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct EventBus {
    sender: Sender<AnalysisEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { sender }
    }

    pub fn send(&self, event: &AnalysisEvent) {
        if self.sender.send(event.clone()).is_err() {
            // No subscribers yet; the next snapshot supersedes this one anyway.
            tracing::debug!("No receivers for event bus, ignoring event: {:?}", &event);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
