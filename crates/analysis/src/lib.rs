//! # Analysis
//!
//! Keeps a live map from method call sites in the edited document to the
//! class of their receiver, as reported by an out-of-process type server.
//!
//! ```text
//! edit ─▶ DirtyTracker + LineCache ─▶ (debounce) ─▶ Scanner
//!                                                      │
//!           EventBus ◀── AnalysisStore ◀── RetryResolver ◀┘
//!                                              │
//!                                      ResolutionEngine ─▶ ServerSession ─▶ ProtocolClient
//! ```
//!
//! [`AnalysisCoordinator`] drives the whole pipeline; [`EngineHandle`] is the
//! shared lifecycle of the server connection.

pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod document;
pub mod engine;
pub mod errors;
pub mod hover;
pub mod resolution;
pub mod retry;
pub mod scanner;
pub mod session;
pub mod store;
pub mod tracker;
pub mod types;

pub use config::{AnalysisConfig, RetryConfig};
pub use coordinator::{AnalysisCoordinator, ScanSummary};
pub use engine::{EngineHandle, EngineState};
pub use errors::{AnalysisError, Result, TrackerError};
pub use resolution::ResolutionEngine;
pub use retry::{ResolutionPhase, RetryResolver};
pub use scanner::Scanner;
pub use store::AnalysisStore;
pub use tracker::{DirtyTracker, LineCache};
pub use types::{
    ChangeEvent, ContentChange, DocumentationLink, DocumentationLookup, LineRange, Occurrence,
    ResolutionState, ResolutionStatus, ResolvedInfo,
};
