//! Shared lifecycle handle for the type server connection.
//!
//! One `EngineHandle` is created per server and cloned into every consumer.
//! It replaces ad hoc "is the server up yet" flags with a single watched
//! state plus a flag for the first diagnostics pass.

use chrono::Utc;
use event_bus::{
    AnalysisEvent, DiagnosticsPublished, EngineEvent, EngineStateChanged, EventBus,
    InitialAnalysisFinished,
};
use lsp_types::PublishDiagnosticsParams;
use protocol_client::{Notification, NotificationMethod, ProtocolClient};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::diagnostics::{
    DiagnosticMarker, SYNTAX_CHECK_SOURCE, SyntaxCheckParams, TYPE_PROFILER_SOURCE,
    markers_from_publish, markers_from_syntax_check,
};
use crate::errors::{AnalysisError, Result};
use crate::session::ServerSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
        }
    }
}

struct EngineInner {
    session: Arc<ServerSession>,
    event_bus: Arc<EventBus>,
    config: AnalysisConfig,
    state: watch::Sender<EngineState>,
    initial_analysis_finished: Arc<AtomicBool>,
}

#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<EngineInner>,
}

impl EngineHandle {
    pub fn new(
        client: Arc<ProtocolClient>,
        event_bus: Arc<EventBus>,
        config: AnalysisConfig,
    ) -> Result<Self> {
        let session = Arc::new(ServerSession::new(client, &config)?);
        let (state, _) = watch::channel(EngineState::Uninitialized);

        let handle = Self {
            inner: Arc::new(EngineInner {
                session,
                event_bus,
                config,
                state,
                initial_analysis_finished: Arc::new(AtomicBool::new(false)),
            }),
        };
        handle.register_diagnostics_handlers();
        Ok(handle)
    }

    pub fn session(&self) -> &Arc<ServerSession> {
        &self.inner.session
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.inner.event_bus
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.inner.config
    }

    pub fn state(&self) -> EngineState {
        *self.inner.state.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == EngineState::Ready
    }

    pub fn is_initial_analysis_finished(&self) -> bool {
        self.inner.initial_analysis_finished.load(Ordering::SeqCst)
    }

    /// Resolves once the engine is ready. Returns immediately if it already is.
    pub async fn wait_ready(&self) {
        let mut receiver = self.inner.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = receiver
            .wait_for(|state| *state == EngineState::Ready)
            .await;
    }

    /// Runs the handshake and opens the document. Concurrent and repeated
    /// calls wait for the first one instead of initializing twice.
    pub async fn initialize(&self, initial_text: &str) -> Result<()> {
        let claimed = self.inner.state.send_if_modified(|state| {
            if *state == EngineState::Uninitialized {
                *state = EngineState::Initializing;
                true
            } else {
                false
            }
        });
        if !claimed {
            let mut receiver = self.inner.state.subscribe();
            let settled = match receiver
                .wait_for(|state| *state != EngineState::Initializing)
                .await
            {
                Ok(state) => *state,
                Err(_) => EngineState::Uninitialized,
            };
            return match settled {
                EngineState::Ready => Ok(()),
                _ => Err(AnalysisError::NotReady),
            };
        }
        self.publish_state(EngineState::Initializing);

        match self.run_handshake(initial_text).await {
            Ok(()) => {
                self.set_state(EngineState::Ready);
                info!("Analysis server ready");
                Ok(())
            }
            Err(e) => {
                warn!("Analysis server initialization failed: {}", e);
                self.set_state(EngineState::Uninitialized);
                Err(e)
            }
        }
    }

    async fn run_handshake(&self, initial_text: &str) -> Result<()> {
        let session = self.session();
        session.initialize().await?;
        session.open_document(initial_text).await?;
        Ok(())
    }

    fn register_diagnostics_handlers(&self) {
        let client = self.session().client();

        let event_bus = Arc::clone(&self.inner.event_bus);
        let finished = Arc::clone(&self.inner.initial_analysis_finished);
        client.on_notification(
            NotificationMethod::PublishDiagnostics,
            move |notification: &Notification| {
                if !finished.swap(true, Ordering::SeqCst) {
                    info!("Initial analysis finished");
                    event_bus.send(&AnalysisEvent::Engine(
                        EngineEvent::InitialAnalysisFinished(InitialAnalysisFinished {
                            finished_at: Utc::now(),
                        }),
                    ));
                }

                match serde_json::from_value::<PublishDiagnosticsParams>(
                    notification.params.clone(),
                ) {
                    Ok(params) => publish_markers(
                        &event_bus,
                        TYPE_PROFILER_SOURCE,
                        markers_from_publish(&params),
                    ),
                    Err(e) => warn!("Ignoring malformed diagnostics notification: {}", e),
                }
            },
        );

        let event_bus = Arc::clone(&self.inner.event_bus);
        client.on_notification(
            NotificationMethod::SyntaxCheck,
            move |notification: &Notification| {
                match serde_json::from_value::<SyntaxCheckParams>(notification.params.clone()) {
                    Ok(params) => publish_markers(
                        &event_bus,
                        SYNTAX_CHECK_SOURCE,
                        markers_from_syntax_check(&params),
                    ),
                    Err(e) => warn!("Ignoring malformed syntax check notification: {}", e),
                }
            },
        );
    }

    fn set_state(&self, state: EngineState) {
        self.inner.state.send_replace(state);
        self.publish_state(state);
    }

    fn publish_state(&self, state: EngineState) {
        self.inner
            .event_bus
            .send(&AnalysisEvent::Engine(EngineEvent::StateChanged(
                EngineStateChanged {
                    state: state.as_str().to_string(),
                    changed_at: Utc::now(),
                },
            )));
    }

    pub(crate) fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(AnalysisError::NotReady)
        }
    }
}

fn publish_markers(event_bus: &EventBus, source: &str, markers: Vec<DiagnosticMarker>) {
    event_bus.send(&AnalysisEvent::DiagnosticsPublished(DiagnosticsPublished {
        source: source.to_string(),
        markers: markers.iter().map(DiagnosticMarker::to_ts).collect(),
        published_at: Utc::now(),
    }));
}
