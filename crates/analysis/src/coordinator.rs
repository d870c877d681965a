//! Debounced scan passes over the live document.
//!
//! Edits are applied to the tracker and cache synchronously. A debounce
//! timer (reset on every edit) then wakes a single scan worker. Every pass,
//! whether started by the worker, by [`AnalysisCoordinator::start`] or by
//! [`AnalysisCoordinator::run_scan_pass`], holds the pass gate, so passes
//! never overlap and a pass that is already resolving is never aborted.
//! Staleness from edits that land mid-pass is reconciled by `keep_only`.
//!
//! Within a pass the occurrences are resolved concurrently. Hover and probe
//! sequences are still serialised by the session; only retry delays overlap,
//! so a pass costs about one retry budget however many names stay unknown.

use event_bus::{AnalysisEvent, EventBus};
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::EngineHandle;
use crate::errors::{AnalysisError, Result};
use crate::resolution::ResolutionEngine;
use crate::retry::RetryResolver;
use crate::scanner::Scanner;
use crate::store::AnalysisStore;
use crate::tracker::{DirtyTracker, LineCache};
use crate::types::{ChangeEvent, DocumentationLookup, Occurrence, ResolutionState, ResolvedInfo};

const SCAN_TRIGGER_CAPACITY: usize = 16;

/// What one scan pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub scanned_lines: usize,
    pub resolved: usize,
    pub unknown: usize,
    pub removed: bool,
    pub notified: bool,
}

struct TrackingState {
    tracker: DirtyTracker,
    cache: LineCache,
    lines: Vec<String>,
}

struct CoordinatorInner {
    engine: EngineHandle,
    resolver: RetryResolver,
    scanner: Scanner,
    documentation: Option<Arc<dyn DocumentationLookup>>,
    tracking: Mutex<TrackingState>,
    store: Mutex<AnalysisStore>,
    pass_gate: tokio::sync::Mutex<()>,
}

pub struct AnalysisCoordinator {
    inner: Arc<CoordinatorInner>,
    debounce: Mutex<Option<JoinHandle<()>>>,
    scan_trigger: mpsc::Sender<()>,
    cancellation_token: CancellationToken,
}

impl AnalysisCoordinator {
    /// Spawns the scan worker; must be called inside a tokio runtime.
    pub fn new(engine: EngineHandle, documentation: Option<Arc<dyn DocumentationLookup>>) -> Self {
        let resolver = RetryResolver::new(
            ResolutionEngine::new(Arc::clone(engine.session())),
            engine.config().retry.clone(),
        );
        let store = AnalysisStore::new(Arc::clone(engine.event_bus()));

        let inner = Arc::new(CoordinatorInner {
            engine,
            resolver,
            scanner: Scanner::new(),
            documentation,
            tracking: Mutex::new(TrackingState {
                tracker: DirtyTracker::new(),
                cache: LineCache::default(),
                lines: Vec::new(),
            }),
            store: Mutex::new(store),
            pass_gate: tokio::sync::Mutex::new(()),
        });

        let (scan_trigger, scan_requests) = mpsc::channel(SCAN_TRIGGER_CAPACITY);
        let cancellation_token = CancellationToken::new();
        tokio::spawn(Self::scan_worker(
            Arc::clone(&inner),
            scan_requests,
            cancellation_token.clone(),
        ));

        Self {
            inner,
            debounce: Mutex::new(None),
            scan_trigger,
            cancellation_token,
        }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.inner.engine
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.event_bus().subscribe()
    }

    fn event_bus(&self) -> &Arc<EventBus> {
        self.inner.engine.event_bus()
    }

    /// Initializes the engine with `text` and runs the first full scan.
    pub async fn start(&self, text: &str) -> Result<ScanSummary> {
        self.load_text(text);
        self.inner.engine.initialize(text).await?;
        Ok(self.inner.run_scan_pass().await)
    }

    /// Applies an editor transaction. `new_text` is the document after the
    /// transaction and must agree with it line for line.
    pub fn on_document_change(&self, event: &ChangeEvent, new_text: &str) -> Result<()> {
        {
            let mut tracking = self.inner.tracking.lock();
            let TrackingState {
                tracker,
                cache,
                lines,
            } = &mut *tracking;

            tracker.process_change_event(event, cache)?;
            *lines = split_lines(new_text);
            if cache.len() != lines.len() {
                return Err(AnalysisError::CacheOutOfSync {
                    cache_len: cache.len(),
                    line_count: lines.len(),
                });
            }
        }

        self.inner.engine.session().update_document(new_text);
        self.schedule_scan();
        Ok(())
    }

    /// Treats `text` as an entirely new document: every line is rescanned.
    pub fn replace_document(&self, text: &str) {
        self.load_text(text);
        self.inner.engine.session().update_document(text);
        self.schedule_scan();
    }

    fn load_text(&self, text: &str) {
        let mut tracking = self.inner.tracking.lock();
        tracking.lines = split_lines(text);
        let line_count = tracking.lines.len();
        tracking.cache.reset(line_count);
        tracking.tracker.mark_all_dirty(line_count);
    }

    /// Runs a pass immediately instead of waiting for the debounce timer.
    /// Waits for a pass that is already running.
    pub async fn run_scan_pass(&self) -> ScanSummary {
        self.inner.run_scan_pass().await
    }

    /// Type of the expression at a cursor position, with retries and
    /// fallbacks. `None` means unknown.
    pub async fn resolve_at_cursor(&self, line: u32, col: u32) -> Option<String> {
        self.inner.engine.wait_ready().await;
        self.inner.resolver.resolve(line, col).await
    }

    pub async fn measure_value(
        &self,
        expression: &str,
        line: u32,
        col: u32,
    ) -> Result<Option<String>> {
        self.inner.engine.ensure_ready()?;
        self.inner
            .engine
            .session()
            .measure_value(expression, line, col)
            .await
    }

    pub fn snapshot(&self) -> Vec<ResolutionState> {
        self.inner.store.lock().get_all()
    }

    pub fn dirty_line_count(&self) -> usize {
        self.inner.tracking.lock().tracker.dirty_lines().len()
    }

    pub fn cached_line_count(&self) -> usize {
        self.inner.tracking.lock().cache.len()
    }

    /// Cached occurrences, in line order.
    pub fn cached_occurrences(&self) -> Vec<Occurrence> {
        self.inner
            .tracking
            .lock()
            .cache
            .occurrences()
            .cloned()
            .collect()
    }

    pub fn shutdown(&self) {
        if let Some(timer) = self.debounce.lock().take() {
            timer.abort();
        }
        self.cancellation_token.cancel();
    }

    /// Restarts the debounce window; only the last edit of a burst triggers a
    /// pass.
    fn schedule_scan(&self) {
        let mut debounce = self.debounce.lock();
        if let Some(timer) = debounce.take() {
            timer.abort();
        }

        let delay = self.inner.engine.config().debounce();
        let trigger = self.scan_trigger.clone();
        *debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if trigger.send(()).await.is_err() {
                debug!("Scan worker is gone, dropping scan trigger");
            }
        }));
    }

    async fn scan_worker(
        inner: Arc<CoordinatorInner>,
        mut scan_requests: mpsc::Receiver<()>,
        cancellation_token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                request = scan_requests.recv() => match request {
                    Some(()) => {
                        // Triggers queued behind a running pass collapse into one.
                        while scan_requests.try_recv().is_ok() {}
                        inner.run_scan_pass().await;
                    }
                    None => break,
                },
                _ = cancellation_token.cancelled() => {
                    info!("Scan worker shutting down");
                    break;
                }
            }
        }
    }
}

impl Drop for AnalysisCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl CoordinatorInner {
    async fn run_scan_pass(&self) -> ScanSummary {
        self.engine.wait_ready().await;
        let _pass = self.pass_gate.lock().await;

        let (scanned_lines, occurrences) = {
            let mut tracking = self.tracking.lock();
            let dirty = tracking.tracker.take_dirty_lines();
            let results = self.scanner.scan(&dirty, tracking.lines.as_slice());

            let mut occurrences = Vec::new();
            for (index, found) in results {
                occurrences.extend(found.iter().cloned());
                tracking.cache.set(index, found);
            }
            (dirty.len(), first_per_name(occurrences))
        };

        {
            let mut store = self.store.lock();
            for occurrence in &occurrences {
                store.set(
                    occurrence.name.clone(),
                    ResolutionState::pending(occurrence),
                );
            }
        }

        let resolutions = occurrences
            .iter()
            .map(|occurrence| self.resolve_occurrence(occurrence));
        let outcomes = join_all(resolutions).await;

        let mut summary = ScanSummary {
            scanned_lines,
            ..Default::default()
        };
        for resolved in outcomes {
            if resolved {
                summary.resolved += 1;
            } else {
                summary.unknown += 1;
            }
        }

        let current_names = self.tracking.lock().cache.names();
        let mut store = self.store.lock();
        summary.removed = store.keep_only(&current_names);
        let first_scan = !store.first_scan_done();
        store.set_first_scan_done(true);

        if !occurrences.is_empty() || summary.removed || first_scan {
            store.notify();
            summary.notified = true;
        }

        if summary.unknown > 0 {
            warn!(
                "Scan pass left {} of {} methods unresolved",
                summary.unknown,
                occurrences.len()
            );
        }
        debug!("Scan pass finished: {:?}", summary);
        summary
    }

    /// Resolves one occurrence and stores the outcome as soon as it is known.
    /// Returns whether the receiver class was found.
    async fn resolve_occurrence(&self, occurrence: &Occurrence) -> bool {
        let class_name = self.resolver.resolve(occurrence.line, occurrence.col).await;
        let resolved = class_name.is_some();
        let state = match class_name {
            Some(class_name) => {
                let documentation = self
                    .documentation
                    .as_ref()
                    .and_then(|lookup| lookup.resolve(&class_name, &occurrence.name));
                ResolutionState::resolved(
                    occurrence,
                    ResolvedInfo {
                        class_name,
                        documentation,
                    },
                )
            }
            None => ResolutionState::unknown(occurrence),
        };
        self.store.lock().set(occurrence.name.clone(), state);
        resolved
    }
}

/// Keeps the first occurrence of every name; the store holds one entry per
/// name.
fn first_per_name(occurrences: Vec<Occurrence>) -> Vec<Occurrence> {
    let mut seen = HashSet::new();
    occurrences
        .into_iter()
        .filter(|occurrence| seen.insert(occurrence.name.clone()))
        .collect()
}

fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_string).collect()
}
