//! Request/response correlation over a single duplex channel.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::errors::{ProtocolError, Result};
use crate::message::{Envelope, Notification, NotificationMethod, Subscription};
use crate::transport::Transport;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

type PendingTable = DashMap<u64, oneshot::Sender<Result<Value>>>;
type NotificationCallback = Arc<dyn Fn(&Notification) + Send + Sync>;

#[derive(Default)]
struct NotificationHandlers {
    by_method: HashMap<NotificationMethod, Vec<NotificationCallback>>,
    wildcard: Vec<NotificationCallback>,
}

impl NotificationHandlers {
    /// Method handlers first, then wildcard handlers, each in registration order.
    fn handlers_for(&self, method: Option<&NotificationMethod>) -> Vec<NotificationCallback> {
        let mut handlers = Vec::new();
        if let Some(method_handlers) = method.and_then(|m| self.by_method.get(m)) {
            handlers.extend(method_handlers.iter().cloned());
        }
        handlers.extend(self.wildcard.iter().cloned());
        handlers
    }
}

/// Client half of the JSON-RPC conversation with the analysis server.
///
/// The client exclusively owns the channel: every higher layer must go
/// through it so request ids stay unique for the lifetime of the process.
pub struct ProtocolClient {
    next_id: AtomicU64,
    pending: Arc<PendingTable>,
    handlers: Arc<RwLock<NotificationHandlers>>,
    outbound: mpsc::Sender<String>,
    closed: Arc<AtomicBool>,
    request_timeout: Duration,
    cancellation_token: CancellationToken,
}

impl ProtocolClient {
    /// Must be called from within a tokio runtime; the inbound dispatch loop is
    /// spawned immediately.
    pub fn new(transport: Transport) -> Self {
        Self::with_request_timeout(transport, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_request_timeout(transport: Transport, request_timeout: Duration) -> Self {
        let Transport { outbound, inbound } = transport;
        let pending: Arc<PendingTable> = Arc::new(DashMap::new());
        let handlers = Arc::new(RwLock::new(NotificationHandlers::default()));
        let closed = Arc::new(AtomicBool::new(false));
        let cancellation_token = CancellationToken::new();

        tokio::spawn(Self::dispatch_loop(
            inbound,
            Arc::clone(&pending),
            Arc::clone(&handlers),
            Arc::clone(&closed),
            cancellation_token.clone(),
        ));

        Self {
            next_id: AtomicU64::new(0),
            pending,
            handlers,
            outbound,
            closed,
            request_timeout,
            cancellation_token,
        }
    }

    /// Sends a request and waits for the matching response.
    ///
    /// Responses may arrive in any order; each is matched by id.
    pub async fn send_request<P: Serialize>(&self, method: &str, params: P) -> Result<Value> {
        if self.is_closed() {
            return Err(ProtocolError::ChannelClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let payload = serde_json::to_string(&Envelope::request(
            id,
            method,
            serde_json::to_value(params)?,
        ))?;

        // Registered before sending so an immediate response cannot be missed.
        let (sender, receiver) = oneshot::channel();
        self.pending.insert(id, sender);

        trace!("Sending request {} ({})", id, method);
        if self.outbound.send(payload).await.is_err() {
            self.pending.remove(&id);
            return Err(ProtocolError::ChannelClosed);
        }

        match tokio::time::timeout(self.request_timeout, receiver).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ProtocolError::ChannelClosed),
            Err(_) => {
                self.pending.remove(&id);
                warn!("Request {} ({}) timed out", id, method);
                Err(ProtocolError::Timeout {
                    id,
                    method: method.to_string(),
                    timeout: self.request_timeout,
                })
            }
        }
    }

    /// Fire-and-forget message; no response is expected.
    pub async fn send_notification<P: Serialize>(&self, method: &str, params: P) -> Result<()> {
        if self.is_closed() {
            return Err(ProtocolError::ChannelClosed);
        }

        let payload = serde_json::to_string(&Envelope::notification(
            method,
            serde_json::to_value(params)?,
        ))?;

        trace!("Sending notification ({})", method);
        self.outbound
            .send(payload)
            .await
            .map_err(|_| ProtocolError::ChannelClosed)
    }

    pub fn on_notification<F>(&self, subscription: impl Into<Subscription>, callback: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let callback: NotificationCallback = Arc::new(callback);
        let mut handlers = self.handlers.write();
        match subscription.into() {
            Subscription::Method(method) => {
                handlers.by_method.entry(method).or_default().push(callback)
            }
            Subscription::Wildcard => handlers.wildcard.push(callback),
        }
    }

    pub fn pending_request_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stops the dispatch loop; waiting requests are rejected.
    pub fn shutdown(&self) {
        self.cancellation_token.cancel();
    }

    async fn dispatch_loop(
        mut inbound: mpsc::Receiver<String>,
        pending: Arc<PendingTable>,
        handlers: Arc<RwLock<NotificationHandlers>>,
        closed: Arc<AtomicBool>,
        cancellation_token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                message = inbound.recv() => match message {
                    Some(raw) => Self::handle_message(&raw, &pending, &handlers),
                    None => {
                        debug!("Inbound protocol channel closed");
                        break;
                    }
                },
                _ = cancellation_token.cancelled() => {
                    debug!("Protocol client shutting down");
                    break;
                }
            }
        }

        closed.store(true, Ordering::SeqCst);
        Self::reject_all_pending(&pending);
    }

    fn handle_message(
        raw: &str,
        pending: &PendingTable,
        handlers: &RwLock<NotificationHandlers>,
    ) {
        let envelope: Envelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                error!("Dropping malformed protocol message: {}", e);
                return;
            }
        };

        if let Some(id) = envelope.response_id() {
            if let Some((_, sender)) = pending.remove(&id) {
                let outcome = match envelope.error {
                    Some(error) => Err(ProtocolError::Server(error)),
                    None => Ok(envelope.result.unwrap_or(Value::Null)),
                };
                if sender.send(outcome).is_err() {
                    debug!("Caller of request {} is no longer waiting", id);
                }
                return;
            }
        }

        let notification = Notification::from(envelope);
        // Cloned out so handlers may register further handlers.
        let callbacks = handlers.read().handlers_for(notification.method.as_ref());
        trace!(
            "Dispatching notification {:?} to {} handlers",
            notification.method,
            callbacks.len()
        );
        for callback in callbacks {
            callback(&notification);
        }
    }

    fn reject_all_pending(pending: &PendingTable) {
        let ids: Vec<u64> = pending.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, sender)) = pending.remove(&id) {
                let _ = sender.send(Err(ProtocolError::ChannelClosed));
            }
        }
    }
}

impl Drop for ProtocolClient {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}
