#![allow(dead_code)]

use analysis::{AnalysisConfig, EngineHandle, RetryConfig};
use event_bus::{AnalysisEvent, AnalysisUpdated, EventBus};
use protocol_client::ProtocolClient;
use std::sync::Arc;
use testing::{HoverQuery, HoverReply, MockLanguageServer};
use tokio::sync::broadcast;

/// No waiting between attempts and no retries; fallbacks still run.
pub fn immediate_config() -> AnalysisConfig {
    AnalysisConfig {
        debounce_ms: 300,
        request_timeout_ms: 1_000,
        retry: RetryConfig {
            initial_delay_ms: 0,
            max_retries: 0,
            retry_delay_ms: 0,
        },
        ..Default::default()
    }
}

pub fn engine_with<F>(config: AnalysisConfig, hover: F) -> (EngineHandle, MockLanguageServer)
where
    F: FnMut(&HoverQuery) -> HoverReply + Send + 'static,
{
    let (transport, server) = MockLanguageServer::connect(hover);
    let client = Arc::new(ProtocolClient::with_request_timeout(
        transport,
        config.request_timeout(),
    ));
    let engine = EngineHandle::new(client, Arc::new(EventBus::new()), config).unwrap();
    (engine, server)
}

pub async fn ready_engine<F>(
    config: AnalysisConfig,
    text: &str,
    hover: F,
) -> (EngineHandle, MockLanguageServer)
where
    F: FnMut(&HoverQuery) -> HoverReply + Send + 'static,
{
    let (engine, server) = engine_with(config, hover);
    engine.initialize(text).await.unwrap();
    (engine, server)
}

/// Skips lifecycle and diagnostics events until the next store snapshot.
pub async fn next_snapshot(receiver: &mut broadcast::Receiver<AnalysisEvent>) -> AnalysisUpdated {
    loop {
        if let AnalysisEvent::AnalysisUpdated(update) = receiver.recv().await.unwrap() {
            return update;
        }
    }
}
