mod common;

use analysis::EngineState;
use common::{engine_with, immediate_config};
use event_bus::{AnalysisEvent, EngineEvent};
use serde_json::json;
use std::time::Duration;
use testing::HoverReply;

#[tokio::test]
async fn test_initialize_handshake_and_open() {
    let (engine, server) = engine_with(immediate_config(), |_| HoverReply::Null);
    assert_eq!(engine.state(), EngineState::Uninitialized);

    engine.initialize("puts 1").await.unwrap();

    assert_eq!(engine.state(), EngineState::Ready);
    assert_eq!(
        server.methods(),
        vec!["initialize", "initialized", "textDocument/didOpen"]
    );
    assert_eq!(server.document().as_deref(), Some("puts 1"));
}

#[tokio::test]
async fn test_waiters_are_released_by_ready() {
    let (engine, _server) = engine_with(immediate_config(), |_| HoverReply::Null);

    let waiter = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.wait_ready().await })
    };
    engine.initialize("").await.unwrap();

    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_second_initialize_does_not_repeat_handshake() {
    let (engine, server) = engine_with(immediate_config(), |_| HoverReply::Null);

    engine.initialize("a").await.unwrap();
    engine.initialize("b").await.unwrap();

    assert_eq!(server.method_count("initialize"), 1);
    assert_eq!(server.document().as_deref(), Some("a"));
}

#[tokio::test]
async fn test_failed_initialize_returns_to_uninitialized() {
    let (engine, server) = engine_with(immediate_config(), |_| HoverReply::Null);
    server.disconnect();

    assert!(engine.initialize("a").await.is_err());
    assert_eq!(engine.state(), EngineState::Uninitialized);
}

#[tokio::test]
async fn test_lifecycle_events_are_published() {
    let (engine, _server) = engine_with(immediate_config(), |_| HoverReply::Null);
    let mut receiver = engine.event_bus().subscribe();

    engine.initialize("").await.unwrap();

    let mut states = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        if let AnalysisEvent::Engine(EngineEvent::StateChanged(change)) = event {
            states.push(change.state);
        }
    }
    assert_eq!(states, vec!["initializing", "ready"]);
}

#[tokio::test]
async fn test_first_diagnostics_finish_initial_analysis() {
    let (engine, server) = engine_with(immediate_config(), |_| HoverReply::Null);
    engine.initialize("1 + ").await.unwrap();
    let mut receiver = engine.event_bus().subscribe();
    assert!(!engine.is_initial_analysis_finished());

    server
        .notify(
            "textDocument/publishDiagnostics",
            json!({
                "uri": "inmemory:///workspace/main.rb",
                "diagnostics": [{
                    "range": {
                        "start": {"line": 0, "character": 2},
                        "end": {"line": 0, "character": 3}
                    },
                    "severity": 1,
                    "message": "wrong argument type"
                }]
            }),
        )
        .await;

    match receiver.recv().await.unwrap() {
        AnalysisEvent::Engine(EngineEvent::InitialAnalysisFinished(_)) => {}
        other => panic!("unexpected event {other:?}"),
    }
    match receiver.recv().await.unwrap() {
        AnalysisEvent::DiagnosticsPublished(published) => {
            assert_eq!(published.source, "TypeProf");
            assert_eq!(published.markers.len(), 1);
            assert_eq!(published.markers[0].severity, "error");
            assert_eq!(published.markers[0].start_column, 3);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(engine.is_initial_analysis_finished());
}

#[tokio::test]
async fn test_syntax_check_publishes_markers() {
    let (engine, server) = engine_with(immediate_config(), |_| HoverReply::Null);
    engine.initialize("def x").await.unwrap();
    let mut receiver = engine.event_bus().subscribe();

    server
        .notify(
            "rubpad/syntaxCheck",
            json!({
                "valid": false,
                "diagnostics": [{
                    "range": {
                        "start": {"line": 0, "character": 0},
                        "end": {"line": 0, "character": 999}
                    },
                    "message": "unexpected end-of-input"
                }]
            }),
        )
        .await;
    server.notify("rubpad/syntaxCheck", json!({"valid": true})).await;

    let mut marker_counts = Vec::new();
    for _ in 0..2 {
        match receiver.recv().await.unwrap() {
            AnalysisEvent::DiagnosticsPublished(published) => {
                assert_eq!(published.source, "RubySyntax");
                marker_counts.push(published.markers.len());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }
    assert_eq!(marker_counts, vec![1, 0]);
    assert!(!engine.is_initial_analysis_finished());
}
