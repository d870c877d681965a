mod common;

use analysis::ResolutionEngine;
use common::{immediate_config, ready_engine};
use std::sync::Arc;
use testing::HoverReply;
use tracing_test::traced_test;

#[tokio::test]
async fn test_receiver_signature_resolves_to_class() {
    let (engine, server) = ready_engine(immediate_config(), "name.upcase", |_| {
        HoverReply::markdown("String#upcase")
    })
    .await;
    let resolution = ResolutionEngine::new(Arc::clone(engine.session()));

    let type_name = resolution.resolve_at_position(1, 6).await;

    assert_eq!(type_name.as_deref(), Some("String"));
    let queries = server.hover_queries();
    assert_eq!(queries.len(), 1);
    assert_eq!((queries[0].line, queries[0].character), (0, 5));
}

#[tokio::test]
async fn test_symbol_literal_resolves_to_symbol() {
    let (engine, _server) =
        ready_engine(immediate_config(), "x = :upcase", |_| HoverReply::markdown(":upcase")).await;
    let resolution = ResolutionEngine::new(Arc::clone(engine.session()));

    assert_eq!(
        resolution.resolve_at_position(1, 6).await.as_deref(),
        Some("Symbol")
    );
}

#[tokio::test]
async fn test_fallback_columns_are_tried_in_order() {
    // Only the column two to the left of the cursor has an answer.
    let (engine, server) = ready_engine(immediate_config(), "items.first.", |query| {
        if query.character == 7 {
            HoverReply::markdown("Array[Integer]#first")
        } else {
            HoverReply::Null
        }
    })
    .await;
    let resolution = ResolutionEngine::new(Arc::clone(engine.session()));

    let type_name = resolution.resolve_at_position(1, 10).await;

    assert_eq!(type_name.as_deref(), Some("Array"));
    let characters: Vec<u32> = server.hover_queries().iter().map(|q| q.character).collect();
    assert_eq!(characters, vec![9, 8, 7]);
}

#[tokio::test]
async fn test_last_fallback_looks_right_of_cursor() {
    let (engine, server) = ready_engine(immediate_config(), "foo.bar", |query| {
        if query.character == 5 {
            HoverReply::markdown("Foo#bar")
        } else {
            HoverReply::Null
        }
    })
    .await;
    let resolution = ResolutionEngine::new(Arc::clone(engine.session()));

    assert_eq!(
        resolution.resolve_at_position(1, 5).await.as_deref(),
        Some("Foo")
    );
    let characters: Vec<u32> = server.hover_queries().iter().map(|q| q.character).collect();
    assert_eq!(characters, vec![4, 3, 2, 5]);
}

#[tokio::test]
async fn test_resolution_is_deterministic() {
    let script = |query: &testing::HoverQuery| match query.character {
        3 => HoverReply::markdown("Integer#times"),
        4 => HoverReply::markdown("Float#floor"),
        _ => HoverReply::Null,
    };

    let mut results = Vec::new();
    for _ in 0..3 {
        let (engine, _server) = ready_engine(immediate_config(), "10.times", script).await;
        let resolution = ResolutionEngine::new(Arc::clone(engine.session()));
        results.push(resolution.resolve_at_position(1, 6).await);
    }

    assert_eq!(results, vec![Some("Float".to_string()); 3]);
}

#[tokio::test]
async fn test_comment_guard_skips_server() {
    let (engine, server) = ready_engine(immediate_config(), "x = 1 # y.upcase", |_| {
        HoverReply::markdown("String#upcase")
    })
    .await;
    let resolution = ResolutionEngine::new(Arc::clone(engine.session()));

    assert_eq!(resolution.resolve_at_position(1, 12).await, None);
    assert!(server.hover_queries().is_empty());
}

#[traced_test]
#[tokio::test]
async fn test_server_error_becomes_none() {
    let (engine, server) = ready_engine(immediate_config(), "foo.bar", |_| {
        HoverReply::Error("boom".to_string())
    })
    .await;
    let resolution = ResolutionEngine::new(Arc::clone(engine.session()));

    assert_eq!(resolution.resolve_at_position(1, 5).await, None);
    // The first failure ends the sequence.
    assert_eq!(server.hover_queries().len(), 1);
    assert!(logs_contain("Resolution at 1:5 failed"));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_becomes_none() {
    let (engine, server) =
        ready_engine(immediate_config(), "foo.bar", |_| HoverReply::Silent).await;
    let resolution = ResolutionEngine::new(Arc::clone(engine.session()));

    assert_eq!(resolution.resolve_at_position(1, 5).await, None);
    assert_eq!(server.hover_queries().len(), 1);
    assert_eq!(engine.session().client().pending_request_count(), 0);
}

#[tokio::test]
async fn test_pending_edits_are_flushed_before_hover() {
    let (engine, server) = ready_engine(immediate_config(), "a", |query| {
        if query.document == "a.upcase" {
            HoverReply::markdown("String#upcase")
        } else {
            HoverReply::Null
        }
    })
    .await;
    engine.session().update_document("a.upcase");
    let resolution = ResolutionEngine::new(Arc::clone(engine.session()));

    assert_eq!(
        resolution.resolve_at_position(1, 3).await.as_deref(),
        Some("String")
    );
    assert_eq!(server.document().as_deref(), Some("a.upcase"));
}

#[tokio::test]
async fn test_probe_restores_live_document() {
    let live = "foo = 'x'\nfoo.";
    let (engine, server) = ready_engine(immediate_config(), live, |query| {
        if query.document.ends_with("foo ") {
            HoverReply::markdown("String")
        } else {
            HoverReply::Null
        }
    })
    .await;
    let resolution = ResolutionEngine::new(Arc::clone(engine.session()));

    let type_name = resolution.probe("foo = 'x'\nfoo ", 2, 3).await;

    assert_eq!(type_name.as_deref(), Some("String"));
    assert_eq!(server.document().as_deref(), Some(live));
    assert!(
        server
            .hover_queries()
            .iter()
            .all(|query| query.document == "foo = 'x'\nfoo ")
    );
}

#[tokio::test]
async fn test_probe_restores_live_document_after_failure() {
    let live = "foo.";
    let (engine, server) = ready_engine(immediate_config(), live, |_| {
        HoverReply::Error("server crashed".to_string())
    })
    .await;
    let resolution = ResolutionEngine::new(Arc::clone(engine.session()));

    assert_eq!(resolution.probe("foo ", 1, 3).await, None);
    assert_eq!(server.document().as_deref(), Some(live));
    assert!(!engine.session().document_text().is_empty());
}
