mod common;

use analysis::{
    AnalysisConfig, AnalysisCoordinator, AnalysisError, ChangeEvent, ContentChange, DocumentationLink,
    DocumentationLookup, Occurrence, ResolutionStatus, TrackerError,
};
use common::{engine_with, immediate_config, next_snapshot};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use testing::{HoverQuery, HoverReply, MockLanguageServer};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::Instant;

fn coordinator_with<F>(hover: F) -> (AnalysisCoordinator, MockLanguageServer)
where
    F: FnMut(&HoverQuery) -> HoverReply + Send + 'static,
{
    let (engine, server) = engine_with(immediate_config(), hover);
    (AnalysisCoordinator::new(engine, None), server)
}

fn always_string(_: &HoverQuery) -> HoverReply {
    HoverReply::markdown("String#method")
}

fn method_names(methods: &[event_bus::types::method_state::TSMethodState]) -> Vec<&str> {
    methods.iter().map(|m| m.name.as_str()).collect()
}

#[tokio::test]
async fn test_start_resolves_whole_document() {
    let (coordinator, _server) = coordinator_with(|query| {
        if query.line == 1 {
            HoverReply::markdown("String#upcase")
        } else {
            HoverReply::Null
        }
    });
    let mut receiver = coordinator.subscribe();

    let summary = coordinator
        .start("name = 'x'\nname.upcase\n[1, 2].each do |i|\nend")
        .await
        .unwrap();

    assert_eq!(summary.scanned_lines, 4);
    assert_eq!(summary.resolved, 1);
    assert_eq!(summary.unknown, 1);
    assert!(summary.notified);

    let snapshot = next_snapshot(&mut receiver).await;
    assert!(snapshot.first_scan_done);
    assert_eq!(method_names(&snapshot.methods), vec!["upcase", "each"]);
    assert_eq!(snapshot.methods[0].status, "resolved");
    assert_eq!(snapshot.methods[0].class_name.as_deref(), Some("String"));
    assert_eq!(snapshot.methods[1].status, "unknown");

    let states = coordinator.snapshot();
    assert_eq!(states[1].status, ResolutionStatus::Unknown);
    assert_eq!((states[1].line, states[1].col), (3, 8));
}

#[tokio::test]
async fn test_empty_document_still_reports_first_scan() {
    let (coordinator, _server) = coordinator_with(always_string);
    let mut receiver = coordinator.subscribe();

    let summary = coordinator.start("").await.unwrap();

    assert!(summary.notified);
    let snapshot = next_snapshot(&mut receiver).await;
    assert!(snapshot.first_scan_done);
    assert!(snapshot.methods.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_edit_shifts_cache_and_rescans_after_debounce() {
    let (coordinator, server) = coordinator_with(always_string);
    coordinator.start("a.upcase\nb.downcase").await.unwrap();
    let mut receiver = coordinator.subscribe();

    coordinator
        .on_document_change(
            &ChangeEvent::single(ContentChange::new(1, 1, "x = 1\na.upcase")),
            "x = 1\na.upcase\nb.downcase",
        )
        .unwrap();

    assert_eq!(coordinator.cached_line_count(), 3);
    assert_eq!(coordinator.dirty_line_count(), 2);
    assert!(
        coordinator
            .cached_occurrences()
            .contains(&Occurrence::new("downcase", 3, 3))
    );

    tokio::time::sleep(Duration::from_millis(400)).await;
    let snapshot = next_snapshot(&mut receiver).await;

    assert_eq!(method_names(&snapshot.methods), vec!["upcase", "downcase"]);
    assert_eq!(snapshot.methods[0].line, 2);
    assert_eq!(coordinator.dirty_line_count(), 0);
    assert_eq!(
        server.document().as_deref(),
        Some("x = 1\na.upcase\nb.downcase")
    );
}

#[tokio::test(start_paused = true)]
async fn test_removed_line_drops_its_method() {
    let (coordinator, _server) = coordinator_with(always_string);
    coordinator.start("a.upcase\nb.downcase").await.unwrap();
    let mut receiver = coordinator.subscribe();

    coordinator
        .on_document_change(
            &ChangeEvent::single(ContentChange::new(1, 2, "a.upcase")),
            "a.upcase",
        )
        .unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    let snapshot = next_snapshot(&mut receiver).await;
    assert_eq!(method_names(&snapshot.methods), vec!["upcase"]);
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_edits_runs_one_pass() {
    let (coordinator, _server) = coordinator_with(always_string);
    coordinator.start("a.upcase").await.unwrap();
    let mut receiver = coordinator.subscribe();

    coordinator
        .on_document_change(
            &ChangeEvent::single(ContentChange::new(1, 1, "a.upcase\nb.strip")),
            "a.upcase\nb.strip",
        )
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    coordinator
        .on_document_change(
            &ChangeEvent::single(ContentChange::new(2, 2, "b.strip!")),
            "a.upcase\nb.strip!",
        )
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1000)).await;

    let snapshot = next_snapshot(&mut receiver).await;
    assert_eq!(method_names(&snapshot.methods), vec!["upcase", "strip!"]);
    assert!(matches!(receiver.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test(start_paused = true)]
async fn test_replace_document_rescans_everything() {
    let (coordinator, _server) = coordinator_with(always_string);
    coordinator.start("a.upcase").await.unwrap();
    let mut receiver = coordinator.subscribe();

    coordinator.replace_document("b.strip\nc.chomp");
    assert_eq!(coordinator.dirty_line_count(), 2);
    tokio::time::sleep(Duration::from_millis(400)).await;

    let snapshot = next_snapshot(&mut receiver).await;
    assert_eq!(method_names(&snapshot.methods), vec!["strip", "chomp"]);
}

#[tokio::test(start_paused = true)]
async fn test_unresolvable_names_share_one_retry_budget() {
    let (engine, _server) = engine_with(AnalysisConfig::default(), |_| HoverReply::Null);
    let coordinator = AnalysisCoordinator::new(engine, None);
    let mut receiver = coordinator.subscribe();

    let started = Instant::now();
    let summary = coordinator
        .start("a.one\nb.two\nc.three\nd.four\ne.five")
        .await
        .unwrap();
    let elapsed = started.elapsed();

    // 100 ms before the first attempt, then 2 s, 4 s and 4 s between retries.
    assert!(elapsed >= Duration::from_millis(10_100));
    assert!(elapsed < Duration::from_millis(12_000));
    assert_eq!(summary.unknown, 5);

    let snapshot = next_snapshot(&mut receiver).await;
    assert_eq!(
        method_names(&snapshot.methods),
        vec!["one", "two", "three", "four", "five"]
    );
    assert!(snapshot.methods.iter().all(|m| m.status == "unknown"));
}

#[tokio::test(start_paused = true)]
async fn test_scan_passes_do_not_overlap() {
    let (engine, _server) = engine_with(AnalysisConfig::default(), |query| {
        if query.line == 1 {
            HoverReply::markdown("Foo#two")
        } else {
            HoverReply::Null
        }
    });
    let coordinator = AnalysisCoordinator::new(engine, None);

    let first = async {
        coordinator.start("a.one").await.unwrap();
        Instant::now()
    };
    let second = async {
        tokio::time::sleep(Duration::from_millis(1)).await;
        coordinator
            .on_document_change(
                &ChangeEvent::single(ContentChange::new(1, 1, "a.one\nb.two")),
                "a.one\nb.two",
            )
            .unwrap();
        coordinator.run_scan_pass().await;
        Instant::now()
    };
    let (first_done, second_done) = tokio::join!(first, second);

    // The second pass only starts once the slow first pass has finished.
    assert!(second_done >= first_done);
    let states = coordinator.snapshot();
    let names: Vec<&str> = states.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["one", "two"]);
    assert_eq!(states[0].status, ResolutionStatus::Unknown);
    assert_eq!(states[1].status, ResolutionStatus::Resolved);
}

#[tokio::test]
async fn test_mismatched_text_is_reported() {
    let (coordinator, _server) = coordinator_with(always_string);
    coordinator.start("a\nb").await.unwrap();

    let error = coordinator
        .on_document_change(
            &ChangeEvent::single(ContentChange::new(1, 1, "x")),
            "x\ny\nz",
        )
        .unwrap_err();
    assert!(matches!(
        error,
        AnalysisError::CacheOutOfSync {
            cache_len: 2,
            line_count: 3
        }
    ));
}

#[tokio::test]
async fn test_out_of_range_change_fails_loudly() {
    let (coordinator, _server) = coordinator_with(always_string);
    coordinator.start("a\nb").await.unwrap();

    let error = coordinator
        .on_document_change(&ChangeEvent::single(ContentChange::new(5, 5, "x")), "a\nb")
        .unwrap_err();
    assert!(matches!(
        error,
        AnalysisError::Tracker(TrackerError::OutOfBounds { .. })
    ));
}

#[tokio::test]
async fn test_resolve_at_cursor() {
    let (coordinator, _server) = coordinator_with(|query| {
        if query.character == 4 {
            HoverReply::markdown("Integer#times")
        } else {
            HoverReply::Null
        }
    });
    coordinator.start("10.times").await.unwrap();

    assert_eq!(
        coordinator.resolve_at_cursor(1, 5).await.as_deref(),
        Some("Integer")
    );
}

#[tokio::test]
async fn test_measure_value_is_cached_until_next_edit() {
    let (coordinator, server) = coordinator_with(always_string);
    coordinator.start("x = 1 + 2\nputs x").await.unwrap();
    server.set_measure_result(json!("3"));

    let value = coordinator.measure_value("x", 2, 6).await.unwrap();

    assert_eq!(value.as_deref(), Some("3"));
    let command = &server.commands()[0];
    assert_eq!(command["command"], "typeprof.measureValue");
    assert_eq!(command["arguments"][0]["expression"], "x");
    assert_eq!(command["arguments"][0]["line"], 1);
    assert_eq!(command["arguments"][0]["character"], 5);
    assert_eq!(command["arguments"][0]["code"], "x = 1 + 2\nputs x");

    let session = coordinator.engine().session();
    assert_eq!(session.measured_value(2).as_deref(), Some("3"));

    coordinator
        .on_document_change(
            &ChangeEvent::single(ContentChange::new(2, 2, "puts x + 1")),
            "x = 1 + 2\nputs x + 1",
        )
        .unwrap();
    assert_eq!(session.measured_value(2), None);
}

#[tokio::test]
async fn test_measure_value_requires_ready_engine() {
    let (coordinator, _server) = coordinator_with(always_string);

    let error = coordinator.measure_value("x", 1, 1).await.unwrap_err();
    assert!(matches!(error, AnalysisError::NotReady));
}

struct StaticDocs;

impl DocumentationLookup for StaticDocs {
    fn resolve(&self, class_name: &str, method_name: &str) -> Option<DocumentationLink> {
        (class_name == "String").then(|| DocumentationLink {
            class_name: class_name.to_string(),
            url: format!("https://docs.ruby-lang.org/en/master/String.html#method-i-{method_name}"),
            separator: "#".to_string(),
        })
    }
}

#[tokio::test]
async fn test_documentation_is_attached_to_resolved_methods() {
    let (engine, _server) = engine_with(immediate_config(), always_string);
    let coordinator = AnalysisCoordinator::new(engine, Some(Arc::new(StaticDocs)));

    coordinator.start("a.upcase").await.unwrap();

    let states = coordinator.snapshot();
    let info = states[0].info.as_ref().unwrap();
    assert_eq!(info.class_name, "String");
    assert_eq!(
        info.documentation.as_ref().map(|doc| doc.url.as_str()),
        Some("https://docs.ruby-lang.org/en/master/String.html#method-i-upcase")
    );
}
