use std::path::{Path, PathBuf};
use std::sync::Arc;

use cocoa::analysis::JavaAnalysis;
use cocoa::config::ToolboxSettings;
use cocoa::context::{AnalysisContext, ContextState};
use cocoa::dispatch::Dispatcher;
use cocoa::errors::{CocoaError, FailureKind};
use cocoa::mcp::build_registry;
use serde_json::{json, Map};
use tempfile::TempDir;

fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample")
}

/// Settings whose analyzer cache lives inside the temporary project.
fn isolated_settings(dir: &Path) -> ToolboxSettings {
    ToolboxSettings {
        output_dir: Some(dir.join("out-cache")),
        ..ToolboxSettings::default()
    }
}

#[test]
fn test_calls_before_ready_are_not_ready() {
    let context = Arc::new(AnalysisContext::new(fixture_root()));
    let dispatcher = Dispatcher::new(Arc::new(build_registry().unwrap()), Arc::clone(&context));

    let err = dispatcher.invoke("get_classes_tool", Map::new()).unwrap_err();
    assert_eq!(err.kind(), FailureKind::ContextNotReady);

    context
        .initialize(|root| JavaAnalysis::load(root, &ToolboxSettings::default()))
        .unwrap();
    assert_eq!(context.state(), ContextState::Ready);
    assert!(dispatcher.invoke("get_classes_tool", Map::new()).is_ok());

    context.close();
    let err = dispatcher.invoke("get_classes_tool", Map::new()).unwrap_err();
    assert!(matches!(err, CocoaError::ContextClosed));
}

#[test]
fn test_are_we_ready_reports_project_path() {
    let root = fixture_root();
    let context = Arc::new(AnalysisContext::new(root.clone()));
    context
        .initialize(|root| JavaAnalysis::load(root, &ToolboxSettings::default()))
        .unwrap();
    let dispatcher = Dispatcher::new(Arc::new(build_registry().unwrap()), context);
    let out = dispatcher.invoke("are_we_ready_tool", Map::new()).unwrap();
    assert_eq!(out, json!(root.to_str().unwrap()));
}

#[test]
fn test_failed_load_is_reported_on_every_call() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("Main.java"), "class Main {}").unwrap();

    let settings = isolated_settings(dir.path());
    let context = Arc::new(AnalysisContext::new(dir.path()));
    // Sources but no analyzer output and no analyzer jar.
    let err = context
        .initialize(|root| JavaAnalysis::load(root, &settings))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Analysis);
    assert_eq!(context.state(), ContextState::Failed);

    let dispatcher = Dispatcher::new(Arc::new(build_registry().unwrap()), context);
    let err = dispatcher.invoke("get_symbol_table_tool", Map::new()).unwrap_err();
    assert_eq!(err.kind(), FailureKind::ContextNotReady);
    assert!(err.to_string().contains("initialization failed"));
}

#[test]
fn test_empty_project_gives_empty_collections() {
    let dir = TempDir::new().unwrap();
    let settings = isolated_settings(dir.path());
    let context = Arc::new(AnalysisContext::new(dir.path()));
    context
        .initialize(|root| JavaAnalysis::load(root, &settings))
        .unwrap();
    let dispatcher = Dispatcher::new(Arc::new(build_registry().unwrap()), context);

    for (name, empty) in [
        ("get_symbol_table_tool", json!({})),
        ("get_classes_tool", json!({})),
        ("get_methods_tool", json!({})),
        ("get_compilation_units_tool", json!([])),
        ("get_call_graph_json_tool", json!([])),
        ("get_test_methods_tool", json!({})),
        ("get_all_crud_operations_tool", json!([])),
        ("get_all_docstrings_tool", json!({})),
        ("remove_all_comments_tool", json!({})),
    ] {
        let out = dispatcher.invoke(name, Map::new()).unwrap();
        assert_eq!(out, empty, "{}", name);
    }

    let graph = dispatcher.invoke("get_call_graph_tool", Map::new()).unwrap();
    assert_eq!(graph, json!({"nodes": [], "edges": []}));
}

#[tokio::test]
async fn test_background_initialization_settles() {
    let context = Arc::new(AnalysisContext::new(fixture_root()));
    let worker = Arc::clone(&context);
    let handle = tokio::task::spawn_blocking(move || {
        worker.initialize(|root| JavaAnalysis::load(root, &ToolboxSettings::default()))
    });

    assert_eq!(context.settled().await, ContextState::Ready);
    handle.await.unwrap().unwrap();
    let analysis = context.get_context().unwrap();
    assert_eq!(analysis.classes().len(), 5);
}

#[test]
fn test_calls_during_initialization_are_not_ready() {
    let context = Arc::new(AnalysisContext::new(fixture_root()));
    let dispatcher = Dispatcher::new(Arc::new(build_registry().unwrap()), Arc::clone(&context));

    let mut seen = None;
    context
        .initialize(|root| {
            seen = Some((
                context.state(),
                context.get_context().map(|_| ()),
                dispatcher.invoke("get_classes_tool", Map::new()),
            ));
            JavaAnalysis::load(root, &ToolboxSettings::default())
        })
        .unwrap();

    let (state, direct, invoked) = seen.unwrap();
    assert_eq!(state, ContextState::Initializing);
    let err = direct.unwrap_err();
    assert_eq!(err.kind(), FailureKind::ContextNotReady);
    assert!(err.to_string().contains("initializing"));
    assert_eq!(invoked.unwrap_err().kind(), FailureKind::ContextNotReady);

    assert!(dispatcher.invoke("get_classes_tool", Map::new()).is_ok());
}
