use std::path::PathBuf;
use std::sync::Arc;

use cocoa::analysis::JavaAnalysis;
use cocoa::config::ToolboxSettings;
use cocoa::context::AnalysisContext;
use cocoa::dispatch::Dispatcher;
use cocoa::errors::FailureKind;
use cocoa::mcp::build_registry;
use serde_json::{json, Map, Value};

fn ready_dispatcher() -> Dispatcher {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample");
    let context = Arc::new(AnalysisContext::new(root));
    context
        .initialize(|root| JavaAnalysis::load(root, &ToolboxSettings::default()))
        .unwrap();
    Dispatcher::new(Arc::new(build_registry().unwrap()), context)
}

fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {}", other),
    }
}

#[test]
fn test_unknown_operation() {
    let dispatcher = ready_dispatcher();
    let err = dispatcher.invoke("drop_tables_tool", Map::new()).unwrap_err();
    assert_eq!(err.kind(), FailureKind::UnknownOperation);
}

#[test]
fn test_missing_required_argument() {
    let dispatcher = ready_dispatcher();
    let err = dispatcher
        .invoke(
            "get_callers_tool",
            args(json!({"target_class_name": "com.acme.shop.OrderRepository"})),
        )
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidArguments);
    assert!(err.to_string().contains("target_method_declaration"));
}

#[test]
fn test_wrong_argument_type_and_unknown_argument() {
    let dispatcher = ready_dispatcher();
    let err = dispatcher
        .invoke("get_class_tool", args(json!({"qualified_class_name": 42})))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidArguments);

    let err = dispatcher
        .invoke(
            "get_class_tool",
            args(json!({"qualified_class_name": "com.acme.shop.OrderService", "verbose": true})),
        )
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidArguments);
}

#[test]
fn test_unknown_class_is_analysis_error() {
    let dispatcher = ready_dispatcher();
    let err = dispatcher
        .invoke("get_class_tool", args(json!({"qualified_class_name": "com.acme.Nope"})))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::Analysis);
}

#[test]
fn test_callers_default_to_symbol_table() {
    let dispatcher = ready_dispatcher();
    let out = dispatcher
        .invoke(
            "get_callers_tool",
            args(json!({
                "target_class_name": "com.acme.shop.OrderRepository",
                "target_method_declaration": "save(com.acme.shop.Order)"
            })),
        )
        .unwrap();
    assert_eq!(out["target_method"]["klass"], "com.acme.shop.OrderRepository");
    let callers = out["caller_details"].as_array().unwrap();
    assert_eq!(callers.len(), 1);
    assert_eq!(callers[0]["calling_lines"], json!([17]));
    assert_eq!(
        callers[0]["method"]["method"]["signature"],
        "placeOrder(java.lang.String, int)"
    );
}

#[test]
fn test_call_graph_has_no_dangling_edges() {
    let dispatcher = ready_dispatcher();
    for flag in [false, true] {
        let graph = dispatcher
            .invoke("get_call_graph_tool", args(json!({"using_symbol_table": flag})))
            .unwrap();
        let nodes = graph["nodes"].as_array().unwrap();
        let keys: Vec<&str> = nodes.iter().map(|n| n["key"].as_str().unwrap()).collect();
        let mut unique = keys.clone();
        unique.dedup();
        assert_eq!(unique, keys, "nodes are listed once, in key order");
        for edge in graph["edges"].as_array().unwrap() {
            assert!(keys.contains(&edge["source"].as_str().unwrap()));
            assert!(keys.contains(&edge["target"].as_str().unwrap()));
        }
    }
}

#[test]
fn test_shared_callee_node_is_identical_from_every_caller() {
    let dispatcher = ready_dispatcher();
    let key = "com.acme.shop.OrderService#placeOrder(java.lang.String, int)";
    let graph = dispatcher
        .invoke("get_call_graph_tool", args(json!({"using_symbol_table": true})))
        .unwrap();
    let node = graph["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["key"] == key)
        .unwrap();

    // placeOrder is both a caller and a callee.
    let edges = graph["edges"].as_array().unwrap();
    assert!(edges.iter().any(|e| e["source"] == key));
    assert!(edges.iter().any(|e| e["target"] == key));
    assert_eq!(node["data"]["klass"], "com.acme.shop.OrderService");
}

#[test]
fn test_classes_by_criteria_defaults() {
    let dispatcher = ready_dispatcher();
    let none = dispatcher
        .invoke("get_classes_by_criteria_tool", Map::new())
        .unwrap();
    assert_eq!(none, json!({}));

    let found = dispatcher
        .invoke(
            "get_classes_by_criteria_tool",
            args(json!({"inclusions": ["Order"], "exclusions": ["Test", "Receipt"]})),
        )
        .unwrap();
    let names: Vec<&String> = found.as_object().unwrap().keys().collect();
    assert_eq!(names, vec!["com.acme.shop.OrderService", "com.acme.shop.OrderRepository"]);
}

#[test]
fn test_class_call_graph_pairs() {
    let dispatcher = ready_dispatcher();
    let out = dispatcher
        .invoke(
            "get_class_call_graph_tool",
            args(json!({"qualified_class_name": "com.acme.shop.OrderService"})),
        )
        .unwrap();
    let pairs = out.as_array().unwrap();
    assert_eq!(pairs.len(), 2);
    assert!(pairs
        .iter()
        .all(|p| p[0]["klass"] == "com.acme.shop.OrderService"));
}

#[test]
fn test_crud_tools() {
    let dispatcher = ready_dispatcher();
    let all = dispatcher
        .invoke("get_all_crud_operations_tool", Map::new())
        .unwrap();
    assert_eq!(all.as_array().unwrap().len(), 3);

    let updates = dispatcher
        .invoke("get_all_update_operations_tool", Map::new())
        .unwrap();
    assert_eq!(updates, json!([]));

    let creates = dispatcher
        .invoke("get_all_create_operations_tool", Map::new())
        .unwrap();
    assert_eq!(
        creates[0]["crud_operations"][0]["operation_type"],
        "CREATE"
    );
}

#[test]
fn test_compilation_unit_by_relative_path() {
    let dispatcher = ready_dispatcher();
    let unit = dispatcher
        .invoke(
            "get_java_compilation_unit_tool",
            args(json!({"file_path": "src/test/java/com/acme/shop/OrderServiceTest.java"})),
        )
        .unwrap();
    assert_eq!(unit["package_name"], "com.acme.shop");
    assert!(unit["type_declarations"]
        .as_object()
        .unwrap()
        .contains_key("com.acme.shop.OrderServiceTest"));
}

#[test]
fn test_explainer_lists_record_fields() {
    let dispatcher = ready_dispatcher();
    let out = dispatcher
        .invoke("JMethodDetail_explainer", Map::new())
        .unwrap();
    assert_eq!(out["name"], "JMethodDetail");
    assert_eq!(out["fields"], json!(["method_declaration", "klass", "method"]));

    let err = dispatcher
        .invoke("JMethodDetail_explainer", args(json!({"verbose": true})))
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidArguments);
}

#[test]
fn test_results_are_deterministic() {
    let dispatcher = ready_dispatcher();
    for name in ["get_application_view_tool", "get_all_comments_tool", "get_methods_tool"] {
        let a = dispatcher.invoke(name, Map::new()).unwrap().to_string();
        let b = dispatcher.invoke(name, Map::new()).unwrap().to_string();
        assert_eq!(a, b, "{}", name);
    }
}
