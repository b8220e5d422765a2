use std::collections::BTreeMap;

use cocoa::codec::*;
use cocoa::errors::{CocoaError, EncodeError, FailureKind};
use cocoa::record;
use indexmap::IndexMap;
use serde_json::json;

#[derive(Clone)]
struct Member {
    owner: String,
    name: String,
    line: Option<i64>,
}

record!(Member { owner, name, line as "start_line" });

fn member(owner: &str, name: &str) -> Member {
    Member {
        owner: owner.to_string(),
        name: name.to_string(),
        line: Some(3),
    }
}

#[test]
fn test_record_encodes_in_declared_order() {
    let encoded = encode(&member("A", "run")).unwrap();
    assert_eq!(
        encoded.to_string(),
        r#"{"owner":"A","name":"run","start_line":3}"#
    );
    assert_eq!(Member::FIELDS, &["owner", "name", "start_line"]);
}

#[test]
fn test_nested_collections_of_records() {
    let mut by_file: IndexMap<String, Vec<Member>> = IndexMap::new();
    by_file.insert("B.java".into(), vec![member("B", "go")]);
    by_file.insert("A.java".into(), vec![member("A", "run"), member("A", "stop")]);

    let encoded = encode(&by_file).unwrap();
    let keys: Vec<&String> = encoded.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["B.java", "A.java"]);
    assert_eq!(encoded["A.java"][1]["name"], "stop");
}

#[test]
fn test_encoding_is_deterministic() {
    let mut map = BTreeMap::new();
    map.insert("z".to_string(), member("Z", "z"));
    map.insert("a".to_string(), member("A", "a"));
    let first = encode(&map).unwrap().to_string();
    let second = encode(&map).unwrap().to_string();
    assert_eq!(first, second);
    assert!(first.starts_with(r#"{"a":"#));
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct Qualified(&'static str, &'static str);

impl WireKey for Qualified {
    fn wire_key(&self) -> String {
        format!("{}.{}", self.0, self.1)
    }
}

#[test]
fn test_key_collision_surfaces_as_tagged_error() {
    let mut map = BTreeMap::new();
    map.insert(Qualified("com.acme", "A"), 1);
    map.insert(Qualified("com", "acme.A"), 2);
    let err: CocoaError = encode(&map).unwrap_err().into();
    assert_eq!(err.kind(), FailureKind::KeyCollision);
}

#[test]
fn test_one_bad_element_fails_whole_value() {
    let values = vec![Some(1.5), None, Some(f64::INFINITY)];
    assert!(matches!(
        encode(&values),
        Err(EncodeError::Unencodable { .. })
    ));
}

#[test]
fn test_graph_nodes_shared_by_edges_are_identical() {
    let mut graph = GraphResult::new();
    graph.add_node("A#run()", member("A", "run"));
    graph.add_node("B#go()", member("B", "go"));
    graph.add_node("C#stop()", member("C", "stop"));
    graph.add_edge(GraphEdge::new("A#run()", "B#go()", "CALL_DEP"));
    graph.add_edge(GraphEdge::new("C#stop()", "B#go()", "CALL_DEP").with_weight(1.0));

    let encoded = encode(&graph).unwrap();
    let nodes = encoded["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 3);
    let shared: Vec<_> = nodes.iter().filter(|n| n["key"] == "B#go()").collect();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0]["data"], json!({"owner": "B", "name": "go", "start_line": 3}));

    for edge in encoded["edges"].as_array().unwrap() {
        for end in ["source", "target"] {
            assert!(nodes.iter().any(|n| n["key"] == edge[end]));
        }
    }
}

#[test]
fn test_graph_with_dangling_edge_is_unencodable() {
    let mut graph: GraphResult<Member> = GraphResult::new();
    graph.add_node("A#run()", member("A", "run"));
    graph.add_edge(GraphEdge::new("A#run()", "Missing#x()", "CALL_DEP"));
    let err: CocoaError = encode(&graph).unwrap_err().into();
    assert_eq!(err.kind(), FailureKind::Encoding);
}
