//! Call-graph construction over the loaded symbol table.
//!
//! Two graphs are built once at load time. The analyzer graph comes from the
//! edges the analyzer resolved itself; the symbol-table graph is derived from
//! call sites whose callee resolves to a callable declared in the project.
//! Both key their nodes by `<class>#<signature>`.

use indexmap::IndexMap;
use serde_json::json;

use super::models::{
    method_key, JCallable, JCompilationUnit, JGraphEdges, JMethodDetail, RawEndpoint, RawGraphEdge,
};
use crate::codec::{GraphEdge, GraphResult};

/// Call graph with method details as nodes.
pub type CallGraph = GraphResult<JMethodDetail>;

/// Edge type used for edges derived from call sites.
pub const CALL_EDGE_TYPE: &str = "CALL_DEP";

/// Which call graph a query should read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphSource {
    /// Edges resolved by the analyzer.
    Analyzer,
    /// Edges derived from symbol-table call sites.
    SymbolTable,
}

impl GraphSource {
    pub fn from_flag(using_symbol_table: bool) -> Self {
        if using_symbol_table {
            Self::SymbolTable
        } else {
            Self::Analyzer
        }
    }
}

/// Read-only view over the symbol table with a class → file index.
pub(crate) struct SymbolIndex<'a> {
    pub symbol_table: &'a IndexMap<String, JCompilationUnit>,
    pub class_files: &'a IndexMap<String, String>,
}

impl<'a> SymbolIndex<'a> {
    pub fn callable(&self, class: &str, signature: &str) -> Option<&'a JCallable> {
        let file = self.class_files.get(class)?;
        self.symbol_table
            .get(file)?
            .type_declarations
            .get(class)?
            .callable_declarations
            .get(signature)
    }

    fn detail(&self, class: &str, signature: &str, declaration: &str) -> JMethodDetail {
        let method = self.callable(class, signature).cloned().unwrap_or_else(|| JCallable {
            signature: signature.to_string(),
            declaration: declaration.to_string(),
            ..JCallable::default()
        });
        let method_declaration = if declaration.is_empty() {
            method.declaration.clone()
        } else {
            declaration.to_string()
        };
        JMethodDetail {
            method_declaration,
            klass: class.to_string(),
            method,
        }
    }

    fn endpoint(&self, raw: &RawEndpoint) -> JMethodDetail {
        self.detail(&raw.type_declaration, &raw.signature, &raw.callable_declaration)
    }

    /// Resolves analyzer edges into method details.
    pub fn resolve_edges(&self, raw: &[RawGraphEdge]) -> Vec<JGraphEdges> {
        raw.iter()
            .map(|e| JGraphEdges {
                source: self.endpoint(&e.source),
                target: self.endpoint(&e.target),
                edge_type: e.edge_type.clone(),
                weight: e.weight.clone(),
                source_kind: e.source_kind.clone(),
                destination_kind: e.destination_kind.clone(),
            })
            .collect()
    }
}

/// Lines in `source` that invoke the callable with `target_signature`.
fn calling_lines(source: &JCallable, target_signature: &str) -> Vec<i64> {
    source
        .call_sites
        .iter()
        .filter(|site| site.callee_signature == target_signature)
        .map(|site| site.start_line)
        .collect()
}

/// Builds the graph from analyzer-resolved edges.
pub fn from_analyzer_edges(edges: &[JGraphEdges]) -> CallGraph {
    let mut graph = CallGraph::new();
    for e in edges {
        let source_key = e.source.key();
        let target_key = e.target.key();
        graph.add_node(source_key.clone(), e.source.clone());
        graph.add_node(target_key.clone(), e.target.clone());

        let mut edge = GraphEdge::new(source_key, target_key, e.edge_type.clone());
        if let Ok(weight) = e.weight.trim().parse::<f64>() {
            edge = edge.with_weight(weight);
        }
        if let Some(kind) = &e.source_kind {
            edge = edge.with_attribute("source_kind", json!(kind));
        }
        if let Some(kind) = &e.destination_kind {
            edge = edge.with_attribute("destination_kind", json!(kind));
        }
        let lines = calling_lines(&e.source.method, &e.target.method.signature);
        graph.add_edge(edge.with_attribute("calling_lines", json!(lines)));
    }
    graph
}

/// Builds the graph from call sites in the symbol table.
///
/// A call site contributes an edge when its callee signature names a
/// callable declared on the receiver type, or on the enclosing class when
/// the receiver type is empty.
pub(crate) fn from_symbol_table(index: &SymbolIndex<'_>) -> CallGraph {
    let mut graph = CallGraph::new();
    for unit in index.symbol_table.values() {
        for (class, ty) in &unit.type_declarations {
            for (signature, callable) in &ty.callable_declarations {
                let mut targets: IndexMap<String, (JMethodDetail, Vec<i64>)> = IndexMap::new();
                for site in &callable.call_sites {
                    if site.callee_signature.is_empty() {
                        continue;
                    }
                    let target_class = if site.receiver_type.is_empty() {
                        class.as_str()
                    } else {
                        site.receiver_type.as_str()
                    };
                    let Some(target) = index.callable(target_class, &site.callee_signature) else {
                        continue;
                    };
                    let key = method_key(target_class, &target.signature);
                    targets
                        .entry(key)
                        .or_insert_with(|| {
                            let detail = JMethodDetail {
                                method_declaration: target.declaration.clone(),
                                klass: target_class.to_string(),
                                method: target.clone(),
                            };
                            (detail, Vec::new())
                        })
                        .1
                        .push(site.start_line);
                }

                if targets.is_empty() {
                    continue;
                }
                let source_key = method_key(class, signature);
                graph.add_node(
                    source_key.clone(),
                    JMethodDetail {
                        method_declaration: callable.declaration.clone(),
                        klass: class.clone(),
                        method: callable.clone(),
                    },
                );
                for (target_key, (detail, lines)) in targets {
                    graph.add_node(target_key.clone(), detail);
                    let edge = GraphEdge::new(source_key.clone(), target_key, CALL_EDGE_TYPE)
                        .with_weight(lines.len() as f64)
                        .with_attribute("calling_lines", json!(lines));
                    graph.add_edge(edge);
                }
            }
        }
    }
    graph
}
