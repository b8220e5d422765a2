use indexmap::IndexMap;

use super::{Encode, WireMap, WireValue};
use crate::errors::EncodeError;

/// A directed edge between two node keys of a [`GraphResult`].
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub edge_type: String,
    pub weight: Option<f64>,
    /// Extra edge attributes, emitted after the fixed fields.
    pub attributes: WireMap,
}

impl GraphEdge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        edge_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            edge_type: edge_type.into(),
            weight: None,
            attributes: WireMap::new(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_attribute(mut self, name: &str, value: WireValue) -> Self {
        self.attributes.insert(name.to_string(), value);
        self
    }
}

/// A node/edge query result whose nodes are identified by a stable key.
///
/// Each logical node is stored once under its key no matter how many edges
/// touch it, and edges refer to nodes by key only. The first node inserted
/// under a key wins; later instances of the same key are ignored.
#[derive(Debug, Clone)]
pub struct GraphResult<N> {
    nodes: IndexMap<String, N>,
    edges: Vec<GraphEdge>,
}

impl<N> Default for GraphResult<N> {
    fn default() -> Self {
        Self {
            nodes: IndexMap::new(),
            edges: Vec::new(),
        }
    }
}

impl<N> GraphResult<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `node` under `key` unless the key is already present.
    /// Returns `true` if the node was inserted.
    pub fn add_node(&mut self, key: impl Into<String>, node: N) -> bool {
        let key = key.into();
        if self.nodes.contains_key(&key) {
            return false;
        }
        self.nodes.insert(key, node);
        true
    }

    /// Appends an edge. Both endpoints must be added as nodes before the
    /// graph is encoded.
    pub fn add_edge(&mut self, edge: GraphEdge) {
        self.edges.push(edge);
    }

    pub fn node(&self, key: &str) -> Option<&N> {
        self.nodes.get(key)
    }

    pub fn contains_node(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, &N)> {
        self.nodes.iter().map(|(k, n)| (k.as_str(), n))
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Edges entering `key`.
    pub fn in_edges<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.target == key)
    }

    /// Edges leaving `key`.
    pub fn out_edges<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == key)
    }

    /// Builds a borrowed subgraph holding the edges accepted by `keep` and
    /// the nodes they touch.
    pub fn filter_edges<F>(&self, mut keep: F) -> GraphResult<&N>
    where
        F: FnMut(&GraphEdge) -> bool,
    {
        let mut sub = GraphResult::new();
        for edge in self.edges.iter().filter(|e| keep(*e)) {
            for key in [&edge.source, &edge.target] {
                if let Some(node) = self.nodes.get(key) {
                    sub.add_node(key.clone(), node);
                }
            }
            sub.add_edge(edge.clone());
        }
        sub
    }
}

impl Encode for GraphEdge {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        let mut map = WireMap::new();
        map.insert("source".to_string(), WireValue::String(self.source.clone()));
        map.insert("target".to_string(), WireValue::String(self.target.clone()));
        map.insert("type".to_string(), WireValue::String(self.edge_type.clone()));
        if let Some(w) = self.weight {
            map.insert("weight".to_string(), w.encode()?);
        }
        for (k, v) in &self.attributes {
            if map.contains_key(k) {
                return Err(EncodeError::KeyCollision { key: k.clone() });
            }
            map.insert(k.clone(), v.clone());
        }
        Ok(WireValue::Object(map))
    }
}

/// Encodes as `{"nodes": [{"key", "data"}...], "edges": [...]}` with nodes
/// sorted by key. Fails if an edge refers to a key with no node.
impl<N: Encode> Encode for GraphResult<N> {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        for edge in &self.edges {
            for key in [&edge.source, &edge.target] {
                if !self.nodes.contains_key(key) {
                    return Err(EncodeError::Unencodable {
                        what: format!("graph edge referring to missing node '{}'", key),
                    });
                }
            }
        }

        let mut keys: Vec<&String> = self.nodes.keys().collect();
        keys.sort();
        let mut nodes = Vec::with_capacity(keys.len());
        for key in keys {
            let mut entry = WireMap::new();
            entry.insert("key".to_string(), WireValue::String(key.clone()));
            entry.insert("data".to_string(), self.nodes[key].encode()?);
            nodes.push(WireValue::Object(entry));
        }

        let edges = self
            .edges
            .iter()
            .map(Encode::encode)
            .collect::<Result<Vec<_>, _>>()?;

        let mut map = WireMap::new();
        map.insert("nodes".to_string(), WireValue::Array(nodes));
        map.insert("edges".to_string(), WireValue::Array(edges));
        Ok(WireValue::Object(map))
    }
}
