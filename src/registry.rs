//! Capability registry: named operations and their descriptors.
//!
//! Operations are offered to [`Registry::discover`] as a table of
//! [`Candidate`]s. Names ending in `_tool` become tools and names ending in
//! `_explainer` become schema explainers; anything else is ignored. The
//! registry is read-only once built and lists operations in name order.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::analysis::JavaAnalysis;
use crate::codec::{Encode, WireMap, WireValue};
use crate::dispatch::Arguments;
use crate::errors::{CocoaError, Result};

pub const TOOL_SUFFIX: &str = "_tool";
pub const EXPLAINER_SUFFIX: &str = "_explainer";

/// Bound implementation of an operation.
pub type Invoke = for<'a> fn(&'a JavaAnalysis, &Arguments) -> Result<Box<dyn Encode + 'a>>;

/// Whether an operation is a query tool or a schema explainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Tool,
    Explainer,
}

impl OperationKind {
    /// Classifies `name` by its suffix.
    pub fn from_name(name: &str) -> Option<Self> {
        if name.ends_with(TOOL_SUFFIX) {
            Some(Self::Tool)
        } else if name.ends_with(EXPLAINER_SUFFIX) {
            Some(Self::Explainer)
        } else {
            None
        }
    }
}

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Boolean,
    StringList,
}

impl ParamKind {
    pub fn json_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::StringList => "array",
        }
    }

    /// Whether `value` has this kind.
    pub fn accepts(&self, value: &WireValue) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
            Self::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(WireValue::is_string)),
        }
    }
}

/// Default applied to an omitted optional parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamDefault {
    Null,
    Bool(bool),
}

impl ParamDefault {
    pub fn to_wire(&self) -> WireValue {
        match self {
            Self::Null => WireValue::Null,
            Self::Bool(b) => json!(b),
        }
    }
}

/// One declared parameter of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<ParamDefault>,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            description,
        }
    }

    pub const fn optional(
        name: &'static str,
        kind: ParamKind,
        default: ParamDefault,
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: Some(default),
            description,
        }
    }
}

/// Hint about the shape of an operation's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultShape {
    Scalar,
    Record,
    List,
    Mapping,
    Graph,
}

/// An implementation offered for registration.
#[derive(Clone, Copy)]
pub struct Candidate {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
    pub shape: ResultShape,
    pub invoke: Invoke,
}

/// Public description of a registered operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationDescriptor {
    pub name: &'static str,
    pub kind: OperationKind,
    pub params: &'static [ParamSpec],
    pub shape: ResultShape,
    pub description: &'static str,
}

impl OperationDescriptor {
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// JSON Schema of the operation's arguments object.
    pub fn input_schema(&self) -> WireValue {
        let mut properties = WireMap::new();
        let mut required = Vec::new();
        for p in self.params {
            let mut prop = WireMap::new();
            prop.insert("type".into(), json!(p.kind.json_type()));
            if p.kind == ParamKind::StringList {
                prop.insert("items".into(), json!({ "type": "string" }));
            }
            prop.insert("description".into(), json!(p.description));
            if let Some(default) = &p.default {
                prop.insert("default".into(), default.to_wire());
            }
            properties.insert(p.name.to_string(), WireValue::Object(prop));
            if p.required {
                required.push(p.name);
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

/// A registered operation: its descriptor and bound implementation.
#[derive(Clone)]
pub struct Operation {
    pub descriptor: OperationDescriptor,
    invoke: Invoke,
}

impl Operation {
    pub fn invoke<'a>(
        &self,
        analysis: &'a JavaAnalysis,
        arguments: &Arguments,
    ) -> Result<Box<dyn Encode + 'a>> {
        (self.invoke)(analysis, arguments)
    }
}

/// Name → operation, iterated in name order.
#[derive(Clone, Default)]
pub struct Registry {
    operations: BTreeMap<&'static str, Operation>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one operation. A second registration under the same name fails.
    pub fn register(&mut self, kind: OperationKind, candidate: &Candidate) -> Result<()> {
        if self.operations.contains_key(candidate.name) {
            return Err(CocoaError::DuplicateName {
                name: candidate.name.to_string(),
            });
        }
        let descriptor = OperationDescriptor {
            name: candidate.name,
            kind,
            params: candidate.params,
            shape: candidate.shape,
            description: candidate.description,
        };
        debug!(name = candidate.name, kind = ?kind, "registered operation");
        self.operations.insert(
            candidate.name,
            Operation {
                descriptor,
                invoke: candidate.invoke,
            },
        );
        Ok(())
    }

    /// Builds a registry from every candidate following the naming convention.
    pub fn discover(candidates: &[Candidate]) -> Result<Self> {
        let mut matching: Vec<(OperationKind, &Candidate)> = candidates
            .iter()
            .filter_map(|c| OperationKind::from_name(c.name).map(|kind| (kind, c)))
            .collect();
        matching.sort_by(|a, b| a.1.name.cmp(b.1.name));

        let mut registry = Self::new();
        for (kind, candidate) in matching {
            registry.register(kind, candidate)?;
        }
        info!(
            operations = registry.len(),
            skipped = candidates.len() - registry.len(),
            "capability registry built"
        );
        Ok(registry)
    }

    pub fn resolve(&self, name: &str) -> Result<&Operation> {
        self.operations
            .get(name)
            .ok_or_else(|| CocoaError::UnknownOperation {
                name: name.to_string(),
            })
    }

    /// All descriptors in name order.
    pub fn list(&self) -> Vec<&OperationDescriptor> {
        self.operations.values().map(|op| &op.descriptor).collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
