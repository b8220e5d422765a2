//! Typed records of the Java analysis model.
//!
//! The shapes follow the analyzer's `analysis.json` output. Every record
//! deserializes leniently (absent fields take their defaults) and encodes
//! through [`record!`](crate::record) in the order listed there, which is also
//! the field list its schema explainer publishes.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::codec::{Encode, WireKey, WireValue};
use crate::errors::EncodeError;
use crate::record;

/// A comment in Java source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JComment {
    pub content: String,
    pub start_line: i64,
    pub end_line: i64,
    pub start_column: i64,
    pub end_column: i64,
    pub is_javadoc: bool,
}

record!(JComment {
    content,
    start_line,
    end_line,
    start_column,
    end_column,
    is_javadoc,
});

/// A component of a Java record declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JRecordComponent {
    pub comment: Option<JComment>,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub modifiers: Vec<String>,
    pub annotations: Vec<String>,
    pub default_value: Option<String>,
    pub is_var_args: bool,
}

record!(JRecordComponent {
    comment,
    name,
    type_name as "type",
    modifiers,
    annotations,
    default_value,
    is_var_args,
});

/// A field declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JField {
    pub comment: Option<JComment>,
    #[serde(rename = "type")]
    pub type_name: String,
    pub start_line: i64,
    pub end_line: i64,
    pub variables: Vec<String>,
    pub modifiers: Vec<String>,
    pub annotations: Vec<String>,
}

record!(JField {
    comment,
    type_name as "type",
    start_line,
    end_line,
    variables,
    modifiers,
    annotations,
});

/// A formal parameter of a method or constructor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JCallableParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub annotations: Vec<String>,
    pub modifiers: Vec<String>,
    pub start_line: i64,
    pub end_line: i64,
    pub start_column: i64,
    pub end_column: i64,
}

record!(JCallableParameter {
    name,
    type_name as "type",
    annotations,
    modifiers,
    start_line,
    end_line,
    start_column,
    end_column,
});

/// An enum constant with its constructor arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JEnumConstant {
    pub name: String,
    pub arguments: Vec<String>,
}

record!(JEnumConstant { name, arguments });

/// Kind of a persistence operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CrudOperationType {
    Create,
    Read,
    Update,
    Delete,
}

impl CrudOperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl Encode for CrudOperationType {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        Ok(WireValue::String(self.as_str().to_string()))
    }
}

impl WireKey for CrudOperationType {
    fn wire_key(&self) -> String {
        self.as_str().to_string()
    }
}

/// Kind of a query string handed to a persistence API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CrudQueryType {
    Read,
    Write,
    Named,
}

impl CrudQueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::Named => "NAMED",
        }
    }
}

impl Encode for CrudQueryType {
    fn encode(&self) -> Result<WireValue, EncodeError> {
        Ok(WireValue::String(self.as_str().to_string()))
    }
}

/// A CRUD operation performed at a line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JCRUDOperation {
    pub line_number: i64,
    pub operation_type: Option<CrudOperationType>,
}

record!(JCRUDOperation {
    line_number,
    operation_type,
});

/// A query issued at a line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JCRUDQuery {
    pub line_number: i64,
    pub query_arguments: Option<Vec<String>>,
    pub query_type: Option<CrudQueryType>,
}

record!(JCRUDQuery {
    line_number,
    query_arguments,
    query_type,
});

/// A method invocation inside a callable body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JCallSite {
    pub comment: Option<JComment>,
    pub method_name: String,
    pub receiver_expr: String,
    pub receiver_type: String,
    pub argument_types: Vec<String>,
    pub return_type: String,
    pub callee_signature: String,
    pub is_static_call: Option<bool>,
    pub is_constructor_call: bool,
    pub crud_operation: Option<JCRUDOperation>,
    pub crud_query: Option<JCRUDQuery>,
    pub start_line: i64,
    pub start_column: i64,
    pub end_line: i64,
    pub end_column: i64,
}

record!(JCallSite {
    comment,
    method_name,
    receiver_expr,
    receiver_type,
    argument_types,
    return_type,
    callee_signature,
    is_static_call,
    is_constructor_call,
    crud_operation,
    crud_query,
    start_line,
    start_column,
    end_line,
    end_column,
});

/// A local variable declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JVariableDeclaration {
    pub comment: Option<JComment>,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub initializer: String,
    pub start_line: i64,
    pub start_column: i64,
    pub end_line: i64,
    pub end_column: i64,
}

record!(JVariableDeclaration {
    comment,
    name,
    type_name as "type",
    initializer,
    start_line,
    start_column,
    end_line,
    end_column,
});

/// A static or instance initializer block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitializationBlock {
    pub file_path: String,
    pub comments: Vec<JComment>,
    pub annotations: Vec<String>,
    pub thrown_exceptions: Vec<String>,
    pub code: String,
    pub start_line: i64,
    pub end_line: i64,
    pub is_static: bool,
    pub referenced_types: Vec<String>,
    pub accessed_fields: Vec<String>,
    pub call_sites: Vec<JCallSite>,
    pub variable_declarations: Vec<JVariableDeclaration>,
    pub cyclomatic_complexity: i64,
}

record!(InitializationBlock {
    file_path,
    comments,
    annotations,
    thrown_exceptions,
    code,
    start_line,
    end_line,
    is_static,
    referenced_types,
    accessed_fields,
    call_sites,
    variable_declarations,
    cyclomatic_complexity,
});

/// A method or constructor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JCallable {
    pub signature: String,
    pub is_implicit: bool,
    pub is_constructor: bool,
    pub comments: Vec<JComment>,
    pub annotations: Vec<String>,
    pub modifiers: Vec<String>,
    pub thrown_exceptions: Vec<String>,
    pub declaration: String,
    pub parameters: Vec<JCallableParameter>,
    pub return_type: Option<String>,
    pub code: String,
    pub start_line: i64,
    pub end_line: i64,
    pub referenced_types: Vec<String>,
    pub accessed_fields: Vec<String>,
    pub call_sites: Vec<JCallSite>,
    pub is_entrypoint: bool,
    pub variable_declarations: Vec<JVariableDeclaration>,
    pub crud_operations: Vec<JCRUDOperation>,
    pub crud_queries: Vec<JCRUDQuery>,
    pub cyclomatic_complexity: i64,
}

record!(JCallable {
    signature,
    is_implicit,
    is_constructor,
    comments,
    annotations,
    modifiers,
    thrown_exceptions,
    declaration,
    parameters,
    return_type,
    code,
    start_line,
    end_line,
    referenced_types,
    accessed_fields,
    call_sites,
    is_entrypoint,
    variable_declarations,
    crud_operations,
    crud_queries,
    cyclomatic_complexity,
});

/// A class, interface, enum, annotation, or record declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JType {
    pub is_interface: bool,
    pub is_inner_class: bool,
    pub is_local_class: bool,
    pub is_nested_type: bool,
    pub is_class_or_interface_declaration: bool,
    pub is_enum_declaration: bool,
    pub is_annotation_declaration: bool,
    pub is_record_declaration: bool,
    pub is_concrete_class: bool,
    pub comments: Vec<JComment>,
    pub extends_list: Vec<String>,
    pub implements_list: Vec<String>,
    pub modifiers: Vec<String>,
    pub annotations: Vec<String>,
    pub parent_type: String,
    pub nested_type_declarations: Vec<String>,
    pub callable_declarations: IndexMap<String, JCallable>,
    pub field_declarations: Vec<JField>,
    pub enum_constants: Vec<JEnumConstant>,
    pub record_components: Vec<JRecordComponent>,
    pub initialization_blocks: Vec<InitializationBlock>,
    pub is_entrypoint_class: bool,
}

record!(JType {
    is_interface,
    is_inner_class,
    is_local_class,
    is_nested_type,
    is_class_or_interface_declaration,
    is_enum_declaration,
    is_annotation_declaration,
    is_record_declaration,
    is_concrete_class,
    comments,
    extends_list,
    implements_list,
    modifiers,
    annotations,
    parent_type,
    nested_type_declarations,
    callable_declarations,
    field_declarations,
    enum_constants,
    record_components,
    initialization_blocks,
    is_entrypoint_class,
});

/// One Java source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JCompilationUnit {
    pub file_path: String,
    pub package_name: String,
    pub comments: Vec<JComment>,
    pub imports: Vec<String>,
    pub type_declarations: IndexMap<String, JType>,
    pub is_modified: bool,
}

record!(JCompilationUnit {
    file_path,
    package_name,
    comments,
    imports,
    type_declarations,
    is_modified,
});

/// A callable together with its declaration string and owning class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JMethodDetail {
    pub method_declaration: String,
    pub klass: String,
    pub method: JCallable,
}

record!(JMethodDetail {
    method_declaration,
    klass,
    method,
});

impl JMethodDetail {
    /// Stable identity of the method: `<class>#<signature>`.
    pub fn key(&self) -> String {
        method_key(&self.klass, &self.method.signature)
    }
}

/// Builds the stable identity used for call-graph nodes.
pub fn method_key(klass: &str, signature: &str) -> String {
    format!("{}#{}", klass, signature)
}

/// A resolved call-graph or dependency-graph edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JGraphEdges {
    pub source: JMethodDetail,
    pub target: JMethodDetail,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub weight: String,
    pub source_kind: Option<String>,
    pub destination_kind: Option<String>,
}

record!(JGraphEdges {
    source,
    target,
    edge_type as "type",
    weight,
    source_kind,
    destination_kind,
});

/// The whole analyzed application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JApplication {
    pub symbol_table: IndexMap<String, JCompilationUnit>,
    pub call_graph: Vec<JGraphEdges>,
    pub system_dependency_graph: Vec<JGraphEdges>,
}

record!(JApplication {
    symbol_table,
    call_graph,
    system_dependency_graph,
});

// ---------------------------------------------------------------------------
// Analyzer output as written on disk
// ---------------------------------------------------------------------------

/// One endpoint of an edge as the analyzer writes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEndpoint {
    pub file_path: String,
    pub type_declaration: String,
    pub signature: String,
    pub callable_declaration: String,
}

/// An edge as the analyzer writes it, before endpoint resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawGraphEdge {
    pub source: RawEndpoint,
    pub target: RawEndpoint,
    #[serde(rename = "type")]
    pub edge_type: String,
    #[serde(deserialize_with = "string_or_number")]
    pub weight: String,
    pub source_kind: Option<String>,
    pub destination_kind: Option<String>,
}

/// Top-level shape of `analysis.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawApplication {
    pub symbol_table: IndexMap<String, JCompilationUnit>,
    pub call_graph: Option<Vec<RawGraphEdge>>,
    pub system_dependency_graph: Option<Vec<RawGraphEdge>>,
}

/// The analyzer writes edge weights as strings in some versions and numbers
/// in others.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
