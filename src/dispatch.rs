//! Dispatcher: resolve, validate, invoke, encode.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::codec::{encode, WireMap, WireValue};
use crate::context::AnalysisContext;
use crate::errors::{CocoaError, Result};
use crate::registry::{OperationDescriptor, ParamKind, Registry};

/// Validated arguments of one invocation.
///
/// Every declared parameter is present: omitted optional ones carry their
/// default (or null).
#[derive(Debug, Clone, PartialEq)]
pub struct Arguments {
    operation: &'static str,
    values: WireMap,
}

impl Arguments {
    /// Checks `raw` against `descriptor`: required parameters present, no
    /// unknown names, every value of the declared kind.
    pub fn validate(descriptor: &OperationDescriptor, mut raw: WireMap) -> Result<Self> {
        let op = descriptor.name;
        if let Some(unknown) = raw.keys().find(|k| descriptor.param(k).is_none()) {
            return Err(CocoaError::invalid_arguments(
                op,
                format!("unexpected argument '{}'", unknown),
            ));
        }

        let mut values = WireMap::new();
        for param in descriptor.params {
            let value = match raw.remove(param.name) {
                Some(WireValue::Null) | None if param.required => {
                    return Err(CocoaError::invalid_arguments(
                        op,
                        format!("missing required argument '{}'", param.name),
                    ));
                }
                Some(WireValue::Null) | None => param
                    .default
                    .map(|d| d.to_wire())
                    .unwrap_or(WireValue::Null),
                Some(value) => {
                    if !param.kind.accepts(&value) {
                        return Err(CocoaError::invalid_arguments(
                            op,
                            format!(
                                "argument '{}' must be of type {}",
                                param.name,
                                param.kind.json_type()
                            ),
                        ));
                    }
                    value
                }
            };
            values.insert(param.name.to_string(), value);
        }
        Ok(Self {
            operation: op,
            values,
        })
    }

    /// Arguments for an operation that takes none.
    pub fn empty(operation: &'static str) -> Self {
        Self {
            operation,
            values: WireMap::new(),
        }
    }

    pub fn operation(&self) -> &str {
        self.operation
    }

    fn missing(&self, name: &str, kind: ParamKind) -> CocoaError {
        CocoaError::invalid_arguments(
            self.operation,
            format!("argument '{}' is not a {}", name, kind.json_type()),
        )
    }

    pub fn str(&self, name: &str) -> Result<&str> {
        self.values
            .get(name)
            .and_then(WireValue::as_str)
            .ok_or_else(|| self.missing(name, ParamKind::String))
    }

    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(WireValue::as_str)
    }

    pub fn bool(&self, name: &str) -> Result<bool> {
        self.values
            .get(name)
            .and_then(WireValue::as_bool)
            .ok_or_else(|| self.missing(name, ParamKind::Boolean))
    }

    /// A string-list argument; null reads as empty.
    pub fn string_list(&self, name: &str) -> Result<Vec<String>> {
        match self.values.get(name) {
            None | Some(WireValue::Null) => Ok(Vec::new()),
            Some(WireValue::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.missing(name, ParamKind::StringList))
                })
                .collect(),
            Some(_) => Err(self.missing(name, ParamKind::StringList)),
        }
    }
}

/// Accepts the `arguments` member of a call: absent or null means none.
pub fn arguments_object(operation: &str, value: Option<WireValue>) -> Result<WireMap> {
    match value {
        None | Some(WireValue::Null) => Ok(WireMap::new()),
        Some(WireValue::Object(map)) => Ok(map),
        Some(_) => Err(CocoaError::invalid_arguments(
            operation,
            "arguments must be an object",
        )),
    }
}

/// Binds a registry to one session's analysis context.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    context: Arc<AnalysisContext>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, context: Arc<AnalysisContext>) -> Self {
        Self { registry, context }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn context(&self) -> &AnalysisContext {
        &self.context
    }

    pub fn context_handle(&self) -> Arc<AnalysisContext> {
        Arc::clone(&self.context)
    }

    /// Runs one invocation to completion. Failures at any step are returned
    /// as-is; nothing is retried and no partial result is produced.
    pub fn invoke(&self, name: &str, arguments: WireMap) -> Result<WireValue> {
        let start = Instant::now();
        debug!(operation = name, "received invocation");
        let result = self.run(name, arguments);
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(operation = name, elapsed_ms, "invocation succeeded"),
            Err(e) => warn!(
                operation = name,
                kind = e.kind().as_str(),
                error = %e,
                elapsed_ms,
                "invocation failed"
            ),
        }
        result
    }

    fn run(&self, name: &str, arguments: WireMap) -> Result<WireValue> {
        let operation = self.registry.resolve(name)?;
        let arguments = Arguments::validate(&operation.descriptor, arguments)?;
        let analysis = self.context.get_context()?;
        let raw = operation.invoke(&analysis, &arguments)?;
        Ok(encode(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{OperationKind, ParamDefault, ParamSpec, ResultShape};
    use serde_json::json;

    const PARAMS: &[ParamSpec] = &[
        ParamSpec::required("qualified_class_name", ParamKind::String, "Class"),
        ParamSpec::optional(
            "using_symbol_table",
            ParamKind::Boolean,
            ParamDefault::Bool(false),
            "Source",
        ),
        ParamSpec::optional("inclusions", ParamKind::StringList, ParamDefault::Null, "Filters"),
    ];

    fn descriptor() -> OperationDescriptor {
        OperationDescriptor {
            name: "sample_tool",
            kind: OperationKind::Tool,
            params: PARAMS,
            shape: ResultShape::Record,
            description: "sample",
        }
    }

    fn map(value: WireValue) -> WireMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let args =
            Arguments::validate(&descriptor(), map(json!({"qualified_class_name": "A"}))).unwrap();
        assert_eq!(args.str("qualified_class_name").unwrap(), "A");
        assert!(!args.bool("using_symbol_table").unwrap());
        assert!(args.string_list("inclusions").unwrap().is_empty());
    }

    #[test]
    fn test_missing_required() {
        let err = Arguments::validate(&descriptor(), WireMap::new()).unwrap_err();
        assert!(matches!(err, CocoaError::InvalidArguments { .. }));
        let err = Arguments::validate(&descriptor(), map(json!({"qualified_class_name": null})))
            .unwrap_err();
        assert!(matches!(err, CocoaError::InvalidArguments { .. }));
    }

    #[test]
    fn test_unknown_argument_rejected() {
        let err = Arguments::validate(
            &descriptor(),
            map(json!({"qualified_class_name": "A", "depth": 2})),
        )
        .unwrap_err();
        assert!(err.to_string().contains("depth"));
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let err = Arguments::validate(
            &descriptor(),
            map(json!({"qualified_class_name": "A", "using_symbol_table": "yes"})),
        )
        .unwrap_err();
        assert!(matches!(err, CocoaError::InvalidArguments { .. }));
    }

    #[test]
    fn test_arguments_object() {
        assert!(arguments_object("x_tool", None).unwrap().is_empty());
        assert!(arguments_object("x_tool", Some(json!([1]))).is_err());
    }
}
