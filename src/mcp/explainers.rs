//! Schema explainers: one zero-argument operation per analysis record kind.
//!
//! The published field list is the record's own encoder field order
//! ([`Record::FIELDS`]), so what an explainer describes is exactly what the
//! tools return.

use crate::analysis::models::{
    InitializationBlock, JApplication, JCRUDOperation, JCRUDQuery, JCallSite, JCallable,
    JCallableParameter, JComment, JCompilationUnit, JEnumConstant, JField, JGraphEdges,
    JMethodDetail, JRecordComponent, JType, JVariableDeclaration,
};
use crate::codec::Record;
use crate::record;
use crate::registry::{Candidate, ResultShape};

/// Shape description of one record kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub fields: &'static [&'static str],
    pub related_models: &'static [&'static str],
}

record!(ModelSchema {
    name,
    description,
    fields,
    related_models,
});

macro_rules! explainer {
    ($model:ident, $description:literal, [$($related:literal),* $(,)?]) => {
        Candidate {
            name: concat!(stringify!($model), "_explainer"),
            description: concat!("Describe the fields of ", stringify!($model), " records."),
            params: &[],
            shape: ResultShape::Record,
            invoke: {
                fn invoke<'a>(
                    _: &'a crate::analysis::JavaAnalysis,
                    _: &crate::dispatch::Arguments,
                ) -> crate::errors::Result<Box<dyn crate::codec::Encode + 'a>> {
                    Ok(Box::new(ModelSchema {
                        name: stringify!($model),
                        description: $description,
                        fields: <$model as Record>::FIELDS,
                        related_models: &[$($related),*],
                    }))
                }
                invoke
            },
        }
    };
}

/// Every schema explainer.
pub static EXPLAINERS: &[Candidate] = &[
    explainer!(
        JComment,
        "A comment in Java source with its line and column span, flagged when it is Javadoc.",
        []
    ),
    explainer!(
        JRecordComponent,
        "A component of a Java record: type, annotations, modifiers and optional default value.",
        ["JComment"]
    ),
    explainer!(
        JField,
        "A field of a class or interface: type, declared variables, modifiers and annotations.",
        ["JComment"]
    ),
    explainer!(
        JCallableParameter,
        "A parameter of a method or constructor: name, type, annotations and position.",
        []
    ),
    explainer!(
        JEnumConstant,
        "A constant of an enum together with its constructor arguments.",
        []
    ),
    explainer!(
        JCRUDOperation,
        "A create, read, update or delete operation at a given line.",
        ["CRUDOperationType"]
    ),
    explainer!(
        JCRUDQuery,
        "A query handed to a persistence API: line, arguments and query kind.",
        ["CRUDQueryType"]
    ),
    explainer!(
        JCallSite,
        "A method invocation: receiver, argument and return types, resolved callee signature and CRUD details.",
        ["JComment", "JCRUDOperation", "JCRUDQuery"]
    ),
    explainer!(
        JVariableDeclaration,
        "A local variable declaration: type, initializer and position.",
        ["JComment"]
    ),
    explainer!(
        InitializationBlock,
        "A static or instance initializer block: code, comments, accessed fields, call sites and complexity.",
        ["JComment", "JCallSite", "JVariableDeclaration"]
    ),
    explainer!(
        JCallable,
        "A method or constructor: signature, modifiers, parameters, body, call sites, CRUD operations and complexity.",
        [
            "JComment",
            "JCallableParameter",
            "JCallSite",
            "JCRUDOperation",
            "JCRUDQuery",
            "JVariableDeclaration"
        ]
    ),
    explainer!(
        JType,
        "A class, interface, enum, annotation or record: supertypes, members, nested types and entry-point flag.",
        [
            "JComment",
            "JCallable",
            "JField",
            "JEnumConstant",
            "JRecordComponent",
            "InitializationBlock"
        ]
    ),
    explainer!(
        JCompilationUnit,
        "One Java source file: package, imports, comments and declared types.",
        ["JComment", "JType"]
    ),
    explainer!(
        JMethodDetail,
        "A method together with its declaration string and owning class.",
        ["JCallable"]
    ),
    explainer!(
        JGraphEdges,
        "An edge of the call or dependency graph between two methods, with edge type and weight.",
        ["JMethodDetail"]
    ),
    explainer!(
        JApplication,
        "The analyzed application: symbol table, call graph and system dependency graph.",
        ["JCompilationUnit", "JGraphEdges"]
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::models::RawApplication;
    use crate::analysis::JavaAnalysis;
    use crate::codec::encode;
    use crate::dispatch::Arguments;
    use std::path::PathBuf;

    #[test]
    fn test_explainer_fields_follow_encoder() {
        let analysis = JavaAnalysis::from_raw(PathBuf::from("/tmp/p"), RawApplication::default());
        let jfield = EXPLAINERS
            .iter()
            .find(|c| c.name == "JField_explainer")
            .unwrap();
        let result = (jfield.invoke)(&analysis, &Arguments::empty(jfield.name)).unwrap();
        let out = encode(&result).unwrap();
        assert_eq!(out["name"], "JField");
        assert_eq!(
            out["fields"],
            serde_json::json!([
                "comment",
                "type",
                "start_line",
                "end_line",
                "variables",
                "modifiers",
                "annotations"
            ])
        );
        assert_eq!(out["related_models"], serde_json::json!(["JComment"]));
    }

    #[test]
    fn test_related_models_are_known() {
        let known: Vec<String> = EXPLAINERS
            .iter()
            .map(|c| c.name.trim_end_matches("_explainer").to_string())
            .collect();
        let extra = ["CRUDOperationType", "CRUDQueryType"];
        for c in EXPLAINERS {
            let analysis =
                JavaAnalysis::from_raw(PathBuf::from("/tmp/p"), RawApplication::default());
            let out = encode(&(c.invoke)(&analysis, &Arguments::empty(c.name)).unwrap()).unwrap();
            for related in out["related_models"].as_array().unwrap() {
                let related = related.as_str().unwrap();
                assert!(
                    known.iter().any(|k| k == related) || extra.contains(&related),
                    "{} names unknown model {}",
                    c.name,
                    related
                );
            }
        }
    }
}
