//! Query tools exposed over MCP.
//!
//! Each entry binds a `_tool` name to one [`JavaAnalysis`] query. The table
//! is the only place a tool has to be added; the registry discovers it and
//! the dispatcher validates its arguments from the declared parameters.

use crate::analysis::models::CrudOperationType;
use crate::analysis::{GraphSource, JavaAnalysis};
use crate::codec::Encode;
use crate::dispatch::Arguments;
use crate::errors::Result;
use crate::registry::{Candidate, ParamDefault, ParamKind, ParamSpec, ResultShape};

type Output<'a> = Result<Box<dyn Encode + 'a>>;

fn boxed<'a, T: Encode + 'a>(value: T) -> Output<'a> {
    Ok(Box::new(value))
}

const CLASS: ParamSpec = ParamSpec::required(
    "qualified_class_name",
    ParamKind::String,
    "Fully qualified class name, e.g. com.acme.OrderService",
);
const METHOD: ParamSpec = ParamSpec::required(
    "qualified_method_name",
    ParamKind::String,
    "Method signature as it appears in the symbol table, e.g. place(java.lang.String)",
);
const METHOD_SIGNATURE: ParamSpec = ParamSpec::required(
    "method_signature",
    ParamKind::String,
    "Method signature as it appears in the symbol table",
);
const FILE_PATH: ParamSpec = ParamSpec::required(
    "file_path",
    ParamKind::String,
    "Java source file, as a symbol-table key or a path relative to the project",
);

const fn symbol_table_flag(default: bool) -> ParamSpec {
    ParamSpec::optional(
        "using_symbol_table",
        ParamKind::Boolean,
        ParamDefault::Bool(default),
        "Read the call graph derived from symbol-table call sites instead of the analyzer's",
    )
}

fn graph_source(args: &Arguments) -> Result<GraphSource> {
    Ok(GraphSource::from_flag(args.bool("using_symbol_table")?))
}

/// Every query tool.
pub static TOOLS: &[Candidate] = &[
    Candidate {
        name: "are_we_ready_tool",
        description: "Report the project path the analysis is bound to. Succeeds only once the analysis is ready.",
        params: &[],
        shape: ResultShape::Scalar,
        invoke: are_we_ready,
    },
    Candidate {
        name: "get_application_view_tool",
        description: "The whole JApplication: symbol table, call graph and system dependency graph.",
        params: &[],
        shape: ResultShape::Record,
        invoke: application_view,
    },
    Candidate {
        name: "get_symbol_table_tool",
        description: "Symbol table mapping each source file to its JCompilationUnit.",
        params: &[],
        shape: ResultShape::Mapping,
        invoke: symbol_table,
    },
    Candidate {
        name: "get_compilation_units_tool",
        description: "Every JCompilationUnit in the project.",
        params: &[],
        shape: ResultShape::List,
        invoke: compilation_units,
    },
    Candidate {
        name: "get_call_graph_tool",
        description: "Call graph as nodes keyed by <class>#<signature> (JMethodDetail) and CALL_DEP edges referencing those keys.",
        params: &[symbol_table_flag(false)],
        shape: ResultShape::Graph,
        invoke: call_graph,
    },
    Candidate {
        name: "get_call_graph_json_tool",
        description: "Call graph flattened to one record per edge with source and target class, signature and body.",
        params: &[],
        shape: ResultShape::List,
        invoke: call_graph_json,
    },
    Candidate {
        name: "get_callers_tool",
        description: "Methods that call the target method, with the lines of each call.",
        params: &[
            ParamSpec::required(
                "target_class_name",
                ParamKind::String,
                "Class declaring the target method",
            ),
            ParamSpec::required(
                "target_method_declaration",
                ParamKind::String,
                "Signature of the target method",
            ),
            symbol_table_flag(true),
        ],
        shape: ResultShape::Record,
        invoke: callers,
    },
    Candidate {
        name: "get_callees_tool",
        description: "Methods called by the source method, with the lines of each call.",
        params: &[
            ParamSpec::required(
                "source_class_name",
                ParamKind::String,
                "Class declaring the source method",
            ),
            ParamSpec::required(
                "source_method_declaration",
                ParamKind::String,
                "Signature of the source method",
            ),
            symbol_table_flag(true),
        ],
        shape: ResultShape::Record,
        invoke: callees,
    },
    Candidate {
        name: "get_methods_tool",
        description: "Every method in the project: class name -> signature -> JCallable.",
        params: &[],
        shape: ResultShape::Mapping,
        invoke: methods,
    },
    Candidate {
        name: "get_classes_tool",
        description: "Every class, interface, enum and record: qualified name -> JType.",
        params: &[],
        shape: ResultShape::Mapping,
        invoke: classes,
    },
    Candidate {
        name: "get_classes_by_criteria_tool",
        description: "Classes whose name contains any inclusion substring and no exclusion substring. No inclusions selects nothing.",
        params: &[
            ParamSpec::optional(
                "inclusions",
                ParamKind::StringList,
                ParamDefault::Null,
                "Substrings a class name must contain (any)",
            ),
            ParamSpec::optional(
                "exclusions",
                ParamKind::StringList,
                ParamDefault::Null,
                "Substrings a class name must not contain",
            ),
        ],
        shape: ResultShape::Mapping,
        invoke: classes_by_criteria,
    },
    Candidate {
        name: "get_class_tool",
        description: "The JType of one class.",
        params: &[CLASS],
        shape: ResultShape::Record,
        invoke: class,
    },
    Candidate {
        name: "get_method_tool",
        description: "The JCallable of one method.",
        params: &[CLASS, METHOD],
        shape: ResultShape::Record,
        invoke: method,
    },
    Candidate {
        name: "get_method_parameters_tool",
        description: "Parameter names of one method, in declaration order.",
        params: &[CLASS, METHOD],
        shape: ResultShape::List,
        invoke: method_parameters,
    },
    Candidate {
        name: "get_java_file_tool",
        description: "Source file declaring a class.",
        params: &[CLASS],
        shape: ResultShape::Scalar,
        invoke: java_file,
    },
    Candidate {
        name: "get_java_compilation_unit_tool",
        description: "The JCompilationUnit of one source file.",
        params: &[FILE_PATH],
        shape: ResultShape::Record,
        invoke: java_compilation_unit,
    },
    Candidate {
        name: "get_methods_in_class_tool",
        description: "Methods and constructors of a class: signature -> JCallable.",
        params: &[CLASS],
        shape: ResultShape::Mapping,
        invoke: methods_in_class,
    },
    Candidate {
        name: "get_constructors_tool",
        description: "Constructors of a class: signature -> JCallable.",
        params: &[CLASS],
        shape: ResultShape::Mapping,
        invoke: constructors,
    },
    Candidate {
        name: "get_fields_tool",
        description: "Field declarations (JField) of a class.",
        params: &[CLASS],
        shape: ResultShape::List,
        invoke: fields,
    },
    Candidate {
        name: "get_nested_classes_tool",
        description: "Nested types (JType) declared inside a class.",
        params: &[CLASS],
        shape: ResultShape::List,
        invoke: nested_classes,
    },
    Candidate {
        name: "get_sub_classes_tool",
        description: "Classes that extend or implement the given type, which may be a library type.",
        params: &[CLASS],
        shape: ResultShape::Mapping,
        invoke: sub_classes,
    },
    Candidate {
        name: "get_extended_classes_tool",
        description: "Superclasses named in a class's extends clause.",
        params: &[CLASS],
        shape: ResultShape::List,
        invoke: extended_classes,
    },
    Candidate {
        name: "get_implemented_interfaces_tool",
        description: "Interfaces named in a class's implements clause.",
        params: &[CLASS],
        shape: ResultShape::List,
        invoke: implemented_interfaces,
    },
    Candidate {
        name: "get_class_call_graph_tool",
        description: "(caller, callee) JMethodDetail pairs for calls made from a class, or from one of its methods.",
        params: &[
            CLASS,
            ParamSpec::optional(
                "method_signature",
                ParamKind::String,
                ParamDefault::Null,
                "Restrict to calls made by this method",
            ),
            symbol_table_flag(false),
        ],
        shape: ResultShape::List,
        invoke: class_call_graph,
    },
    Candidate {
        name: "get_entry_point_classes_tool",
        description: "Entry-point classes (servlets, controllers, main classes, ...): qualified name -> JType.",
        params: &[],
        shape: ResultShape::Mapping,
        invoke: entry_point_classes,
    },
    Candidate {
        name: "get_entry_point_methods_tool",
        description: "Entry-point methods: class name -> signature -> JCallable.",
        params: &[],
        shape: ResultShape::Mapping,
        invoke: entry_point_methods,
    },
    Candidate {
        name: "remove_all_comments_tool",
        description: "Source of every file with comments removed: file -> source. Line numbers are preserved.",
        params: &[],
        shape: ResultShape::Mapping,
        invoke: remove_all_comments,
    },
    Candidate {
        name: "get_test_methods_tool",
        description: "Methods annotated as tests (JUnit, TestNG): <class>#<signature> -> body.",
        params: &[],
        shape: ResultShape::Mapping,
        invoke: test_methods,
    },
    Candidate {
        name: "get_all_crud_operations_tool",
        description: "Every method performing CRUD operations, with those operations.",
        params: &[],
        shape: ResultShape::List,
        invoke: all_crud,
    },
    Candidate {
        name: "get_all_create_operations_tool",
        description: "Methods performing CREATE operations.",
        params: &[],
        shape: ResultShape::List,
        invoke: create_ops,
    },
    Candidate {
        name: "get_all_read_operations_tool",
        description: "Methods performing READ operations.",
        params: &[],
        shape: ResultShape::List,
        invoke: read_ops,
    },
    Candidate {
        name: "get_all_update_operations_tool",
        description: "Methods performing UPDATE operations.",
        params: &[],
        shape: ResultShape::List,
        invoke: update_ops,
    },
    Candidate {
        name: "get_all_delete_operations_tool",
        description: "Methods performing DELETE operations.",
        params: &[],
        shape: ResultShape::List,
        invoke: delete_ops,
    },
    Candidate {
        name: "get_comments_in_a_method_tool",
        description: "Comments (JComment) inside one method.",
        params: &[CLASS, METHOD_SIGNATURE],
        shape: ResultShape::List,
        invoke: comments_in_method,
    },
    Candidate {
        name: "get_comments_in_a_class_tool",
        description: "Comments (JComment) attached to one class.",
        params: &[CLASS],
        shape: ResultShape::List,
        invoke: comments_in_class,
    },
    Candidate {
        name: "get_comment_in_file_tool",
        description: "Comments (JComment) in one source file.",
        params: &[FILE_PATH],
        shape: ResultShape::List,
        invoke: comments_in_file,
    },
    Candidate {
        name: "get_all_comments_tool",
        description: "Every comment in the project: file -> [JComment].",
        params: &[],
        shape: ResultShape::Mapping,
        invoke: all_comments,
    },
    Candidate {
        name: "get_all_docstrings_tool",
        description: "Javadoc comments: file -> [JComment], for files that have any.",
        params: &[],
        shape: ResultShape::Mapping,
        invoke: all_docstrings,
    },
];

fn are_we_ready<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.project_root())
}

fn application_view<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.application())
}

fn symbol_table<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.symbol_table())
}

fn compilation_units<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.compilation_units())
}

fn call_graph<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.call_graph(graph_source(args)?))
}

fn call_graph_json<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.call_graph_edges())
}

fn callers<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.callers(
        args.str("target_class_name")?,
        args.str("target_method_declaration")?,
        graph_source(args)?,
    )?)
}

fn callees<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.callees(
        args.str("source_class_name")?,
        args.str("source_method_declaration")?,
        graph_source(args)?,
    )?)
}

fn methods<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.methods())
}

fn classes<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.classes())
}

fn classes_by_criteria<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    let inclusions = args.string_list("inclusions")?;
    let exclusions = args.string_list("exclusions")?;
    boxed(a.classes_by_criteria(&inclusions, &exclusions))
}

fn class<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.class(args.str("qualified_class_name")?)?)
}

fn method<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.method(
        args.str("qualified_class_name")?,
        args.str("qualified_method_name")?,
    )?)
}

fn method_parameters<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.method_parameters(
        args.str("qualified_class_name")?,
        args.str("qualified_method_name")?,
    )?)
}

fn java_file<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.java_file(args.str("qualified_class_name")?)?)
}

fn java_compilation_unit<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.compilation_unit(args.str("file_path")?)?)
}

fn methods_in_class<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.methods_in_class(args.str("qualified_class_name")?)?)
}

fn constructors<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.constructors(args.str("qualified_class_name")?)?)
}

fn fields<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.fields(args.str("qualified_class_name")?)?)
}

fn nested_classes<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.nested_classes(args.str("qualified_class_name")?)?)
}

fn sub_classes<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.sub_classes(args.str("qualified_class_name")?))
}

fn extended_classes<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.extended_classes(args.str("qualified_class_name")?)?)
}

fn implemented_interfaces<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.implemented_interfaces(args.str("qualified_class_name")?)?)
}

fn class_call_graph<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.class_call_graph(
        args.str("qualified_class_name")?,
        args.opt_str("method_signature"),
        graph_source(args)?,
    )?)
}

fn entry_point_classes<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.entry_point_classes())
}

fn entry_point_methods<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.entry_point_methods())
}

fn remove_all_comments<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.source_without_comments()?)
}

fn test_methods<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.test_methods())
}

fn all_crud<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.crud_operations(None))
}

fn create_ops<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.crud_operations(Some(CrudOperationType::Create)))
}

fn read_ops<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.crud_operations(Some(CrudOperationType::Read)))
}

fn update_ops<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.crud_operations(Some(CrudOperationType::Update)))
}

fn delete_ops<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.crud_operations(Some(CrudOperationType::Delete)))
}

fn comments_in_method<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.comments_in_method(
        args.str("qualified_class_name")?,
        args.str("method_signature")?,
    )?)
}

fn comments_in_class<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.comments_in_class(args.str("qualified_class_name")?)?)
}

fn comments_in_file<'a>(a: &'a JavaAnalysis, args: &Arguments) -> Output<'a> {
    boxed(a.comments_in_file(args.str("file_path")?)?)
}

fn all_comments<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.all_comments())
}

fn all_docstrings<'a>(a: &'a JavaAnalysis, _: &Arguments) -> Output<'a> {
    boxed(a.all_docstrings())
}
