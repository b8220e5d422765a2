//! Java analysis model and its read-only query surface.
//!
//! [`JavaAnalysis`] is built once from the analyzer's output and never
//! mutated afterwards. Every query borrows from it, so any number of callers
//! can read concurrently.

mod callgraph;
mod comments;
mod loader;
pub mod models;

pub use callgraph::{CallGraph, GraphSource, CALL_EDGE_TYPE};
pub use comments::strip_comments;
pub use loader::{count_java_sources, load_application, read_application, ANALYSIS_FILENAME};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use indexmap::IndexMap;
use tracing::info;

use crate::codec::GraphEdge;
use crate::config::ToolboxSettings;
use crate::errors::{CocoaError, Result};
use crate::record;
use callgraph::SymbolIndex;
use models::{
    method_key, CrudOperationType, JApplication, JCRUDOperation, JCallable, JComment,
    JCompilationUnit, JField, JMethodDetail, JType, RawApplication,
};

/// Annotations that mark a method as a test (JUnit 4/5, TestNG).
const TEST_ANNOTATIONS: &[&str] = &[
    "Test",
    "ParameterizedTest",
    "RepeatedTest",
    "TestFactory",
    "TestTemplate",
];

/// A caller or callee together with the lines where the call happens.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRelation {
    pub method: JMethodDetail,
    pub calling_lines: Vec<i64>,
}

record!(CallRelation {
    method,
    calling_lines,
});

/// Every method that calls a target method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCallers {
    pub target_method: JMethodDetail,
    pub caller_details: Vec<CallRelation>,
}

record!(MethodCallers {
    target_method,
    caller_details,
});

/// Every method a source method calls.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCallees {
    pub source_method: JMethodDetail,
    pub callee_details: Vec<CallRelation>,
}

record!(MethodCallees {
    source_method,
    callee_details,
});

/// Flat view of one call-graph edge.
#[derive(Debug, Clone, PartialEq)]
pub struct CallEdgeSummary {
    pub source_class: String,
    pub source_method_signature: String,
    pub source_method_body: String,
    pub target_class: String,
    pub target_method_signature: String,
    pub target_method_body: String,
    pub weight: Option<f64>,
}

record!(CallEdgeSummary {
    source_class,
    source_method_signature,
    source_method_body,
    target_class,
    target_method_signature,
    target_method_body,
    weight,
});

/// CRUD operations performed by one method.
#[derive(Debug, Clone, PartialEq)]
pub struct CrudUsage {
    pub class_name: String,
    pub method_signature: String,
    pub crud_operations: Vec<JCRUDOperation>,
}

record!(CrudUsage {
    class_name,
    method_signature,
    crud_operations,
});

/// The loaded, indexed analysis of one project.
#[derive(Debug)]
pub struct JavaAnalysis {
    project_root: PathBuf,
    application: JApplication,
    /// Qualified class name → symbol-table key of the declaring file.
    class_files: IndexMap<String, String>,
    analyzer_graph: CallGraph,
    symbol_graph: CallGraph,
}

impl JavaAnalysis {
    /// Loads (running the analyzer if configured) and indexes `project_root`.
    pub fn load(project_root: &Path, settings: &ToolboxSettings) -> Result<Self> {
        let start = Instant::now();
        let raw = load_application(project_root, settings)?;
        let analysis = Self::from_raw(project_root.to_path_buf(), raw);
        info!(
            project = %project_root.display(),
            files = analysis.application.symbol_table.len(),
            classes = analysis.class_files.len(),
            call_edges = analysis.analyzer_graph.edge_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "analysis model ready"
        );
        Ok(analysis)
    }

    /// Indexes already-parsed analyzer output.
    pub fn from_raw(project_root: PathBuf, raw: RawApplication) -> Self {
        let RawApplication {
            symbol_table,
            call_graph,
            system_dependency_graph,
        } = raw;

        let mut class_files = IndexMap::new();
        for (file, unit) in &symbol_table {
            for class in unit.type_declarations.keys() {
                class_files
                    .entry(class.clone())
                    .or_insert_with(|| file.clone());
            }
        }

        let index = SymbolIndex {
            symbol_table: &symbol_table,
            class_files: &class_files,
        };
        let symbol_graph = callgraph::from_symbol_table(&index);
        let (call_graph, analyzer_graph) = match call_graph.as_deref() {
            Some(raw_edges) => {
                let edges = index.resolve_edges(raw_edges);
                let graph = callgraph::from_analyzer_edges(&edges);
                (edges, graph)
            }
            // Symbol-table-only output: the derived graph stands in.
            None => (Vec::new(), symbol_graph.clone()),
        };
        let system_dependency_graph = system_dependency_graph
            .as_deref()
            .map(|edges| index.resolve_edges(edges))
            .unwrap_or_default();

        Self {
            project_root,
            application: JApplication {
                symbol_table,
                call_graph,
                system_dependency_graph,
            },
            class_files,
            analyzer_graph,
            symbol_graph,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn application(&self) -> &JApplication {
        &self.application
    }

    pub fn symbol_table(&self) -> &IndexMap<String, JCompilationUnit> {
        &self.application.symbol_table
    }

    pub fn compilation_units(&self) -> Vec<&JCompilationUnit> {
        self.application.symbol_table.values().collect()
    }

    pub fn call_graph(&self, source: GraphSource) -> &CallGraph {
        match source {
            GraphSource::Analyzer => &self.analyzer_graph,
            GraphSource::SymbolTable => &self.symbol_graph,
        }
    }

    /// Flattened edges of the analyzer call graph.
    pub fn call_graph_edges(&self) -> Vec<CallEdgeSummary> {
        let graph = &self.analyzer_graph;
        graph
            .edges()
            .iter()
            .filter_map(|edge| {
                let source = graph.node(&edge.source)?;
                let target = graph.node(&edge.target)?;
                Some(CallEdgeSummary {
                    source_class: source.klass.clone(),
                    source_method_signature: source.method.signature.clone(),
                    source_method_body: source.method.code.clone(),
                    target_class: target.klass.clone(),
                    target_method_signature: target.method.signature.clone(),
                    target_method_body: target.method.code.clone(),
                    weight: edge.weight,
                })
            })
            .collect()
    }

    /// Methods that call `class#signature`.
    pub fn callers(
        &self,
        class: &str,
        signature: &str,
        source: GraphSource,
    ) -> Result<MethodCallers> {
        let target_method = self.method_detail(class, signature)?;
        let graph = self.call_graph(source);
        let key = method_key(class, signature);
        let caller_details = graph
            .in_edges(&key)
            .filter_map(|edge| {
                graph.node(&edge.source).map(|caller| CallRelation {
                    method: caller.clone(),
                    calling_lines: edge_lines(edge),
                })
            })
            .collect();
        Ok(MethodCallers {
            target_method,
            caller_details,
        })
    }

    /// Methods called by `class#signature`.
    pub fn callees(
        &self,
        class: &str,
        signature: &str,
        source: GraphSource,
    ) -> Result<MethodCallees> {
        let source_method = self.method_detail(class, signature)?;
        let graph = self.call_graph(source);
        let key = method_key(class, signature);
        let callee_details = graph
            .out_edges(&key)
            .filter_map(|edge| {
                graph.node(&edge.target).map(|callee| CallRelation {
                    method: callee.clone(),
                    calling_lines: edge_lines(edge),
                })
            })
            .collect();
        Ok(MethodCallees {
            source_method,
            callee_details,
        })
    }

    /// Every class once, in declaration order. A class declared in more than
    /// one file resolves to its first declaration, as in [`Self::class`].
    fn types(&self) -> impl Iterator<Item = (&str, &JType)> {
        self.class_files.iter().filter_map(|(name, file)| {
            let ty = self
                .application
                .symbol_table
                .get(file)?
                .type_declarations
                .get(name)?;
            Some((name.as_str(), ty))
        })
    }

    /// Class name → signature → callable, for every class.
    pub fn methods(&self) -> IndexMap<&str, &IndexMap<String, JCallable>> {
        self.types()
            .map(|(name, ty)| (name, &ty.callable_declarations))
            .collect()
    }

    pub fn classes(&self) -> IndexMap<&str, &JType> {
        self.types().collect()
    }

    /// Classes whose name contains any inclusion and no exclusion.
    /// No inclusions selects nothing.
    pub fn classes_by_criteria(
        &self,
        inclusions: &[String],
        exclusions: &[String],
    ) -> IndexMap<&str, &JType> {
        self.types()
            .filter(|(name, _)| inclusions.iter().any(|inc| name.contains(inc.as_str())))
            .filter(|(name, _)| !exclusions.iter().any(|exc| name.contains(exc.as_str())))
            .collect()
    }

    pub fn class(&self, class: &str) -> Result<&JType> {
        self.class_files
            .get(class)
            .and_then(|file| self.application.symbol_table.get(file))
            .and_then(|unit| unit.type_declarations.get(class))
            .ok_or_else(|| CocoaError::analysis(format!("class '{}' not found", class)))
    }

    pub fn method(&self, class: &str, signature: &str) -> Result<&JCallable> {
        self.class(class)?
            .callable_declarations
            .get(signature)
            .ok_or_else(|| {
                CocoaError::analysis(format!(
                    "method '{}' not found in class '{}'",
                    signature, class
                ))
            })
    }

    fn method_detail(&self, class: &str, signature: &str) -> Result<JMethodDetail> {
        let method = self.method(class, signature)?;
        Ok(JMethodDetail {
            method_declaration: method.declaration.clone(),
            klass: class.to_string(),
            method: method.clone(),
        })
    }

    pub fn method_parameters(&self, class: &str, signature: &str) -> Result<Vec<&str>> {
        Ok(self
            .method(class, signature)?
            .parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect())
    }

    /// Symbol-table key of the file declaring `class`.
    pub fn java_file(&self, class: &str) -> Result<&str> {
        self.class_files
            .get(class)
            .map(String::as_str)
            .ok_or_else(|| CocoaError::analysis(format!("class '{}' not found", class)))
    }

    /// Compilation unit by symbol-table key, project-relative path, or path suffix.
    pub fn compilation_unit(&self, file_path: &str) -> Result<&JCompilationUnit> {
        let table = &self.application.symbol_table;
        if let Some(unit) = table.get(file_path) {
            return Ok(unit);
        }
        let joined = self.project_root.join(file_path);
        if let Some(unit) = joined.to_str().and_then(|p| table.get(p)) {
            return Ok(unit);
        }
        let wanted = Path::new(file_path);
        table
            .iter()
            .find(|(key, _)| Path::new(key.as_str()).ends_with(wanted))
            .map(|(_, unit)| unit)
            .ok_or_else(|| {
                CocoaError::analysis(format!("no compilation unit for file '{}'", file_path))
            })
    }

    pub fn methods_in_class(&self, class: &str) -> Result<&IndexMap<String, JCallable>> {
        Ok(&self.class(class)?.callable_declarations)
    }

    pub fn constructors(&self, class: &str) -> Result<IndexMap<&str, &JCallable>> {
        Ok(self
            .class(class)?
            .callable_declarations
            .iter()
            .filter(|(_, c)| c.is_constructor)
            .map(|(sig, c)| (sig.as_str(), c))
            .collect())
    }

    pub fn fields(&self, class: &str) -> Result<&[JField]> {
        Ok(&self.class(class)?.field_declarations)
    }

    /// Nested types of `class` that are present in the symbol table.
    pub fn nested_classes(&self, class: &str) -> Result<Vec<&JType>> {
        Ok(self
            .class(class)?
            .nested_type_declarations
            .iter()
            .filter_map(|name| self.class(name).ok())
            .collect())
    }

    /// Classes that extend or implement `class`. The name need not be
    /// declared in the project, so library supertypes can be queried.
    pub fn sub_classes(&self, class: &str) -> IndexMap<&str, &JType> {
        self.types()
            .filter(|(_, ty)| {
                ty.extends_list.iter().any(|s| s == class)
                    || ty.implements_list.iter().any(|s| s == class)
            })
            .collect()
    }

    pub fn extended_classes(&self, class: &str) -> Result<&[String]> {
        Ok(&self.class(class)?.extends_list)
    }

    pub fn implemented_interfaces(&self, class: &str) -> Result<&[String]> {
        Ok(&self.class(class)?.implements_list)
    }

    /// `(caller, callee)` pairs for calls made by the methods of `class`,
    /// or by one method when `method` is given.
    pub fn class_call_graph(
        &self,
        class: &str,
        method: Option<&str>,
        source: GraphSource,
    ) -> Result<Vec<(&JMethodDetail, &JMethodDetail)>> {
        let ty = self.class(class)?;
        let signatures: Vec<&str> = match method {
            Some(sig) => {
                self.method(class, sig)?;
                vec![sig]
            }
            None => ty.callable_declarations.keys().map(String::as_str).collect(),
        };

        let graph = self.call_graph(source);
        let mut pairs = Vec::new();
        for sig in signatures {
            let key = method_key(class, sig);
            for edge in graph.out_edges(&key) {
                let caller = graph.node(&edge.source);
                let callee = graph.node(&edge.target);
                if let (Some(src), Some(tgt)) = (caller, callee) {
                    pairs.push((src, tgt));
                }
            }
        }
        Ok(pairs)
    }

    pub fn entry_point_classes(&self) -> IndexMap<&str, &JType> {
        self.types().filter(|(_, ty)| ty.is_entrypoint_class).collect()
    }

    /// Class name → signature → callable, for entry-point methods only.
    pub fn entry_point_methods(&self) -> IndexMap<&str, IndexMap<&str, &JCallable>> {
        self.types()
            .filter_map(|(name, ty)| {
                let entries: IndexMap<&str, &JCallable> = ty
                    .callable_declarations
                    .iter()
                    .filter(|(_, c)| c.is_entrypoint)
                    .map(|(sig, c)| (sig.as_str(), c))
                    .collect();
                (!entries.is_empty()).then_some((name, entries))
            })
            .collect()
    }

    /// Every source file in the symbol table with its comments stripped.
    pub fn source_without_comments(&self) -> Result<IndexMap<&str, String>> {
        let mut out = IndexMap::new();
        for key in self.application.symbol_table.keys() {
            let path = self.source_path(key);
            let source = fs::read_to_string(&path).map_err(|e| {
                CocoaError::analysis(format!("cannot read source '{}': {}", path.display(), e))
            })?;
            out.insert(key.as_str(), strip_comments(&source)?);
        }
        Ok(out)
    }

    fn source_path(&self, key: &str) -> PathBuf {
        let path = Path::new(key);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    /// `<class>#<signature>` → body, for methods carrying a test annotation.
    pub fn test_methods(&self) -> IndexMap<String, &str> {
        self.types()
            .flat_map(|(class, ty)| {
                ty.callable_declarations
                    .iter()
                    .filter(|(_, c)| c.annotations.iter().any(|a| is_test_annotation(a)))
                    .map(move |(sig, c)| (method_key(class, sig), c.code.as_str()))
            })
            .collect()
    }

    /// Methods performing CRUD operations, optionally of one kind only.
    pub fn crud_operations(&self, kind: Option<CrudOperationType>) -> Vec<CrudUsage> {
        let mut usages = Vec::new();
        for (class, ty) in self.types() {
            for (sig, callable) in &ty.callable_declarations {
                let ops: Vec<JCRUDOperation> = callable
                    .crud_operations
                    .iter()
                    .filter(|op| kind.is_none() || op.operation_type == kind)
                    .cloned()
                    .collect();
                if !ops.is_empty() {
                    usages.push(CrudUsage {
                        class_name: class.to_string(),
                        method_signature: sig.clone(),
                        crud_operations: ops,
                    });
                }
            }
        }
        usages
    }

    pub fn comments_in_method(&self, class: &str, signature: &str) -> Result<&[JComment]> {
        Ok(&self.method(class, signature)?.comments)
    }

    pub fn comments_in_class(&self, class: &str) -> Result<&[JComment]> {
        Ok(&self.class(class)?.comments)
    }

    pub fn comments_in_file(&self, file_path: &str) -> Result<&[JComment]> {
        Ok(&self.compilation_unit(file_path)?.comments)
    }

    /// File → every comment in the file.
    pub fn all_comments(&self) -> IndexMap<&str, &[JComment]> {
        self.application
            .symbol_table
            .iter()
            .map(|(file, unit)| (file.as_str(), unit.comments.as_slice()))
            .collect()
    }

    /// File → Javadoc comments, for files that have any.
    pub fn all_docstrings(&self) -> IndexMap<&str, Vec<&JComment>> {
        self.application
            .symbol_table
            .iter()
            .filter_map(|(file, unit)| {
                let docs: Vec<&JComment> = unit.comments.iter().filter(|c| c.is_javadoc).collect();
                (!docs.is_empty()).then_some((file.as_str(), docs))
            })
            .collect()
    }
}

fn edge_lines(edge: &GraphEdge) -> Vec<i64> {
    edge.attributes
        .get("calling_lines")
        .and_then(|v| v.as_array())
        .map(|lines| lines.iter().filter_map(|l| l.as_i64()).collect())
        .unwrap_or_default()
}

/// Matches `@Test`, `@org.junit.Test`, `@Test(expected = ...)` and friends.
fn is_test_annotation(annotation: &str) -> bool {
    let name = annotation.trim_start_matches('@');
    let name = name.split('(').next().unwrap_or(name).trim();
    let simple = name.rsplit('.').next().unwrap_or(name);
    TEST_ANNOTATIONS.contains(&simple)
}
