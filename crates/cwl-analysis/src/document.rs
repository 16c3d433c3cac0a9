//! A fully analyzed CWL document.
//!
//! [`Document::analyze`] runs the complete pipeline once (parse, version
//! selection, walk) and the result answers every query from the artifacts
//! that single pass produced. Queries never re-read the source text.

use cwl_ast::Position;
use cwl_ast::SourceNode;
use tracing::debug;
use url::Url;

use crate::Diagnostic;
use crate::diagnostics;
use crate::graph::TypeGraph;
use crate::lookup::LookupEntry;
use crate::lookup::LookupTable;
use crate::schema;
use crate::walker;
use crate::walker::Symbol;
use crate::walker::WalkOutcome;
use crate::workflow::WorkflowModel;

/// A CWL document analyzed against the schema of its declared version.
#[derive(Debug)]
pub struct Document {
    /// The document's URI, if it has one.
    uri: Option<Url>,
    /// The type graph the document was validated against.
    graph: &'static TypeGraph,
    /// The parsed source tree; `None` when the text did not parse.
    root: Option<SourceNode>,
    /// The diagnostics, in discovery order.
    diagnostics: Vec<Diagnostic>,
    /// The cursor-addressable lookup table.
    lookup: LookupTable,
    /// The symbol outline.
    symbols: Vec<Symbol>,
    /// The workflow connectivity model, when the document is a workflow.
    workflow: Option<WorkflowModel>,
    /// The expression library registered by `InlineJavascriptRequirement`.
    expression_lib: Vec<String>,
}

impl Document {
    /// Analyzes a document's text.
    ///
    /// A YAML failure that survives self-healing yields a document with a
    /// single parse diagnostic; an unrecognized `cwlVersion` warns and
    /// falls back to the latest supported schema. Analysis itself never
    /// fails: partial documents are the common case during editing.
    pub fn analyze(text: &str, uri: Option<&Url>) -> Self {
        let root = match cwl_ast::parse(text) {
            Ok(root) => root,
            Err(error) => {
                debug!("document did not parse: {error}");
                return Self {
                    uri: uri.cloned(),
                    graph: schema::latest(),
                    root: None,
                    diagnostics: vec![diagnostics::yaml_error(&error)],
                    lookup: LookupTable::default(),
                    symbols: Vec::new(),
                    workflow: None,
                    expression_lib: Vec::new(),
                };
            }
        };

        let declared = root
            .as_mapping()
            .and_then(|mapping| mapping.value("cwlVersion"));
        let mut diagnostics = Vec::new();
        let graph = match declared.and_then(SourceNode::as_str) {
            Some(version) => match schema::for_version(version) {
                Some(graph) => graph,
                None => {
                    let range = declared.map(SourceNode::range).unwrap_or_default();
                    diagnostics.push(diagnostics::unsupported_cwl_version(
                        version,
                        schema::LATEST_VERSION,
                        range,
                    ));
                    schema::latest()
                }
            },
            None => schema::latest(),
        };

        let WalkOutcome {
            diagnostics: walk_diagnostics,
            lookup,
            symbols,
            workflow,
            expression_lib,
        } = walker::walk(&root, graph, uri);
        diagnostics.extend(walk_diagnostics);

        Self {
            uri: uri.cloned(),
            graph,
            root: Some(root),
            diagnostics,
            lookup,
            symbols,
            workflow,
            expression_lib,
        }
    }

    /// Gets the document's URI.
    pub fn uri(&self) -> Option<&Url> {
        self.uri.as_ref()
    }

    /// Gets the type graph the document was validated against.
    pub fn graph(&self) -> &TypeGraph {
        self.graph
    }

    /// Gets the parsed source tree, if the text parsed.
    pub fn root(&self) -> Option<&SourceNode> {
        self.root.as_ref()
    }

    /// Gets the diagnostics, in discovery order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Resolves a cursor position to its lookup entry.
    pub fn lookup(&self, position: Position) -> Option<&LookupEntry> {
        self.lookup.resolve(position)
    }

    /// Gets the full lookup table.
    pub fn lookup_table(&self) -> &LookupTable {
        &self.lookup
    }

    /// Gets the symbol outline.
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Gets the workflow connectivity model, when the document is a
    /// workflow.
    pub fn workflow(&self) -> Option<&WorkflowModel> {
        self.workflow.as_ref()
    }

    /// Gets the expression library registered by
    /// `InlineJavascriptRequirement`.
    pub fn expression_lib(&self) -> &[String] {
        &self.expression_lib
    }
}
