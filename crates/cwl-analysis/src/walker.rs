//! The recursive document walker and validator.
//!
//! The walker descends the positioned source tree against the type graph,
//! emitting diagnostics, registering lookup entries for key and value
//! ranges, building the symbol outline, and assembling the workflow
//! connectivity model when the document is a `Workflow`.
//!
//! Structural mismatches never abort the walk: partial and invalid
//! documents are the common case during live editing, so every node is
//! visited and contributes whatever entries and diagnostics it can.

use std::path::Path;
use std::path::PathBuf;

use cwl_ast::IdentityView;
use cwl_ast::Mapping;
use cwl_ast::Range;
use cwl_ast::SourceNode;
use indexmap::IndexMap;
use indexmap::IndexSet;
use tracing::debug;
use url::Url;

use crate::Diagnostic;
use crate::diagnostics;
use crate::graph::Field;
use crate::graph::ImportKind;
use crate::graph::TypeGraph;
use crate::graph::TypeHandle;
use crate::graph::TypeIndex;
use crate::graph::TypeNode;
use crate::lookup::LookupContext;
use crate::lookup::LookupEntry;
use crate::lookup::LookupTable;
use crate::matcher::MapContext;
use crate::matcher::TypeEnv;
use crate::matcher::infer_type;
use crate::matcher::strip_type_suffixes;
use crate::workflow::ConnectionError;
use crate::workflow::StepInterface;
use crate::workflow::WorkflowModel;

/// The names of the process types a document's root may be.
const PROCESS_TYPE_NAMES: &[&str] = &["CommandLineTool", "ExpressionTool", "Workflow"];

/// Top-level keys that are never validated as fields.
const SKIPPED_KEYS: &[&str] = &["$schemas", "$namespaces"];

/// The kind of an outline symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    /// A top-level CWL section.
    Section,
    /// A workflow step.
    Step,
}

/// An entry of the document's symbol outline.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// The symbol's display name.
    pub name: String,
    /// The symbol's full range (key through value).
    pub range: Range,
    /// The range to select when navigating to the symbol.
    pub selection: Range,
    /// The symbol's kind.
    pub kind: SymbolKind,
    /// The symbol's children (per-step entries under `steps`).
    pub children: Vec<Symbol>,
}

/// Everything one walk of a document produces.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// The diagnostics, in discovery order.
    pub diagnostics: Vec<Diagnostic>,
    /// The cursor-addressable lookup table.
    pub lookup: LookupTable,
    /// The symbol outline.
    pub symbols: Vec<Symbol>,
    /// The workflow connectivity model, when the document is a workflow.
    pub workflow: Option<WorkflowModel>,
    /// The JavaScript expression library registered by
    /// `InlineJavascriptRequirement`, for callers that preview expressions.
    pub expression_lib: Vec<String>,
}

/// The mutable state threaded through the recursive walk.
///
/// An explicit context instead of shared mutable accumulators: every sink
/// the walk writes to is a field here, passed by `&mut` through the
/// recursion.
#[derive(Debug)]
struct WalkContext {
    /// The diagnostics sink.
    diagnostics: Vec<Diagnostic>,
    /// The lookup-table sink.
    lookup: LookupTable,
    /// The symbol outline sink.
    symbols: Vec<Symbol>,
    /// The workflow model of the innermost workflow being walked.
    workflow: Option<WorkflowModel>,
    /// The model of the outermost (document-level) workflow, once its walk
    /// has completed.
    finished_workflow: Option<WorkflowModel>,
    /// User-defined types registered by `SchemaDefRequirement`.
    user_types: IndexMap<String, TypeNode>,
    /// The expression library registered by `InlineJavascriptRequirement`.
    expression_lib: Vec<String>,
    /// The namespace prefixes declared by `$namespaces`.
    namespaces: IndexMap<String, String>,
    /// The id of the step currently being walked, if any.
    current_step: Option<String>,
    /// Whether the walk is inside a `hints` section, where unknown classes
    /// warn instead of erroring.
    in_hints: bool,
    /// The directory linked files resolve against.
    doc_dir: Option<PathBuf>,
}

impl WalkContext {
    /// Creates a context for a document at the given URI.
    fn new(uri: Option<&Url>) -> Self {
        let doc_dir = uri
            .and_then(|uri| uri.to_file_path().ok())
            .and_then(|path| path.parent().map(Path::to_path_buf));
        Self {
            diagnostics: Vec::new(),
            lookup: LookupTable::default(),
            symbols: Vec::new(),
            workflow: None,
            finished_workflow: None,
            user_types: IndexMap::new(),
            expression_lib: Vec::new(),
            namespaces: IndexMap::new(),
            current_step: None,
            in_hints: false,
            doc_dir,
        }
    }

    /// Registers a lookup entry.
    fn register(&mut self, range: Range, node: TypeHandle, context: LookupContext) {
        self.lookup.register(LookupEntry {
            range,
            node,
            context,
        });
    }

    /// Resolves a linked-file path against the document's directory.
    fn resolve_path(&self, path: &str) -> Option<PathBuf> {
        let raw = Path::new(path);
        if raw.is_absolute() {
            return Some(raw.to_path_buf());
        }
        self.doc_dir.as_ref().map(|dir| dir.join(raw))
    }
}

/// Walks a parsed document against a type graph.
pub fn walk(root: &SourceNode, graph: &TypeGraph, uri: Option<&Url>) -> WalkOutcome {
    let mut ctx = WalkContext::new(uri);

    match root {
        SourceNode::Null { .. } => {
            // An empty document is a valid document with zero fields.
        }
        SourceNode::Mapping(_) => {
            let candidates: Vec<TypeIndex> = PROCESS_TYPE_NAMES
                .iter()
                .filter_map(|name| graph.lookup(name))
                .collect();
            let inference = infer(&ctx, graph, root, None, &candidates, None);
            let resolved = inference.resolved;
            walk_node(graph, &mut ctx, root, &resolved, None, None, true);
        }
        _ => {
            ctx.diagnostics
                .push(diagnostics::not_a_cwl_document(root.range()));
        }
    }

    WalkOutcome {
        diagnostics: ctx.diagnostics,
        lookup: ctx.lookup,
        symbols: ctx.symbols,
        workflow: ctx.finished_workflow,
        expression_lib: ctx.expression_lib,
    }
}

/// Runs type inference with the walk's current user-type registry.
fn infer(
    ctx: &WalkContext,
    graph: &TypeGraph,
    node: &SourceNode,
    key: Option<&str>,
    candidates: &[TypeIndex],
    map_ctx: Option<MapContext<'_>>,
) -> crate::matcher::Inference {
    infer_type(
        TypeEnv {
            graph,
            user_types: &ctx.user_types,
        },
        node,
        key,
        candidates,
        map_ctx,
    )
}

/// Walks one node under its resolved type.
///
/// `key` is the projection key the node sits under in a list-as-map field;
/// `map_ctx` is that projection's subject/predicate context.
fn walk_node(
    graph: &TypeGraph,
    ctx: &mut WalkContext,
    node: &SourceNode,
    resolved: &TypeHandle,
    key: Option<&str>,
    map_ctx: Option<MapContext<'_>>,
    is_root: bool,
) {
    match resolved.resolve(graph) {
        TypeNode::Record {
            name,
            fields,
            required,
            ..
        } => {
            walk_record(
                graph, ctx, node, resolved, name, fields, required, key, map_ctx, is_root,
            );
            // Containers register after their children so the linear lookup
            // scan finds the innermost entry first.
            ctx.register(node.range(), resolved.clone(), LookupContext::Value);
        }
        TypeNode::Enum { symbols, .. } => {
            ctx.register(node.range(), resolved.clone(), LookupContext::Value);
            if let Some(value) = node.as_str() {
                if !symbols.iter().any(|symbol| symbol == value) {
                    ctx.diagnostics
                        .push(diagnostics::expecting_one_of(symbols, node.range()));
                }
            }
        }
        TypeNode::DataType { symbols, .. } => {
            let mut options: Vec<String> = symbols.clone();
            options.extend(ctx.user_types.keys().cloned());
            ctx.register(
                node.range(),
                resolved.clone(),
                LookupContext::Types {
                    options: options.clone(),
                },
            );
            if let Some(value) = node.as_str() {
                let base = strip_type_suffixes(value);
                let known = symbols.iter().any(|symbol| symbol == base)
                    || ctx.user_types.contains_key(base)
                    || graph.lookup(base).is_some();
                if !known {
                    ctx.diagnostics
                        .push(diagnostics::expecting_one_of(&options, node.range()));
                }
            }
        }
        TypeNode::Expression => {
            let text = node.as_str().unwrap_or_default().to_string();
            ctx.register(
                node.range(),
                resolved.clone(),
                LookupContext::Preview { text },
            );
        }
        TypeNode::Array { items, .. } => {
            let items = items.clone();
            if let Some(children) = node.as_sequence() {
                for child in children {
                    let inference = infer(ctx, graph, child, None, &items, None);
                    walk_node(graph, ctx, child, &inference.resolved, None, None, false);
                }
            }
            ctx.register(node.range(), resolved.clone(), LookupContext::Value);
        }
        TypeNode::ListOrMap {
            items,
            subject,
            predicate,
            ..
        } => {
            let items = items.clone();
            let subject = subject.clone();
            let predicate = predicate.clone();
            walk_list_or_map(graph, ctx, node, &items, &subject, predicate.as_deref());
            ctx.register(node.range(), resolved.clone(), LookupContext::Value);
        }
        TypeNode::Namespaced { prefix, .. } => {
            let prefix = prefix.clone();
            ctx.register(node.range(), resolved.clone(), LookupContext::Value);
            if !ctx.namespaces.contains_key(&prefix) {
                ctx.diagnostics
                    .push(diagnostics::unresolved_namespace(&prefix, node.range()));
            }
        }
        TypeNode::ImportInclude { kind } => {
            let kind = *kind;
            walk_import(ctx, node, resolved, kind);
        }
        TypeNode::Unknown { expected } => {
            let expected = expected.clone();
            ctx.register(node.range(), resolved.clone(), LookupContext::Value);
            let class = node
                .as_mapping()
                .and_then(|mapping| mapping.value("class"))
                .and_then(SourceNode::as_str)
                .unwrap_or(key.unwrap_or("<none>"));
            // Unknown hint classes are tolerated by executors, so under
            // `hints` the mismatch only warns.
            let diagnostic = if ctx.in_hints {
                diagnostics::unknown_hint_class(class, node.range())
            } else {
                diagnostics::unknown_class(class, &expected, node.range())
            };
            ctx.diagnostics.push(diagnostic);
        }
        TypeNode::Base { .. } | TypeNode::Any => {
            ctx.register(node.range(), resolved.clone(), LookupContext::Value);
        }
        TypeNode::LinkedFile { .. } | TypeNode::LinkedSchemaDef { .. } => {
            // Linked nodes are synthesized with their entry already
            // registered by the field that resolved them.
        }
    }
}

/// Walks a `$import`/`$include` directive node.
fn walk_import(ctx: &mut WalkContext, node: &SourceNode, resolved: &TypeHandle, kind: ImportKind) {
    let directive = match kind {
        ImportKind::Import => "$import",
        ImportKind::Include => "$include",
    };
    let Some(target) = node
        .as_mapping()
        .and_then(|mapping| mapping.value(directive))
    else {
        return;
    };
    let Some(path) = target.as_str() else {
        ctx.diagnostics
            .push(diagnostics::missing_linked_file("<empty>", target.range()));
        return;
    };

    match ctx.resolve_path(path) {
        Some(full) => {
            let exists = full.is_file();
            if !exists {
                ctx.diagnostics
                    .push(diagnostics::missing_linked_file(path, target.range()));
            }
            ctx.register(
                target.range(),
                resolved.clone(),
                LookupContext::Linked { path: full, exists },
            );
        }
        None => {
            ctx.diagnostics
                .push(diagnostics::missing_linked_file(path, target.range()));
        }
    }
}

/// Walks a list-or-map field's items.
fn walk_list_or_map(
    graph: &TypeGraph,
    ctx: &mut WalkContext,
    node: &SourceNode,
    items: &[TypeIndex],
    subject: &str,
    predicate: Option<&str>,
) {
    let Some(view) = IdentityView::project(node, subject) else {
        ctx.diagnostics
            .push(diagnostics::expecting_list_or_map(node.range()));
        return;
    };

    for error in view.errors() {
        ctx.diagnostics.push(diagnostics::identity_error(error));
    }

    // Map form supplies the subject through the key; list form carries it
    // inline, so no subject exemption applies there.
    let map_ctx = if view.from_list() {
        None
    } else {
        Some(MapContext { subject, predicate })
    };

    let entries: Vec<(String, Range, SourceNode)> = view
        .iter()
        .map(|(key, entry)| (key.to_string(), entry.key_range, entry.node.clone()))
        .collect();

    for (key, key_range, child) in &entries {
        // The `requirements: {DockerRequirement: {...}}` shorthand makes
        // the key itself a class name; offer the candidate classes there.
        if subject == "class" && map_ctx.is_some() {
            if let Some(first) = items.first() {
                let options = graph.candidate_names(items);
                ctx.register(
                    *key_range,
                    TypeHandle::Indexed(*first),
                    LookupContext::Key { options, doc: None },
                );
            }
        }

        let inference = infer(ctx, graph, child, Some(key), items, map_ctx);
        walk_node(
            graph,
            ctx,
            child,
            &inference.resolved,
            Some(key),
            map_ctx,
            false,
        );
    }
}

/// The field-walk order of a record: `requirements` first (its schema-def
/// and expression-library side effects must be visible to every other
/// field), then `when` (its referenced ports fold into the step's input
/// set), then document order.
fn ordered_keys(mapping: &Mapping) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(mapping.len());
    for front in ["requirements", "when"] {
        if mapping.contains_key(front) {
            keys.push(front.to_string());
        }
    }
    for key in mapping.keys() {
        if key != "requirements" && key != "when" {
            keys.push(key.to_string());
        }
    }
    keys
}

/// Walks a record-typed node.
#[allow(clippy::too_many_arguments)]
fn walk_record(
    graph: &TypeGraph,
    ctx: &mut WalkContext,
    node: &SourceNode,
    resolved: &TypeHandle,
    name: &str,
    fields: &IndexMap<String, Field>,
    required: &[String],
    key: Option<&str>,
    map_ctx: Option<MapContext<'_>>,
    is_root: bool,
) {
    let Some(mapping) = node.as_mapping() else {
        walk_scalar_record_shorthand(graph, ctx, node, fields, map_ctx);
        return;
    };

    // Entering a workflow creates its connectivity model up front, from the
    // complete document text, so forward references to later-declared steps
    // are legal by construction.
    let is_workflow = name == "Workflow";
    let saved_workflow = if is_workflow {
        let saved = ctx.workflow.take();
        let model = build_workflow_model(ctx, mapping);
        ctx.workflow = Some(model);
        Some(saved)
    } else {
        None
    };

    // A step's id comes from its projection key in map form or its inline
    // field in list form.
    let saved_step = if name == "WorkflowStep" {
        let step_id = key
            .map(str::to_string)
            .or_else(|| id_of(node).map(str::to_string));
        Some(std::mem::replace(&mut ctx.current_step, step_id))
    } else {
        None
    };

    // Namespace prefixes are declared wherever the author likes, so they
    // register before any field can reference one.
    if let Some(ns) = mapping.value("$namespaces").and_then(SourceNode::as_mapping) {
        for (prefix, ns_entry) in ns.iter() {
            let uri = ns_entry.value.as_str().unwrap_or_default().to_string();
            ctx.namespaces.insert(prefix.to_string(), uri);
        }
    }

    for field_key in ordered_keys(mapping) {
        let entry = mapping
            .get(&field_key)
            .expect("ordered keys come from the mapping");
        let key_range = entry.key_range;
        let value = entry.value.clone();

        if SKIPPED_KEYS.contains(&field_key.as_str()) {
            continue;
        }
        // Namespaced and tag-prefixed keys are extensions, not typos.
        if field_key.contains(':') || field_key.starts_with('$') {
            continue;
        }

        let Some(field) = fields.get(&field_key) else {
            ctx.diagnostics
                .push(diagnostics::unknown_field(&field_key, key_range));
            continue;
        };

        // Key-position completion offers the record's other fields; hover
        // shows this field's documentation.
        let absent: Vec<String> = fields
            .keys()
            .filter(|name| !mapping.contains_key(name.as_str()))
            .cloned()
            .collect();
        ctx.register(
            key_range,
            resolved.clone(),
            LookupContext::Key {
                options: absent,
                doc: field.doc.clone(),
            },
        );

        if (field_key == "requirements" || field_key == "hints") && !value.is_null() {
            harvest_requirements(ctx, &value);
        }

        // Workflow connectivity fields get dedicated handling; everything
        // else goes through generic inference.
        if ctx.workflow.is_some() || ctx.current_step.is_some() {
            match field_key.as_str() {
                "source" | "outputSource" => {
                    walk_connection_field(ctx, &value, &field_key);
                    continue;
                }
                "scatter" => {
                    walk_scatter_field(ctx, &value);
                    continue;
                }
                "run" => {
                    if walk_run_field(ctx, &value) {
                        continue;
                    }
                }
                "in" => {
                    check_step_input_ids(ctx, &value);
                }
                _ => {}
            }
        }

        let allowed = field.allowed.clone();
        let inference = infer(ctx, graph, &value, None, &allowed, None);
        let field_resolved = inference.resolved;
        let saved_hints = ctx.in_hints;
        ctx.in_hints = saved_hints || field_key == "hints";
        walk_node(graph, ctx, &value, &field_resolved, None, None, false);
        ctx.in_hints = saved_hints;
    }

    // Required fields absent from the document, minus any field the
    // projection key supplies implicitly.
    for missing in required {
        if mapping.contains_key(missing) {
            continue;
        }
        if map_ctx.is_some_and(|m| m.subject == missing) {
            continue;
        }
        let at = mapping
            .key_range("class")
            .unwrap_or_else(|| Range::at(node.range().start));
        ctx.diagnostics
            .push(diagnostics::missing_required_section(missing, at));
    }

    if is_root {
        build_symbols(ctx, mapping);
    }

    if let Some(saved) = saved_step {
        ctx.current_step = saved;
    }
    if let Some(saved) = saved_workflow {
        let finished = ctx.workflow.take();
        ctx.workflow = saved;
        // Only the outermost workflow's model survives the walk; an inline
        // sub-workflow restores its parent's model instead.
        if ctx.workflow.is_none() {
            ctx.finished_workflow = finished;
        }
    }
}

/// Walks a scalar standing for a record via map-predicate shorthand
/// (`in: {reads: someSource}`).
fn walk_scalar_record_shorthand(
    graph: &TypeGraph,
    ctx: &mut WalkContext,
    node: &SourceNode,
    fields: &IndexMap<String, Field>,
    map_ctx: Option<MapContext<'_>>,
) {
    let Some(predicate) = map_ctx.and_then(|m| m.predicate) else {
        return;
    };
    let Some(field) = fields.get(predicate) else {
        return;
    };

    if predicate == "source" {
        walk_connection_field(ctx, node, "source");
        return;
    }

    let allowed = field.allowed.clone();
    let inference = infer(ctx, graph, node, None, &allowed, None);
    let resolved = inference.resolved;
    walk_node(graph, ctx, node, &resolved, None, None, false);
}

/// Validates a `source`/`outputSource` value (a scalar or a list of
/// scalars) against the workflow model, registering port-completion
/// entries either way.
fn walk_connection_field(ctx: &mut WalkContext, node: &SourceNode, field: &str) {
    let values: Vec<&SourceNode> = match node {
        SourceNode::Sequence { items, .. } => items.iter().collect(),
        other => vec![other],
    };
    // `outputSource` sits on a workflow output, outside any step.
    let current_step = if field == "outputSource" {
        None
    } else {
        ctx.current_step.clone()
    };

    let Some(model) = ctx.workflow.clone() else {
        return;
    };
    let options = model.connection_options(current_step.as_deref());

    for value in values {
        ctx.register(
            value.range(),
            TypeHandle::synthesized(TypeNode::Base {
                name: "string".to_string(),
            }),
            LookupContext::Ports {
                options: options.clone(),
            },
        );

        let Some(text) = value.as_str() else {
            continue;
        };

        if let Err(error) = model.validate_connection(text, current_step.as_deref()) {
            let range = value.range();
            let diagnostic = match (&error, field) {
                (ConnectionError::NoSuchWorkflowInput { id }, _) => {
                    diagnostics::no_such_workflow_input(id, range)
                }
                (ConnectionError::SelfReference { step }, _) => {
                    diagnostics::step_self_reference(step, range)
                }
                (ConnectionError::NoSuchStep { step }, _) => {
                    diagnostics::no_such_step(step, range)
                }
                (ConnectionError::NoSuchPort { step, port }, "outputSource") => {
                    diagnostics::no_output_port(step, port, range)
                }
                (ConnectionError::NoSuchPort { step, port }, _) => {
                    diagnostics::no_port_called(step, port, range)
                }
            };
            ctx.diagnostics.push(diagnostic);
        }
    }
}

/// Validates a step's `scatter` names against its declared input ports.
fn walk_scatter_field(ctx: &mut WalkContext, node: &SourceNode) {
    let Some(step_id) = ctx.current_step.clone() else {
        return;
    };
    let Some(inputs) = ctx
        .workflow
        .as_ref()
        .and_then(|model| model.step_interfaces.get(&step_id))
        .map(|interface| interface.inputs.clone())
    else {
        return;
    };
    let declared: Vec<&String> = inputs.iter().collect();

    let values: Vec<&SourceNode> = match node {
        SourceNode::Sequence { items, .. } => items.iter().collect(),
        other => vec![other],
    };
    for value in values {
        let Some(text) = value.as_str() else {
            continue;
        };
        if !inputs.contains(text) {
            ctx.diagnostics.push(diagnostics::scatter_unknown_port(
                text,
                &declared,
                value.range(),
            ));
        }
    }
}

/// Walks a step's `run` field when it is a linked-file path.
///
/// Returns `true` if the field was fully handled here; an inline process
/// mapping falls through to generic walking, where its `class` field
/// resolves it.
fn walk_run_field(ctx: &mut WalkContext, node: &SourceNode) -> bool {
    let Some(path) = node.as_str() else {
        return false;
    };

    match ctx.resolve_path(path) {
        Some(full) => {
            let exists = full.is_file();
            if !exists {
                ctx.diagnostics
                    .push(diagnostics::missing_linked_file(path, node.range()));
            } else if let Err(error) = std::fs::read_to_string(&full) {
                ctx.diagnostics.push(diagnostics::unreadable_linked_file(
                    path,
                    &error.to_string(),
                    node.range(),
                ));
            }
            ctx.register(
                node.range(),
                TypeHandle::synthesized(TypeNode::LinkedFile {
                    path: path.to_string(),
                }),
                LookupContext::Linked { path: full, exists },
            );
        }
        None => {
            ctx.diagnostics
                .push(diagnostics::missing_linked_file(path, node.range()));
        }
    }
    true
}

/// Checks the keys of a step's `in` section against the step's declared
/// input ports.
fn check_step_input_ids(ctx: &mut WalkContext, node: &SourceNode) {
    let Some(step_id) = ctx.current_step.clone() else {
        return;
    };
    let Some(interface) = ctx
        .workflow
        .as_ref()
        .and_then(|model| model.step_interfaces.get(&step_id))
        .cloned()
    else {
        return;
    };
    let Some(view) = IdentityView::project(node, "id") else {
        return;
    };

    let declared: Vec<&String> = interface.inputs.iter().collect();
    for (port, entry) in view.iter() {
        if !interface.inputs.contains(port) {
            ctx.diagnostics.push(diagnostics::no_input_port(
                &step_id,
                port,
                &declared,
                entry.key_range,
            ));
        }
    }
}

/// Gets the inline `id` of a record node, if it has one.
fn id_of(node: &SourceNode) -> Option<&str> {
    node.as_mapping()
        .and_then(|mapping| mapping.value("id"))
        .and_then(SourceNode::as_str)
}

/// Builds the connectivity model of a workflow record.
///
/// Model construction is silent: problems it encounters (a missing run
/// file, say) are diagnosed by the field walk that follows, at the precise
/// offending range.
fn build_workflow_model(ctx: &WalkContext, mapping: &Mapping) -> WorkflowModel {
    let mut model = WorkflowModel::default();

    if let Some(inputs) = mapping.value("inputs") {
        if let Some(view) = IdentityView::project(inputs, "id") {
            model.input_ids = view.keys().map(str::to_string).collect();
        }
    }
    if let Some(outputs) = mapping.value("outputs") {
        if let Some(view) = IdentityView::project(outputs, "id") {
            model.output_ids = view.keys().map(str::to_string).collect();
        }
    }

    if let Some(steps) = mapping.value("steps") {
        if let Some(view) = IdentityView::project(steps, "id") {
            for (step_id, entry) in view.iter() {
                let mut interface = StepInterface::default();
                if let Some(step) = entry.node.as_mapping() {
                    if let Some(run) = step.value("run") {
                        interface = resolve_step_interface(ctx, run);
                    }
                    // A step's `when` may reference input ports not
                    // otherwise declared; fold them into the effective
                    // input set before connections are validated.
                    if let Some(when) = step.value("when").and_then(SourceNode::as_str) {
                        for referenced in harvest_input_references(when) {
                            interface.inputs.insert(referenced);
                        }
                    }
                }
                model.step_interfaces.insert(step_id.to_string(), interface);
            }
        }
    }

    model
}

/// Resolves a step's `run` value to its input/output port interface.
///
/// An inline mapping is read directly; a scalar path is loaded from disk
/// and parsed. Failures degrade to an empty interface, never an error.
fn resolve_step_interface(ctx: &WalkContext, run: &SourceNode) -> StepInterface {
    match run {
        SourceNode::Mapping(_) => interface_of_process(run),
        SourceNode::Scalar { value, .. } => {
            let Some(path) = ctx.resolve_path(value) else {
                return StepInterface::default();
            };
            let Ok(text) = std::fs::read_to_string(&path) else {
                return StepInterface::default();
            };
            match cwl_ast::parse(&text) {
                Ok(process) => interface_of_process(&process),
                Err(error) => {
                    debug!(
                        "linked process `{path}` did not parse: {error}",
                        path = path.display()
                    );
                    StepInterface::default()
                }
            }
        }
        _ => StepInterface::default(),
    }
}

/// Extracts the input/output port ids of a process node.
fn interface_of_process(process: &SourceNode) -> StepInterface {
    let mut interface = StepInterface::default();
    if let Some(mapping) = process.as_mapping() {
        if let Some(inputs) = mapping.value("inputs") {
            if let Some(view) = IdentityView::project(inputs, "id") {
                interface.inputs = view.keys().map(str::to_string).collect();
            }
        }
        if let Some(outputs) = mapping.value("outputs") {
            if let Some(view) = IdentityView::project(outputs, "id") {
                interface.outputs = view.keys().map(str::to_string).collect();
            }
        }
    }
    interface
}

/// Extracts the `inputs.<name>` references of a CWL expression.
fn harvest_input_references(expression: &str) -> IndexSet<String> {
    let mut referenced = IndexSet::new();
    let mut rest = expression;
    while let Some(at) = rest.find("inputs.") {
        let tail = &rest[at + "inputs.".len()..];
        let name: String = tail
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if !name.is_empty() {
            referenced.insert(name);
        }
        rest = tail;
    }
    referenced
}

/// Harvests the side effects of a `requirements`/`hints` section: the
/// user-defined types of `SchemaDefRequirement` and the expression library
/// of `InlineJavascriptRequirement`.
fn harvest_requirements(ctx: &mut WalkContext, node: &SourceNode) {
    let Some(view) = IdentityView::project(node, "class") else {
        return;
    };

    let entries: Vec<(String, SourceNode)> = view
        .iter()
        .map(|(key, entry)| (key.to_string(), entry.node.clone()))
        .collect();

    for (key, item) in entries {
        let class = if view.from_list() {
            id_of_class(&item).unwrap_or_default()
        } else {
            key.clone()
        };

        match class.as_str() {
            "SchemaDefRequirement" => {
                let Some(types) = item.as_mapping().and_then(|m| m.value("types")) else {
                    continue;
                };
                let Some(items) = types.as_sequence() else {
                    continue;
                };
                for type_def in items {
                    harvest_schema_def(ctx, type_def);
                }
            }
            "InlineJavascriptRequirement" => {
                let Some(lib) = item.as_mapping().and_then(|m| m.value("expressionLib")) else {
                    continue;
                };
                if let Some(entries) = lib.as_sequence() {
                    for entry in entries {
                        if let Some(text) = entry.as_str() {
                            ctx.expression_lib.push(text.to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Gets the `class` of a requirement item written in list form.
fn id_of_class(node: &SourceNode) -> Option<String> {
    node.as_mapping()
        .and_then(|mapping| mapping.value("class"))
        .and_then(SourceNode::as_str)
        .map(str::to_string)
}

/// Registers one user-defined type from a `SchemaDefRequirement` entry.
///
/// A `$import` entry is loaded from disk and may define one type or a list
/// of them; definitions register shallowly (name, kind, and enum symbols),
/// which is what type-expression matching and completion consume.
fn harvest_schema_def(ctx: &mut WalkContext, type_def: &SourceNode) {
    let Some(mapping) = type_def.as_mapping() else {
        return;
    };

    if let Some(import) = mapping.value("$import").and_then(SourceNode::as_str) {
        let Some(full) = ctx.resolve_path(import) else {
            return;
        };
        let exists = full.is_file();
        ctx.register(
            mapping.value("$import").expect("key just read").range(),
            TypeHandle::synthesized(TypeNode::LinkedSchemaDef {
                path: import.to_string(),
            }),
            LookupContext::Linked {
                path: full.clone(),
                exists,
            },
        );
        if !exists {
            return;
        }
        let Ok(text) = std::fs::read_to_string(&full) else {
            return;
        };
        let Ok(imported) = cwl_ast::parse(&text) else {
            return;
        };
        match &imported {
            SourceNode::Sequence { items, .. } => {
                for item in items {
                    register_user_type(ctx, item);
                }
            }
            other => register_user_type(ctx, other),
        }
        return;
    }

    register_user_type(ctx, type_def);
}

/// Registers a single user-defined record/enum/array type node.
fn register_user_type(ctx: &mut WalkContext, type_def: &SourceNode) {
    let Some(mapping) = type_def.as_mapping() else {
        return;
    };
    let Some(name) = mapping.value("name").and_then(SourceNode::as_str) else {
        return;
    };
    let name = strip_type_suffixes(name).to_string();

    let node = match mapping.value("type").and_then(SourceNode::as_str) {
        Some("enum") => {
            let symbols = mapping
                .value("symbols")
                .and_then(SourceNode::as_sequence)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(SourceNode::as_str)
                        .map(|s| s.rsplit('/').next().unwrap_or(s).to_string())
                        .collect()
                })
                .unwrap_or_default();
            TypeNode::Enum {
                name: name.clone(),
                doc: None,
                symbols,
            }
        }
        Some("record") => {
            let field_names: Vec<String> = mapping
                .value("fields")
                .and_then(|fields| IdentityView::project(fields, "name"))
                .map(|view| view.keys().map(str::to_string).collect())
                .unwrap_or_default();
            let fields = field_names
                .into_iter()
                .map(|field_name| {
                    (field_name, Field {
                        doc: None,
                        required: false,
                        allowed: Vec::new(),
                        subject: None,
                        predicate: None,
                    })
                })
                .collect();
            TypeNode::Record {
                name: name.clone(),
                doc: None,
                fields,
                required: Vec::new(),
            }
        }
        _ => TypeNode::Base { name: name.clone() },
    };

    debug!("registered user-defined type `{name}`");
    ctx.user_types.insert(name, node);
}

/// Builds the symbol outline from the document's top-level sections.
fn build_symbols(ctx: &mut WalkContext, mapping: &Mapping) {
    for (key, entry) in mapping.iter() {
        let mut children = Vec::new();
        if key == "steps" {
            if let Some(view) = IdentityView::project(&entry.value, "id") {
                for (step_id, step_entry) in view.iter() {
                    children.push(Symbol {
                        name: step_id.to_string(),
                        range: step_entry.key_range.union(step_entry.node.range()),
                        selection: step_entry.key_range,
                        kind: SymbolKind::Step,
                        children: Vec::new(),
                    });
                }
            }
        }
        ctx.symbols.push(Symbol {
            name: key.to_string(),
            range: entry.key_range.union(entry.value.range()),
            selection: entry.key_range,
            kind: SymbolKind::Section,
            children,
        });
    }
}
