//! Polymorphic matching of document nodes against candidate types.
//!
//! CWL fields routinely allow several types (`string | Expression |
//! CommandLineBinding`), and documents under live editing are routinely
//! incomplete, so matching computes a confidence-ranked set of checks and
//! resolves one type with a deterministic tie-break rather than demanding
//! an exact fit.

use cwl_ast::SourceNode;
use indexmap::IndexMap;

use crate::graph::ImportKind;
use crate::graph::TypeGraph;
use crate::graph::TypeHandle;
use crate::graph::TypeIndex;
use crate::graph::TypeNode;

/// The tri-state confidence of checking a node against a candidate type.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Match {
    /// The node is this type.
    Yes,
    /// The node is probably this type, with problems.
    Maybe,
    /// The node is not this type.
    No,
}

/// The result of checking a node against one candidate type.
#[derive(Debug, Clone)]
pub struct TypeCheck {
    /// The candidate that was checked.
    pub candidate: TypeIndex,
    /// The confidence of the check.
    pub matched: Match,
    /// Required fields of the candidate record absent from the node.
    pub missing_required: Vec<String>,
    /// Optional fields of the candidate record absent from the node.
    ///
    /// Kept for completion: these are the fields worth offering at a key
    /// position inside the record.
    pub missing_optional: Vec<String>,
}

impl TypeCheck {
    /// Creates a check result carrying only a confidence.
    fn of(candidate: TypeIndex, matched: Match) -> Self {
        Self {
            candidate,
            matched,
            missing_required: Vec::new(),
            missing_optional: Vec::new(),
        }
    }
}

/// The outcome of type inference for one node.
#[derive(Debug, Clone)]
pub struct Inference {
    /// The resolved type.
    pub resolved: TypeHandle,
    /// The per-candidate checks, in candidate order.
    pub checks: Vec<TypeCheck>,
}

/// The list-as-map context a node is being matched in.
#[derive(Debug, Copy, Clone)]
pub struct MapContext<'a> {
    /// The identity field supplied by the map key.
    pub subject: &'a str,
    /// The field a scalar shorthand value supplies, if any.
    pub predicate: Option<&'a str>,
}

/// The type environment matching runs against: the compiled graph plus the
/// user-defined types registered by `SchemaDefRequirement` during the
/// current walk.
#[derive(Debug, Copy, Clone)]
pub struct TypeEnv<'a> {
    /// The compiled type graph.
    pub graph: &'a TypeGraph,
    /// User-defined types, by name.
    pub user_types: &'a IndexMap<String, TypeNode>,
}

impl<'a> TypeEnv<'a> {
    /// Determines if a name refers to a known type: a primitive symbol
    /// aside, either a graph entry or a user-defined type.
    fn knows_type(&self, name: &str) -> bool {
        self.graph.lookup(name).is_some() || self.user_types.contains_key(name)
    }
}

/// Infers the type of a document node against a list of candidate types.
///
/// `key` is the map key the node sits under, when it sits in a list-as-map
/// projection; `map_ctx` carries that projection's subject and predicate.
///
/// Resolution is deterministic: an explicit `class` discriminator wins
/// outright; otherwise the first `Yes` in candidate order, else the first
/// `Maybe`, else a lone candidate regardless of its confidence (a
/// structurally failing lone candidate is still the least-wrong guess for
/// a mid-edit document), else `Unknown`.
pub fn infer_type(
    env: TypeEnv<'_>,
    node: &SourceNode,
    key: Option<&str>,
    candidates: &[TypeIndex],
    map_ctx: Option<MapContext<'_>>,
) -> Inference {
    // `$import`/`$include` keys short-circuit regardless of declared shape.
    if let Some(mapping) = node.as_mapping() {
        for (directive, kind) in [("$import", ImportKind::Import), ("$include", ImportKind::Include)]
        {
            if mapping.contains_key(directive) {
                return Inference {
                    resolved: TypeHandle::synthesized(TypeNode::ImportInclude { kind }),
                    checks: Vec::new(),
                };
            }
        }
    }

    // Explicit discriminator short-circuit: CWL records self-identify via
    // `class`, making structural guessing strictly worse when one is given.
    let discriminator = match map_ctx {
        Some(ctx) if ctx.subject == "class" => key,
        _ => node
            .as_mapping()
            .and_then(|mapping| mapping.value("class"))
            .and_then(SourceNode::as_str),
    };

    if let Some(class) = discriminator {
        return resolve_discriminator(env, class, candidates);
    }

    let mut checks = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let check = check_candidate(env, *candidate, node, map_ctx);
        let matched = check.matched;
        checks.push(check);
        if matched == Match::Yes {
            return Inference {
                resolved: TypeHandle::Indexed(*candidate),
                checks,
            };
        }
    }

    if let Some(check) = checks.iter().find(|check| check.matched == Match::Maybe) {
        let resolved = TypeHandle::Indexed(check.candidate);
        return Inference { resolved, checks };
    }

    // A lone candidate is accepted regardless of confidence: mid-edit
    // documents are structurally incomplete far more often than they are
    // genuinely another type.
    if let [only] = candidates {
        return Inference {
            resolved: TypeHandle::Indexed(*only),
            checks,
        };
    }

    Inference {
        resolved: TypeHandle::synthesized(TypeNode::Unknown {
            expected: env.graph.candidate_names(candidates),
        }),
        checks,
    }
}

/// Resolves an explicit `class` discriminator against the candidates.
fn resolve_discriminator(env: TypeEnv<'_>, class: &str, candidates: &[TypeIndex]) -> Inference {
    if let Some((prefix, name)) = class.split_once(':') {
        return Inference {
            resolved: TypeHandle::synthesized(TypeNode::Namespaced {
                prefix: prefix.to_string(),
                name: name.to_string(),
            }),
            checks: Vec::new(),
        };
    }

    for candidate in candidates {
        match env.graph.get(*candidate) {
            node if node.name() == class => {
                return Inference {
                    resolved: TypeHandle::Indexed(*candidate),
                    checks: vec![TypeCheck::of(*candidate, Match::Yes)],
                };
            }
            // `Any` answers "if you must be this kind, which concrete type
            // is it" by consulting the whole graph.
            TypeNode::Any => {
                if let Some(index) = env.graph.lookup(class) {
                    return Inference {
                        resolved: TypeHandle::Indexed(index),
                        checks: vec![TypeCheck::of(index, Match::Yes)],
                    };
                }
                if let Some(node) = env.user_types.get(class) {
                    return Inference {
                        resolved: TypeHandle::synthesized(node.clone()),
                        checks: Vec::new(),
                    };
                }
            }
            _ => {}
        }
    }

    Inference {
        resolved: TypeHandle::synthesized(TypeNode::Unknown {
            expected: env.graph.candidate_names(candidates),
        }),
        checks: Vec::new(),
    }
}

/// Checks a node against one candidate type.
fn check_candidate(
    env: TypeEnv<'_>,
    candidate: TypeIndex,
    node: &SourceNode,
    map_ctx: Option<MapContext<'_>>,
) -> TypeCheck {
    match env.graph.get(candidate) {
        TypeNode::Base { name } => {
            let matched = match name.as_str() {
                // `null` matches only the absent/empty value.
                "null" => {
                    if node.is_null() {
                        Match::Yes
                    } else {
                        Match::No
                    }
                }
                // A generic string never answers `Yes`: `Yes` is reserved
                // for more specific candidates in the same allowed list,
                // notably `Expression`, so an expression embedded in a
                // plain string field is recognized without per-field
                // schema special cases.
                "string" => {
                    if matches!(node, SourceNode::Scalar { .. }) {
                        Match::Maybe
                    } else {
                        Match::No
                    }
                }
                // Loose by intent: CWL tolerates string-typed numeric
                // literals in some contexts, so strictness is deferred to
                // execution.
                "boolean" | "int" | "long" | "float" | "double" => {
                    if matches!(node, SourceNode::Scalar { .. }) {
                        Match::Yes
                    } else {
                        Match::No
                    }
                }
                _ => {
                    if matches!(node, SourceNode::Scalar { .. }) {
                        Match::Maybe
                    } else {
                        Match::No
                    }
                }
            };
            TypeCheck::of(candidate, matched)
        }
        TypeNode::Enum { symbols, .. } => {
            let matched = match node.as_str() {
                Some(value) if symbols.iter().any(|symbol| symbol == value) => Match::Yes,
                Some(_) => Match::Maybe,
                None => Match::No,
            };
            TypeCheck::of(candidate, matched)
        }
        TypeNode::DataType { symbols, .. } => {
            let matched = match node.as_str() {
                Some(value) => {
                    let name = strip_type_suffixes(value);
                    if symbols.iter().any(|symbol| symbol == name) || env.knows_type(name) {
                        Match::Yes
                    } else {
                        Match::Maybe
                    }
                }
                None => Match::No,
            };
            TypeCheck::of(candidate, matched)
        }
        TypeNode::Any => {
            let matched = if node.is_null() { Match::Maybe } else { Match::Yes };
            TypeCheck::of(candidate, matched)
        }
        TypeNode::Expression => {
            let matched = if node.has_expression() {
                Match::Yes
            } else {
                Match::No
            };
            TypeCheck::of(candidate, matched)
        }
        TypeNode::Array { .. } => {
            let matched = if node.as_sequence().is_some() {
                Match::Yes
            } else {
                Match::No
            };
            TypeCheck::of(candidate, matched)
        }
        TypeNode::ListOrMap { .. } => {
            let matched = if node.as_sequence().is_some() || node.as_mapping().is_some() {
                Match::Yes
            } else {
                Match::No
            };
            TypeCheck::of(candidate, matched)
        }
        TypeNode::Record {
            fields, required, ..
        } => check_record(candidate, node, fields, required, map_ctx),
        // Synthesized-only variants are never compiled into candidate
        // lists.
        TypeNode::Namespaced { .. }
        | TypeNode::ImportInclude { .. }
        | TypeNode::LinkedFile { .. }
        | TypeNode::LinkedSchemaDef { .. }
        | TypeNode::Unknown { .. } => TypeCheck::of(candidate, Match::No),
    }
}

/// Checks a node against a record type.
fn check_record(
    candidate: TypeIndex,
    node: &SourceNode,
    fields: &IndexMap<String, crate::graph::Field>,
    required: &[String],
    map_ctx: Option<MapContext<'_>>,
) -> TypeCheck {
    // A map-subject key supplies one required field's value implicitly via
    // the key string rather than as an inline field.
    let effective_required: Vec<&String> = required
        .iter()
        .filter(|name| map_ctx.map_or(true, |ctx| ctx.subject != name.as_str()))
        .collect();

    let Some(mapping) = node.as_mapping() else {
        // A scalar used under map-subject/predicate shorthand stands for
        // the predicate field's value; that is only unambiguous when the
        // predicate is the sole remaining required field.
        if let Some(ctx) = map_ctx {
            if !node.is_null() {
                let sole_predicate = match (effective_required.as_slice(), ctx.predicate) {
                    ([], _) => true,
                    ([only], Some(predicate)) => only.as_str() == predicate,
                    _ => false,
                };
                if sole_predicate {
                    return TypeCheck::of(candidate, Match::Yes);
                }
            }
        }

        // No inline keys at all: probably this record, with errors.
        return TypeCheck {
            candidate,
            matched: Match::Maybe,
            missing_required: effective_required.iter().map(|s| (*s).clone()).collect(),
            missing_optional: fields
                .iter()
                .filter(|(_, field)| !field.required)
                .map(|(name, _)| name.clone())
                .collect(),
        };
    };

    let missing_required: Vec<String> = effective_required
        .iter()
        .filter(|name| !mapping.contains_key(name.as_str()))
        .map(|s| (*s).clone())
        .collect();
    let missing_optional: Vec<String> = fields
        .iter()
        .filter(|(name, field)| !field.required && !mapping.contains_key(name.as_str()))
        .map(|(name, _)| name.clone())
        .collect();
    let extra = mapping.keys().any(|key| {
        !fields.contains_key(key) && !key.contains(':') && !key.starts_with('$')
    });

    let matched = if !missing_required.is_empty() || extra {
        // A record identified by its position but missing fields is still
        // "probably this record, with errors", never "not this record".
        Match::Maybe
    } else {
        Match::Yes
    };

    TypeCheck {
        candidate,
        matched,
        missing_required,
        missing_optional,
    }
}

/// Strips the `?` (optional) and `[]` (array) suffixes from a CWL type
/// expression, yielding the base type name.
pub fn strip_type_suffixes(value: &str) -> &str {
    let mut name = value.trim();
    loop {
        if let Some(stripped) = name.strip_suffix('?') {
            name = stripped.trim_end();
        } else if let Some(stripped) = name.strip_suffix("[]") {
            name = stripped.trim_end();
        } else {
            return name;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::schema::compile;

    /// Compiles a test graph with the primitive enum plus the given types.
    fn graph(mut records: Vec<serde_json::Value>) -> TypeGraph {
        let mut all = vec![
            json!({
                "name": "CWLType",
                "type": "enum",
                "symbols": ["null", "boolean", "int", "long", "float", "double", "string", "File", "Directory"],
            }),
            json!({"name": "Any", "type": "record", "fields": []}),
            json!({"name": "Expression", "type": "record", "fields": []}),
        ];
        all.append(&mut records);
        compile(&all, "v1.2").unwrap()
    }

    /// Parses a YAML snippet into its source tree.
    fn node(text: &str) -> SourceNode {
        cwl_ast::parse(text).unwrap()
    }

    fn env<'a>(
        graph: &'a TypeGraph,
        user: &'a IndexMap<String, TypeNode>,
    ) -> TypeEnv<'a> {
        TypeEnv {
            graph,
            user_types: user,
        }
    }

    #[test]
    fn expression_beats_generic_string() {
        let graph = graph(vec![]);
        let user = IndexMap::new();
        let candidates = [graph.lookup("string").unwrap(), graph.lookup("Expression").unwrap()];

        let inference = infer_type(
            env(&graph, &user),
            &node("$(inputs.reads.path)"),
            None,
            &candidates,
            None,
        );
        assert!(matches!(
            inference.resolved.resolve(&graph),
            TypeNode::Expression
        ));

        // A plain string still resolves to the string candidate via its
        // `Maybe`.
        let inference = infer_type(
            env(&graph, &user),
            &node("just-a-path.txt"),
            None,
            &candidates,
            None,
        );
        assert_eq!(
            inference.resolved.resolve(&graph).name(),
            "string"
        );
    }

    #[test]
    fn record_missing_required_is_maybe_with_fields() {
        let graph = graph(vec![json!({
            "name": "Step",
            "type": "record",
            "fields": [
                {"name": "id", "type": "string"},
                {"name": "run", "type": "string"},
                {"name": "label", "type": ["null", "string"]},
            ],
        })]);
        let user = IndexMap::new();
        let step = graph.lookup("Step").unwrap();
        let other = graph.lookup("File").unwrap();

        let inference = infer_type(
            env(&graph, &user),
            &node("id: align\n"),
            None,
            &[step, other],
            None,
        );

        let check = &inference.checks[0];
        assert_eq!(check.matched, Match::Maybe);
        assert_eq!(check.missing_required, ["run"]);
        assert_eq!(check.missing_optional, ["label"]);
        assert_eq!(inference.resolved.resolve(&graph).name(), "Step");
    }

    #[test]
    fn class_discriminator_short_circuits() {
        let graph = graph(vec![
            json!({
                "name": "DockerRequirement",
                "type": "record",
                "fields": [{"name": "class", "type": "string"}],
            }),
            json!({
                "name": "ResourceRequirement",
                "type": "record",
                "fields": [{"name": "class", "type": "string"}],
            }),
        ]);
        let user = IndexMap::new();
        let candidates = [
            graph.lookup("DockerRequirement").unwrap(),
            graph.lookup("ResourceRequirement").unwrap(),
        ];

        let inference = infer_type(
            env(&graph, &user),
            &node("class: ResourceRequirement\ncoresMin: 4\n"),
            None,
            &candidates,
            None,
        );
        assert_eq!(
            inference.resolved.resolve(&graph).name(),
            "ResourceRequirement"
        );

        // The shorthand `requirements: {DockerRequirement: {...}}` supplies
        // the class through the map key.
        let inference = infer_type(
            env(&graph, &user),
            &node("dockerPull: ubuntu\n"),
            Some("DockerRequirement"),
            &candidates,
            Some(MapContext {
                subject: "class",
                predicate: None,
            }),
        );
        assert_eq!(
            inference.resolved.resolve(&graph).name(),
            "DockerRequirement"
        );
    }

    #[test]
    fn unknown_class_resolves_to_unknown() {
        let graph = graph(vec![json!({
            "name": "DockerRequirement",
            "type": "record",
            "fields": [{"name": "class", "type": "string"}],
        })]);
        let user = IndexMap::new();
        let candidates = [graph.lookup("DockerRequirement").unwrap()];

        let inference = infer_type(
            env(&graph, &user),
            &node("class: MadeUpRequirement\n"),
            None,
            &candidates,
            None,
        );
        match inference.resolved.resolve(&graph) {
            TypeNode::Unknown { expected } => {
                assert_eq!(expected, &["DockerRequirement"]);
            }
            other => panic!("expected unknown, found {}", other.name()),
        }
    }

    #[test]
    fn namespaced_class_resolves_to_namespaced() {
        let graph = graph(vec![]);
        let user = IndexMap::new();

        let inference = infer_type(
            env(&graph, &user),
            &node("class: edam:operation_3192\n"),
            None,
            &[graph.lookup("Any").unwrap()],
            None,
        );
        match inference.resolved.resolve(&graph) {
            TypeNode::Namespaced { prefix, name } => {
                assert_eq!(prefix, "edam");
                assert_eq!(name, "operation_3192");
            }
            other => panic!("expected namespaced, found {}", other.name()),
        }
    }

    #[test]
    fn lone_candidate_wins_regardless_of_confidence() {
        let graph = graph(vec![]);
        let user = IndexMap::new();
        let array_of_string = {
            // A sequence candidate checked against a scalar node is `No`.
            graph.lookup("string").unwrap()
        };

        let inference = infer_type(
            env(&graph, &user),
            &node("- a\n- b\n"),
            None,
            &[array_of_string],
            None,
        );
        // `string` against a sequence is `No`, but it is the only
        // candidate, so it is still chosen.
        assert_eq!(inference.checks[0].matched, Match::No);
        assert_eq!(inference.resolved.resolve(&graph).name(), "string");
    }

    #[test]
    fn null_candidate_matches_absent_value() {
        let graph = graph(vec![]);
        let user = IndexMap::new();
        let candidates = [graph.lookup("null").unwrap(), graph.lookup("string").unwrap()];

        let inference = infer_type(env(&graph, &user), &node(""), None, &candidates, None);
        assert_eq!(inference.resolved.resolve(&graph).name(), "null");
    }

    #[test]
    fn import_key_short_circuits() {
        let graph = graph(vec![]);
        let user = IndexMap::new();

        let inference = infer_type(
            env(&graph, &user),
            &node("$import: ../types/record.yml\n"),
            None,
            &[graph.lookup("string").unwrap()],
            None,
        );
        assert!(matches!(
            inference.resolved.resolve(&graph),
            TypeNode::ImportInclude {
                kind: ImportKind::Import
            }
        ));
    }

    #[test]
    fn data_type_matches_user_defined_names() {
        let graph = graph(vec![]);
        let mut user = IndexMap::new();
        user.insert(
            "paired_end_options".to_string(),
            TypeNode::Enum {
                name: "paired_end_options".to_string(),
                doc: None,
                symbols: vec!["paired".to_string(), "single".to_string()],
            },
        );
        let data_type = graph.lookup("CWLType").unwrap();

        let inference = infer_type(
            env(&graph, &user),
            &node("paired_end_options?"),
            None,
            &[data_type],
            None,
        );
        assert_eq!(inference.checks[0].matched, Match::Yes);
    }

    #[test]
    fn suffix_stripping() {
        assert_eq!(strip_type_suffixes("File[]"), "File");
        assert_eq!(strip_type_suffixes("File[]?"), "File");
        assert_eq!(strip_type_suffixes("string?"), "string");
        assert_eq!(strip_type_suffixes("int"), "int");
    }
}
