//! Compilation of CWL schema definitions into a type graph.
//!
//! The input is a flat JSON array of named schema records (`record`,
//! `enum`, or `array` shaped). CWL schemas define every type before its
//! first use, so compilation is a single pass in input order; the only
//! permitted "forward" reference is a record referring to itself, which the
//! arena makes safe by inserting the record's handle before its fields are
//! compiled.

use std::sync::LazyLock;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::graph::Field;
use crate::graph::TypeGraph;
use crate::graph::TypeIndex;
use crate::graph::TypeNode;

/// The primitive types seeded into every graph before compilation.
///
/// A schema may shadow any of these with a more precise definition.
const SEEDED_PRIMITIVES: &[&str] = &[
    "null",
    "boolean",
    "int",
    "long",
    "float",
    "double",
    "string",
    "File",
    "Directory",
];

/// The names under which schemas declare the CWL primitive-type enum.
const PRIMITIVE_ENUM_NAMES: &[&str] = &["CWLType", "PrimitiveType"];

/// The latest CWL version this crate ships a schema for.
pub const LATEST_VERSION: &str = "v1.2";

/// The embedded schema definitions, one per supported CWL version.
const EMBEDDED_SCHEMAS: &[(&str, &str)] = &[
    ("v1.0", include_str!("../schemas/v1.0.json")),
    ("v1.1", include_str!("../schemas/v1.1.json")),
    ("v1.2", include_str!("../schemas/v1.2.json")),
];

/// The compiled graphs for the embedded schemas.
static GRAPHS: LazyLock<IndexMap<&'static str, TypeGraph>> = LazyLock::new(|| {
    EMBEDDED_SCHEMAS
        .iter()
        .map(|(version, text)| {
            let records: Vec<Value> =
                serde_json::from_str(text).expect("embedded schema is valid JSON");
            let graph =
                compile(&records, version).expect("embedded schema compiles to a type graph");
            (*version, graph)
        })
        .collect()
});

/// Gets the compiled type graph for a CWL version, if it is supported.
pub fn for_version(version: &str) -> Option<&'static TypeGraph> {
    GRAPHS.get(version)
}

/// Gets the compiled type graph for the latest supported CWL version.
///
/// This is the fallback when a document declares an unrecognized
/// `cwlVersion`.
pub fn latest() -> &'static TypeGraph {
    GRAPHS
        .get(LATEST_VERSION)
        .expect("latest version has an embedded schema")
}

/// Iterates the supported CWL version strings.
pub fn supported_versions() -> impl Iterator<Item = &'static str> {
    EMBEDDED_SCHEMAS.iter().map(|(version, _)| *version)
}

/// An error compiling a schema.
///
/// Schema errors indicate a corrupt or incomplete schema file, not a
/// problem with any user document; they are fatal to graph construction.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The primitive-type enum is absent from the input.
    #[error("schema does not define a primitive type enum (one of {PRIMITIVE_ENUM_NAMES:?})")]
    MissingPrimitiveEnum,
    /// A schema entry is not an object with a `name` and `type`.
    #[error("schema entry {index} is not a named type definition")]
    MalformedEntry {
        /// The entry's position in the input.
        index: usize,
    },
    /// A type reference does not resolve to an already-defined type.
    #[error("type `{name}` referenced by `{context}` is not defined")]
    UnresolvedType {
        /// The unresolved name.
        name: String,
        /// The definition containing the reference.
        context: String,
    },
}

/// Compiles a flat list of schema records into a type graph.
///
/// Processing order is input order. `Any` and `Expression` records are
/// specialized after compilation: `Any` becomes the graph-wide wildcard and
/// `Expression` the content-detected expression type. Pre-release symbols
/// are stripped from the `CWLVersion` enum.
pub fn compile(records: &[Value], version: &str) -> Result<TypeGraph, SchemaError> {
    let mut graph = TypeGraph::new(version);

    for name in SEEDED_PRIMITIVES {
        graph.insert_named(
            *name,
            TypeNode::Base {
                name: (*name).to_string(),
            },
        );
    }

    for (index, record) in records.iter().enumerate() {
        let Some(object) = record.as_object() else {
            return Err(SchemaError::MalformedEntry { index });
        };
        let Some(name) = object.get("name").and_then(Value::as_str) else {
            return Err(SchemaError::MalformedEntry { index });
        };

        match object.get("type").and_then(Value::as_str) {
            Some("enum") => {
                compile_enum(&mut graph, name, record);
            }
            Some("record") => {
                compile_record(&mut graph, name, record)?;
            }
            Some("array") => {
                let items = compile_type(
                    &mut graph,
                    record.get("items").unwrap_or(&Value::Null),
                    name,
                    None,
                )?;
                graph.insert_named(
                    name,
                    TypeNode::Array {
                        name: name.to_string(),
                        items,
                    },
                );
            }
            _ => return Err(SchemaError::MalformedEntry { index }),
        }
    }

    specialize(&mut graph);

    if !PRIMITIVE_ENUM_NAMES.iter().any(|name| {
        graph
            .lookup(name)
            .is_some_and(|index| matches!(graph.get(index), TypeNode::DataType { .. }))
    }) {
        return Err(SchemaError::MissingPrimitiveEnum);
    }

    Ok(graph)
}

/// Compiles an enum definition into the graph.
///
/// The primitive-type enum compiles to the self-referentially matched
/// [`TypeNode::DataType`]; all other enums are plain symbol sets.
fn compile_enum(graph: &mut TypeGraph, name: &str, record: &Value) {
    let symbols: Vec<String> = record
        .get("symbols")
        .and_then(Value::as_array)
        .map(|symbols| {
            symbols
                .iter()
                .filter_map(Value::as_str)
                .map(short_name)
                .collect()
        })
        .unwrap_or_default();

    if PRIMITIVE_ENUM_NAMES.contains(&name) {
        graph.insert_named(
            name,
            TypeNode::DataType {
                name: name.to_string(),
                symbols,
            },
        );
    } else {
        graph.insert_named(
            name,
            TypeNode::Enum {
                name: name.to_string(),
                doc: doc_of(record),
                symbols,
            },
        );
    }
}

/// Compiles a record definition into the graph.
///
/// The record's (empty) node is inserted before its fields are compiled so
/// that fields may reference the record itself.
fn compile_record(graph: &mut TypeGraph, name: &str, record: &Value) -> Result<(), SchemaError> {
    let index = graph.insert_named(
        name,
        TypeNode::Record {
            name: name.to_string(),
            doc: doc_of(record),
            fields: IndexMap::new(),
            required: Vec::new(),
        },
    );

    let mut fields: IndexMap<String, Field> = IndexMap::new();

    // Pre-populate fields from the extended records.
    for base in extends_of(record) {
        let Some(base_index) = graph.lookup(&base) else {
            return Err(SchemaError::UnresolvedType {
                name: base,
                context: name.to_string(),
            });
        };
        if let Some((base_fields, _)) = graph.get(base_index).as_record() {
            let base_fields = base_fields.clone();
            fields.extend(base_fields);
        }
    }

    if let Some(declared) = record.get("fields").and_then(Value::as_array) {
        for field in declared {
            let Some(field_name) = field.get("name").and_then(Value::as_str) else {
                continue;
            };

            let predicate = field.get("jsonldPredicate");
            let subject = predicate
                .and_then(|p| p.get("mapSubject"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let map_predicate = predicate
                .and_then(|p| p.get("mapPredicate"))
                .and_then(Value::as_str)
                .map(str::to_string);

            let allowed = compile_type(
                graph,
                field.get("type").unwrap_or(&Value::Null),
                &format!("{name}.{field_name}"),
                subject.as_deref().map(|s| (s, map_predicate.as_deref())),
            )?;

            let required = !allowed
                .iter()
                .any(|index| matches!(graph.get(*index), TypeNode::Base { name } if name == "null"));

            fields.insert(
                field_name.to_string(),
                Field {
                    doc: doc_of(field),
                    required,
                    allowed,
                    subject,
                    predicate: map_predicate,
                },
            );
        }
    }

    let required = fields
        .iter()
        .filter(|(_, field)| field.required)
        .map(|(field_name, _)| field_name.clone())
        .collect();

    *graph.get_mut(index) = TypeNode::Record {
        name: name.to_string(),
        doc: doc_of(record),
        fields,
        required,
    };

    Ok(())
}

/// Compiles a field or item type expression into a list of allowed types.
///
/// `map_keys` carries the owning field's `mapSubject`/`mapPredicate`, which
/// turn an array type into a list-or-map type.
fn compile_type(
    graph: &mut TypeGraph,
    value: &Value,
    context: &str,
    map_keys: Option<(&str, Option<&str>)>,
) -> Result<Vec<TypeIndex>, SchemaError> {
    match value {
        Value::String(name) => {
            let name = short_name(name);
            match graph.lookup(&name) {
                Some(index) => Ok(vec![index]),
                None => Err(SchemaError::UnresolvedType {
                    name,
                    context: context.to_string(),
                }),
            }
        }
        Value::Array(entries) => {
            let mut allowed = Vec::new();
            for entry in entries {
                allowed.extend(compile_type(graph, entry, context, map_keys)?);
            }
            Ok(allowed)
        }
        Value::Object(object) => match object.get("type").and_then(Value::as_str) {
            Some("array") => {
                let items = compile_type(
                    graph,
                    object.get("items").unwrap_or(&Value::Null),
                    context,
                    None,
                )?;
                let item_names = graph.candidate_names(&items).join(" | ");
                let node = match map_keys {
                    Some((subject, predicate)) => TypeNode::ListOrMap {
                        name: format!("{item_names} (list or map)"),
                        items,
                        subject: subject.to_string(),
                        predicate: predicate.map(str::to_string),
                    },
                    None => TypeNode::Array {
                        name: format!("array of {item_names}"),
                        items,
                    },
                };
                Ok(vec![graph.insert(node)])
            }
            Some("enum") => {
                let name = object
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("enum")
                    .to_string();
                compile_enum(graph, &name, value);
                Ok(vec![graph.lookup(&name).expect("enum was just inserted")])
            }
            Some("record") => {
                let name = object
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("record")
                    .to_string();
                compile_record(graph, &name, value)?;
                Ok(vec![graph.lookup(&name).expect("record was just inserted")])
            }
            _ => Err(SchemaError::UnresolvedType {
                name: value.to_string(),
                context: context.to_string(),
            }),
        },
        _ => Err(SchemaError::UnresolvedType {
            name: value.to_string(),
            context: context.to_string(),
        }),
    }
}

/// Applies the post-compilation specializations.
///
/// `Any` and `Expression` are declared as ordinary records in the schema
/// but match by entirely different rules, so their nodes are replaced, and
/// pre-release tags are stripped from the `CWLVersion` enum so they are
/// never offered in completions.
fn specialize(graph: &mut TypeGraph) {
    if let Some(index) = graph.lookup("Any") {
        *graph.get_mut(index) = TypeNode::Any;
    }
    if let Some(index) = graph.lookup("Expression") {
        *graph.get_mut(index) = TypeNode::Expression;
    }

    if let Some(index) = graph.lookup("CWLVersion") {
        if let TypeNode::Enum { symbols, .. } = graph.get_mut(index) {
            let before = symbols.len();
            symbols.retain(|symbol| !symbol.starts_with("draft-") && !symbol.contains("dev"));
            if symbols.len() != before {
                debug!(
                    "stripped {count} pre-release CWLVersion symbols",
                    count = before - symbols.len()
                );
            }
        }
    }
}

/// Gets the `extends` names of a schema entry, in declaration order.
///
/// Schemas write `extends` as a single name or a list of names, either
/// form possibly URI-qualified.
fn extends_of(record: &Value) -> Vec<String> {
    match record.get("extends") {
        Some(Value::String(name)) => vec![short_name(name)],
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .map(short_name)
            .collect(),
        _ => Vec::new(),
    }
}

/// Strips any URI qualification from a schema name
/// (`https://w3id.org/cwl/cwl#Workflow` becomes `Workflow`).
fn short_name(name: &str) -> String {
    name.rsplit(['#', '/']).next().unwrap_or(name).to_string()
}

/// Gets the `doc` string of a schema entry, joining list-form docs.
fn doc_of(value: &Value) -> Option<String> {
    match value.get("doc") {
        Some(Value::String(doc)) => Some(doc.clone()),
        Some(Value::Array(lines)) => Some(
            lines
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    /// A minimal schema carrying the primitive enum plus the given records.
    fn with_primitives(mut records: Vec<Value>) -> Vec<Value> {
        let mut all = vec![json!({
            "name": "CWLType",
            "type": "enum",
            "symbols": ["null", "boolean", "int", "long", "float", "double", "string", "File", "Directory"],
        })];
        all.append(&mut records);
        all
    }

    #[test]
    fn missing_primitive_enum_is_fatal() {
        let records = vec![json!({"name": "Foo", "type": "enum", "symbols": ["a"]})];
        let error = compile(&records, "v1.2").unwrap_err();
        assert!(matches!(error, SchemaError::MissingPrimitiveEnum));
    }

    #[test]
    fn compiles_self_referential_record() {
        let records = with_primitives(vec![json!({
            "name": "Tree",
            "type": "record",
            "fields": [
                {"name": "label", "type": "string"},
                {"name": "children", "type": ["null", {"type": "array", "items": "Tree"}]},
            ],
        })]);
        let graph = compile(&records, "v1.2").unwrap();

        let tree = graph.lookup("Tree").unwrap();
        let (fields, required) = graph.get(tree).as_record().unwrap();
        assert_eq!(required, ["label"]);

        // The self-reference resolved to the record's own handle.
        let children = &fields["children"];
        assert!(!children.required);
        let array = children
            .allowed
            .iter()
            .find_map(|index| match graph.get(*index) {
                TypeNode::Array { items, .. } => Some(items),
                _ => None,
            })
            .unwrap();
        assert_eq!(array, &[tree]);
    }

    #[test]
    fn extends_prepopulates_fields() {
        let records = with_primitives(vec![
            json!({
                "name": "Base",
                "type": "record",
                "fields": [{"name": "id", "type": "string"}],
            }),
            json!({
                "name": "Derived",
                "type": "record",
                "extends": "Base",
                "fields": [{"name": "extra", "type": ["null", "int"]}],
            }),
        ]);
        let graph = compile(&records, "v1.2").unwrap();

        let derived = graph.lookup("Derived").unwrap();
        let (fields, required) = graph.get(derived).as_record().unwrap();
        assert_eq!(fields.keys().collect::<Vec<_>>(), ["id", "extra"]);
        assert_eq!(required, ["id"]);
    }

    #[test]
    fn map_subject_produces_list_or_map() {
        let records = with_primitives(vec![json!({
            "name": "Holder",
            "type": "record",
            "fields": [{
                "name": "inputs",
                "type": {"type": "array", "items": "string"},
                "jsonldPredicate": {"mapSubject": "id", "mapPredicate": "type"},
            }],
        })]);
        let graph = compile(&records, "v1.2").unwrap();

        let holder = graph.lookup("Holder").unwrap();
        let (fields, _) = graph.get(holder).as_record().unwrap();
        let allowed = &fields["inputs"].allowed;
        assert_eq!(allowed.len(), 1);
        match graph.get(allowed[0]) {
            TypeNode::ListOrMap {
                subject, predicate, ..
            } => {
                assert_eq!(subject, "id");
                assert_eq!(predicate.as_deref(), Some("type"));
            }
            other => panic!("expected a list-or-map type, found {}", other.name()),
        }
    }

    #[test]
    fn any_and_expression_are_specialized() {
        let records = with_primitives(vec![
            json!({"name": "Any", "type": "record", "fields": []}),
            json!({"name": "Expression", "type": "record", "fields": []}),
        ]);
        let graph = compile(&records, "v1.2").unwrap();

        assert!(matches!(
            graph.get(graph.lookup("Any").unwrap()),
            TypeNode::Any
        ));
        assert!(matches!(
            graph.get(graph.lookup("Expression").unwrap()),
            TypeNode::Expression
        ));
    }

    #[test]
    fn cwl_version_prereleases_are_stripped() {
        let records = with_primitives(vec![json!({
            "name": "CWLVersion",
            "type": "enum",
            "symbols": ["draft-2", "draft-3", "v1.0", "v1.1", "v1.2", "v1.2.0-dev5"],
        })]);
        let graph = compile(&records, "v1.2").unwrap();

        match graph.get(graph.lookup("CWLVersion").unwrap()) {
            TypeNode::Enum { symbols, .. } => {
                assert_eq!(symbols, &["v1.0", "v1.1", "v1.2"]);
            }
            other => panic!("expected an enum, found {}", other.name()),
        }
    }

    #[test]
    fn unresolved_reference_is_an_error() {
        let records = with_primitives(vec![json!({
            "name": "Bad",
            "type": "record",
            "fields": [{"name": "x", "type": "NotDefined"}],
        })]);
        let error = compile(&records, "v1.2").unwrap_err();
        assert!(matches!(error, SchemaError::UnresolvedType { .. }));
    }

    #[test]
    fn embedded_schemas_compile() {
        for version in supported_versions() {
            let graph = for_version(version).unwrap();
            assert_eq!(graph.version(), version);
            for name in ["CommandLineTool", "ExpressionTool", "Workflow"] {
                assert!(
                    graph.lookup(name).is_some(),
                    "{version} schema defines {name}"
                );
            }
        }
    }
}
