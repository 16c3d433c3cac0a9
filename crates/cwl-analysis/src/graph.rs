//! The compiled type graph.
//!
//! Schema compilation produces an arena of [`TypeNode`]s addressed by
//! [`TypeIndex`] handles plus a name table over them. Handles make
//! self-referential record types safe to build: a record's handle exists
//! before its fields are compiled, so a field may refer back to its own
//! record without aliasing.

use indexmap::IndexMap;

/// A handle to a node in a [`TypeGraph`]'s arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TypeIndex(pub(crate) usize);

/// The kind of a `$import`/`$include` directive.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImportKind {
    /// A `$import` directive; the target is parsed as YAML.
    Import,
    /// A `$include` directive; the target is included as text.
    Include,
}

/// A field of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// The field's documentation, if the schema carries any.
    pub doc: Option<String>,
    /// Whether the field is required.
    ///
    /// A field is optional when its allowed types include `null`.
    pub required: bool,
    /// The types allowed for the field's value, in schema order.
    pub allowed: Vec<TypeIndex>,
    /// The list-as-map subject key declared by the field's
    /// `jsonldPredicate`, if any.
    pub subject: Option<String>,
    /// The list-as-map predicate key declared by the field's
    /// `jsonldPredicate`, if any.
    pub predicate: Option<String>,
}

/// A node of the type graph.
///
/// This is a closed union: every capability (matching, walking, completion,
/// hover, definition) is an exhaustive match over it, so a new variant
/// cannot silently opt out of a capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNode {
    /// An opaque primitive type (`string`, `int`, `boolean`, ...).
    Base {
        /// The name of the primitive.
        name: String,
    },
    /// An enumeration of symbols.
    Enum {
        /// The name of the enum.
        name: String,
        /// The enum's documentation, if any.
        doc: Option<String>,
        /// The allowed symbols, in schema order.
        symbols: Vec<String>,
    },
    /// The CWL primitive-type enum.
    ///
    /// Matching is self-referential: a value names either one of the
    /// symbols or a user-defined type registered during the walk, possibly
    /// with `?` (optional) or `[]` (array) suffixes.
    DataType {
        /// The name of the enum.
        name: String,
        /// The primitive type names, in schema order.
        symbols: Vec<String>,
    },
    /// The `Any` type; matches any present value and can answer "if you
    /// must be a given kind, which concrete type is it" against the whole
    /// graph.
    Any,
    /// A CWL expression, detected from `$(...)`/`${...}` content rather
    /// than declared structure.
    Expression,
    /// An array of items.
    Array {
        /// The display name of the array type.
        name: String,
        /// The types allowed for items, in schema order.
        items: Vec<TypeIndex>,
    },
    /// An array that may also be written as a mapping keyed by an identity
    /// field of its items.
    ListOrMap {
        /// The display name of the type.
        name: String,
        /// The types allowed for items, in schema order.
        items: Vec<TypeIndex>,
        /// The item field supplying the key in map form.
        subject: String,
        /// The item field supplied by a scalar shorthand value, if any.
        predicate: Option<String>,
    },
    /// A record with named fields.
    Record {
        /// The name of the record.
        name: String,
        /// The record's documentation, if any.
        doc: Option<String>,
        /// The record's fields, in schema order.
        fields: IndexMap<String, Field>,
        /// The names of the required fields, in schema order.
        required: Vec<String>,
    },
    /// A namespaced (`prefix:name`) value; resolved against the document's
    /// `$namespaces`.
    Namespaced {
        /// The namespace prefix.
        prefix: String,
        /// The name after the prefix.
        name: String,
    },
    /// A `$import`/`$include` directive.
    ImportInclude {
        /// Which directive was used.
        kind: ImportKind,
    },
    /// A process linked by file path (a step's `run: path.cwl`).
    LinkedFile {
        /// The path as written in the document.
        path: String,
    },
    /// A schema definition linked by file path.
    LinkedSchemaDef {
        /// The path as written in the document.
        path: String,
    },
    /// A value that resolved to no candidate type.
    Unknown {
        /// The names of the candidates that were expected.
        expected: Vec<String>,
    },
}

impl TypeNode {
    /// Gets the display name of the type.
    pub fn name(&self) -> &str {
        match self {
            Self::Base { name }
            | Self::Enum { name, .. }
            | Self::DataType { name, .. }
            | Self::Array { name, .. }
            | Self::ListOrMap { name, .. }
            | Self::Record { name, .. } => name,
            Self::Any => "Any",
            Self::Expression => "Expression",
            Self::Namespaced { name, .. } => name,
            Self::ImportInclude { kind: ImportKind::Import } => "$import",
            Self::ImportInclude { kind: ImportKind::Include } => "$include",
            Self::LinkedFile { .. } => "linked process",
            Self::LinkedSchemaDef { .. } => "linked schema",
            Self::Unknown { .. } => "unknown",
        }
    }

    /// Gets the node as a record, if it is one.
    pub fn as_record(&self) -> Option<(&IndexMap<String, Field>, &[String])> {
        match self {
            Self::Record {
                fields, required, ..
            } => Some((fields, required)),
            _ => None,
        }
    }
}

/// A reference to a type: a compiled graph entry, or a node synthesized
/// during matching or walking (namespaced names, import directives, linked
/// files, unknowns, and user-defined schema-def types).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeHandle {
    /// A handle into the graph arena.
    Indexed(TypeIndex),
    /// An owned node synthesized outside the arena.
    Synthesized(Box<TypeNode>),
}

impl TypeHandle {
    /// Creates a handle owning a synthesized node.
    pub fn synthesized(node: TypeNode) -> Self {
        Self::Synthesized(Box::new(node))
    }

    /// Resolves the handle to its node.
    pub fn resolve<'a>(&'a self, graph: &'a TypeGraph) -> &'a TypeNode {
        match self {
            Self::Indexed(index) => graph.get(*index),
            Self::Synthesized(node) => node,
        }
    }
}

impl From<TypeIndex> for TypeHandle {
    fn from(index: TypeIndex) -> Self {
        Self::Indexed(index)
    }
}

/// The compiled type graph of a CWL language version.
///
/// Invariant: after compilation the graph contains no unresolved string
/// type references; every field and `extends` reference is a [`TypeIndex`]
/// into the arena.
#[derive(Debug)]
pub struct TypeGraph {
    /// The arena of compiled nodes.
    arena: Vec<TypeNode>,
    /// The name table over the arena.
    ///
    /// Anonymous nodes (inline arrays, enums, and records) live in the
    /// arena without a name-table entry.
    names: IndexMap<String, TypeIndex>,
    /// The CWL version the graph was compiled for.
    version: String,
}

impl TypeGraph {
    /// Creates an empty graph for the given version.
    pub(crate) fn new(version: impl Into<String>) -> Self {
        Self {
            arena: Vec::new(),
            names: IndexMap::new(),
            version: version.into(),
        }
    }

    /// Inserts an anonymous node into the arena.
    pub(crate) fn insert(&mut self, node: TypeNode) -> TypeIndex {
        let index = TypeIndex(self.arena.len());
        self.arena.push(node);
        index
    }

    /// Inserts a named node, making it visible to lookup.
    ///
    /// A later insertion under the same name shadows the earlier one, which
    /// is how schema records replace the seeded primitives when a version
    /// defines them more precisely.
    pub(crate) fn insert_named(&mut self, name: impl Into<String>, node: TypeNode) -> TypeIndex {
        let index = self.insert(node);
        self.names.insert(name.into(), index);
        index
    }

    /// Gets the node for a handle.
    pub fn get(&self, index: TypeIndex) -> &TypeNode {
        &self.arena[index.0]
    }

    /// Gets a mutable reference to the node for a handle.
    pub(crate) fn get_mut(&mut self, index: TypeIndex) -> &mut TypeNode {
        &mut self.arena[index.0]
    }

    /// Looks up a named type.
    pub fn lookup(&self, name: &str) -> Option<TypeIndex> {
        self.names.get(name).copied()
    }

    /// Iterates the graph's type names in definition order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    /// Gets the CWL version the graph was compiled for.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Gets the display names of a candidate list, for diagnostics.
    pub fn candidate_names(&self, candidates: &[TypeIndex]) -> Vec<String> {
        candidates
            .iter()
            .map(|index| self.get(*index).name().to_string())
            .collect()
    }
}
